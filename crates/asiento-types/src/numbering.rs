//! Per-company sequential transaction numbers: `PREFIX-00001`.

/// Zero-padding width of the sequence part.
pub const SEQUENCE_WIDTH: usize = 5;

pub fn format_number(prefix: &str, sequence: u64) -> String {
    format!("{prefix}-{sequence:0width$}", width = SEQUENCE_WIDTH)
}

/// Sequence part of `number` when it was issued under `prefix`.
pub fn parse_sequence(prefix: &str, number: &str) -> Option<u64> {
    number
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Next number after the highest sequence found among `existing`.
pub fn next_number<'a, I>(prefix: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let last = existing
        .into_iter()
        .filter_map(|n| parse_sequence(prefix, n))
        .max()
        .unwrap_or(0);
    format_number(prefix, last + 1)
}
