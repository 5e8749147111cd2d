use asiento_types::CompanyId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Amount-deviation thresholds for [`crate::AnomalyDetector`].
///
/// An amount is anomalous when it is below `average × low_ratio` or above
/// `average × high_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub low_ratio: Decimal,
    pub high_ratio: Decimal,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            low_ratio: Decimal::new(5, 1),
            high_ratio: Decimal::TWO,
        }
    }
}

impl DetectorConfig {
    /// Requires `0 < low_ratio <= 1 <= high_ratio`.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.low_ratio <= Decimal::ZERO || self.low_ratio > Decimal::ONE {
            return Err(LedgerError::Config(format!(
                "detector.low_ratio must be in (0, 1], got {}",
                self.low_ratio
            )));
        }
        if self.high_ratio < Decimal::ONE {
            return Err(LedgerError::Config(format!(
                "detector.high_ratio must be at least 1, got {}",
                self.high_ratio
            )));
        }
        Ok(())
    }
}

/// Extra keywords for the expense classifier.
///
/// Keywords for a code already in the base table are appended to it; new
/// codes are tried after the base table. `company_id` limits the entry to
/// one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub account_code: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    /// Re-reads after an optimistic-concurrency conflict before a rule
    /// update gives up.
    pub max_conflict_retries: u32,
    /// Fallback expense account ("gastos diversos").
    pub default_account_code: String,
    pub keywords: Vec<KeywordRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            max_conflict_retries: default_max_conflict_retries(),
            default_account_code: default_account_code(),
            keywords: Vec::new(),
        }
    }
}

fn default_max_conflict_retries() -> u32 {
    5
}

fn default_account_code() -> String {
    "5195".to_string()
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.detector.validate()?;
        if self.default_account_code.trim().is_empty() {
            return Err(LedgerError::Config(
                "default_account_code must not be empty".to_string(),
            ));
        }
        if let Some(rule) = self.keywords.iter().find(|r| r.account_code.trim().is_empty()) {
            return Err(LedgerError::Config(format!(
                "keyword rule {:?} has no account code",
                rule.keywords
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_are_half_and_double() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.detector.low_ratio, dec!(0.5));
        assert_eq!(cfg.detector.high_ratio, dec!(2));
        assert_eq!(cfg.max_conflict_retries, 5);
        assert_eq!(cfg.default_account_code, "5195");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_ratios() {
        let cfg = DetectorConfig {
            low_ratio: dec!(1.5),
            high_ratio: dec!(2),
        };
        assert!(matches!(cfg.validate(), Err(LedgerError::Config(_))));

        let cfg = DetectorConfig {
            low_ratio: dec!(0.5),
            high_ratio: dec!(0.9),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            max_conflict_retries = 9

            [detector]
            high_ratio = 3.0

            [[keywords]]
            account_code = "5120"
            keywords = ["bodega"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.max_conflict_retries, 9);
        assert_eq!(cfg.detector.low_ratio, dec!(0.5));
        assert_eq!(cfg.detector.high_ratio, dec!(3));
        assert_eq!(cfg.keywords[0].company_id, None);
    }
}
