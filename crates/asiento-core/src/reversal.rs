//! Voiding a posted transaction with a mirror entry.
//!
//! The original stays in the books; a new transaction with every line's
//! debit and credit swapped cancels it out.

use asiento_types::{MovementDraft, Transaction, TransactionDraft};
use chrono::NaiveDate;

pub const REVERSAL_CONCEPT_PREFIX: &str = "ANULACIÓN - ";

/// Draft that cancels `original`, dated `date`.
pub fn reversal_draft(
    original: &Transaction,
    date: NaiveDate,
    requested_by: Option<&str>,
) -> TransactionDraft {
    let mut note = format!("Anula comprobante {} del {}", original.number, original.date);
    if let Some(user) = requested_by.map(str::trim).filter(|u| !u.is_empty()) {
        note.push_str(". Usuario: ");
        note.push_str(user);
    }

    TransactionDraft {
        company_id: original.company_id,
        date,
        concept: format!("{REVERSAL_CONCEPT_PREFIX}{}", original.concept),
        additional_description: Some(note),
        movements: original
            .movements
            .iter()
            .map(|m| MovementDraft {
                account: Some(m.account_id),
                third_party: Some(m.third_party_id),
                debit: m.credit,
                credit: m.debit,
                description: Some(format!(
                    "Anulación: {}",
                    m.description.as_deref().unwrap_or_default()
                )),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asiento_types::{
        AccountId, CompanyId, Money, Movement, MovementId, ThirdPartyId, TransactionId,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn posted() -> Transaction {
        let now = Utc::now();
        let id = TransactionId::new();
        let tp = ThirdPartyId::new();
        let line = |account, debit: Money, credit: Money, description: Option<&str>| Movement {
            id: MovementId::new(),
            transaction_id: id,
            account_id: account,
            third_party_id: tp,
            debit,
            credit,
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        Transaction {
            id,
            company_id: CompanyId::new(),
            number: "TRX-00007".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            concept: "Aseo marzo".to_string(),
            additional_description: None,
            movements: vec![
                line(AccountId::new(), Money::new(dec!(300)), Money::ZERO, Some("Factura 12")),
                line(AccountId::new(), Money::ZERO, Money::new(dec!(300)), None),
            ],
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    #[test]
    fn sides_are_swapped_line_by_line() {
        let original = posted();
        let today = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let draft = reversal_draft(&original, today, Some("contador"));

        assert_eq!(draft.company_id, original.company_id);
        assert_eq!(draft.date, today);
        assert_eq!(draft.concept, "ANULACIÓN - Aseo marzo");
        assert_eq!(
            draft.additional_description.as_deref(),
            Some("Anula comprobante TRX-00007 del 2024-03-05. Usuario: contador")
        );
        for (reversed, line) in draft.movements.iter().zip(&original.movements) {
            assert_eq!(reversed.account, Some(line.account_id));
            assert_eq!(reversed.third_party, Some(line.third_party_id));
            assert_eq!(reversed.debit, line.credit);
            assert_eq!(reversed.credit, line.debit);
        }
        assert_eq!(draft.movements[0].description.as_deref(), Some("Anulación: Factura 12"));
        assert_eq!(draft.movements[1].description.as_deref(), Some("Anulación: "));
    }

    #[test]
    fn blank_user_is_left_out() {
        let draft = reversal_draft(&posted(), NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(), Some(" "));
        assert_eq!(
            draft.additional_description.as_deref(),
            Some("Anula comprobante TRX-00007 del 2024-03-05")
        );
    }
}
