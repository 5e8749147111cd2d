//! Account nature review.
//!
//! Result accounts normally move on one side only: equity and income are
//! credited, expenses are debited. A line against that side is usually a
//! mistake, except for the inverted accounts 4175 (sales returns, debited)
//! and 5905 (recovered expenses, credited). Findings are warnings and never
//! block a save.

use std::collections::HashMap;

use asiento_types::{Account, AccountId, AccountKind, MovementDraft, Side};
use serde::{Deserialize, Serialize};

const SALES_RETURNS_PREFIX: &str = "4175";
const RECOVERED_EXPENSES_PREFIX: &str = "5905";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatureWarning {
    pub movement_index: usize,
    pub account_code: String,
    pub kind: AccountKind,
    pub side: Side,
    pub message: String,
}

/// Lines whose side contradicts the nature of their result account.
///
/// Lines with unknown accounts, balance-sheet accounts (assets,
/// liabilities) and memo or cost accounts are not reviewed.
pub fn review_nature(
    movements: &[MovementDraft],
    accounts: &HashMap<AccountId, Account>,
) -> Vec<NatureWarning> {
    movements
        .iter()
        .enumerate()
        .filter_map(|(index, line)| {
            let account = accounts.get(&line.account?)?;
            let side = line.side()?;
            let code = account.code.as_str();

            let against_nature = match (account.kind, side) {
                (AccountKind::Equity, Side::Debit) => true,
                (AccountKind::Income, Side::Debit) => !code.starts_with(SALES_RETURNS_PREFIX),
                (AccountKind::Expense, Side::Credit) => {
                    !code.starts_with(RECOVERED_EXPENSES_PREFIX)
                }
                _ => false,
            };
            if !against_nature {
                return None;
            }

            let side_word = match side {
                Side::Debit => "debited",
                Side::Credit => "credited",
            };
            Some(NatureWarning {
                movement_index: index,
                account_code: account.code.clone(),
                kind: account.kind,
                side,
                message: format!(
                    "{} ({} account) is {} on movement {}; check the side",
                    account.full_name(),
                    account.kind.label(),
                    side_word,
                    index + 1
                ),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use asiento_types::{Money, ThirdPartyId};

    fn chart(accounts: &[&Account]) -> HashMap<AccountId, Account> {
        accounts.iter().map(|a| (a.id, (*a).clone())).collect()
    }

    #[test]
    fn debit_to_income_is_flagged() {
        let sales = Account::new("4135", "Comercio");
        let bank = Account::new("1110", "Bancos");
        let lines = [
            MovementDraft::debit(sales.id, ThirdPartyId::new(), Money::from_minor(100)),
            MovementDraft::credit(bank.id, ThirdPartyId::new(), Money::from_minor(100)),
        ];
        let warnings = review_nature(&lines, &chart(&[&sales, &bank]));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].movement_index, 0);
        assert_eq!(warnings[0].kind, AccountKind::Income);
        assert!(warnings[0].message.contains("4135 - Comercio"));
    }

    #[test]
    fn inverted_accounts_are_exempt() {
        let returns = Account::new("417505", "Devoluciones en ventas");
        let recovered = Account::new("5905", "Recuperaciones");
        let lines = [
            MovementDraft::debit(returns.id, ThirdPartyId::new(), Money::from_minor(100)),
            MovementDraft::credit(recovered.id, ThirdPartyId::new(), Money::from_minor(100)),
        ];
        assert!(review_nature(&lines, &chart(&[&returns, &recovered])).is_empty());
    }

    #[test]
    fn credit_to_expense_and_debit_to_equity_flagged() {
        let services = Account::new("5135", "Servicios");
        let capital = Account::new("3105", "Capital suscrito");
        let lines = [
            MovementDraft::debit(capital.id, ThirdPartyId::new(), Money::from_minor(100)),
            MovementDraft::credit(services.id, ThirdPartyId::new(), Money::from_minor(100)),
        ];
        let warnings = review_nature(&lines, &chart(&[&services, &capital]));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn balance_sheet_accounts_are_skipped() {
        let bank = Account::new("1110", "Bancos");
        let suppliers = Account::new("2205", "Proveedores");
        let lines = [
            MovementDraft::credit(bank.id, ThirdPartyId::new(), Money::from_minor(100)),
            MovementDraft::debit(suppliers.id, ThirdPartyId::new(), Money::from_minor(100)),
        ];
        assert!(review_nature(&lines, &chart(&[&bank, &suppliers])).is_empty());
    }
}
