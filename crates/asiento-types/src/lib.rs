//! # asiento-types
//!
//! Domain model shared by every Asiento crate:
//!
//! - **Money**: a 2-decimal `rust_decimal` newtype; amounts are parsed once
//!   at the edge and never re-coerced inside validation logic
//! - **Chart of accounts**: PUC codes with kind and nature derived from the
//!   leading digit
//! - **Third parties**: counterparties keyed by a cleaned NIT
//! - **Movements / transactions**: proposed (`*Draft`) and persisted forms
//! - **Classification rules**: learned (company, third party) → account
//!   mappings with confidence and running amount statistics
//!
//! ## Invariants
//!
//! - A persisted movement is pure debit or pure credit, never both, never
//!   neither.
//! - A persisted transaction balances within [`balance_tolerance`].

#![deny(unsafe_code)]

pub mod account;
pub mod error;
pub mod ids;
pub mod money;
pub mod movement;
pub mod nit;
pub mod numbering;
pub mod recurring;
pub mod rule;
pub mod third_party;
pub mod transaction;

pub use account::{Account, AccountKind, AccountNature, Company};
pub use error::{BalanceError, MoneyError, NitError, RequiredField};
pub use ids::{
    AccountId, CompanyId, MovementId, RuleId, TemplateId, ThirdPartyId, TransactionId,
};
pub use money::{balance_tolerance, Money};
pub use movement::{Movement, MovementDraft, Side};
pub use recurring::{MovementTemplate, RecurringTemplate};
pub use rule::ClassificationRule;
pub use third_party::ThirdParty;
pub use transaction::{Transaction, TransactionDraft};
