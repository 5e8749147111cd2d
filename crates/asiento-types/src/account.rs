use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, CompanyId};

/// Account class of the Colombian PUC, keyed by the first code digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
    Cost,
    DebitMemo,
    CreditMemo,
}

impl AccountKind {
    /// Class from the leading digit of a PUC code. Unknown or empty codes
    /// default to [`AccountKind::Asset`].
    pub fn from_code(code: &str) -> Self {
        match code.trim().chars().next() {
            Some('2') => AccountKind::Liability,
            Some('3') => AccountKind::Equity,
            Some('4') => AccountKind::Income,
            Some('5') => AccountKind::Expense,
            Some('6') | Some('7') => AccountKind::Cost,
            Some('8') => AccountKind::DebitMemo,
            Some('9') => AccountKind::CreditMemo,
            _ => AccountKind::Asset,
        }
    }

    /// Side on which balances of this class naturally grow.
    pub fn nature(self) -> AccountNature {
        match self {
            AccountKind::Asset
            | AccountKind::Expense
            | AccountKind::Cost
            | AccountKind::DebitMemo => AccountNature::Debit,
            AccountKind::Liability
            | AccountKind::Equity
            | AccountKind::Income
            | AccountKind::CreditMemo => AccountNature::Credit,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountKind::Asset => "asset",
            AccountKind::Liability => "liability",
            AccountKind::Equity => "equity",
            AccountKind::Income => "income",
            AccountKind::Expense => "expense",
            AccountKind::Cost => "cost",
            AccountKind::DebitMemo => "debit memo",
            AccountKind::CreditMemo => "credit memo",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountNature {
    Debit,
    Credit,
}

/// Chart-of-accounts entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Hierarchical PUC code, e.g. `"5135"` or `"110505"`.
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
    pub nature: AccountNature,
    /// Depth in the hierarchy; the code length.
    pub level: u8,
    pub is_active: bool,
    pub description: Option<String>,
}

impl Account {
    /// Build an account with kind, nature and level derived from its code.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        let code = code.into().trim().to_string();
        let kind = AccountKind::from_code(&code);
        Self {
            id: AccountId::new(),
            level: code.len().min(u8::MAX as usize) as u8,
            code,
            name: name.into(),
            kind,
            nature: kind.nature(),
            is_active: true,
            description: None,
        }
    }

    /// Override the derived class (and its nature).
    pub fn with_kind(mut self, kind: AccountKind) -> Self {
        self.kind = kind;
        self.nature = kind.nature();
        self
    }

    /// `"5135 - Servicios"`.
    pub fn full_name(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }
}

/// Tenant company. Transactions are numbered per company with its prefix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub nit: String,
    pub transaction_prefix: String,
    pub is_active: bool,
}

impl Company {
    pub const DEFAULT_PREFIX: &'static str = "TRX";

    pub fn new(name: impl Into<String>, nit: impl Into<String>) -> Self {
        Self {
            id: CompanyId::new(),
            name: name.into(),
            nit: nit.into(),
            transaction_prefix: Self::DEFAULT_PREFIX.to_string(),
            is_active: true,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.transaction_prefix = prefix.into();
        self
    }
}
