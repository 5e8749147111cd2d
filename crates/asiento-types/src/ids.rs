//! Strongly typed record identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

record_id!(
    /// Tenant company owning transactions and rules.
    CompanyId
);
record_id!(
    /// Chart-of-accounts entry.
    AccountId
);
record_id!(
    /// Vendor / customer counterparty.
    ThirdPartyId
);
record_id!(
    /// Persisted journal entry.
    TransactionId
);
record_id!(
    /// One line of a persisted journal entry.
    MovementId
);
record_id!(
    /// Learned or manual classification rule.
    RuleId
);
record_id!(
    /// Recurring transaction template.
    TemplateId
);
