use serde::{Deserialize, Serialize};

use crate::error::NitError;
use crate::ids::ThirdPartyId;
use crate::nit;

/// Vendor or customer. The key under which classification rules are learned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThirdParty {
    pub id: ThirdPartyId,
    pub name: String,
    /// Digits only; see [`nit::clean_nit`].
    pub nit: String,
    pub alias: Option<String>,
    pub is_deleted: bool,
}

impl ThirdParty {
    /// Register a third party, rejecting malformed NITs.
    pub fn new(name: impl Into<String>, nit: &str) -> Result<Self, NitError> {
        let nit = nit::validate_nit(nit)?;
        Ok(Self {
            id: ThirdPartyId::new(),
            name: name.into(),
            nit,
            alias: None,
            is_deleted: false,
        })
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Alias when set, full name otherwise.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_cleaned_nit() {
        let tp = ThirdParty::new("Aseo Total", "900.123.456-8").unwrap();
        assert_eq!(tp.nit, "9001234568");
        assert_eq!(tp.display_name(), "Aseo Total");
        assert_eq!(tp.with_alias("Aseo").display_name(), "Aseo");
    }

    #[test]
    fn rejects_bad_nit() {
        assert!(ThirdParty::new("Nadie", "12").is_err());
    }
}
