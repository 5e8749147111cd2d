//! Expense account suggestion for a third party.
//!
//! Order of preference: the learned rule, then the keyword table, then the
//! default account. Classification never changes rules.

use asiento_types::{AccountId, CompanyId, Money, ThirdPartyId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EngineConfig, KeywordRule};
use crate::detector::{AnomalyDetector, RuleSnapshot};

/// Keyword table applied to every company. Earlier entries win.
const BASE_KEYWORDS: &[(&str, &[&str])] = &[
    ("5120", &["arriendo", "alquiler", "renta", "arrendamiento", "lease", "canon"]),
    ("5105", &["honorarios", "nomina", "nómina", "salario", "sueldo", "prestaciones", "personal"]),
    ("5135", &["servicios", "aseo", "vigilancia"]),
    ("5140", &["impuesto", "gravamen", "predial", "vehicular", "ica", "reteica", "iva"]),
    ("5130", &["seguros", "póliza", "aseguradora", "poliza", "seguro"]),
    ("5115", &["celular", "internet", "telecomunicaciones", "telefono", "datos"]),
    ("5145", &["mantenimiento", "reparación", "reparacion", "repuesto"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    LearnedRule,
    Keyword,
    Default,
}

/// Suggested account: an id when it comes from a rule, a PUC code otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAccount {
    Id(AccountId),
    Code(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub account: SuggestedAccount,
    pub source: ClassificationSource,
    pub anomalous: bool,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    table: Vec<(String, Vec<String>, Option<CompanyId>)>,
    default_code: String,
    detector: AnomalyDetector,
}

impl Classifier {
    pub fn new(config: &EngineConfig, detector: AnomalyDetector) -> Self {
        let mut table: Vec<(String, Vec<String>, Option<CompanyId>)> = BASE_KEYWORDS
            .iter()
            .map(|(code, words)| {
                (
                    code.to_string(),
                    words.iter().map(|w| w.to_string()).collect(),
                    None,
                )
            })
            .collect();

        for KeywordRule {
            account_code,
            keywords,
            company_id,
        } in &config.keywords
        {
            let words = keywords.iter().map(|k| k.to_lowercase());
            match table
                .iter_mut()
                .find(|(code, _, scope)| code == account_code && scope == company_id)
            {
                Some((_, existing, _)) => existing.extend(words),
                None => table.push((account_code.clone(), words.collect(), *company_id)),
            }
        }

        Self {
            table,
            default_code: config.default_account_code.clone(),
            detector,
        }
    }

    /// Keyword lookup only. Falls back to the default code.
    pub fn classify_by_keywords(&self, company_id: CompanyId, text: &str) -> (String, bool) {
        let text = text.to_lowercase();
        let hit = self
            .table
            .iter()
            .filter(|(_, _, scope)| scope.map_or(true, |c| c == company_id))
            .find(|(_, words, _)| words.iter().any(|w| text.contains(w.as_str())));
        match hit {
            Some((code, _, _)) => (code.clone(), true),
            None => (self.default_code.clone(), false),
        }
    }

    pub fn classify(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
        text: &str,
        amount: Money,
        rules: &RuleSnapshot,
    ) -> Classification {
        if let Some(rule) = rules.get(company_id, third_party_id) {
            let average = rule.average();
            if self.detector.amount_deviates(average, amount) {
                warn!(
                    third_party = %third_party_id,
                    average = %average,
                    amount = %amount,
                    "Amount anomalous for learned rule, using default account"
                );
                return Classification {
                    account: SuggestedAccount::Code(self.default_code.clone()),
                    source: ClassificationSource::Default,
                    anomalous: true,
                    reason: format!("Anomalous amount: average is {average}"),
                };
            }
            debug!(third_party = %third_party_id, confidence = rule.confidence, "Classified by rule");
            return Classification {
                account: SuggestedAccount::Id(rule.account_id),
                source: ClassificationSource::LearnedRule,
                anomalous: false,
                reason: format!("Learned rule (confidence {})", rule.confidence),
            };
        }

        let (code, matched) = self.classify_by_keywords(company_id, text);
        if matched {
            Classification {
                account: SuggestedAccount::Code(code),
                source: ClassificationSource::Keyword,
                anomalous: false,
                reason: "Keyword match".to_string(),
            }
        } else {
            Classification {
                account: SuggestedAccount::Code(code),
                source: ClassificationSource::Default,
                anomalous: false,
                reason: "No rule or keyword matched".to_string(),
            }
        }
    }
}
