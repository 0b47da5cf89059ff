//! Entity types assigned to filings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Corporate structure a filing belongs to
///
/// The six known types serialize to the keys used by the checklist file.
/// `Other` carries a category label returned by the reference index that is
/// not one of the six.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    PrivateCompanyLimitedBySharesNonFinancial,
    PrivateCompanyLimitedByGuaranteeNonFinancial,
    PrivateCompanyLimitedBySharesFinancial,
    SpvContinuance,
    BranchFinancialNonFinancial,
    LlpFinancialNonFinancial,
    Other(String),
}

impl EntityType {
    /// The six known entity types in declaration order
    pub const KNOWN: [EntityType; 6] = [
        EntityType::PrivateCompanyLimitedBySharesNonFinancial,
        EntityType::PrivateCompanyLimitedByGuaranteeNonFinancial,
        EntityType::PrivateCompanyLimitedBySharesFinancial,
        EntityType::SpvContinuance,
        EntityType::BranchFinancialNonFinancial,
        EntityType::LlpFinancialNonFinancial,
    ];

    /// Canonical label (checklist key)
    pub fn as_str(&self) -> &str {
        match self {
            Self::PrivateCompanyLimitedBySharesNonFinancial => {
                "PrivateCompany_LimitedByShares_NonFinancial"
            }
            Self::PrivateCompanyLimitedByGuaranteeNonFinancial => {
                "PrivateCompany_LimitedByGuarantee_NonFinancial"
            }
            Self::PrivateCompanyLimitedBySharesFinancial => {
                "PrivateCompany_LimitedByShares_Financial"
            }
            Self::SpvContinuance => "SPV_Continuance",
            Self::BranchFinancialNonFinancial => "Branch_Financial_NonFinancial",
            Self::LlpFinancialNonFinancial => "LLP_Financial_NonFinancial",
            Self::Other(label) => label.as_str(),
        }
    }

    /// Whether this is one of the six known types
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for EntityType {
    fn from(label: String) -> Self {
        Self::KNOWN
            .iter()
            .find(|known| known.as_str() == label)
            .cloned()
            .unwrap_or(Self::Other(label))
    }
}

impl From<&str> for EntityType {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<EntityType> for String {
    fn from(entity: EntityType) -> Self {
        match entity {
            EntityType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
