use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RepError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f64,
}

/// Raw classifier verdict: every label it scored, with its confidence.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Classification {
    #[serde(default)]
    pub labels: Vec<LabelScore>,
}

/// The external text-classification oracle.
///
/// Implementations return `UpstreamUnavailable` when the oracle cannot be
/// reached; callers decide how to degrade.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, RepError>;
}
