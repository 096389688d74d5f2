use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::{IssueTag, RiskReport};
use crate::port::{Classification, TextClassifier};

#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    /// Only labels scored strictly above this become issues.
    pub threshold: f64,
    pub timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            timeout: Duration::from_secs(3),
        }
    }
}

/// Classifier outcome once the timeout and fallback have been applied.
#[derive(Debug, Clone)]
pub enum ClassifierVerdict {
    Available(Classification),
    Degraded,
}

/// Pre-publication content check. Advisory only: it never fails.
pub struct ContentRiskAnalyzer {
    classifier: Arc<dyn TextClassifier>,
    config: AnalyzerConfig,
}

impl ContentRiskAnalyzer {
    pub fn new(classifier: Arc<dyn TextClassifier>, config: AnalyzerConfig) -> Self {
        Self { classifier, config }
    }

    #[must_use]
    pub fn config(&self) -> AnalyzerConfig {
        self.config
    }

    pub async fn analyze(&self, content: &str) -> RiskReport {
        if content.trim().is_empty() {
            return RiskReport::default();
        }
        match self.classify(content).await {
            ClassifierVerdict::Available(classification) => self.report_from(&classification),
            ClassifierVerdict::Degraded => RiskReport::degraded(),
        }
    }

    /// Raw classifier call with the bounded timeout applied.
    pub async fn classify(&self, text: &str) -> ClassifierVerdict {
        match timeout(self.config.timeout, self.classifier.classify(text)).await {
            Ok(Ok(classification)) => ClassifierVerdict::Available(classification),
            Ok(Err(e)) => {
                warn!(error = %e, "classifier unavailable, degrading to empty report");
                ClassifierVerdict::Degraded
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "classifier timed out, degrading to empty report"
                );
                ClassifierVerdict::Degraded
            }
        }
    }

    /// Keep only known labels scored above the threshold.
    #[must_use]
    pub fn report_from(&self, classification: &Classification) -> RiskReport {
        let findings = classification.labels.iter().filter_map(|label| {
            let tag = IssueTag::from_label(&label.label)?;
            (label.confidence > self.config.threshold).then_some((tag, label.confidence))
        });
        let report = RiskReport::from_findings(findings);
        debug!(
            issues = report.issues.len(),
            confidence = report.confidence,
            "content analyzed"
        );
        report
    }
}
