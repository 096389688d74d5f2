use serde::{Deserialize, Serialize};

use super::reputation::Reason;

/// Policy issue the classifier can flag.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IssueTag {
    HateSpeech,
    Harassment,
    Spam,
    ExcessiveProfanity,
    PersonalAttack,
}

impl IssueTag {
    /// Fixed point deduction applied per issue.
    #[must_use]
    pub const fn penalty_points(self) -> f64 {
        match self {
            Self::HateSpeech => -10.0,
            Self::Harassment => -8.0,
            Self::Spam => -2.0,
            Self::ExcessiveProfanity => -3.0,
            Self::PersonalAttack => -1.0,
        }
    }

    #[must_use]
    pub const fn reason(self) -> Reason {
        match self {
            Self::HateSpeech => Reason::HateSpeech,
            Self::Harassment => Reason::Harassment,
            Self::Spam => Reason::Spam,
            Self::ExcessiveProfanity => Reason::ExcessiveProfanity,
            Self::PersonalAttack => Reason::PersonalAttack,
        }
    }

    /// Map a classifier label onto a tag. Labels we do not police return `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "hate_speech" | "hate" => Some(Self::HateSpeech),
            "harassment" => Some(Self::Harassment),
            "spam" => Some(Self::Spam),
            "excessive_profanity" | "profanity" => Some(Self::ExcessiveProfanity),
            "personal_attack" | "insult" => Some(Self::PersonalAttack),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.reason().as_str()
    }

    /// User-facing warning text.
    #[must_use]
    pub const fn warning(self) -> &'static str {
        match self {
            Self::HateSpeech => "This content may contain hate speech.",
            Self::Harassment => "This content may be read as harassment.",
            Self::Spam => "This content looks like spam.",
            Self::ExcessiveProfanity => "This content contains a lot of profanity.",
            Self::PersonalAttack => "This content may read as a personal attack.",
        }
    }
}

/// Structured outcome of classifying a piece of content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub issues: Vec<IssueTag>,
    /// Sum of the per-issue deductions; zero or negative.
    pub suggested_penalty: f64,
    pub confidence: f64,
    /// Set when the classifier could not be consulted and this report is a fallback.
    #[serde(default)]
    pub degraded: bool,
}

impl RiskReport {
    /// Fallback used when the classifier is unreachable or timed out.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }

    /// Build a report from already thresholded `(tag, confidence)` findings.
    #[must_use]
    pub fn from_findings(findings: impl IntoIterator<Item = (IssueTag, f64)>) -> Self {
        let mut issues: Vec<IssueTag> = Vec::new();
        let mut confidence: f64 = 0.0;
        for (tag, score) in findings {
            if !issues.contains(&tag) {
                issues.push(tag);
            }
            confidence = confidence.max(score);
        }
        issues.sort();
        let suggested_penalty = issues.iter().map(|tag| tag.penalty_points()).sum();
        Self {
            issues,
            suggested_penalty,
            confidence,
            degraded: false,
        }
    }

    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_normalizes() {
        assert_eq!(IssueTag::from_label("Hate-Speech"), Some(IssueTag::HateSpeech));
        assert_eq!(IssueTag::from_label(" spam "), Some(IssueTag::Spam));
        assert_eq!(IssueTag::from_label("political"), None);
    }

    #[test]
    fn test_report_sums_penalties_and_dedups() {
        let report = RiskReport::from_findings([
            (IssueTag::Harassment, 0.8),
            (IssueTag::Spam, 0.95),
            (IssueTag::Harassment, 0.75),
        ]);
        assert_eq!(report.issues, vec![IssueTag::Harassment, IssueTag::Spam]);
        assert_eq!(report.suggested_penalty, -10.0);
        assert_eq!(report.confidence, 0.95);
        assert!(!report.degraded);
    }

    #[test]
    fn test_degraded_report_is_empty() {
        let report = RiskReport::degraded();
        assert!(!report.has_issues());
        assert!(report.degraded);
        assert_eq!(report.suggested_penalty, 0.0);
    }
}
