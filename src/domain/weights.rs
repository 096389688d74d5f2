use serde::{Deserialize, Serialize};

use crate::error::RepError;

/// Tolerance on the sum-to-one check.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Unvalidated wire form of [`WeightConfig`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawWeights {
    pub recency: f64,
    pub similarity: f64,
    pub social: f64,
    pub trending: f64,
}

/// Factor weights for the composite score. Always non-negative and summing to 1.0.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(try_from = "RawWeights", into = "RawWeights")]
pub struct WeightConfig {
    recency: f64,
    similarity: f64,
    social: f64,
    trending: f64,
}

impl WeightConfig {
    pub fn new(recency: f64, similarity: f64, social: f64, trending: f64) -> Result<Self, RepError> {
        let config = Self {
            recency,
            similarity,
            social,
            trending,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RepError> {
        let parts = [
            ("recency", self.recency),
            ("similarity", self.similarity),
            ("social", self.social),
            ("trending", self.trending),
        ];
        for (name, value) in parts {
            if !value.is_finite() {
                return Err(RepError::InvalidWeightConfig(format!(
                    "{name} weight is not a finite number"
                )));
            }
            if value < 0.0 {
                return Err(RepError::InvalidWeightConfig(format!(
                    "{name} weight is negative ({value})"
                )));
            }
        }
        let sum: f64 = parts.iter().map(|(_, v)| v).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(RepError::InvalidWeightConfig(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn recency(&self) -> f64 {
        self.recency
    }

    #[must_use]
    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    #[must_use]
    pub fn social(&self) -> f64 {
        self.social
    }

    #[must_use]
    pub fn trending(&self) -> f64 {
        self.trending
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            recency: 0.35,
            similarity: 0.25,
            social: 0.25,
            trending: 0.15,
        }
    }
}

impl TryFrom<RawWeights> for WeightConfig {
    type Error = RepError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.recency, raw.similarity, raw.social, raw.trending)
    }
}

impl From<WeightConfig> for RawWeights {
    fn from(config: WeightConfig) -> Self {
        Self {
            recency: config.recency,
            similarity: config.similarity,
            social: config.social,
            trending: config.trending,
        }
    }
}
