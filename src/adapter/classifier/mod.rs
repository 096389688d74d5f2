mod http;

pub use http::{HttpClassifier, HttpClassifierConfig, UnconfiguredClassifier};
