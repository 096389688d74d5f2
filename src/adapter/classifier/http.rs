/// HTTP client for the external text classifier.
///
/// Connect and total timeouts are set on the underlying client; any transport
/// failure, timeout or non-2xx answer surfaces as `UpstreamUnavailable`.
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::RepError;
use crate::port::{Classification, TextClassifier};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpClassifierConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpClassifier {
    pub fn new(config: HttpClassifierConfig) -> Result<Self, RepError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RepError::Config(format!("failed to build classifier HTTP client: {e}")))?;

        let endpoint = classify_endpoint(&config.base_url)?;

        Ok(Self {
            client,
            endpoint,
            token: config.token,
        })
    }
}

/// `{base}/v1/classify`, keeping any path prefix on the base URL.
fn classify_endpoint(base_url: &str) -> Result<Url, RepError> {
    fn invalid(e: impl std::fmt::Display) -> RepError {
        RepError::Config(format!("invalid classifier URL: {e}"))
    }
    let mut base = Url::parse(base_url.trim()).map_err(invalid)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("v1/classify").map_err(invalid)
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, RepError> {
        debug!(chars = text.chars().count(), "classifying text");

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&ClassifyRequest { text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RepError::UpstreamUnavailable(format!("classifier request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepError::UpstreamUnavailable(format!(
                "classifier returned status {status}"
            )));
        }

        response
            .json::<Classification>()
            .await
            .map_err(|e| RepError::UpstreamUnavailable(format!("invalid classifier response: {e}")))
    }
}

/// Stand-in used when no classifier URL is configured. Always unavailable,
/// so every analysis degrades to an empty report.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredClassifier;

#[async_trait]
impl TextClassifier for UnconfiguredClassifier {
    async fn classify(&self, _text: &str) -> Result<Classification, RepError> {
        Err(RepError::UpstreamUnavailable(
            "no classifier configured".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> HttpClassifierConfig {
        HttpClassifierConfig {
            base_url,
            timeout: Duration::from_millis(500),
            token: Some("secret".into()),
        }
    }

    #[tokio::test]
    async fn test_classify_parses_labels() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": [{ "label": "spam", "confidence": 0.91 }]
            })))
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(config(server.uri())).unwrap();
        let result = classifier.classify("buy now").await.unwrap();
        assert_eq!(result.labels.len(), 1);
        assert_eq!(result.labels[0].label, "spam");
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(config(server.uri())).unwrap();
        let err = classifier.classify("hello").await.unwrap_err();
        assert!(matches!(err, RepError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_classifier_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/classify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "labels": [] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(config(server.uri())).unwrap();
        let err = classifier.classify("hello").await.unwrap_err();
        assert!(matches!(err, RepError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        assert_eq!(
            classify_endpoint("http://h/api").unwrap().as_str(),
            "http://h/api/v1/classify"
        );
        assert_eq!(
            classify_endpoint("http://h/api/").unwrap().as_str(),
            "http://h/api/v1/classify"
        );
        assert_eq!(
            classify_endpoint("http://h:8080").unwrap().as_str(),
            "http://h:8080/v1/classify"
        );
    }

    #[tokio::test]
    async fn test_classify_under_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/moderation/v1/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": []
            })))
            .mount(&server)
            .await;

        let classifier =
            HttpClassifier::new(config(format!("{}/moderation", server.uri()))).unwrap();
        assert!(classifier.classify("hello").await.unwrap().labels.is_empty());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = HttpClassifier::new(config("not a url".into())).unwrap_err();
        assert!(matches!(err, RepError::Config(_)));
    }
}
