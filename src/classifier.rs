//! Remote classifier boundary.
//!
//! One multipart upload per `classify` call, no retries. Whatever goes
//! wrong (explicit service error, transport failure, unparseable body) is
//! reported as a `ClassifyError` for the session to map to an "Unknown"
//! result.

use crate::model::{Classification, ClientConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier error: {0}")]
    Service(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed classifier response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Seam between the session and the remote service; stubbed in tests.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: Bytes, file_name: String)
        -> Result<Classification, ClassifyError>;
}

pub struct HttpClassifier {
    http: reqwest::Client,
    predict_url: String,
}

impl HttpClassifier {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&cfg.user_agent);
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build().context("build HTTP client")?,
            predict_url: format!("{}/predict", cfg.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        image: Bytes,
        file_name: String,
    ) -> Result<Classification, ClassifyError> {
        let part = reqwest::multipart::Part::stream(image).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self.http.post(&self.predict_url).multipart(form).send().await?;
        // The service reports failures in the body, not the status code,
        // so parse regardless of status.
        let body = resp.text().await?;
        parse_prediction(&body)
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: Option<String>,
    confidence: Option<f64>,
    error: Option<String>,
}

/// Parse a classifier response body.
///
/// Absent `confidence` defaults to 0 here, at the boundary, so the rest of
/// the flow never deals with a missing score.
fn parse_prediction(body: &str) -> Result<Classification, ClassifyError> {
    let resp: PredictResponse = serde_json::from_str(body)?;
    if let Some(error) = resp.error {
        return Err(ClassifyError::Service(error));
    }
    Ok(Classification {
        label: resp.prediction.unwrap_or_else(|| "Unknown".to_string()),
        confidence: resp.confidence.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prediction_and_confidence() {
        let c = parse_prediction(r#"{"prediction":"Jollof Rice","confidence":0.92}"#).unwrap();
        assert_eq!(c.label, "Jollof Rice");
        assert_eq!(c.confidence, 0.92);
    }

    #[test]
    fn missing_confidence_defaults_to_zero() {
        let c = parse_prediction(r#"{"prediction":"Suya"}"#).unwrap();
        assert_eq!(c.label, "Suya");
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn missing_prediction_defaults_to_unknown() {
        let c = parse_prediction(r#"{"confidence":0.5}"#).unwrap();
        assert_eq!(c.label, "Unknown");
    }

    #[test]
    fn error_field_is_a_service_failure() {
        let err = parse_prediction(r#"{"error":"model unavailable"}"#).unwrap_err();
        match err {
            ClassifyError::Service(msg) => assert_eq!(msg, "model unavailable"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_prediction("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedResponse(_)));
    }

    #[test]
    fn predict_url_strips_trailing_slash() {
        let cfg = ClientConfig {
            base_url: "https://www.naijafood.live/".into(),
            user_agent: "test".into(),
            request_timeout: None,
        };
        let client = HttpClassifier::new(&cfg).unwrap();
        assert_eq!(client.predict_url, "https://www.naijafood.live/predict");
    }
}
