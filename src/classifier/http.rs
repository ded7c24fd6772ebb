//! Label model served over HTTP.
//!
//! Request: `{"text": "...", "k": n}`. Response: `{"labels": [...], "probabilities": [...]}`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use super::{LabelPredictor, Prediction};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
    k: usize,
}

#[derive(Clone)]
pub struct HttpLabelPredictor {
    client: ureq::Agent,
    endpoint: String,
}

impl HttpLabelPredictor {
    pub fn new(endpoint: String, timeout_secs: u64) -> Self {
        let client = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(if timeout_secs == 0 {
                DEFAULT_TIMEOUT_SECS
            } else {
                timeout_secs
            }))
            .build();
        Self { client, endpoint }
    }
}

impl LabelPredictor for HttpLabelPredictor {
    fn name(&self) -> &'static str {
        "http-label-model"
    }

    fn predict(&self, text: &str, k: usize) -> Result<Prediction> {
        let response = self
            .client
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_json(&PredictRequest { text, k })
            .map_err(|e| match e {
                ureq::Error::Status(status, response) => {
                    let body = response.into_string().unwrap_or_default();
                    if body.is_empty() {
                        anyhow!("Label model request failed with status {}", status)
                    } else {
                        anyhow!("Label model request failed with status {}: {}", status, body)
                    }
                }
                other => anyhow!("Failed to reach label model at {}: {}", self.endpoint, other),
            })?;

        let prediction: Prediction = response
            .into_json()
            .context("Failed to parse label model response")?;

        if prediction.labels.len() != prediction.probabilities.len() {
            return Err(anyhow!(
                "Label model returned {} labels but {} probabilities",
                prediction.labels.len(),
                prediction.probabilities.len()
            ));
        }

        Ok(prediction)
    }
}
