use crate::core::classifier::{ClassifierError, ScamClassifier};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// HTTP client for the external scam-scoring service.
pub struct HttpClassifier {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpClassifier {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl ScamClassifier for HttpClassifier {
    async fn score(&self, text: &str, user_id: u64) -> Result<f64, ClassifierError> {
        let url = format!("{}/v1/score", self.base_url);

        let payload = json!({
            "text": text,
            "user_id": user_id,
        });

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "scoring service returned {}",
                response.status()
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

        response_json["probability"]
            .as_f64()
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("no numeric `probability` field".to_string())
            })
    }
}
