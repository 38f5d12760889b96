//! One-shot request/response calls against the backend.
//!
//! Used for actions that expect a single structured reply, like submitting a
//! free-text answer during a convergence flow. Validation failures never
//! reach the network; backend error payloads surface their `detail` text
//! verbatim; everything else degrades to a transport failure with the best
//! available message.

use kardia_core::KardiaError;

#[derive(Debug, Clone)]
pub struct ConvergenceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ConvergenceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a convergence answer. The success payload is opaque JSON
    /// forwarded verbatim to the caller.
    pub async fn submit_answer(&self, answer: &str) -> Result<serde_json::Value, KardiaError> {
        if answer.is_empty() {
            return Err(KardiaError::Validation(
                "answer must be a non-empty string".to_string(),
            ));
        }

        let url = format!("{}/convergence/answer", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "answer": answer }))
            .send()
            .await
            .map_err(|e| KardiaError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| KardiaError::Transport(format!("malformed response body: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string));

        match detail {
            Some(detail) => Err(KardiaError::Backend(detail)),
            None => Err(KardiaError::Transport(format!(
                "backend returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ))),
        }
    }
}
