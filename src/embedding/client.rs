use std::io::Read;
use std::time::Duration;

use url::Url;

use super::ModelClient;
use crate::config::ModelConfig;
use crate::error::{Error, Result};

/// Model client speaking the Bedrock runtime `InvokeModel` HTTP layout:
/// `POST {endpoint}/model/{model_id}/invoke`.
pub struct HttpModelClient {
    endpoint: Url,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl HttpModelClient {
    /// Fails when `endpoint` is not an absolute http(s) URL.
    pub fn new(endpoint: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let parsed = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
        }
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Ok(Self {
            endpoint: parsed,
            api_key: api_key.map(|s| s.to_string()),
            agent,
        })
    }

    /// `model_id` is pushed as a single path segment, so `/`, `?`, `#` and
    /// `%` inside it are percent-encoded rather than changing the URL.
    fn invoke_url(&self, model_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("model").push(model_id).push("invoke");
        }
        url
    }
}

impl ModelClient for HttpModelClient {
    fn invoke_model(&self, model_id: &str, body: &[u8], content_type: &str) -> Result<Vec<u8>> {
        let url = self.invoke_url(model_id);

        let mut req = self
            .agent
            .post(url.as_str())
            .set("Content-Type", content_type)
            .set("Accept", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.set("Authorization", &format!("Bearer {}", api_key));
        }

        let response = match req.send_bytes(body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                return Err(Error::Invocation(format!(
                    "{} returned status {}: {}",
                    model_id,
                    code,
                    detail.trim()
                )));
            }
            Err(e) => return Err(Error::Invocation(format!("{} request failed: {}", model_id, e))),
        };

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| Error::Invocation(format!("Failed to read {} response: {}", model_id, e)))?;

        Ok(bytes)
    }
}

/// Create a model client based on configuration
pub fn create_client(config: &ModelConfig) -> Result<Box<dyn ModelClient>> {
    let api_key = config.resolved_api_key();
    Ok(Box::new(HttpModelClient::new(
        &config.endpoint,
        api_key.as_deref(),
        Duration::from_secs(config.timeout_secs),
    )?))
}
