use std::io::Read;
use std::time::Duration;

use super::ObjectStore;
use crate::error::{Error, Result};

/// S3-compatible bucket read over plain HTTPS GET.
///
/// Works with public buckets or presigned base URLs; no request signing.
pub struct HttpStore {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl ObjectStore for HttpStore {
    fn get_object(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.object_url(path);

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            // S3 answers 403 instead of 404 when listing is not allowed
            Err(ureq::Error::Status(404 | 403, _)) => {
                return Err(Error::ObjectNotFound(path.to_string()));
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::Store(format!("GET {} returned status {}", url, code)));
            }
            Err(e) => return Err(Error::Store(format!("GET {} failed: {}", url, e))),
        };

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| Error::Store(format!("Failed to read body of {}: {}", url, e)))?;

        Ok(body)
    }

    fn store_name(&self) -> &'static str {
        "http"
    }
}
