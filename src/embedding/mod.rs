//! Multimodal embedding generation.
//!
//! A text/image pair is sent to a hosted embedding model as
//! `{"inputText", "inputImage", "embeddingConfig": {"outputEmbeddingLength"}}`
//! and the `embedding` array of the JSON response is returned as-is.

mod client;

pub use client::{create_client, HttpModelClient};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::{fetch_image_base64, ObjectStore, DEFAULT_IMAGE_SIZE};

/// Embedding length requested when none is configured
pub const DEFAULT_OUTPUT_EMBEDDING_LENGTH: u32 = 1024;

/// Read-only capability for invoking a hosted model
pub trait ModelClient: Send + Sync {
    /// Invoke `model_id` with `body` and return the raw response body
    fn invoke_model(&self, model_id: &str, body: &[u8], content_type: &str) -> Result<Vec<u8>>;
}

/// Knobs for [`generate_embedding_with`]
#[derive(Debug, Clone)]
pub struct EmbeddingOptions {
    pub image_size: String,
    pub output_embedding_length: u32,
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            output_embedding_length: DEFAULT_OUTPUT_EMBEDDING_LENGTH,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingRequest<'a> {
    input_text: &'a str,
    input_image: String,
    embedding_config: EmbeddingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingConfig {
    output_embedding_length: u32,
}

/// Embed `text` together with the `small` rendition of `image_key`.
pub fn generate_embedding(
    store: &dyn ObjectStore,
    text: &str,
    image_key: &str,
    client: &dyn ModelClient,
    model_id: &str,
) -> Result<Vec<f64>> {
    generate_embedding_with(store, text, image_key, client, model_id, &EmbeddingOptions::default())
}

/// Embed `text` together with an image, with explicit size variant and
/// output length.
pub fn generate_embedding_with(
    store: &dyn ObjectStore,
    text: &str,
    image_key: &str,
    client: &dyn ModelClient,
    model_id: &str,
    options: &EmbeddingOptions,
) -> Result<Vec<f64>> {
    let input_image = fetch_image_base64(store, image_key, &options.image_size)?;

    let request = EmbeddingRequest {
        input_text: text,
        input_image,
        embedding_config: EmbeddingConfig {
            output_embedding_length: options.output_embedding_length,
        },
    };
    let body = serde_json::to_vec(&request).map_err(Error::EncodeRequest)?;

    tracing::debug!(model_id, image_key, "invoking embedding model");
    let response = client.invoke_model(model_id, &body, "application/json")?;

    parse_embedding_response(&response)
}

/// Pull the `embedding` array out of a model response body, keeping the
/// full f64 precision of each component
fn parse_embedding_response(body: &[u8]) -> Result<Vec<f64>> {
    let mut response: Value = serde_json::from_slice(body).map_err(Error::MalformedResponse)?;

    let embedding = response
        .get_mut("embedding")
        .map(Value::take)
        .ok_or(Error::MissingField("embedding"))?;

    serde_json::from_value(embedding).map_err(Error::MalformedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    use crate::store::LocalStore;

    /// Records the last request and answers with a canned body
    struct FakeClient {
        response: Result<Vec<u8>>,
        seen: Mutex<Option<(String, Value, String)>>,
    }

    impl FakeClient {
        fn answering(body: &str) -> Self {
            Self {
                response: Ok(body.as_bytes().to_vec()),
                seen: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(Error::Invocation("throttled".to_string())),
                seen: Mutex::new(None),
            }
        }
    }

    impl ModelClient for FakeClient {
        fn invoke_model(&self, model_id: &str, body: &[u8], content_type: &str) -> Result<Vec<u8>> {
            let payload: Value = serde_json::from_slice(body).unwrap();
            *self.seen.lock().unwrap() =
                Some((model_id.to_string(), payload, content_type.to_string()));
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(e) => Err(Error::Invocation(e.to_string())),
            }
        }
    }

    fn store_with_image() -> (tempfile::TempDir, LocalStore) {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images/small/8c")).unwrap();
        std::fs::write(dir.path().join("images/small/8c/shoe.jpg"), b"jpeg-bytes").unwrap();
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_generate_embedding_returns_vector_unchanged() {
        let (_dir, store) = store_with_image();
        let client = FakeClient::answering(r#"{"embedding": [0.1, 0.2], "inputTextTokenCount": 4}"#);

        let embedding =
            generate_embedding(&store, "red shoe", "8c/shoe.jpg", &client, "titan").unwrap();
        assert_eq!(embedding, vec![0.1, 0.2]);
    }

    #[test]
    fn test_embedding_keeps_full_precision() {
        let (_dir, store) = store_with_image();
        let client = FakeClient::answering(r#"{"embedding": [0.123456789012345, -1.0000000000001]}"#);

        let embedding =
            generate_embedding(&store, "red shoe", "8c/shoe.jpg", &client, "titan").unwrap();
        assert!((embedding[0] - 0.123456789012345).abs() < 1e-15);
        assert!((embedding[1] + 1.0000000000001).abs() < 1e-15);
    }

    #[test]
    fn test_request_encoding_error_is_not_a_response_error() {
        let source = serde_json::from_str::<Value>("{").unwrap_err();
        let err = Error::EncodeRequest(source);
        assert!(err.to_string().starts_with("failed to encode model request"));
        assert!(!matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_request_payload() {
        let (_dir, store) = store_with_image();
        let client = FakeClient::answering(r#"{"embedding": []}"#);

        generate_embedding(&store, "red shoe", "8c/shoe.jpg", &client, "titan").unwrap();

        let (model_id, payload, content_type) = client.seen.lock().unwrap().take().unwrap();
        assert_eq!(model_id, "titan");
        assert_eq!(content_type, "application/json");
        assert_eq!(payload["inputText"], "red shoe");
        assert_eq!(payload["inputImage"], "anBlZy1ieXRlcw==");
        assert_eq!(payload["embeddingConfig"]["outputEmbeddingLength"], 1024);
    }

    #[test]
    fn test_options_override_length_and_size() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images/large")).unwrap();
        std::fs::write(dir.path().join("images/large/a.jpg"), b"x").unwrap();
        let store = LocalStore::new(dir.path());
        let client = FakeClient::answering(r#"{"embedding": [1.0]}"#);

        let options = EmbeddingOptions {
            image_size: "large".to_string(),
            output_embedding_length: 384,
        };
        generate_embedding_with(&store, "t", "a.jpg", &client, "titan", &options).unwrap();

        let (_, payload, _) = client.seen.lock().unwrap().take().unwrap();
        assert_eq!(payload["embeddingConfig"]["outputEmbeddingLength"], 384);
    }

    #[test]
    fn test_missing_embedding_field() {
        let (_dir, store) = store_with_image();
        let client = FakeClient::answering(r#"{"message": "ok"}"#);

        let err = generate_embedding(&store, "t", "8c/shoe.jpg", &client, "titan").unwrap_err();
        assert!(matches!(err, Error::MissingField("embedding")));
    }

    #[test]
    fn test_non_json_response() {
        let (_dir, store) = store_with_image();
        let client = FakeClient::answering("<html>502</html>");

        let err = generate_embedding(&store, "t", "8c/shoe.jpg", &client, "titan").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_invocation_error_propagates() {
        let (_dir, store) = store_with_image();
        let client = FakeClient::failing();

        let err = generate_embedding(&store, "t", "8c/shoe.jpg", &client, "titan").unwrap_err();
        assert!(matches!(err, Error::Invocation(_)));
    }

    #[test]
    fn test_missing_image_skips_invocation() {
        let (_dir, store) = store_with_image();
        let client = FakeClient::answering(r#"{"embedding": [0.5]}"#);

        let err = generate_embedding(&store, "t", "nope.jpg", &client, "titan").unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound(_)));
        assert!(client.seen.lock().unwrap().is_none());
    }
}
