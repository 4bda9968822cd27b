//! Google Gemini API implementation of `LlmClient`.
//!
//! Auth is a `?key=API_KEY` query parameter, the system instruction is a
//! top-level `system_instruction` field, and generation parameters live
//! under `generationConfig`. The digest only uses non-streaming
//! completions with `responseMimeType: application/json`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::{GenerateRequest, LlmClient};

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API client.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client from configuration.
    ///
    /// Reads the API key from the environment variable named by
    /// `config.api_key_env`. Returns `LlmError::AuthFailed` if unset.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| LlmError::AuthFailed {
            provider: format!("Gemini (env var '{}' not set)", config.api_key_env),
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
        })
    }

    /// Build the JSON request body for `generateContent`.
    fn build_request_body(request: &GenerateRequest) -> Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.prompt}],
            }],
            "generationConfig": {
                "maxOutputTokens": request.max_output_tokens,
                "temperature": request.temperature,
            },
        });

        if let Some(system) = &request.system {
            body["system_instruction"] = serde_json::json!({
                "parts": [{"text": system}]
            });
        }
        if request.json_response {
            body["generationConfig"]["responseMimeType"] =
                Value::String("application/json".to_string());
        }

        body
    }

    /// Extract the concatenated text parts of the first candidate.
    fn parse_response(body: &Value) -> Result<String, LlmError> {
        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'candidates' array in response".to_string(),
            })?;

        if candidates.is_empty() {
            return Err(LlmError::ResponseParse {
                message: "Empty 'candidates' array in response".to_string(),
            });
        }

        let parts = candidates[0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'parts' array in candidate content".to_string(),
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            // Safety-filtered or otherwise empty completions are a parse
            // failure for the caller to degrade on, not a panic.
            return Err(LlmError::ResponseParse {
                message: "Response contained no text parts".to_string(),
            });
        }

        Ok(text)
    }

    /// Map an HTTP status code to the appropriate `LlmError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: "Gemini".to_string(),
            },
            429 => LlmError::RateLimited {
                retry_after_secs: 30,
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Gemini API: {}", status, body_text),
            },
        }
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        let body = Self::build_request_body(&request);
        let url = self.endpoint_url();

        debug!(model = self.model.as_str(), "Sending Gemini completion request");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Request to Gemini API failed: {}", e),
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| LlmError::ResponseParse {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON in response: {}", e),
            })?;

        Self::parse_response(&response_json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_key_env: &str) -> LlmConfig {
        LlmConfig {
            model: "gemini-2.5-flash".to_string(),
            api_key_env: api_key_env.to_string(),
            base_url: None,
            max_calls: 80,
            batch_size: 10,
        }
    }

    #[test]
    fn test_new_reads_env() {
        let env_var = "GEMINI_TEST_KEY_NEW_READS";
        // SAFETY: test-only env var manipulation
        unsafe { std::env::set_var(env_var, "my-gemini-api-key") };
        let client = GeminiClient::new(&test_config(env_var)).unwrap();
        assert_eq!(client.api_key, "my-gemini-api-key");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.model_name(), "gemini-2.5-flash");
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var(env_var) };
    }

    #[test]
    fn test_new_missing_env_returns_auth_failed() {
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var("GEMINI_MISSING_KEY_XYZ") };
        let result = GeminiClient::new(&test_config("GEMINI_MISSING_KEY_XYZ"));
        match result.err().unwrap() {
            LlmError::AuthFailed { provider } => {
                assert!(provider.contains("GEMINI_MISSING_KEY_XYZ"));
            }
            other => panic!("Expected AuthFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_new_custom_base_url() {
        let env_var = "GEMINI_TEST_KEY_CUSTOM_URL";
        // SAFETY: test-only env var manipulation
        unsafe { std::env::set_var(env_var, "test-key") };
        let mut config = test_config(env_var);
        config.base_url = Some("https://my-proxy.example.com/v1".to_string());
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://my-proxy.example.com/v1");
        assert!(client.endpoint_url().starts_with("https://my-proxy.example.com/v1/models/"));
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var(env_var) };
    }

    #[test]
    fn test_build_request_body_basic() {
        let req = GenerateRequest::json("Classify these papers.")
            .with_system("You are an expert classifier.")
            .with_max_output_tokens(1024);
        let body = GeminiClient::build_request_body(&req);

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Classify these papers.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["system_instruction"]["parts"][0]["text"],
            "You are an expert classifier."
        );
    }

    #[test]
    fn test_build_request_body_without_system_or_json() {
        let mut req = GenerateRequest::json("hello");
        req.json_response = false;
        let body = GeminiClient::build_request_body(&req);
        assert!(body.get("system_instruction").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "[{\"paper_index\": 0}]"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 25, "candidatesTokenCount": 10}
        });
        let text = GeminiClient::parse_response(&response_json).unwrap();
        assert_eq!(text, "[{\"paper_index\": 0}]");
    }

    #[test]
    fn test_parse_multi_part_response_concatenates() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "[1,"}, {"text": " 2]"}], "role": "model"}
            }]
        });
        assert_eq!(GeminiClient::parse_response(&response_json).unwrap(), "[1, 2]");
    }

    #[test]
    fn test_parse_empty_candidates() {
        let response_json = serde_json::json!({"candidates": [], "usageMetadata": {}});
        let err = GeminiClient::parse_response(&response_json).unwrap_err();
        assert!(matches!(err, LlmError::ResponseParse { message } if message.contains("Empty")));
    }

    #[test]
    fn test_parse_missing_candidates() {
        let response_json = serde_json::json!({"error": "bad request"});
        let err = GeminiClient::parse_response(&response_json).unwrap_err();
        assert!(
            matches!(err, LlmError::ResponseParse { message } if message.contains("candidates"))
        );
    }

    #[test]
    fn test_parse_empty_parts_is_error() {
        let response_json = serde_json::json!({
            "candidates": [{"content": {"parts": [], "role": "model"}}]
        });
        assert!(GeminiClient::parse_response(&response_json).is_err());
    }

    #[test]
    fn test_http_error_mapping() {
        let err = GeminiClient::map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Invalid API key"}}"#,
        );
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let err = GeminiClient::map_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Rate limited"}}"#,
        );
        assert!(matches!(err, LlmError::RateLimited { retry_after_secs: 30 }));

        let err = GeminiClient::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":{"message":"Internal server error"}}"#,
        );
        assert!(matches!(err, LlmError::ApiRequest { message } if message.contains("500")));
    }
}
