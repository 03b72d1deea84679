use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::config::ClientConfig;
use crate::errors::ProviderError;

/// Text produced by a `generateContent` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedText {
    pub text: String,
    pub finish_reason: Option<String>,
}

/// Outcome of the model-listing probe. The endpoint answers either with a
/// `models` array or an `error` object; both arrive as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelListing {
    Models(Vec<String>),
    Error(Option<String>),
}

/// Boundary to the generative API so the task runner can be driven by fakes.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate_content(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedText, ProviderError>;

    async fn list_models(&self, credential: &str) -> Result<ModelListing, ProviderError>;
}

pub struct GeminiClient {
    client: Client,
    config: ClientConfig,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to construct HTTP client")?;
        Ok(Self { client, config })
    }

    fn generate_request(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
    ) -> reqwest::Result<Request> {
        let endpoint = self.config.endpoint(&format!("models/{model}:generateContent"));
        let payload = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}]
                }
            ]
        });
        self.client
            .post(endpoint)
            .query(&[("key", credential)])
            .json(&payload)
            .build()
    }

    fn list_request(&self, credential: &str) -> reqwest::Result<Request> {
        self.client
            .get(self.config.endpoint("models"))
            .query(&[("key", credential)])
            .build()
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate_content(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedText, ProviderError> {
        let request = self.generate_request(credential, model, prompt)?;
        let response = self.client.execute(request).await?;
        let status = response.status();
        let raw = response.text().await?;
        interpret_generate(status, &raw)
    }

    async fn list_models(&self, credential: &str) -> Result<ModelListing, ProviderError> {
        let request = self.list_request(credential)?;
        let response = self.client.execute(request).await?;
        // Error statuses still carry a JSON body with the detail we surface.
        let raw = response.text().await?;
        interpret_listing(&raw)
    }
}

/// Decide the outcome of a `generateContent` call from its status and body.
/// An `error.message` in the body wins over the bare status.
pub fn interpret_generate(status: StatusCode, raw: &str) -> Result<GeneratedText, ProviderError> {
    let body: Value = match serde_json::from_str(raw) {
        Ok(body) => body,
        Err(_) if !status.is_success() => {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: fallback_status_message(status, raw),
            })
        }
        Err(err) => return Err(ProviderError::Malformed(err.to_string())),
    };

    if let Some(message) = api_error_message(&body) {
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }
    if !status.is_success() {
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message: fallback_status_message(status, ""),
        });
    }
    parse_generate_response(&body)
}

/// Interpret a listing body regardless of the HTTP status it came with.
pub fn interpret_listing(raw: &str) -> Result<ModelListing, ProviderError> {
    let body: Value =
        serde_json::from_str(raw).map_err(|err| ProviderError::Malformed(err.to_string()))?;
    Ok(parse_model_listing(&body))
}

/// Extract `error.message` from a Gemini error body.
pub fn api_error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|err| err.get("message"))
        .and_then(|msg| msg.as_str())
        .map(|msg| msg.to_string())
}

pub fn parse_generate_response(body: &Value) -> Result<GeneratedText, ProviderError> {
    let candidate = body.get("candidates").and_then(|c| c.get(0));
    let Some(candidate) = candidate else {
        let reason = body
            .get("promptFeedback")
            .and_then(|fb| fb.get("blockReason"))
            .and_then(|r| r.as_str());
        return Err(match reason {
            Some(reason) => ProviderError::Blocked(reason.to_string()),
            None => ProviderError::Malformed("response contained no candidates".to_string()),
        });
    };

    let finish_reason = candidate
        .get("finishReason")
        .and_then(|r| r.as_str())
        .map(|r| r.to_string());
    let parts = candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array());

    let text = parts
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) =
            finish_reason.as_deref()
        {
            return Err(ProviderError::Blocked(reason.to_string()));
        }
    }

    Ok(GeneratedText {
        text,
        finish_reason,
    })
}

pub fn parse_model_listing(body: &Value) -> ModelListing {
    match body.get("models").and_then(|m| m.as_array()) {
        Some(models) => ModelListing::Models(
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                .map(|name| name.to_string())
                .collect(),
        ),
        None => ModelListing::Error(api_error_message(body)),
    }
}

fn fallback_status_message(status: StatusCode, raw: &str) -> String {
    let snippet = raw.trim().chars().take(200).collect::<String>();
    if snippet.is_empty() {
        format!("Gemini request failed with status {status}")
    } else {
        format!("Gemini request failed with status {status}: {snippet}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::agents::config::DEFAULT_BASE_URL;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = json!({
            "candidates": [
                {
                    "content": {"role": "model", "parts": [{"text": "Hello"}, {"text": ", world"}]},
                    "finishReason": "STOP"
                },
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });
        let parsed = parse_generate_response(&body).unwrap();
        assert_eq!(parsed.text, "Hello, world");
        assert_eq!(parsed.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert_eq!(
            parse_generate_response(&body),
            Err(ProviderError::Blocked("SAFETY".into()))
        );
        let body = json!({"candidates": [{"finishReason": "SAFETY"}]});
        assert_eq!(
            parse_generate_response(&body),
            Err(ProviderError::Blocked("SAFETY".into()))
        );
    }

    #[test]
    fn missing_candidates_is_malformed() {
        assert!(matches!(
            parse_generate_response(&json!({})),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn error_body_message_is_extracted() {
        let body = json!({"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}});
        assert_eq!(api_error_message(&body).as_deref(), Some("API key not valid."));
        assert_eq!(api_error_message(&json!({"models": []})), None);
    }

    #[test]
    fn listing_is_tagged_by_shape() {
        let body = json!({"models": [{"name": "models/gemini-2.0-flash"}, {"name": "models/gemini-2.5-pro"}]});
        assert_eq!(
            parse_model_listing(&body),
            ModelListing::Models(vec![
                "models/gemini-2.0-flash".into(),
                "models/gemini-2.5-pro".into()
            ])
        );
        assert_eq!(
            parse_model_listing(&json!({"error": {"message": "invalid key"}})),
            ModelListing::Error(Some("invalid key".into()))
        );
        assert_eq!(parse_model_listing(&json!({})), ModelListing::Error(None));
    }

    fn request_query(request: &Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn client_builds_from_default_config() {
        let client = GeminiClient::new(ClientConfig::default()).unwrap();
        let request = client.list_request("k").unwrap();
        assert_eq!(
            request.url().as_str(),
            format!("{}/models?key=k", DEFAULT_BASE_URL)
        );
    }

    #[test]
    fn requests_carry_key_as_query_parameter() {
        let client = GeminiClient::new(ClientConfig {
            base_url: "http://127.0.0.1:9/v1beta".into(),
            ..ClientConfig::default()
        })
        .unwrap();

        let request = client
            .generate_request("AIza key", "gemini-2.5-pro", "hi")
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().path(),
            "/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert_eq!(
            request_query(&request),
            vec![("key".to_string(), "AIza key".to_string())]
        );
        let body: Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");

        let request = client.list_request("AIza key").unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/v1beta/models");
        assert_eq!(
            request_query(&request),
            vec![("key".to_string(), "AIza key".to_string())]
        );
    }

    #[test]
    fn successful_generate_body_yields_text() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"hola"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(interpret_generate(StatusCode::OK, raw).unwrap().text, "hola");
    }

    #[test]
    fn error_body_message_wins_over_status() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            interpret_generate(StatusCode::BAD_REQUEST, raw),
            Err(ProviderError::Api {
                status: 400,
                message: "API key not valid. Please pass a valid API key.".into(),
            })
        );
        let raw = r#"{"error":{"message":"quota"}}"#;
        assert!(matches!(
            interpret_generate(StatusCode::OK, raw),
            Err(ProviderError::Api { status: 200, message }) if message == "quota"
        ));
    }

    #[test]
    fn non_json_error_body_falls_back_to_status() {
        let raw = "<html><body>Bad Gateway</body></html>";
        let err = interpret_generate(StatusCode::BAD_GATEWAY, raw).unwrap_err();
        let ProviderError::Api { status, message } = err else {
            panic!("expected an API error, got {err:?}");
        };
        assert_eq!(status, 502);
        assert!(message.starts_with("Gemini request failed with status 502 Bad Gateway"));
        assert!(message.contains("Bad Gateway</body>"));

        let err = interpret_generate(StatusCode::SERVICE_UNAVAILABLE, "{}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gemini request failed with status 503 Service Unavailable"
        );
    }

    #[test]
    fn non_json_success_body_is_malformed() {
        assert!(matches!(
            interpret_generate(StatusCode::OK, "not json"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn listing_body_is_read_whatever_the_status() {
        assert_eq!(
            interpret_listing(r#"{"error":{"code":400,"message":"invalid key"}}"#),
            Ok(ModelListing::Error(Some("invalid key".into())))
        );
        assert_eq!(
            interpret_listing(r#"{"models":[{"name":"models/gemma-3-27b-it"}]}"#),
            Ok(ModelListing::Models(vec!["models/gemma-3-27b-it".into()]))
        );
        assert!(matches!(
            interpret_listing("<html>"),
            Err(ProviderError::Malformed(_))
        ));
    }
}
