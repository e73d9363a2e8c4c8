//! Thin HTTP client for the upstream completions endpoint.
//!
//! One `generate` call is exactly one POST: no retries, no backoff. The whole
//! exchange is bounded by the configured timeout.
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::prompt::enhancer::enhance_prompt;
use crate::prompt::validation::{validate_request, PromptRules};
use crate::types::{GeneratedImage, GenerationRequest, GenerationResult};
use crate::upstream::extract::extract_image_url;
use crate::upstream::types::{
    ChatMessage, CompletionRequest, CompletionResponse, ImageGenerationParams, UpstreamErrorBody,
};

pub const MAX_TOKENS: u32 = 1024;
pub const TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    endpoint: String,
    api_key: String,
    customer_id: String,
    model: String,
    system_prompt: String,
    timeout: Duration,
    rules: PromptRules,
}

impl GenerationClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(AppError::HttpClient)?;
        Ok(GenerationClient {
            client,
            endpoint: config.upstream_url.clone(),
            api_key: config.upstream_api_key.clone(),
            customer_id: config.upstream_customer_id.clone(),
            model: config.upstream_model.clone(),
            system_prompt: config.system_prompt.clone(),
            timeout: config.upstream_timeout,
            rules: PromptRules::default().with_min_len(config.prompt_min_length),
        })
    }

    pub fn rules(&self) -> &PromptRules {
        &self.rules
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the upstream body for `request` with an already enhanced prompt.
    pub fn build_payload(&self, request: &GenerationRequest, enhanced_prompt: &str) -> CompletionRequest {
        let system = request
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.system_prompt.as_str());
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(enhanced_prompt)],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            image_generation: ImageGenerationParams {
                width: request.width,
                height: request.height,
                quality: request.quality,
                seed: request.seed,
            },
        }
    }

    /// Generate an image, reporting every failure as a typed result.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        match self.try_generate(request).await {
            Ok(image) => GenerationResult::Success(image),
            Err(e) => GenerationResult::Failure { kind: e.kind(), message: e.to_string() },
        }
    }

    /// Same flow as [`generate`](Self::generate) for callers that want `?`.
    pub async fn try_generate(&self, request: &GenerationRequest) -> AppResult<GeneratedImage> {
        validate_request(request, &self.rules)?;

        let enhanced_prompt = enhance_prompt(request.prompt.trim(), &request.style);
        let payload = self.build_payload(request, &enhanced_prompt);

        tracing::info!("Sending generation request to {}", self.endpoint);
        tracing::debug!("Generation payload: {:?}", payload);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("CustomerId", &self.customer_id)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            tracing::error!("Upstream error. Status: {}, Body: {}", status, body);
            return Err(map_status(status, &body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Malformed upstream body: {}", e);
            AppError::Upstream {
                status: status.as_u16(),
                message: "Invalid response format from image generation service".to_string(),
            }
        })?;
        let content = parsed.first_content().ok_or_else(|| {
            AppError::UpstreamFormat("response has no choices[0].message.content".to_string())
        })?;
        let image_url = extract_image_url(&content).ok_or_else(|| {
            AppError::UpstreamFormat("content did not contain an image reference".to_string())
        })?;

        tracing::info!("Generation succeeded for style '{}'", request.style);
        Ok(GeneratedImage {
            image_url,
            enhanced_prompt,
            dimensions: request.dimensions(),
            timestamp: Utc::now(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            tracing::error!("Upstream call timed out after {:?}", self.timeout);
            AppError::Timeout(self.timeout)
        } else {
            tracing::error!("Upstream transport error: {}", e);
            AppError::HttpClient(e)
        }
    }
}

/// Map a non-OK upstream status to the error taxonomy.
pub fn map_status(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited,
        StatusCode::UNAUTHORIZED => AppError::UpstreamAuth,
        _ => {
            let message = serde_json::from_str::<UpstreamErrorBody>(body)
                .ok()
                .and_then(|b| b.error.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown Status")
                    )
                });
            AppError::Upstream { status: status.as_u16(), message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, Quality};
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Mock {
        hits: AtomicUsize,
        last_body: Mutex<Option<Value>>,
        last_headers: Mutex<Option<HeaderMap>>,
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Content(&'static str),
        Status(u16),
        Stall,
    }

    async fn spawn_mock(reply: Reply) -> (SocketAddr, Arc<Mock>) {
        let mock = Arc::new(Mock::default());
        let handler = move |State(m): State<Arc<Mock>>, headers: HeaderMap, Json(body): Json<Value>| async move {
            m.hits.fetch_add(1, Ordering::SeqCst);
            *m.last_body.lock().unwrap() = Some(body);
            *m.last_headers.lock().unwrap() = Some(headers);
            match reply {
                Reply::Content(c) => (
                    axum::http::StatusCode::OK,
                    Json(json!({"choices": [{"message": {"role": "assistant", "content": c}}]})),
                ),
                Reply::Status(code) => (
                    axum::http::StatusCode::from_u16(code).unwrap(),
                    Json(json!({"error": {"message": "upstream says no"}})),
                ),
                Reply::Stall => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    (axum::http::StatusCode::OK, Json(json!({})))
                }
            }
        };
        let app = Router::new()
            .route("/chat/completions", post(handler))
            .with_state(mock.clone());
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        (addr, mock)
    }

    fn client_for(addr: SocketAddr, timeout: Duration) -> GenerationClient {
        let config = Config {
            upstream_url: format!("http://{}/chat/completions", addr),
            upstream_api_key: "test-key".to_string(),
            upstream_customer_id: "cus_test".to_string(),
            upstream_timeout: timeout,
            ..Config::default()
        };
        GenerationClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_plain_url_content() {
        let (addr, mock) = spawn_mock(Reply::Content("https://x.test/img.png")).await;
        let client = client_for(addr, Duration::from_secs(5));
        let req = GenerationRequest::new("a red fox in snow").with_style("vintage");

        let result = client.generate(&req).await;
        assert_eq!(result.image_url(), Some("https://x.test/img.png"));
        assert_eq!(mock.hits.load(Ordering::SeqCst), 1);

        if let GenerationResult::Success(image) = result {
            assert_eq!(
                image.enhanced_prompt,
                "a red fox in snow, vintage, retro, classic, nostalgic, timeless"
            );
        }
    }

    #[tokio::test]
    async fn test_json_content_and_payload_shape() {
        let (addr, mock) = spawn_mock(Reply::Content(r#"{"url":"https://x.test/a.jpg"}"#)).await;
        let client = client_for(addr, Duration::from_secs(5));
        let req = GenerationRequest::new("  lighthouse  ")
            .with_size(1344, 768)
            .with_quality(Quality::High)
            .with_seed(7);

        let image = client.try_generate(&req).await.unwrap();
        assert_eq!(image.image_url, "https://x.test/a.jpg");
        assert_eq!(image.dimensions.width, 1344);

        let body = mock.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], crate::config::DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"].as_str().unwrap().starts_with("lighthouse, "));
        assert_eq!(body["image_generation"], json!({"width": 1344, "height": 768, "quality": "high", "seed": 7}));

        let headers = mock.last_headers.lock().unwrap().clone().unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer test-key");
        assert_eq!(headers.get("customerid").unwrap(), "cus_test");
    }

    #[tokio::test]
    async fn test_system_prompt_override() {
        let (addr, mock) = spawn_mock(Reply::Content("https://x.test/img.png")).await;
        let client = client_for(addr, Duration::from_secs(5));
        let req = GenerationRequest::new("a quiet pond").with_system_prompt("Only watercolors.");
        assert!(client.generate(&req).await.is_success());
        let body = mock.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["messages"][0]["content"], "Only watercolors.");
    }

    #[tokio::test]
    async fn test_rate_limit_single_call() {
        let (addr, mock) = spawn_mock(Reply::Status(429)).await;
        let client = client_for(addr, Duration::from_secs(5));
        let result = client.generate(&GenerationRequest::new("a red fox")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::RateLimit));
        assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_failure() {
        let (addr, _mock) = spawn_mock(Reply::Status(401)).await;
        let client = client_for(addr, Duration::from_secs(5));
        let result = client.generate(&GenerationRequest::new("a red fox")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Auth));
    }

    #[tokio::test]
    async fn test_other_status_uses_upstream_message() {
        let (addr, _mock) = spawn_mock(Reply::Status(503)).await;
        let client = client_for(addr, Duration::from_secs(5));
        match client.generate(&GenerationRequest::new("a red fox")).await {
            GenerationResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Upstream);
                assert_eq!(message, "upstream says no");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_reported_once() {
        let (addr, mock) = spawn_mock(Reply::Stall).await;
        let client = client_for(addr, Duration::from_millis(200));
        let result = client.generate(&GenerationRequest::new("a red fox")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_image_data() {
        let (addr, _mock) = spawn_mock(Reply::Content("Sorry, I can only describe images.")).await;
        let client = client_for(addr, Duration::from_secs(5));
        let result = client.generate(&GenerationRequest::new("a red fox")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::NoImageData));
    }

    #[tokio::test]
    async fn test_validation_skips_network() {
        let (addr, mock) = spawn_mock(Reply::Content("https://x.test/img.png")).await;
        let client = client_for(addr, Duration::from_secs(5));
        let result = client.generate(&GenerationRequest::new("   ")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(mock.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_map_status_fallback_message() {
        let err = map_status(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
        assert!(matches!(map_status(StatusCode::TOO_MANY_REQUESTS, ""), AppError::RateLimited));
        assert!(matches!(map_status(StatusCode::UNAUTHORIZED, ""), AppError::UpstreamAuth));
    }
}
