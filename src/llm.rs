//! Cliente mínimo del endpoint `generateContent` de Gemini.
//!
//! Una única petición por mensaje: sin reintentos, sin backoff y sin timeout
//! de respuesta. Cualquier estado no 2xx o carga con otra forma es un error.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::AppConfig;

pub const TEMPERATURE: f32 = 0.7;
pub const TOP_K: u32 = 40;
pub const TOP_P: f32 = 0.95;
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("falta la API key de Gemini")]
    MissingApiKey,
    #[error("URL del endpoint inválida: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("fallo de transporte: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("el endpoint respondió {status}: {body}")]
    Status { status: u16, body: String },
    #[error("respuesta con formato inesperado")]
    MalformedPayload,
}

/// Generador de texto remoto visto como caja negra.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, GenerationError> {
        Self::new(
            cfg.gemini_base_url.clone(),
            cfg.gemini_model.clone(),
            cfg.gemini_api_key.clone(),
        )
    }

    fn endpoint(&self, api_key: &str) -> Result<Url, GenerationError> {
        let mut url = Url::parse(&format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        ))?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;
        let url = self.endpoint(api_key)?;

        info!("Petición a Gemini model={} ({} caracteres de prompt)", self.model, prompt.len());
        let response = self
            .client
            .post(url)
            .json(&GenerateRequest::new(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini respondió {}: {}", status, body.chars().take(500).collect::<String>());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|_| GenerationError::MalformedPayload)?;
        extract_text(&payload)
    }
}

/// Extrae `candidates[0].content.parts[0].text`.
fn extract_text(payload: &Value) -> Result<String, GenerationError> {
    payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GenerationError::MalformedPayload)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// Servidor local que imita el endpoint generativo.
    #[derive(Clone)]
    pub(crate) struct MockEndpoint {
        pub status: StatusCode,
        pub body: Value,
        pub received: Arc<Mutex<Vec<Value>>>,
    }

    impl MockEndpoint {
        pub fn replying(status: StatusCode, body: Value) -> Self {
            Self {
                status,
                body,
                received: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Arranca el servidor y devuelve su URL base.
        pub async fn spawn(self) -> String {
            async fn handler(
                State(mock): State<MockEndpoint>,
                Json(request): Json<Value>,
            ) -> (StatusCode, Json<Value>) {
                mock.received.lock().expect("received lock").push(request);
                (mock.status, Json(mock.body.clone()))
            }

            let app = Router::new()
                .route("/models/:action", post(handler))
                .with_state(self);
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock endpoint");
            let addr = listener.local_addr().expect("mock endpoint addr");
            tokio::spawn(async move {
                axum::serve(listener, app).await.expect("run mock endpoint");
            });
            format!("http://{addr}")
        }
    }

    pub(crate) fn success_body(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[tokio::test]
    async fn posts_prompt_and_fixed_generation_config() {
        let mock = MockEndpoint::replying(StatusCode::OK, success_body("Respuesta"));
        let received = mock.received.clone();
        let base_url = mock.spawn().await;

        let client = GeminiClient::new(base_url, "gemini-2.0-flash", Some("k".into())).unwrap();
        let text = client.generate("hola").await.unwrap();
        assert_eq!(text, "Respuesta");

        let requests = received.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request["contents"][0]["parts"][0]["text"], "hola");
        assert_eq!(request["generationConfig"]["topK"], 40);
        assert_eq!(request["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[tokio::test]
    async fn server_errors_are_reported_without_retrying() {
        let mock = MockEndpoint::replying(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}));
        let received = mock.received.clone();
        let base_url = mock.spawn().await;

        let client = GeminiClient::new(base_url, "gemini-2.0-flash", Some("k".into())).unwrap();
        let err = client.generate("hola").await.unwrap_err();
        assert!(matches!(err, GenerationError::Status { status: 500, .. }));
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unexpected_shapes_are_malformed() {
        let mock = MockEndpoint::replying(StatusCode::OK, json!({ "candidates": [] }));
        let base_url = mock.spawn().await;

        let client = GeminiClient::new(base_url, "gemini-2.0-flash", Some("k".into())).unwrap();
        let err = client.generate("hola").await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedPayload));
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let client = GeminiClient::new("http://127.0.0.1:9", "gemini-2.0-flash", None).unwrap();
        let err = client.generate("hola").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }

    #[test]
    fn from_config_builds_a_client_for_the_configured_endpoint() {
        let cfg = AppConfig {
            server_addr: "127.0.0.1:0".into(),
            frontend_dir: "frontend".into(),
            open_browser: false,
            gemini_api_key: Some("secret".into()),
            gemini_base_url: "https://example.test/v1beta".into(),
            gemini_model: "gemini-2.0-flash".into(),
            preferences_path: std::env::temp_dir().join("preferences.json"),
            timings: Default::default(),
        };

        let client = GeminiClient::from_config(&cfg).unwrap();
        assert_eq!(client.api_key.as_deref(), Some("secret"));
        assert_eq!(
            client.endpoint("secret").unwrap().as_str(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent?key=secret"
        );
    }

    #[test]
    fn endpoint_carries_model_and_key() {
        let client = GeminiClient::new("https://example.test/v1beta/", "gemini-2.0-flash", None).unwrap();
        let url = client.endpoint("abc").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent?key=abc"
        );
    }
}
