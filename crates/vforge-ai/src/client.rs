//! OpenAI-compatible HTTP client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vforge_models::ContentAnalysis;

use crate::error::{AiError, AiResult};
use crate::parse::parse_analysis;
use crate::{ContentAnalyzer, Transcriber, Transcription};

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a video content analyzer. Analyze the transcription \
and identify the most engaging scenes for short-form content.
Return a JSON object with:
- scenes: Array of scenes with startTime, endTime (in seconds), confidence (0-1), and description
- highlights: Array of key phrases or topics that make the content engaging

Focus on identifying moments with high engagement potential for social media.";

/// Configuration for the AI client.
#[derive(Debug, Clone)]
pub struct AiClientConfig {
    pub api_key: String,
    /// Base URL including the API version segment
    pub base_url: String,
    pub transcription_model: String,
    pub analysis_model: String,
    pub language: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for AiClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            transcription_model: "whisper-1".to_string(),
            analysis_model: "gpt-4o".to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl AiClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            transcription_model: std::env::var("TRANSCRIPTION_MODEL")
                .unwrap_or(defaults.transcription_model),
            analysis_model: std::env::var("ANALYSIS_MODEL").unwrap_or(defaults.analysis_model),
            language: std::env::var("TRANSCRIPTION_LANGUAGE").unwrap_or(defaults.language),
            timeout: std::env::var("AI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client implementing both pipeline AI capabilities.
pub struct OpenAiClient {
    http: Client,
    config: AiClientConfig,
}

impl OpenAiClient {
    pub fn new(config: AiClientConfig) -> AiResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::MissingCredentials("OPENAI_API_KEY not set".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> AiResult<Self> {
        Self::new(AiClientConfig::from_env())
    }

    pub fn config(&self) -> &AiClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> AiError {
        if e.is_timeout() {
            AiError::Timeout(self.config.timeout.as_secs())
        } else {
            AiError::Network(e)
        }
    }

    async fn check_status(response: Response) -> AiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AiError::from_status(status.as_u16(), &body))
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, audio: &Path) -> AiResult<Transcription> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        debug!(
            file = %audio.display(),
            size_bytes = bytes.len(),
            model = %self.config.transcription_model,
            "Sending audio for transcription"
        );

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name))
            .text("model", self.config.transcription_model.clone())
            .text("response_format", "json")
            .text("language", self.config.language.clone());

        let response = self
            .http
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let transcription: Transcription = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::invalid_response(format!("transcription body: {}", e)))?;

        info!(chars = transcription.text.len(), "Transcription received");
        Ok(transcription)
    }
}

#[async_trait]
impl ContentAnalyzer for OpenAiClient {
    async fn analyze(&self, transcript: &str) -> AiResult<ContentAnalysis> {
        let user_prompt = format!(
            "Analyze this video transcription and identify the best scenes for short-form content:\n\n{}",
            transcript
        );
        let request = ChatRequest {
            model: &self.config.analysis_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ANALYSIS_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let chat: ChatResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::invalid_response(format!("chat body: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::invalid_response("no content in analysis response"))?;

        let analysis = parse_analysis(&content)?;
        info!(
            scenes = analysis.scenes.len(),
            highlights = analysis.highlights.len(),
            "Content analysis received"
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(AiClientConfig {
            api_key: "test-key".to_string(),
            base_url: format!("{}/v1", server.uri()),
            timeout: Duration::from_secs(5),
            ..AiClientConfig::default()
        })
        .unwrap()
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn test_config_defaults() {
        let config = AiClientConfig::default();
        assert_eq!(config.transcription_model, "whisper-1");
        assert_eq!(config.analysis_model, "gpt-4o");
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let err = OpenAiClient::new(AiClientConfig::default()).err().unwrap();
        assert!(matches!(err, AiError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "hello there"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.wav");
        tokio::fs::write(&audio, b"RIFF....WAVE").await.unwrap();

        let result = client_for(&server).transcribe(&audio).await.unwrap();
        assert_eq!(result.text, "hello there");
    }

    #[tokio::test]
    async fn test_transcribe_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.wav");
        tokio::fs::write(&audio, b"x").await.unwrap();

        let err = client_for(&server).transcribe(&audio).await.unwrap_err();
        assert!(matches!(err, AiError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_transcribe_missing_file() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .transcribe(Path::new("/definitely/not/here.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Audio(_)));
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let server = MockServer::start().await;
        let content = r#"{"scenes":[{"startTime":1,"endTime":4,"confidence":0.7}],"highlights":["a"]}"#;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
            .mount(&server)
            .await;

        let analysis = client_for(&server).analyze("some words").await.unwrap();
        assert_eq!(analysis.scenes.len(), 1);
        assert_eq!(analysis.scenes[0].end_time, 4.0);
    }

    #[tokio::test]
    async fn test_analyze_fails_closed_on_malformed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("{\"topics\": []}")))
            .mount(&server)
            .await;

        let err = client_for(&server).analyze("words").await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_analyze_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).analyze("words").await.unwrap_err();
        assert!(matches!(err, AiError::Unauthorized(_)));
    }
}
