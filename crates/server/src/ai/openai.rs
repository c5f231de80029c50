//! OpenAI Chat Completions and audio transcription client

use serde::{Deserialize, Serialize};

use super::AiError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TRANSCRIPTION_MODEL: &str = "whisper-1";

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Transcription {
    text: String,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// File extension Whisper uses to sniff the container format
fn audio_extension(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or_default().trim() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/flac" => "flac",
        _ => "webm",
    }
}

impl OpenAiClient {
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(AiError::Api {
            vendor: "OpenAI",
            status: status.as_u16(),
            message,
        })
    }

    pub async fn chat(&self, system: Option<&str>, user_message: &str) -> Result<String, AiError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_message,
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature: 0.2,
            })
            .send()
            .await
            .map_err(|e| AiError::Transport(format!("HTTP request failed: {}", e)))?;

        let reply = Self::check(response)
            .await?
            .json::<ChatResponse>()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AiError::InvalidResponse("No text content in response".to_string()))
    }

    /// Speech to text through the Whisper transcription endpoint
    pub async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<String, AiError> {
        let file = reqwest::multipart::Part::bytes(audio)
            .file_name(format!("audio.{}", audio_extension(mime)))
            .mime_str(mime)
            .map_err(|e| AiError::Unsupported(format!("audio type {mime}: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", TRANSCRIPTION_MODEL);

        let response = self
            .http
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AiError::Transport(format!("HTTP request failed: {}", e)))?;

        let transcription = Self::check(response)
            .await?
            .json::<Transcription>()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Failed to parse transcription: {}", e)))?;
        Ok(transcription.text)
    }
}

#[cfg(test)]
mod tests {
    use super::audio_extension;

    #[test]
    fn maps_audio_types_to_extensions() {
        assert_eq!(audio_extension("audio/mpeg"), "mp3");
        assert_eq!(audio_extension("audio/wav"), "wav");
        assert_eq!(audio_extension("audio/webm;codecs=opus"), "webm");
        assert_eq!(audio_extension("application/octet-stream"), "webm");
    }
}
