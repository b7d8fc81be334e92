use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::VisionBackend;
use crate::error::AnalysisError;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

// OpenRouter attribution headers (bookkeeping on their side, not required
// for the request to succeed)
const APP_REFERER: &str = "https://eaten.app";
const APP_TITLE: &str = "Eaten - Food Nutrition Analyzer";

const MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: String,
}

/// OpenRouter chat-completions transport for image analysis requests.
pub struct OpenRouterClient {
    api_key: String,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VisionBackend for OpenRouterClient {
    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        image_data_url: &str,
    ) -> Result<String, AnalysisError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        content_type: "text".to_string(),
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        content_type: "image_url".to_string(),
                        image_url: ImageData {
                            url: image_data_url.to_string(),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
        };

        log::info!("🤖 Sending request to OpenRouter with model: {}", model);

        let response = self
            .client
            .post(OPENROUTER_URL)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::BackendRequest {
                model: model.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        log::debug!("📥 OpenRouter response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ OpenRouter API error ({}): {}", status, error_text);
            return Err(classify_api_error(model, status, &error_text));
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| AnalysisError::BackendRequest {
                model: model.to_string(),
                message: format!("invalid completion envelope: {}", e),
            })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AnalysisError::BackendRequest {
                model: model.to_string(),
                message: "completion response had no choices".to_string(),
            })?;

        log::debug!("💬 {} replied with {} chars", model, content.len());

        Ok(content)
    }
}

/// Map an HTTP failure to the most specific error category, by status code
/// first and body text markers second.
fn classify_api_error(model: &str, status: StatusCode, body: &str) -> AnalysisError {
    let marker = body.to_lowercase();

    if status == StatusCode::TOO_MANY_REQUESTS || marker.contains("quota") {
        AnalysisError::RateLimited(format!("{}: {}", model, status))
    } else if status == StatusCode::SERVICE_UNAVAILABLE || marker.contains("overloaded") {
        AnalysisError::Overloaded(format!("{}: {}", model, status))
    } else {
        AnalysisError::BackendRequest {
            model: model.to_string(),
            message: format!("{}: {}", status, body),
        }
    }
}
