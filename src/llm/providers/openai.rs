use crate::config::LlmConfig;
use crate::llm::providers::parse_json_reply;
use crate::llm::{GenerationRequest, LlmError, StructuredGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::ConfigError("API key is required for the openai backend".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    fn build_request<'a>(request: &'a GenerationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &request.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: 0.1,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &request.schema_name,
                    schema: &request.schema,
                    strict: false,
                },
            },
        }
    }
}

#[async_trait]
impl StructuredGenerator for OpenAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value, LlmError> {
        debug!("Sending '{}' request to {}", request.schema_name, self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("OpenAI API responded with status code: {} - {}", status, body);
            return Err(LlmError::ResponseError(format!(
                "API responded with status code: {}",
                status
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| LlmError::ResponseError("No choices in response".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(LlmError::ResponseError(format!("Model refused: {}", refusal)));
        }

        let content = message
            .content
            .ok_or_else(|| LlmError::ResponseError("Empty message content".to_string()))?;

        parse_json_reply(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::GeneratedQuery;

    #[test]
    fn request_carries_schema_and_both_messages() {
        let request = GenerationRequest::for_type::<GeneratedQuery>(
            "gpt-4o",
            "system text".into(),
            "user text".into(),
        );
        let body = serde_json::to_value(OpenAiProvider::build_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user text");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "GeneratedQuery");
        let schema = &body["response_format"]["json_schema"]["schema"];
        assert!(schema["properties"]["query"].is_object());
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let mut config = crate::llm::testing::config();
        config.api_key = None;
        assert!(matches!(OpenAiProvider::new(&config), Err(LlmError::ConfigError(_))));
    }
}
