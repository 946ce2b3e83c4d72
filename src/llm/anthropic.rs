//! Anthropic Claude provider implementation

use super::types::{
    ContentBlock, LlmMessage, LlmRequest, LlmResponse, StructuredOutput, SystemContent, Usage,
};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Anthropic model variants
#[derive(Debug, Clone, Copy)]
pub enum AnthropicModel {
    Claude45Opus,
    Claude45Sonnet,
    Claude45Haiku,
}

impl AnthropicModel {
    pub fn api_name(self) -> &'static str {
        match self {
            AnthropicModel::Claude45Opus => "claude-opus-4-5-20251101",
            AnthropicModel::Claude45Sonnet => "claude-sonnet-4-5-20250929",
            AnthropicModel::Claude45Haiku => "claude-haiku-4-5-20251001",
        }
    }

    pub fn model_id(self) -> &'static str {
        match self {
            AnthropicModel::Claude45Opus => "claude-4.5-opus",
            AnthropicModel::Claude45Sonnet => "claude-4.5-sonnet",
            AnthropicModel::Claude45Haiku => "claude-4.5-haiku",
        }
    }
}

/// Anthropic service implementation
pub struct AnthropicService {
    client: Client,
    api_key: String,
    model: AnthropicModel,
    base_url: String,
    model_id: String,
}

impl AnthropicService {
    pub fn new(api_key: String, model: AnthropicModel, gateway: Option<&str>) -> Self {
        let base_url = match gateway {
            Some(gw) => format!("{}/anthropic/v1/messages", gw.trim_end_matches('/')),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url,
            model_id: model.model_id().to_string(),
        }
    }

    fn translate_request(&self, request: &LlmRequest) -> AnthropicRequest {
        let system = request.system.iter().map(translate_system).collect();

        let messages = request.messages.iter().map(translate_message).collect();

        // Structured output is a single tool the model is forced to call
        let (tools, tool_choice) = match &request.output {
            Some(output) => (
                Some(vec![translate_output_tool(output)]),
                Some(ToolChoice {
                    r#type: "tool".to_string(),
                    name: output.name.clone(),
                }),
            ),
            None => (None, None),
        };

        AnthropicRequest {
            model: self.model.api_name().to_string(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: request.temperature,
            tools,
            tool_choice,
        }
    }
}

fn translate_system(s: &SystemContent) -> AnthropicSystemBlock {
    AnthropicSystemBlock {
        r#type: "text".to_string(),
        text: s.text.clone(),
        cache_control: if s.cache {
            Some(CacheControl {
                r#type: "ephemeral".to_string(),
            })
        } else {
            None
        },
    }
}

fn translate_output_tool(output: &StructuredOutput) -> AnthropicTool {
    AnthropicTool {
        name: output.name.clone(),
        description: output.description.clone(),
        input_schema: output.schema.clone(),
    }
}

fn translate_message(msg: &LlmMessage) -> AnthropicMessage {
    let content = msg
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
            ContentBlock::ToolUse { id, name, input } => AnthropicContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
        })
        .collect();

    AnthropicMessage {
        role: msg.role.as_str().to_string(),
        content,
    }
}

fn normalize_response(resp: AnthropicResponse) -> LlmResponse {
    let content = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(ContentBlock::Text { text }),
            AnthropicContentBlock::ToolUse { id, name, input } => {
                Some(ContentBlock::ToolUse { id, name, input })
            }
            AnthropicContentBlock::Other => None,
        })
        .collect();

    let end_turn = matches!(resp.stop_reason.as_deref(), Some("end_turn" | "tool_use"));

    LlmResponse {
        content,
        end_turn,
        usage: Usage {
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
            cache_creation_tokens: resp.usage.cache_creation_input_tokens.unwrap_or(0),
            cache_read_tokens: resp.usage.cache_read_input_tokens.unwrap_or(0),
        },
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| LlmError::from_send(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(LlmError::from_status(status, &body));
        }

        let anthropic_response: AnthropicResponse =
            serde_json::from_str(&body).map_err(|e| {
                LlmError::malformed_response(format!(
                    "Failed to parse response: {e} - body: {body}"
                ))
            })?;

        Ok(normalize_response(anthropic_response))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: Vec<AnthropicSystemBlock>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
struct AnthropicSystemBlock {
    r#type: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct CacheControl {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    r#type: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Thinking and other block types we never send and ignore on receipt
    #[serde(other, skip_serializing)]
    Other,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_with_output() -> LlmRequest {
        LlmRequest {
            system: vec![SystemContent::cached("protocol")],
            messages: vec![
                LlmMessage::user("I have a headache"),
                LlmMessage::assistant("How long?"),
            ],
            max_tokens: None,
            temperature: Some(0.1),
            output: Some(StructuredOutput {
                name: "record_turn".to_string(),
                description: "Record the turn".to_string(),
                schema: json!({"type": "object"}),
            }),
        }
    }

    #[test]
    fn test_translate_forces_output_tool() {
        let service = AnthropicService::new("key".to_string(), AnthropicModel::Claude45Haiku, None);
        let wire = serde_json::to_value(service.translate_request(&request_with_output())).unwrap();

        assert_eq!(wire["model"], "claude-haiku-4-5-20251001");
        assert_eq!(wire["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(wire["tools"][0]["name"], "record_turn");
        assert_eq!(wire["tools"][0]["input_schema"], json!({"type": "object"}));
        assert_eq!(wire["tool_choice"], json!({"type": "tool", "name": "record_turn"}));
        assert_eq!(wire["system"][0]["cache_control"]["type"], "ephemeral");
        assert_eq!(wire["messages"][1]["role"], "assistant");
        assert_eq!(wire["messages"][1]["content"][0], json!({"type": "text", "text": "How long?"}));
        assert!((wire["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_translate_without_output_omits_tools() {
        let service = AnthropicService::new("key".to_string(), AnthropicModel::Claude45Sonnet, None);
        let mut request = request_with_output();
        request.output = None;
        request.temperature = None;

        let wire = serde_json::to_value(service.translate_request(&request)).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("tool_choice").is_none());
        assert!(wire.get("temperature").is_none());
    }

    #[test]
    fn test_gateway_url() {
        let service = AnthropicService::new(
            "implicit".to_string(),
            AnthropicModel::Claude45Sonnet,
            Some("https://gw.example.com/"),
        );
        assert_eq!(service.base_url, "https://gw.example.com/anthropic/v1/messages");
    }

    #[test]
    fn test_normalize_tool_use_response() {
        let body = json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "tool_use", "id": "toolu_1", "name": "record_turn",
                 "input": {"status": "CONTINUING"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let resp: AnthropicResponse = serde_json::from_value(body).unwrap();
        let normalized = normalize_response(resp);

        assert!(normalized.end_turn);
        assert_eq!(normalized.content.len(), 1);
        assert_eq!(normalized.structured_payload(), r#"{"status":"CONTINUING"}"#);
        assert_eq!(normalized.usage.input_tokens, 10);
    }
}
