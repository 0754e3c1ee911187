use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

static POOLED_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("errand/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create pooled reqwest client")
});

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
    Function,
}

/// One conversation turn in Gemini wire shape.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    #[serde(rename = "functionResponse", skip_serializing_if = "Option::is_none")]
    pub function_response: Option<Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
            function_response: None,
        }
    }

    pub fn function_response(name: &str, response: Value) -> Self {
        Self {
            text: None,
            function_call: None,
            function_response: Some(json!({ "name": name, "response": response })),
        }
    }
}

/// A local function the model asked us to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

/// What one generateContent round trip produced.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

/// Call the Gemini API once with the given turns, system instruction,
/// and optional tool declarations.
pub async fn generate_content(
    api_key: &str,
    model: &str,
    system_prompt: &str,
    messages: &[Message],
    tools: Option<Value>,
) -> anyhow::Result<ModelReply> {
    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
        model, api_key
    );

    let mut payload = json!({
        "systemInstruction": {
            "parts": [{ "text": system_prompt }]
        },
        "contents": messages,
    });
    if let Some(t) = tools {
        payload["tools"] = t;
    }

    let response = POOLED_CLIENT.post(url).json(&payload).send().await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(anyhow::anyhow!(
            "Gemini API Error (Model: {}): {}",
            model,
            error_text
        ));
    }

    let res_json: Value = response.json().await?;
    Ok(parse_reply(&res_json))
}

/// Pull text, tool calls, token counts, and the finish reason out of a
/// raw generateContent response. Pure so tests can feed canned JSON.
pub fn parse_reply(res_json: &Value) -> ModelReply {
    let mut reply = ModelReply::default();

    let candidate = &res_json["candidates"][0];
    if let Some(parts) = candidate["content"]["parts"].as_array() {
        let mut text_acc = String::new();
        for part in parts {
            if let Some(text) = part["text"].as_str() {
                text_acc.push_str(text);
            }
            if let Some(call) = part.get("functionCall") {
                reply.tool_calls.push(ToolCallRequest {
                    name: call["name"].as_str().unwrap_or("unknown").to_string(),
                    args: call.get("args").cloned().unwrap_or_else(|| json!({})),
                });
            }
        }
        if !text_acc.is_empty() {
            reply.text = Some(text_acc);
        }
    }

    reply.finish_reason = candidate["finishReason"].as_str().map(str::to_string);

    // The whole usageMetadata object being present is what matters; the
    // individual counts are read leniently.
    if res_json["usageMetadata"].is_object() {
        let usage = &res_json["usageMetadata"];
        reply.usage = Some(TokenUsage {
            prompt_tokens: usage["promptTokenCount"].as_u64().unwrap_or(0),
            response_tokens: usage["candidatesTokenCount"].as_u64().unwrap_or(0),
        });
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_text_serializes_to_gemini_wire_shape() {
        let message = Message::user_text("hi there");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({ "role": "user", "parts": [{ "text": "hi there" }] }));
    }

    #[test]
    fn test_function_response_part_skips_absent_fields() {
        let part = Part::function_response("get_file_content", json!({ "result": "ok" }));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(
            value,
            json!({
                "functionResponse": {
                    "name": "get_file_content",
                    "response": { "result": "ok" }
                }
            })
        );
    }

    #[test]
    fn test_parse_reply_extracts_text_and_usage() {
        let canned = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }], "role": "model" },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 7 }
        });

        let reply = parse_reply(&canned);
        assert_eq!(reply.text.as_deref(), Some("Hello world"));
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.finish_reason.as_deref(), Some("STOP"));
        let usage = reply.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.response_tokens, 7);
    }

    #[test]
    fn test_parse_reply_collects_every_function_call() {
        let canned = json!({
            "candidates": [{
                "content": { "parts": [
                    { "functionCall": { "name": "get_file_content", "args": { "file_path": "main.py" } } },
                    { "functionCall": { "name": "run_python_file" } }
                ], "role": "model" }
            }],
            "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 4 }
        });

        let reply = parse_reply(&canned);
        assert!(reply.text.is_none());
        assert_eq!(reply.tool_calls.len(), 2);
        assert_eq!(reply.tool_calls[0].name, "get_file_content");
        assert_eq!(reply.tool_calls[0].args, json!({ "file_path": "main.py" }));
        assert_eq!(reply.tool_calls[1].name, "run_python_file");
        assert_eq!(reply.tool_calls[1].args, json!({}));
    }

    #[test]
    fn test_parse_reply_tolerates_missing_usage_metadata() {
        let canned = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "hi" }], "role": "model" }
            }]
        });

        let reply = parse_reply(&canned);
        assert_eq!(reply.text.as_deref(), Some("hi"));
        assert!(reply.usage.is_none());
    }

    #[test]
    fn test_parse_reply_surfaces_finish_reason_when_empty() {
        let canned = json!({
            "candidates": [{ "finishReason": "SAFETY" }],
            "usageMetadata": { "promptTokenCount": 1, "candidatesTokenCount": 0 }
        });

        let reply = parse_reply(&canned);
        assert!(reply.text.is_none());
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.finish_reason.as_deref(), Some("SAFETY"));
    }
}
