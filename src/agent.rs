/*
 * Errand - Sandboxed Single-Shot Gemini Agent
 * File Path: src/agent.rs
 * Responsibility: Single-shot prompt handling: one model call, at most one round of tool calls
 */
use crate::config::Config;
use crate::llm::{self, Message};
use crate::sandbox::Sandbox;
use crate::tools;
use anyhow::{Context, Result, bail};
use serde_json::Value;

const SYSTEM_PROMPT: &str = "\
You are a helpful AI coding agent.

When a user asks a question or makes a request, make a function call plan. You can perform the following operations:

- Read file contents
- Execute Python files with optional arguments

All paths you provide should be relative to the working directory. You do not need to specify the working directory in your function calls as it is automatically injected for security reasons.";

/// One full invocation: prompt in, model call, optional tool round,
/// printed output. Tool results are not fed back into a second call.
pub async fn run_once(config: &Config, prompt: &str, verbose: bool) -> Result<()> {
    let api_key = config.resolve_api_key()?;
    let sandbox = Sandbox::new(&config.sandbox)?;

    let messages = vec![Message::user_text(prompt)];

    let reply = llm::generate_content(
        &api_key,
        &config.gemini.model,
        SYSTEM_PROMPT,
        &messages,
        Some(tools::declarations()),
    )
    .await?;

    let Some(usage) = reply.usage else {
        bail!("Usage Metadata not available");
    };

    if verbose {
        println!("User prompt: {}", prompt);
        println!("Prompt tokens: {}", usage.prompt_tokens);
        println!("Response tokens: {}", usage.response_tokens);
    }

    if !reply.tool_calls.is_empty() {
        for call in &reply.tool_calls {
            let result = tools::dispatch(&sandbox, call, verbose).await;
            let payload = validate_tool_message(&result)?;
            if verbose {
                println!("-> {}", payload);
            }
        }
    } else if let Some(text) = reply.text {
        println!("{}", text);
    } else {
        let reason = reply.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        let msg = format!("Gemini returned no content. Finish Reason: {}", reason);
        eprintln!("🔴 [LLM ERROR] {}", msg);
        bail!(msg);
    }

    Ok(())
}

/// The dispatcher promises one function-role message with one populated
/// functionResponse. A violation here is our bug, not the model's.
fn validate_tool_message(message: &Message) -> Result<&Value> {
    let part = message
        .parts
        .first()
        .context("Function call result has no parts")?;
    let function_response = part
        .function_response
        .as_ref()
        .context("Function call part has no function_response")?;
    function_response
        .get("response")
        .context("FunctionResponse has no response payload")
}
