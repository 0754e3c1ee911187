/*
 * Errand - Sandboxed Single-Shot Gemini Agent
 * File Path: src/tools.rs
 * Responsibility: Self-describing tool definitions, dispatch, and result shaping
 */

use crate::llm::{Message, MessageRole, Part, ToolCallRequest};
use crate::sandbox::{Access, Sandbox};
use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use std::fs;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    OutsideRoot,
    NotFound,
    NotPython,
    BadArgs,
    Io,
    Launch,
    Timeout,
    UnknownTool,
}

/// Every tool run produces exactly one of these. Errors are data handed
/// back to the model, never faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Error(ToolErrorKind, String),
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        ToolOutcome::Success(output.into())
    }

    pub fn error(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        ToolOutcome::Error(kind, message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error(..))
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success(output) => output,
            ToolOutcome::Error(_, message) => message,
        }
    }
}

/// A callable the model may request. Each tool carries its own schema so
/// the declaration advertised to the API cannot drift from the code that
/// executes it.
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> Value;
    fn run<'a>(&'a self, sandbox: &'a Sandbox, args: &'a Value) -> BoxFuture<'a, ToolOutcome>;
}

static TOOLS: &[&dyn Tool] = &[&ReadFileTool, &RunPythonFileTool];

fn find_tool(name: &str) -> Option<&'static dyn Tool> {
    TOOLS.iter().copied().find(|tool| tool.name() == name)
}

/// The `tools` payload advertised to the model.
pub fn declarations() -> Value {
    let declarations: Vec<Value> = TOOLS
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "parameters": tool.parameters(),
            })
        })
        .collect();
    json!([{ "functionDeclarations": declarations }])
}

/// Run one model-requested call and wrap whatever happened into the
/// structured function-role message the agent validates and prints.
/// The sandbox is injected here; the model never supplies the root.
pub async fn dispatch(sandbox: &Sandbox, call: &ToolCallRequest, verbose: bool) -> Message {
    if verbose {
        println!("Calling function: {}({})", call.name, call.args);
    } else {
        println!(" - Calling function: {}", call.name);
    }

    let outcome = match find_tool(&call.name) {
        Some(tool) => tool.run(sandbox, &call.args).await,
        None => ToolOutcome::error(
            ToolErrorKind::UnknownTool,
            format!("Unknown function: {}", call.name),
        ),
    };

    let payload = match &outcome {
        ToolOutcome::Success(output) => json!({ "result": output }),
        ToolOutcome::Error(_, message) => json!({ "error": message }),
    };

    Message {
        role: MessageRole::Function,
        parts: vec![Part::function_response(&call.name, payload)],
    }
}

fn require_str_arg<'a>(args: &'a Value, field: &str) -> Result<&'a str, ToolOutcome> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ToolOutcome::error(
                ToolErrorKind::BadArgs,
                format!("Missing required argument `{}`", field),
            )
        })
}

pub struct ReadFileTool;

impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "get_file_content"
    }

    fn description(&self) -> &'static str {
        "Reads and returns the contents of a file relative to the working directory, up to a maximum character limit"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to read, relative to the working directory"
                }
            },
            "required": ["file_path"]
        })
    }

    fn run<'a>(&'a self, sandbox: &'a Sandbox, args: &'a Value) -> BoxFuture<'a, ToolOutcome> {
        Box::pin(async move { read_file_content(sandbox, args) })
    }
}

fn read_file_content(sandbox: &Sandbox, args: &Value) -> ToolOutcome {
    let file_path = match require_str_arg(args, "file_path") {
        Ok(path) => path,
        Err(err) => return err,
    };

    let target = match sandbox.resolve(file_path, Access::Read) {
        Ok(path) => path,
        Err(escape) => return ToolOutcome::error(ToolErrorKind::OutsideRoot, escape.to_string()),
    };

    if !target.is_file() {
        return ToolOutcome::error(
            ToolErrorKind::NotFound,
            format!("File not found or is not a regular file: \"{}\"", file_path),
        );
    }

    match fs::read_to_string(&target) {
        Ok(content) => {
            let limit = sandbox.max_file_chars;
            let mut chars = content.chars();
            let mut kept: String = chars.by_ref().take(limit).collect();
            // Probe one character past the limit to decide on the marker.
            if chars.next().is_some() {
                kept.push_str(&format!(
                    "[...File \"{}\" truncated at {} characters]",
                    file_path, limit
                ));
            }
            ToolOutcome::success(kept)
        }
        Err(err) => ToolOutcome::error(
            ToolErrorKind::Io,
            format!(
                "{}. There is an error while opening the file. Check the file path: {}",
                err, file_path
            ),
        ),
    }
}

pub struct RunPythonFileTool;

impl Tool for RunPythonFileTool {
    fn name(&self) -> &'static str {
        "run_python_file"
    }

    fn description(&self) -> &'static str {
        "Executes a Python file located in the working directory and returns its output"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the Python file to execute, relative to the working directory"
                },
                "args": {
                    "type": "array",
                    "description": "Optional list of command-line arguments to pass to the Python file",
                    "items": { "type": "string" }
                }
            },
            "required": ["file_path"]
        })
    }

    fn run<'a>(&'a self, sandbox: &'a Sandbox, args: &'a Value) -> BoxFuture<'a, ToolOutcome> {
        Box::pin(run_python_file(sandbox, args))
    }
}

async fn run_python_file(sandbox: &Sandbox, args: &Value) -> ToolOutcome {
    let file_path = match require_str_arg(args, "file_path") {
        Ok(path) => path,
        Err(err) => return err,
    };

    let target = match sandbox.resolve(file_path, Access::Execute) {
        Ok(path) => path,
        Err(escape) => return ToolOutcome::error(ToolErrorKind::OutsideRoot, escape.to_string()),
    };

    if !target.is_file() {
        return ToolOutcome::error(
            ToolErrorKind::NotFound,
            format!("\"{}\" does not exist or is not a regular file", file_path),
        );
    }

    if target.extension().and_then(|ext| ext.to_str()) != Some("py") {
        return ToolOutcome::error(
            ToolErrorKind::NotPython,
            format!("\"{}\" is not a Python file", file_path),
        );
    }

    let script_args: Vec<String> = args["args"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut cmd = Command::new(&sandbox.python_bin);
    cmd.arg(&target)
        .args(&script_args)
        .current_dir(sandbox.root())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(sandbox.script_timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            return ToolOutcome::error(
                ToolErrorKind::Launch,
                format!("executing Python file: {}", err),
            );
        }
        Err(_) => {
            return ToolOutcome::error(
                ToolErrorKind::Timeout,
                format!(
                    "executing \"{}\" timed out after {}s",
                    file_path,
                    sandbox.script_timeout.as_secs()
                ),
            );
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let mut lines = Vec::new();
    if !output.status.success() {
        lines.push(format!(
            "Process exited with code {}",
            output.status.code().unwrap_or(-1)
        ));
    }
    if stdout.is_empty() && stderr.is_empty() {
        lines.push("No output produced".to_string());
    }
    if !stdout.is_empty() {
        lines.push(format!("STDOUT: {}", stdout));
    }
    if !stderr.is_empty() {
        lines.push(format!("STDERR: {}", stderr));
    }

    ToolOutcome::success(lines.join("\n"))
}
