//! Tool registry and execution (C3).
//!
//! A registry entry bundles a tool's descriptor, its argument/result JSON
//! schemas, and a pair of decode/encode closures alongside the invoke
//! closure itself — the same `Tool { input_schema, executor }` shape the
//! teacher uses, reified rather than discovered via reflection so the
//! registry stays a plain data structure.
//!
//! Basic shape validation (arguments decode to a JSON object) always runs.
//! Full JSON-Schema validation against `arg_schema` is gated behind the
//! `json-validation` cargo feature, exactly as the teacher gates it, so a
//! binary that never needs it doesn't pay for the `jsonschema` dependency.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;

use crate::error::{GraphError, Result};

/// Human- and machine-readable description of a tool, independent of how
/// its arguments/results are encoded.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub arg_schema: Value,
    pub result_schema: Value,
}

/// A request to invoke a tool, as produced by an assistant message.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Distinguishes why a call's `result` is an `Err`, so the executor can
/// route the failure through the right pipeline event
/// (`toolValidationFailed` vs. `toolCallFailed`, `§4.3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFailureKind {
    /// Argument decode/schema validation failed before `invoke` ran.
    Validation,
    /// `invoke` itself returned an error, or the tool name was unknown.
    Failed,
}

/// The outcome of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCallOutcome {
    pub id: String,
    pub name: String,
    pub result: std::result::Result<Value, String>,
    /// `None` on success; otherwise which pipeline event the failure maps to.
    pub failure_kind: Option<ToolFailureKind>,
}

type InvokeFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;
type InvokeFn = Arc<dyn Fn(Value) -> InvokeFuture + Send + Sync>;
type DecodeFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;
type EncodeFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// One registered tool: descriptor plus the closures that decode its
/// arguments, run it, and encode its result.
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    decode: DecodeFn,
    invoke: InvokeFn,
    encode: EncodeFn,
}

impl RegisteredTool {
    /// Build a tool with identity decode/encode (arguments and results pass
    /// through as-is beyond basic shape validation).
    pub fn new<F, Fut>(descriptor: ToolDescriptor, invoke: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        RegisteredTool {
            descriptor,
            decode: Arc::new(|args: &Value| Ok(args.clone())),
            invoke: Arc::new(move |args| Box::pin(invoke(args))),
            encode: Arc::new(|result: &Value| Ok(result.clone())),
        }
    }

    /// Override the decode step, e.g. to coerce or default fields before
    /// invocation.
    pub fn with_decode<D>(mut self, decode: D) -> Self
    where
        D: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.decode = Arc::new(decode);
        self
    }

    /// Override the encode step, e.g. to project the result down to the
    /// declared result schema.
    pub fn with_encode<E>(mut self, encode: E) -> Self
    where
        E: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.encode = Arc::new(encode);
        self
    }

    fn validate_shape(&self, args: &Value) -> std::result::Result<(), String> {
        if !args.is_object() {
            return Err("tool arguments must be a JSON object".to_string());
        }
        Ok(())
    }

    #[cfg(feature = "json-validation")]
    fn validate_schema(&self, args: &Value) -> std::result::Result<(), String> {
        let compiled = jsonschema::JSONSchema::compile(&self.descriptor.arg_schema)
            .map_err(|e| format!("invalid argument schema: {e}"))?;
        match compiled.validate(args) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let messages: Vec<String> = errors
                    .map(|e| format!("{}: {}", e.instance_path, e))
                    .collect();
                Err(messages.join("; "))
            }
        }
    }

    #[cfg(not(feature = "json-validation"))]
    fn validate_schema(&self, _args: &Value) -> std::result::Result<(), String> {
        tracing::debug!(
            tool = %self.descriptor.name,
            "full JSON Schema validation skipped (enable the json-validation feature)"
        );
        Ok(())
    }

    /// Run the full decode/execute/encode contract for one call.
    async fn call(&self, args: Value) -> Result<Value> {
        self.validate_shape(&args)
            .map_err(|reason| GraphError::ToolValidationError {
                tool: self.descriptor.name.clone(),
                reason,
            })?;
        self.validate_schema(&args)
            .map_err(|reason| GraphError::ToolValidationError {
                tool: self.descriptor.name.clone(),
                reason,
            })?;
        let decoded = (self.decode)(&args).map_err(|e| GraphError::ToolValidationError {
            tool: self.descriptor.name.clone(),
            reason: e.to_string(),
        })?;
        let result = (self.invoke)(decoded).await?;
        (self.encode)(&result)
    }
}

/// How a set of tool calls from one LLM response is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Exactly one call; equivalent to sequential with one element.
    #[default]
    Single,
    /// Multiple calls, run one at a time in declaration order.
    SequentialSingleRun,
    /// Multiple calls, run concurrently via `tokio::task::JoinSet`.
    Parallel,
}

/// Maps tool name to its registration.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: RegisteredTool) {
        self.tools.insert(tool.descriptor.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().map(|t| &t.descriptor).collect()
    }

    /// Execute a single call, turning any error into a textual outcome
    /// rather than propagating, since the default recovery policy is to
    /// feed the error back to the model as the tool result.
    async fn execute_one(&self, call: ToolCall) -> ToolCallOutcome {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolCallOutcome {
                id: call.id,
                name: call.name.clone(),
                result: Err(format!("tool '{}' is not registered", call.name)),
                failure_kind: Some(ToolFailureKind::Failed),
            };
        };
        match tool.call(call.arguments).await {
            Ok(value) => ToolCallOutcome {
                id: call.id,
                name: call.name,
                result: Ok(value),
                failure_kind: None,
            },
            Err(GraphError::ToolValidationError { reason, .. }) => ToolCallOutcome {
                id: call.id,
                name: call.name,
                result: Err(reason),
                failure_kind: Some(ToolFailureKind::Validation),
            },
            Err(other) => ToolCallOutcome {
                id: call.id,
                name: call.name,
                result: Err(other.to_string()),
                failure_kind: Some(ToolFailureKind::Failed),
            },
        }
    }

    /// Dispatch a batch of calls per `mode`. Results are returned in input
    /// order regardless of completion order. Partial failures never cancel
    /// siblings — each call's outcome carries its own success/failure.
    pub async fn execute_calls(&self, calls: Vec<ToolCall>, mode: DispatchMode) -> Vec<ToolCallOutcome> {
        match mode {
            DispatchMode::Single | DispatchMode::SequentialSingleRun => {
                let mut outcomes = Vec::with_capacity(calls.len());
                for call in calls {
                    outcomes.push(self.execute_one(call).await);
                }
                outcomes
            }
            DispatchMode::Parallel => self.execute_parallel(calls).await,
        }
    }

    async fn execute_parallel(&self, calls: Vec<ToolCall>) -> Vec<ToolCallOutcome> {
        let mut set: JoinSet<(usize, ToolCallOutcome)> = JoinSet::new();
        for (index, call) in calls.into_iter().enumerate() {
            let registry = self.clone();
            set.spawn(async move {
                let outcome = registry.execute_one(call).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<ToolCallOutcome>> = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if slots.len() <= index {
                        slots.resize_with(index + 1, || None);
                    }
                    slots[index] = Some(outcome);
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "tool execution task panicked");
                }
            }
        }
        slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool(name: &str) -> RegisteredTool {
        RegisteredTool::new(
            ToolDescriptor {
                name: name.to_string(),
                description: "echoes its input".to_string(),
                arg_schema: json!({"type": "object"}),
                result_schema: json!({"type": "object"}),
            },
            |args: Value| async move { Ok(args) },
        )
    }

    #[tokio::test]
    async fn executes_a_single_call() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo"));
        let outcomes = registry
            .execute_calls(
                vec![ToolCall {
                    id: "1".into(),
                    name: "echo".into(),
                    arguments: json!({"x": 1}),
                }],
                DispatchMode::Single,
            )
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].result, Ok(json!({"x": 1})));
    }

    #[tokio::test]
    async fn unregistered_tool_fails_locally_without_aborting() {
        let registry = ToolRegistry::new();
        let outcomes = registry
            .execute_calls(
                vec![ToolCall {
                    id: "1".into(),
                    name: "missing".into(),
                    arguments: json!({}),
                }],
                DispatchMode::Single,
            )
            .await;
        assert!(outcomes[0].result.is_err());
    }

    #[tokio::test]
    async fn non_object_arguments_fail_validation() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo"));
        let outcomes = registry
            .execute_calls(
                vec![ToolCall {
                    id: "1".into(),
                    name: "echo".into(),
                    arguments: json!("not an object"),
                }],
                DispatchMode::Single,
            )
            .await;
        assert!(outcomes[0].result.is_err());
    }

    #[tokio::test]
    async fn parallel_dispatch_preserves_declaration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(RegisteredTool::new(
            ToolDescriptor {
                name: "delay_echo".to_string(),
                description: "sleeps inversely to its index then echoes".to_string(),
                arg_schema: json!({"type": "object"}),
                result_schema: json!({"type": "object"}),
            },
            |args: Value| async move {
                let n = args["n"].as_u64().unwrap_or(0);
                tokio::time::sleep(std::time::Duration::from_millis(5 * (3 - n.min(3)))).await;
                Ok(args)
            },
        ));

        let calls: Vec<ToolCall> = (0..3)
            .map(|i| ToolCall {
                id: i.to_string(),
                name: "delay_echo".into(),
                arguments: json!({"n": i}),
            })
            .collect();

        let outcomes = registry.execute_calls(calls, DispatchMode::Parallel).await;
        let ids: Vec<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn one_failing_call_does_not_cancel_siblings() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo"));
        let calls = vec![
            ToolCall {
                id: "1".into(),
                name: "echo".into(),
                arguments: json!({"ok": true}),
            },
            ToolCall {
                id: "2".into(),
                name: "missing".into(),
                arguments: json!({}),
            },
            ToolCall {
                id: "3".into(),
                name: "echo".into(),
                arguments: json!({"ok": true}),
            },
        ];
        let outcomes = registry.execute_calls(calls, DispatchMode::Parallel).await;
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
    }
}
