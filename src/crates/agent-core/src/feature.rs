//! Feature Pipeline (C7) — the engine's event bus.
//!
//! A [`Feature`] is `(storageKey, defaultConfig, install(pipeline, config))`
//! per `§3 DATA MODEL: Feature registration`. Every lifecycle event in
//! `§4.7`'s catalogue is dispatched as an [`Event`] variant rather than
//! modeled through a deep handler-interface hierarchy — the tagged-variant
//! shape `§9 DESIGN NOTES: Deep inheritance` calls for. Handlers for one
//! event fire sequentially in registration order (`§4.7 Dispatch contract`,
//! `§8 TESTABLE PROPERTIES`); a handler's error is isolated, logged, and
//! reported through the run's [`crate::environment::Environment`], but never
//! aborts dispatch to the remaining handlers for that event.
//!
//! `environmentTransforming` is the one fold in the catalogue — each
//! handler receives the prior environment and returns a (possibly new) one,
//! in registration order, with the last transform winning on conflicts. It
//! is kept on a separate code path from the 16 fire-and-forget notification
//! events rather than forced into the same shape.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::environment::Environment;
use crate::error::GraphError;

/// Discriminant for the 16 notification events in the catalogue.
/// `environmentTransforming` is not included — it is dispatched through
/// [`FeaturePipeline::transform_environment`], not [`FeaturePipeline::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AgentStarting,
    AgentCompleted,
    AgentExecutionFailed,
    AgentClosing,
    StrategyStarting,
    StrategyCompleted,
    LlmCallStarting,
    LlmCallCompleted,
    ToolCallStarting,
    ToolValidationFailed,
    ToolCallFailed,
    ToolCallCompleted,
    StreamingStarting,
    StreamingFrameReceived,
    StreamingFailed,
    StreamingCompleted,
    /// Used only to probe a feature's `eventFilter` for the
    /// `environmentTransforming` fold — no [`Event`] variant carries it.
    EnvironmentTransforming,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AgentStarting => "agentStarting",
            EventKind::AgentCompleted => "agentCompleted",
            EventKind::AgentExecutionFailed => "agentExecutionFailed",
            EventKind::AgentClosing => "agentClosing",
            EventKind::StrategyStarting => "strategyStarting",
            EventKind::StrategyCompleted => "strategyCompleted",
            EventKind::LlmCallStarting => "llmCallStarting",
            EventKind::LlmCallCompleted => "llmCallCompleted",
            EventKind::ToolCallStarting => "toolCallStarting",
            EventKind::ToolValidationFailed => "toolValidationFailed",
            EventKind::ToolCallFailed => "toolCallFailed",
            EventKind::ToolCallCompleted => "toolCallCompleted",
            EventKind::StreamingStarting => "streamingStarting",
            EventKind::StreamingFrameReceived => "streamingFrameReceived",
            EventKind::StreamingFailed => "streamingFailed",
            EventKind::StreamingCompleted => "streamingCompleted",
            EventKind::EnvironmentTransforming => "environmentTransforming",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentStartingContext {
    pub run_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone)]
pub struct AgentCompletedContext {
    pub run_id: String,
    pub agent_id: String,
    pub result: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct AgentExecutionFailedContext {
    pub run_id: String,
    pub agent_id: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct AgentClosingContext {
    pub run_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone)]
pub struct StrategyStartingContext {
    pub run_id: String,
    pub strategy_name: String,
    pub input: Value,
}

#[derive(Debug, Clone)]
pub struct StrategyCompletedContext {
    pub run_id: String,
    pub strategy_name: String,
    pub output: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct LlmCallStartingContext {
    pub run_id: String,
    pub node_id: String,
    pub prompt_messages: usize,
}

#[derive(Debug, Clone)]
pub struct LlmCallCompletedContext {
    pub run_id: String,
    pub node_id: String,
    pub messages: Vec<llm::Message>,
}

#[derive(Debug, Clone)]
pub struct ToolCallStartingContext {
    pub run_id: String,
    pub tool: String,
    pub call_id: String,
    pub arguments: Value,
}

#[derive(Debug, Clone)]
pub struct ToolValidationFailedContext {
    pub run_id: String,
    pub tool: String,
    pub call_id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ToolCallFailedContext {
    pub run_id: String,
    pub tool: String,
    pub call_id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ToolCallCompletedContext {
    pub run_id: String,
    pub tool: String,
    pub call_id: String,
    pub result: Value,
}

#[derive(Debug, Clone)]
pub struct StreamingStartingContext {
    pub run_id: String,
    pub node_id: String,
}

#[derive(Debug, Clone)]
pub struct StreamingFrameReceivedContext {
    pub run_id: String,
    pub node_id: String,
    pub frame_index: usize,
}

#[derive(Debug, Clone)]
pub struct StreamingFailedContext {
    pub run_id: String,
    pub node_id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct StreamingCompletedContext {
    pub run_id: String,
    pub node_id: String,
}

/// One lifecycle notification, tagged by the data it carries rather than
/// dispatched through a handler-interface hierarchy.
#[derive(Debug, Clone)]
pub enum Event {
    AgentStarting(AgentStartingContext),
    AgentCompleted(AgentCompletedContext),
    AgentExecutionFailed(AgentExecutionFailedContext),
    AgentClosing(AgentClosingContext),
    StrategyStarting(StrategyStartingContext),
    StrategyCompleted(StrategyCompletedContext),
    LlmCallStarting(LlmCallStartingContext),
    LlmCallCompleted(LlmCallCompletedContext),
    ToolCallStarting(ToolCallStartingContext),
    ToolValidationFailed(ToolValidationFailedContext),
    ToolCallFailed(ToolCallFailedContext),
    ToolCallCompleted(ToolCallCompletedContext),
    StreamingStarting(StreamingStartingContext),
    StreamingFrameReceived(StreamingFrameReceivedContext),
    StreamingFailed(StreamingFailedContext),
    StreamingCompleted(StreamingCompletedContext),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AgentStarting(_) => EventKind::AgentStarting,
            Event::AgentCompleted(_) => EventKind::AgentCompleted,
            Event::AgentExecutionFailed(_) => EventKind::AgentExecutionFailed,
            Event::AgentClosing(_) => EventKind::AgentClosing,
            Event::StrategyStarting(_) => EventKind::StrategyStarting,
            Event::StrategyCompleted(_) => EventKind::StrategyCompleted,
            Event::LlmCallStarting(_) => EventKind::LlmCallStarting,
            Event::LlmCallCompleted(_) => EventKind::LlmCallCompleted,
            Event::ToolCallStarting(_) => EventKind::ToolCallStarting,
            Event::ToolValidationFailed(_) => EventKind::ToolValidationFailed,
            Event::ToolCallFailed(_) => EventKind::ToolCallFailed,
            Event::ToolCallCompleted(_) => EventKind::ToolCallCompleted,
            Event::StreamingStarting(_) => EventKind::StreamingStarting,
            Event::StreamingFrameReceived(_) => EventKind::StreamingFrameReceived,
            Event::StreamingFailed(_) => EventKind::StreamingFailed,
            Event::StreamingCompleted(_) => EventKind::StreamingCompleted,
        }
    }
}

/// Unique key a feature is installed/uninstalled under
/// (`§3 DATA MODEL: Feature registration`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureKey(pub String);

impl FeatureKey {
    pub fn new(name: impl Into<String>) -> Self {
        FeatureKey(name.into())
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A feature's init/close lifecycle, e.g. opening a file or network
/// exporter on install and flushing/closing it on uninstall.
#[async_trait::async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn init(&self) -> crate::error::Result<()> {
        Ok(())
    }

    async fn close(&self) -> crate::error::Result<()> {
        Ok(())
    }
}

type FilterFn = Arc<dyn Fn(EventKind) -> bool + Send + Sync>;

/// Per-feature configuration: message processors plus the event filter
/// predicate gating every handler and transform this feature installs.
#[derive(Clone)]
pub struct FeatureConfig {
    pub event_filter: FilterFn,
    pub processors: Vec<Arc<dyn MessageProcessor>>,
    /// Debugger forbids filtering (`§4.7 Dispatch contract`): every handler
    /// it installs always fires regardless of the filter passed in.
    pub forbid_filtering: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            event_filter: Arc::new(|_| true),
            processors: Vec::new(),
            forbid_filtering: false,
        }
    }
}

impl FeatureConfig {
    pub fn with_event_filter(mut self, filter: impl Fn(EventKind) -> bool + Send + Sync + 'static) -> Self {
        self.event_filter = Arc::new(filter);
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn MessageProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn forbidding_filtering(mut self) -> Self {
        self.forbid_filtering = true;
        self
    }
}

/// `(storageKey, defaultConfig, install(pipeline, config))` (`§4.7`).
pub trait Feature: Send + Sync {
    fn key(&self) -> FeatureKey;
    fn default_config(&self) -> FeatureConfig {
        FeatureConfig::default()
    }
    fn install(&self, pipeline: &mut FeaturePipeline, config: &FeatureConfig);
}

type HandlerFn = Arc<dyn Fn(Event) -> BoxFuture<'static, crate::error::Result<()>> + Send + Sync>;
type TransformFn =
    Arc<dyn Fn(Arc<dyn Environment>) -> BoxFuture<'static, Arc<dyn Environment>> + Send + Sync>;

struct RegisteredHandler {
    feature: FeatureKey,
    filter: FilterFn,
    forbid_filtering: bool,
    handler: HandlerFn,
}

struct RegisteredTransform {
    feature: FeatureKey,
    filter: FilterFn,
    forbid_filtering: bool,
    transform: TransformFn,
}

/// The central event bus: installed features register handlers here;
/// `dispatch` and `transform_environment` are the engine's two entry points
/// into it (`§4.7`, `§5 CONCURRENCY & RESOURCE MODEL`: handler registry
/// mutated only during install/uninstall, read-only during dispatch).
#[derive(Default)]
pub struct FeaturePipeline {
    handlers: HashMap<EventKind, Vec<RegisteredHandler>>,
    transforms: Vec<RegisteredTransform>,
    processors: HashMap<FeatureKey, Vec<Arc<dyn MessageProcessor>>>,
    prepared: bool,
    system_features_installed: bool,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `kind`. Intended to be called from inside a
    /// [`Feature::install`] implementation, once per event it cares about.
    pub fn on<F>(&mut self, feature: FeatureKey, kind: EventKind, config: &FeatureConfig, handler: F)
    where
        F: Fn(Event) -> BoxFuture<'static, crate::error::Result<()>> + Send + Sync + 'static,
    {
        self.handlers.entry(kind).or_default().push(RegisteredHandler {
            feature,
            filter: config.event_filter.clone(),
            forbid_filtering: config.forbid_filtering,
            handler: Arc::new(handler),
        });
    }

    /// Register an `environmentTransforming` fold step.
    pub fn on_environment_transforming<F>(&mut self, feature: FeatureKey, config: &FeatureConfig, transform: F)
    where
        F: Fn(Arc<dyn Environment>) -> BoxFuture<'static, Arc<dyn Environment>> + Send + Sync + 'static,
    {
        self.transforms.push(RegisteredTransform {
            feature,
            filter: config.event_filter.clone(),
            forbid_filtering: config.forbid_filtering,
            transform: Arc::new(transform),
        });
    }

    /// Install a feature: runs its `install` hook (which registers handlers
    /// through `on`/`on_environment_transforming`) and remembers its message
    /// processors for `prepare_all_features`/`close_all_features_message_processors`.
    pub fn install(&mut self, feature: &dyn Feature, config: FeatureConfig) {
        let key = feature.key();
        self.processors.insert(key.clone(), config.processors.clone());
        feature.install(self, &config);
    }

    /// Install a feature using its own `default_config`.
    pub fn install_default(&mut self, feature: &dyn Feature) {
        let config = feature.default_config();
        self.install(feature, config);
    }

    pub fn is_installed(&self, key: &FeatureKey) -> bool {
        self.processors.contains_key(key)
    }

    /// Unregisters every handler/transform/processor belonging to `key`.
    /// Message processors are not closed here — call
    /// `close_all_features_message_processors` (or close them directly)
    /// before uninstalling if that matters to the caller.
    pub fn uninstall(&mut self, key: &FeatureKey) {
        for handlers in self.handlers.values_mut() {
            handlers.retain(|h| &h.feature != key);
        }
        self.transforms.retain(|t| &t.feature != key);
        self.processors.remove(key);
    }

    /// Dispatch a notification event to every handler registered for its
    /// kind, sequentially in registration order. A handler's error is
    /// logged, reported through `environment`, and does not stop dispatch
    /// to the remaining handlers.
    pub async fn dispatch(&self, event: Event, environment: &dyn Environment) {
        let kind = event.kind();
        let Some(handlers) = self.handlers.get(&kind) else {
            return;
        };
        for registered in handlers {
            if !registered.forbid_filtering && !(registered.filter)(kind) {
                continue;
            }
            let outcome = (registered.handler)(event.clone()).await;
            if let Err(err) = outcome {
                let message = format!(
                    "feature '{}' failed handling '{}': {}",
                    registered.feature, kind.name(), err
                );
                tracing::error!(feature = %registered.feature, event = kind.name(), error = %err, "feature handler failed");
                environment.report_problem(&message).await;
            }
        }
    }

    /// Fold `environmentTransforming` over every registered transform in
    /// registration order; the last transform applied wins on conflicts.
    pub async fn transform_environment(&self, environment: Arc<dyn Environment>) -> Arc<dyn Environment> {
        let mut current = environment;
        for registered in &self.transforms {
            if !registered.forbid_filtering && !(registered.filter)(EventKind::EnvironmentTransforming) {
                continue;
            }
            current = (registered.transform)(current).await;
        }
        current
    }

    /// Reads `KOOG_FEATURES`/`KOOG_FEATURES_OVERRIDE` and auto-installs
    /// recognized system features not already installed (`§4.7 System
    /// features`). Unknown keys are logged as warnings. Runs once; later
    /// calls are no-ops.
    pub fn install_system_features(&mut self) {
        if self.system_features_installed {
            return;
        }
        self.system_features_installed = true;

        let mut requested = crate::config::system_feature_keys();
        requested.extend(crate::config::system_feature_override_keys());

        for key in requested {
            match key.as_str() {
                "Debugger" => {
                    if !self.is_installed(&FeatureKey::new("Debugger")) {
                        self.install_default(&DebuggerFeature);
                    }
                }
                other => {
                    tracing::warn!(feature = other, "unknown system feature key ignored");
                }
            }
        }
    }

    /// Sequentially initializes every installed feature's message
    /// processors (e.g. opening exporters). Idempotent: a second call is a
    /// no-op. Also triggers `install_system_features` once, matching the
    /// spec's "runs once during prepareAllFeatures".
    pub async fn prepare_all_features(&mut self) -> crate::error::Result<()> {
        if self.prepared {
            return Ok(());
        }
        self.install_system_features();
        for processors in self.processors.values() {
            for processor in processors {
                processor.init().await?;
            }
        }
        self.prepared = true;
        Ok(())
    }

    /// Sequentially closes every installed feature's message processors.
    /// Idempotent: closing twice is harmless (processors themselves are
    /// expected to tolerate a repeat `close`).
    pub async fn close_all_features_message_processors(&self) -> crate::error::Result<()> {
        for processors in self.processors.values() {
            for processor in processors {
                processor.close().await?;
            }
        }
        Ok(())
    }
}

/// Built-in system feature: logs every dispatched event via `tracing` and
/// forbids filtering, so it always observes the full event stream
/// regardless of what other features request (`§4.7`: "The Debugger
/// feature forbids filtering").
pub struct DebuggerFeature;

impl Feature for DebuggerFeature {
    fn key(&self) -> FeatureKey {
        FeatureKey::new("Debugger")
    }

    fn default_config(&self) -> FeatureConfig {
        FeatureConfig::default().forbidding_filtering()
    }

    fn install(&self, pipeline: &mut FeaturePipeline, config: &FeatureConfig) {
        for kind in ALL_EVENT_KINDS {
            let key = self.key();
            pipeline.on(key, kind, config, move |event: Event| {
                Box::pin(async move {
                    tracing::debug!(event = event.kind().name(), "debugger: event observed");
                    Ok(())
                })
            });
        }
    }
}

const ALL_EVENT_KINDS: [EventKind; 16] = [
    EventKind::AgentStarting,
    EventKind::AgentCompleted,
    EventKind::AgentExecutionFailed,
    EventKind::AgentClosing,
    EventKind::StrategyStarting,
    EventKind::StrategyCompleted,
    EventKind::LlmCallStarting,
    EventKind::LlmCallCompleted,
    EventKind::ToolCallStarting,
    EventKind::ToolValidationFailed,
    EventKind::ToolCallFailed,
    EventKind::ToolCallCompleted,
    EventKind::StreamingStarting,
    EventKind::StreamingFrameReceived,
    EventKind::StreamingFailed,
    EventKind::StreamingCompleted,
];
