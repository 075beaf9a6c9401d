//! Run-level configuration for the graph execution engine.
//!
//! [`RunConfig`] bundles every knob a strategy run reads: the iteration
//! cap, LLM sampling parameters, tool-choice policy, fan-out mode, and the
//! retry budget for models that can't enforce required tool choice. It
//! follows the same builder-plus-`from_env` shape as the teacher's
//! `ChatConfig`/`RetryPolicy`, loading overrides through `tooling::config`.

use llm::ToolChoice;
use tooling::config::{get_env_bool, get_env_or, get_env_parse_or};

use crate::error::{GraphError, Result};

/// How a strategy fans work out across a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// One invocation, no fan-out.
    #[default]
    SingleRun,
    /// Multiple invocations, run one at a time in declaration order.
    SingleRunSequential,
    /// Multiple invocations, run concurrently via `tokio::task::JoinSet`.
    Parallel,
}

impl std::str::FromStr for RunMode {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single_run" | "singlerun" => Ok(RunMode::SingleRun),
            "single_run_sequential" | "singlerunsequential" => Ok(RunMode::SingleRunSequential),
            "parallel" => Ok(RunMode::Parallel),
            other => Err(GraphError::build(format!("unknown run mode '{other}'"))),
        }
    }
}

/// Configuration for a single strategy run.
///
/// Defaults match spec §6: a 50-iteration cap, 3 retries before giving up
/// on tool-choice enforcement, single-run fan-out, and automatic
/// persistence disabled.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Hard cap on total node invocations for the run; exceeding it fails
    /// with [`GraphError::IterationLimitExceeded`].
    pub max_agent_iterations: u32,
    /// Sampling temperature passed to the LLM executor.
    pub temperature: f32,
    /// Requested tool-choice policy for LLM calls.
    pub tool_choice: ToolChoice,
    /// Fan-out mode for parallel nodes and multi-choice calls.
    pub run_mode: RunMode,
    /// ReAct-style interval, in node invocations, between forced reasoning
    /// steps. Zero disables the behavior.
    pub reasoning_interval: u32,
    /// How many synthetic "call tools instead" retries the engine attempts
    /// before failing with [`GraphError::ToolChoiceUnsupported`].
    pub max_attempts_without_tool_choice: u32,
    /// Whether the engine automatically checkpoints on node entry.
    pub enable_automatic_persistence: bool,
    /// How many choices to request from the LLM executor per call.
    pub number_of_choices: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_agent_iterations: 50,
            temperature: 1.0,
            tool_choice: ToolChoice::Auto,
            run_mode: RunMode::SingleRun,
            reasoning_interval: 0,
            max_attempts_without_tool_choice: 3,
            enable_automatic_persistence: false,
            number_of_choices: 1,
        }
    }
}

impl RunConfig {
    /// Start from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_agent_iterations(mut self, n: u32) -> Self {
        self.max_agent_iterations = n;
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_tool_choice(mut self, tc: ToolChoice) -> Self {
        self.tool_choice = tc;
        self
    }

    pub fn with_run_mode(mut self, mode: RunMode) -> Self {
        self.run_mode = mode;
        self
    }

    pub fn with_reasoning_interval(mut self, n: u32) -> Self {
        self.reasoning_interval = n;
        self
    }

    pub fn with_max_attempts_without_tool_choice(mut self, n: u32) -> Self {
        self.max_attempts_without_tool_choice = n;
        self
    }

    pub fn with_automatic_persistence(mut self, enabled: bool) -> Self {
        self.enable_automatic_persistence = enabled;
        self
    }

    pub fn with_number_of_choices(mut self, n: u32) -> Self {
        self.number_of_choices = n;
        self
    }

    /// Rejects configurations that cannot possibly complete: a zero
    /// iteration cap, or zero retries on a model that needs the
    /// tool-choice-unsupported retry loop to make progress.
    pub fn validate(&self) -> Result<()> {
        if self.max_agent_iterations == 0 {
            return Err(GraphError::build("max_agent_iterations must be non-zero"));
        }
        if self.max_attempts_without_tool_choice == 0 {
            return Err(GraphError::build(
                "max_attempts_without_tool_choice must be non-zero",
            ));
        }
        if self.number_of_choices == 0 {
            return Err(GraphError::build("number_of_choices must be non-zero"));
        }
        Ok(())
    }

    /// Overlay environment variables on top of `self`, using `prefix` (e.g.
    /// `"AGENT_"`) the way `tooling::config` layers env vars over defaults.
    /// Unset variables leave the existing value untouched.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let defaults = Self::default();
        let max_agent_iterations = get_env_parse_or(
            &format!("{prefix}MAX_AGENT_ITERATIONS"),
            defaults.max_agent_iterations,
        )
        .map_err(GraphError::custom)?;
        let temperature = get_env_parse_or(&format!("{prefix}TEMPERATURE"), defaults.temperature)
            .map_err(GraphError::custom)?;
        let run_mode_str = get_env_or(
            &format!("{prefix}RUN_MODE"),
            match defaults.run_mode {
                RunMode::SingleRun => "single_run",
                RunMode::SingleRunSequential => "single_run_sequential",
                RunMode::Parallel => "parallel",
            },
        )
        .map_err(GraphError::custom)?;
        let run_mode: RunMode = run_mode_str.parse()?;
        let reasoning_interval = get_env_parse_or(
            &format!("{prefix}REASONING_INTERVAL"),
            defaults.reasoning_interval,
        )
        .map_err(GraphError::custom)?;
        let max_attempts_without_tool_choice = get_env_parse_or(
            &format!("{prefix}MAX_ATTEMPTS_WITHOUT_TOOL_CHOICE"),
            defaults.max_attempts_without_tool_choice,
        )
        .map_err(GraphError::custom)?;
        let enable_automatic_persistence = get_env_bool(&format!("{prefix}ENABLE_AUTOMATIC_PERSISTENCE"))
            .map_err(GraphError::custom)?
            .unwrap_or(defaults.enable_automatic_persistence);
        let number_of_choices = get_env_parse_or(
            &format!("{prefix}NUMBER_OF_CHOICES"),
            defaults.number_of_choices,
        )
        .map_err(GraphError::custom)?;

        Ok(RunConfig {
            max_agent_iterations,
            temperature,
            tool_choice: defaults.tool_choice,
            run_mode,
            reasoning_interval,
            max_attempts_without_tool_choice,
            enable_automatic_persistence,
            number_of_choices,
        })
    }
}

/// Comma-separated list of system feature keys to auto-install, read from
/// `KOOG_FEATURES`. Mirrors the teacher's env-var-over-default layering;
/// unknown keys are the caller's responsibility to warn about.
pub fn system_feature_keys() -> Vec<String> {
    parse_feature_list(&get_env_or("KOOG_FEATURES", "").unwrap_or_default())
}

/// Override list read from `KOOG_FEATURES_OVERRIDE`, the Rust stand-in for
/// the JVM `koog.features` system property (no equivalent exists for a
/// plain binary, so this falls back to an environment variable too).
pub fn system_feature_override_keys() -> Vec<String> {
    parse_feature_list(&get_env_or("KOOG_FEATURES_OVERRIDE", "").unwrap_or_default())
}

fn parse_feature_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.max_agent_iterations, 50);
        assert_eq!(cfg.max_attempts_without_tool_choice, 3);
        assert_eq!(cfg.run_mode, RunMode::SingleRun);
        assert!(!cfg.enable_automatic_persistence);
        assert_eq!(cfg.number_of_choices, 1);
    }

    #[test]
    fn validate_rejects_zero_iteration_cap() {
        let cfg = RunConfig::default().with_max_agent_iterations(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_retry_budget() {
        let cfg = RunConfig::default().with_max_attempts_without_tool_choice(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn builder_methods_chain() {
        let cfg = RunConfig::new()
            .with_temperature(0.2)
            .with_run_mode(RunMode::Parallel)
            .with_number_of_choices(3);
        assert_eq!(cfg.temperature, 0.2);
        assert_eq!(cfg.run_mode, RunMode::Parallel);
        assert_eq!(cfg.number_of_choices, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn run_mode_parses_known_strings() {
        assert_eq!("parallel".parse::<RunMode>().unwrap(), RunMode::Parallel);
        assert_eq!(
            "single_run_sequential".parse::<RunMode>().unwrap(),
            RunMode::SingleRunSequential
        );
        assert!("nonsense".parse::<RunMode>().is_err());
    }

    #[test]
    fn feature_list_parses_comma_separated_trimmed() {
        assert_eq!(
            parse_feature_list(" Debugger, EventLogger ,,"),
            vec!["Debugger".to_string(), "EventLogger".to_string()]
        );
        assert!(parse_feature_list("").is_empty());
    }
}
