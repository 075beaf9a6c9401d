//! Graph model: nodes, edges, subgraphs, qualified paths (C4, `§3 DATA
//! MODEL: Graph`, `§4.4`).
//!
//! Node variants are a single tagged enum rather than a trait-object class
//! hierarchy, per the REDESIGN FLAGS guidance: each variant carries its own
//! payload and its interpretation lives in the executor's match arm, not in
//! a virtual method on the node itself. The qualified-path arena is a flat
//! map keyed by the colon-joined path (`strategy:subgraph:...:node`);
//! `Graph::build` computes a last-segment index once so `resolve` (used by
//! checkpoint restoration, `§4.6`) never has to scan.

use std::collections::HashMap;
use std::sync::Arc;

use llm::Message;
use serde_json::Value;

use crate::compression::CompressionPolicy;
use crate::error::{GraphError, Result};

/// A colon-joined path, unique within a strategy once `Graph::build`
/// succeeds (`§3 DATA MODEL: Graph`).
pub type QualifiedPath = String;

pub type TransformFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;
/// Inspects the last produced value and the current prompt tail; pure,
/// non-suspending (`§5`: "Guards, transforms, and edge selection are
/// non-suspending").
pub type GuardFn = Arc<dyn Fn(&Value, &[Message]) -> bool + Send + Sync>;
pub type EdgeTransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// How a [`NodeKind::Parallel`] node combines its children's results into
/// one value and picks which child's context becomes active (`§4.5`).
#[derive(Clone)]
pub enum ParallelReducer {
    /// Left fold over children in declaration order, independent of
    /// completion order. The active context is always the last child
    /// folded (declaration order), matching a reduction that logically
    /// "accumulates" rather than "selects".
    Fold {
        init: Value,
        fold: Arc<dyn Fn(Value, Value) -> Value + Send + Sync>,
    },
    /// First child (in declaration order) whose projection is `true` wins;
    /// falls back to the first child if none match.
    SelectBy(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
    /// The child whose projection is numerically greatest wins; ties keep
    /// the earliest declared child.
    SelectByMax(Arc<dyn Fn(&Value) -> f64 + Send + Sync>),
}

impl ParallelReducer {
    /// Combine per-child `(index, value)` pairs (already reordered into
    /// declaration order) into `(output_value, winning_child_index)`.
    pub fn reduce(&self, children: &[Value]) -> (Value, usize) {
        match self {
            ParallelReducer::Fold { init, fold } => {
                let mut acc = init.clone();
                let mut winner = 0;
                for (i, v) in children.iter().enumerate() {
                    acc = fold(acc, v.clone());
                    winner = i;
                }
                (acc, winner)
            }
            ParallelReducer::SelectBy(pred) => {
                let winner = children.iter().position(|v| pred(v)).unwrap_or(0);
                (children[winner].clone(), winner)
            }
            ParallelReducer::SelectByMax(project) => {
                let mut winner = 0;
                let mut best = f64::NEG_INFINITY;
                for (i, v) in children.iter().enumerate() {
                    let score = project(v);
                    if score > best {
                        best = score;
                        winner = i;
                    }
                }
                (children[winner].clone(), winner)
            }
        }
    }
}

/// One node in the graph arena (`§3 DATA MODEL: Node variants`).
#[derive(Clone)]
pub enum NodeKind {
    /// `(input) -> output`, pure with respect to context.
    Transform(TransformFn),
    /// Issues an LLM request. `forbid_tool_calls` mirrors a subgraph
    /// position where tool calls are not allowed in the response.
    LlmRequest { forbid_tool_calls: bool },
    /// Consumes a tool-call batch (as `Vec<crate::tool_registry::ToolCall>`
    /// encoded to `Value`), dispatches through the environment.
    ToolExecute,
    /// Appends tool results to the prompt, then issues the next LLM request.
    ToolResultSend,
    /// Rewrites prompt history by a named policy.
    HistoryCompress(CompressionPolicy),
    /// Fans one input out to `children`, awaits all, reduces.
    Parallel {
        children: Vec<QualifiedPath>,
        reducer: ParallelReducer,
    },
    /// Recursive invocation of another subgraph by name.
    Subgraph(String),
    /// Marks this node's own qualified path and current input as the point
    /// a later [`NodeKind::Rollback`] resumes at, by persisting a checkpoint
    /// through the run's [`agent_checkpoint::CheckpointSaver`] unconditionally
    /// (not gated on `enable_automatic_persistence`), then passes the input
    /// through unchanged (`§3 DATA MODEL: Checkpoint`, S3).
    CheckpointAnchor,
    /// Requests `rollbackToLatestCheckpoint`-style resumption at the most
    /// recently recorded [`NodeKind::CheckpointAnchor`], unless this run was
    /// itself resumed from that rollback — in which case it passes `input`
    /// through instead of scheduling again (`§4.6`, S3: "observes the flag
    /// and does not roll back again"). Only meaningful at the top-level
    /// strategy subgraph; see `GraphError::RollbackScheduled`.
    Rollback,
}

impl NodeKind {
    /// Container nodes participate in checkpoint execution-point
    /// enforcement (`§4.6`: "for each intermediate container node, assert
    /// it is execution-point-bearing").
    pub fn is_execution_point_bearing(&self) -> bool {
        matches!(self, NodeKind::Parallel { .. } | NodeKind::Subgraph(_))
    }
}

/// One labelled transition (`§3 DATA MODEL: Edge`). Evaluated in
/// declaration order; the first whose `guard` matches wins.
#[derive(Clone)]
pub struct Edge {
    pub from: QualifiedPath,
    pub to: QualifiedPath,
    pub guard: GuardFn,
    pub transform: EdgeTransformFn,
}

impl Edge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        guard: impl Fn(&Value, &[Message]) -> bool + Send + Sync + 'static,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Edge {
            from: from.into(),
            to: to.into(),
            guard: Arc::new(guard),
            transform: Arc::new(transform),
        }
    }

    /// An edge that always matches and passes its value through unchanged.
    pub fn always(from: impl Into<String>, to: impl Into<String>) -> Self {
        Edge::new(from, to, |_, _| true, |v| v)
    }
}

/// `(startNode, finishNode, nodesMap, edges, toolSelectionStrategy)`
/// (`§3 DATA MODEL: Graph`). A strategy is a subgraph whose name is its
/// top-level path segment.
pub struct Subgraph {
    pub name: String,
    pub start: QualifiedPath,
    pub finish: QualifiedPath,
    pub nodes: HashMap<QualifiedPath, NodeKind>,
    pub edges: Vec<Edge>,
    pub tool_choice: llm::ToolChoice,
}

impl Subgraph {
    pub fn new(name: impl Into<String>, start: impl Into<String>, finish: impl Into<String>) -> Self {
        Subgraph {
            name: name.into(),
            start: start.into(),
            finish: finish.into(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            tool_choice: llm::ToolChoice::Auto,
        }
    }

    pub fn with_node(mut self, path: impl Into<String>, node: NodeKind) -> Self {
        self.nodes.insert(path.into(), node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: llm::ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    /// Edges leaving `path`, in declaration order.
    pub fn outgoing(&self, path: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.from == path).collect()
    }
}

/// The compiled graph for one strategy: every subgraph it contains, plus
/// the last-segment index `resolve` uses (`§4.4`).
pub struct Graph {
    pub strategy_name: String,
    subgraphs: HashMap<String, Subgraph>,
    last_segment_index: HashMap<String, Vec<QualifiedPath>>,
}

impl Graph {
    /// Validates and compiles a set of subgraphs into one [`Graph`].
    ///
    /// Checks performed (every failure is a [`GraphError::BuildError`],
    /// never surfaced during a run):
    /// - every subgraph's `start`/`finish` are present in its own `nodes` map
    ///   (the `finish` node itself carries no [`NodeKind`] — it is a marker);
    /// - every edge's `from`/`to` refer to nodes within the same subgraph;
    /// - no two qualified paths across the whole graph share a last segment.
    pub fn build(strategy_name: impl Into<String>, subgraphs: Vec<Subgraph>) -> Result<Self> {
        let strategy_name = strategy_name.into();
        let mut by_name = HashMap::new();
        let mut last_segment_index: HashMap<String, Vec<QualifiedPath>> = HashMap::new();

        for subgraph in &subgraphs {
            if subgraph.start != subgraph.finish && !subgraph.nodes.contains_key(&subgraph.start) {
                return Err(GraphError::build(format!(
                    "subgraph '{}': start node '{}' is not in nodes map",
                    subgraph.name, subgraph.start
                )));
            }
            for edge in &subgraph.edges {
                let from_ok = edge.from == subgraph.start || subgraph.nodes.contains_key(&edge.from);
                let to_ok = edge.to == subgraph.finish || subgraph.nodes.contains_key(&edge.to);
                if !from_ok || !to_ok {
                    return Err(GraphError::build(format!(
                        "subgraph '{}': edge {} -> {} refers to a node outside the subgraph",
                        subgraph.name, edge.from, edge.to
                    )));
                }
            }
            for path in subgraph.nodes.keys() {
                let last_segment = path.rsplit(':').next().unwrap_or(path).to_string();
                last_segment_index.entry(last_segment).or_default().push(path.clone());
            }
        }

        for (segment, paths) in &last_segment_index {
            if paths.len() > 1 {
                return Err(GraphError::build(format!(
                    "qualified path last segment '{segment}' is ambiguous: matches {paths:?}"
                )));
            }
        }

        for subgraph in subgraphs {
            by_name.insert(subgraph.name.clone(), subgraph);
        }

        if !by_name.contains_key(&strategy_name) {
            return Err(GraphError::build(format!(
                "no subgraph named '{strategy_name}' (the strategy's own top-level subgraph)"
            )));
        }

        Ok(Graph {
            strategy_name,
            subgraphs: by_name,
            last_segment_index,
        })
    }

    pub fn subgraph(&self, name: &str) -> Result<&Subgraph> {
        self.subgraphs
            .get(name)
            .ok_or_else(|| GraphError::build(format!("no subgraph named '{name}'")))
    }

    pub fn node(&self, subgraph_name: &str, path: &str) -> Option<&NodeKind> {
        self.subgraphs.get(subgraph_name)?.nodes.get(path)
    }

    /// Resolve a bare node id (its last qualified-path segment) to the full
    /// path. Ambiguity was already rejected at `build` time, so a result
    /// here is either exactly one match or none.
    pub fn resolve(&self, node_id: &str) -> Result<QualifiedPath> {
        match self.last_segment_index.get(node_id) {
            Some(paths) if paths.len() == 1 => Ok(paths[0].clone()),
            _ => Err(GraphError::NodeNotFound(node_id.to_string())),
        }
    }

    /// Finds a node by its full qualified path, searching every subgraph
    /// rather than just the one named by the path's first segment — a
    /// [`NodeKind::Parallel`]'s children and a restored execution point may
    /// name paths rooted in a subgraph other than the one currently
    /// executing. Used by the executor to dispatch parallel children and by
    /// restoration to validate the container chain (`§4.5`, `§4.6`).
    pub fn find_node(&self, path: &str) -> Option<&NodeKind> {
        if let Some(first) = path.split(':').next() {
            if let Some(node) = self.subgraphs.get(first).and_then(|s| s.nodes.get(path)) {
                return Some(node);
            }
        }
        self.subgraphs.values().find_map(|s| s.nodes.get(path))
    }

    /// The subgraph that owns a given qualified path, if any.
    pub fn subgraph_owning(&self, path: &str) -> Option<&Subgraph> {
        self.subgraphs.values().find(|s| s.nodes.contains_key(path))
    }

    /// `enforceExecutionPoint(node, input)` (`§4.4`): asserts `container_path`
    /// names an execution-point-bearing node and directs it at `child` with
    /// `input`, producing the [`ExecutionPoint`] the restoration walk carries
    /// one level deeper. Used by [`crate::restore::restore`] to validate each
    /// intermediate container in a restored path instead of only checking it
    /// and discarding the result (`§4.6` step 3c).
    pub fn enforce_execution_point(
        &self,
        container_path: &str,
        child: QualifiedPath,
        input: Value,
    ) -> Result<ExecutionPoint> {
        match self.find_node(container_path) {
            Some(node) if node.is_execution_point_bearing() => Ok(ExecutionPoint { node: child, input }),
            Some(_) => Err(GraphError::NotAContainer(container_path.to_string())),
            None => Err(GraphError::NotAContainer(container_path.to_string())),
        }
    }
}

/// Where a restored run should resume: a leaf node and the input it was
/// about to receive (`§4.6`).
#[derive(Debug, Clone)]
pub struct ExecutionPoint {
    pub node: QualifiedPath,
    pub input: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_subgraph(name: &str) -> Subgraph {
        Subgraph::new(name, format!("{name}:start"), format!("{name}:finish"))
            .with_node(format!("{name}:start"), NodeKind::Transform(Arc::new(|v| Ok(v))))
            .with_edge(Edge::always(format!("{name}:start"), format!("{name}:finish")))
    }

    #[test]
    fn build_rejects_ambiguous_last_segment() {
        let mut sub = leaf_subgraph("strat");
        sub.nodes.insert("strat:sub:start".to_string(), NodeKind::Transform(Arc::new(|v| Ok(v))));
        let result = Graph::build("strat", vec![sub]);
        assert!(result.is_err());
    }

    #[test]
    fn build_rejects_edge_to_unknown_node() {
        let mut sub = leaf_subgraph("strat");
        sub.edges.push(Edge::always("strat:start", "strat:nowhere"));
        let result = Graph::build("strat", vec![sub]);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_finds_unique_last_segment() {
        let graph = Graph::build("strat", vec![leaf_subgraph("strat")]).unwrap();
        assert_eq!(graph.resolve("start").unwrap(), "strat:start");
    }

    #[test]
    fn resolve_fails_for_unknown_segment() {
        let graph = Graph::build("strat", vec![leaf_subgraph("strat")]).unwrap();
        assert!(graph.resolve("nope").is_err());
    }

    #[test]
    fn parallel_reducer_select_by_max_picks_highest_score() {
        let reducer = ParallelReducer::SelectByMax(Arc::new(|v: &Value| v.as_f64().unwrap_or(0.0)));
        let children = vec![Value::from(10.0), Value::from(50.0), Value::from(100.0)];
        let (value, index) = reducer.reduce(&children);
        assert_eq!(value, Value::from(100.0));
        assert_eq!(index, 2);
    }

    #[test]
    fn parallel_reducer_fold_accumulates_in_declaration_order() {
        let reducer = ParallelReducer::Fold {
            init: Value::from(0i64),
            fold: Arc::new(|acc, v| Value::from(acc.as_i64().unwrap() + v.as_i64().unwrap())),
        };
        let children = vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)];
        let (value, _) = reducer.reduce(&children);
        assert_eq!(value, Value::from(6i64));
    }
}
