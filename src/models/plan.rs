use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::command::Command;

/// Name of the pseudo column when a model does not configure one
pub const DEFAULT_PSEUDO_COLUMN: &str = "SOURCE_NAME";

/// How the fan-out planner exposes the originating source of merged rows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PseudoColumnMode {
    /// Append `'<source>' AS <pseudo column>` to every branch projection
    #[default]
    Synthesize,
    /// Only rely on a pseudo column the query already projects
    ReuseExisting,
}

/// Virtual model backed by several physical sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiSourceModel {
    pub name: String,
    /// Source binding names, in fan-out order
    pub sources: Vec<String>,
    #[serde(default = "default_pseudo_column")]
    pub pseudo_column: String,
    #[serde(default)]
    pub pseudo_column_mode: PseudoColumnMode,
}

fn default_pseudo_column() -> String {
    DEFAULT_PSEUDO_COLUMN.to_string()
}

impl MultiSourceModel {
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources,
            pseudo_column: default_pseudo_column(),
            pseudo_column_mode: PseudoColumnMode::default(),
        }
    }

    pub fn with_pseudo_column(mut self, name: impl Into<String>) -> Self {
        self.pseudo_column = name.into();
        self
    }

    pub fn with_pseudo_column_mode(mut self, mode: PseudoColumnMode) -> Self {
        self.pseudo_column_mode = mode;
        self
    }
}

/// Access to one model, as produced by the optimizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessPlanNode {
    pub id: Uuid,
    pub model_name: String,
    pub command: Command,
    #[serde(default)]
    pub connector_binding_id: Option<String>,
}

impl AccessPlanNode {
    pub fn new(model_name: impl Into<String>, command: Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_name: model_name.into(),
            command,
            connector_binding_id: None,
        }
    }

    /// Copy of this node bound to `binding`, with a fresh identity and the
    /// given command.
    pub fn for_source(&self, binding: &str, command: Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_name: self.model_name.clone(),
            command,
            connector_binding_id: Some(binding.to_string()),
        }
    }
}

/// Outcome of expanding one access node across its sources
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "shape", content = "nodes", rename_all = "lowercase")]
pub enum FanOutResult {
    /// Every branch was pruned; no source is contacted
    Empty,
    /// Exactly one physical access, executed as is
    Single(AccessPlanNode),
    /// Several physical accesses merged with UNION ALL
    Many(Vec<AccessPlanNode>),
}

impl FanOutResult {
    pub fn nodes(&self) -> Vec<&AccessPlanNode> {
        match self {
            FanOutResult::Empty => Vec::new(),
            FanOutResult::Single(node) => vec![node],
            FanOutResult::Many(nodes) => nodes.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FanOutResult::Empty => 0,
            FanOutResult::Single(_) => 1,
            FanOutResult::Many(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FanOutResult::Empty)
    }

    /// Source bindings in execution order
    pub fn bindings(&self) -> Vec<&str> {
        self.nodes()
            .into_iter()
            .filter_map(|node| node.connector_binding_id.as_deref())
            .collect()
    }
}

/// Identifies the request a rendered command belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionContext {
    pub connection_id: String,
    pub request_id: String,
    #[serde(default)]
    pub sub_request_id: u32,
}

impl ExecutionContext {
    pub fn new(connection_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            request_id: request_id.into(),
            sub_request_id: 0,
        }
    }

    pub fn sub_request(&self, sub_request_id: u32) -> Self {
        Self {
            sub_request_id,
            ..self.clone()
        }
    }
}
