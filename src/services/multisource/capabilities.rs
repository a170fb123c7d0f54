// Source capabilities
//
// What a physical source can evaluate, as seen by the optimizer. Queries
// against a multi-source model see the source's capabilities through
// `MultiSourceCapabilities`, which reports every operation that needs a
// single execution against a single source as unsupported.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::services::dialect::DialectKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    // Predicates
    CriteriaCompare,
    CriteriaIn,
    CriteriaLike,
    CriteriaLikeEscape,
    CriteriaIsNull,
    CriteriaNot,
    ScalarSubqueries,
    // Joins
    InnerJoins,
    OuterJoins,
    FullOuterJoins,
    InlineViews,
    // Set operations
    Union,
    Intersect,
    Except,
    // Aggregation
    AggregatesCount,
    AggregatesCountStar,
    AggregatesSum,
    AggregatesAvg,
    AggregatesMin,
    AggregatesMax,
    AggregatesDistinct,
    SelectDistinct,
    GroupBy,
    Having,
    // Ordering and paging
    OrderBy,
    OrderByNullOrdering,
    RowLimit,
    RowOffset,
    // Updates
    Insert,
    BulkInsert,
    InsertWithQueryExpression,
    Update,
    Delete,
    ProcedureCalls,
}

impl Capability {
    pub const ALL: &'static [Capability] = &[
        Capability::CriteriaCompare,
        Capability::CriteriaIn,
        Capability::CriteriaLike,
        Capability::CriteriaLikeEscape,
        Capability::CriteriaIsNull,
        Capability::CriteriaNot,
        Capability::ScalarSubqueries,
        Capability::InnerJoins,
        Capability::OuterJoins,
        Capability::FullOuterJoins,
        Capability::InlineViews,
        Capability::Union,
        Capability::Intersect,
        Capability::Except,
        Capability::AggregatesCount,
        Capability::AggregatesCountStar,
        Capability::AggregatesSum,
        Capability::AggregatesAvg,
        Capability::AggregatesMin,
        Capability::AggregatesMax,
        Capability::AggregatesDistinct,
        Capability::SelectDistinct,
        Capability::GroupBy,
        Capability::Having,
        Capability::OrderBy,
        Capability::OrderByNullOrdering,
        Capability::RowLimit,
        Capability::RowOffset,
        Capability::Insert,
        Capability::BulkInsert,
        Capability::InsertWithQueryExpression,
        Capability::Update,
        Capability::Delete,
        Capability::ProcedureCalls,
    ];

    /// Forced off when the query targets a multi-source model
    pub fn is_masked_for_multi_source(&self) -> bool {
        matches!(
            self,
            Capability::Union
                | Capability::Intersect
                | Capability::Except
                | Capability::AggregatesCount
                | Capability::AggregatesCountStar
                | Capability::AggregatesSum
                | Capability::AggregatesAvg
                | Capability::AggregatesMin
                | Capability::AggregatesMax
                | Capability::AggregatesDistinct
                | Capability::SelectDistinct
                | Capability::GroupBy
                | Capability::Having
                | Capability::OrderBy
                | Capability::OrderByNullOrdering
                | Capability::RowLimit
                | Capability::RowOffset
        )
    }
}

/// Capability queries answered for one physical source
pub trait SourceCapabilities: Send + Sync + fmt::Debug {
    fn supports(&self, capability: Capability) -> bool;

    /// Whether the named canonical function can be pushed to the source
    fn supports_function(&self, name: &str) -> bool;

    /// Largest IN list the source accepts, `None` for unbounded
    fn max_in_criteria_size(&self) -> Option<usize> {
        None
    }
}

/// Plain capability set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicCapabilities {
    supported: HashSet<Capability>,
    functions: HashSet<String>,
    max_in_criteria_size: Option<usize>,
}

const COMMON_FUNCTIONS: &[&str] = &[
    "abs", "ceiling", "coalesce", "concat", "convert", "floor", "ifnull", "lcase", "left",
    "length", "locate", "lower", "ltrim", "mod", "right", "round", "rtrim", "substring", "trim",
    "ucase", "upper",
];

impl BasicCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability and every common function
    pub fn all() -> Self {
        Self {
            supported: Capability::ALL.iter().copied().collect(),
            functions: COMMON_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
            max_in_criteria_size: None,
        }
    }

    /// Default capabilities of a dialect
    pub fn for_dialect(kind: DialectKind) -> Self {
        let capabilities = Self::all();
        match kind {
            DialectKind::MySql => capabilities
                .without(Capability::FullOuterJoins)
                .without(Capability::Intersect)
                .without(Capability::Except)
                .without(Capability::OrderByNullOrdering),
            DialectKind::Oracle => capabilities
                .with_max_in_criteria_size(1000)
                .with_functions(&["dayofyear", "dayofmonth", "dayofweek", "week", "quarter"]),
            DialectKind::SqlServer => capabilities
                .without(Capability::OrderByNullOrdering)
                .with_max_in_criteria_size(2100)
                .with_functions(&["dayofyear", "dayofweek", "week", "quarter"]),
            DialectKind::PostgreSql => {
                capabilities.with_functions(&["dayofyear", "dayofweek", "week", "quarter"])
            }
            DialectKind::Generic => capabilities,
        }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.supported.insert(capability);
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.supported.remove(&capability);
        self
    }

    pub fn with_functions(mut self, names: &[&str]) -> Self {
        self.functions
            .extend(names.iter().map(|name| name.to_lowercase()));
        self
    }

    pub fn with_max_in_criteria_size(mut self, size: usize) -> Self {
        self.max_in_criteria_size = Some(size);
        self
    }
}

impl SourceCapabilities for BasicCapabilities {
    fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }

    fn supports_function(&self, name: &str) -> bool {
        self.functions.contains(&name.to_lowercase())
    }

    fn max_in_criteria_size(&self) -> Option<usize> {
        self.max_in_criteria_size
    }
}

/// Capabilities of a source seen through a multi-source model
#[derive(Debug, Clone)]
pub struct MultiSourceCapabilities {
    inner: Arc<dyn SourceCapabilities>,
}

impl MultiSourceCapabilities {
    pub fn new(inner: Arc<dyn SourceCapabilities>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn SourceCapabilities> {
        &self.inner
    }
}

impl SourceCapabilities for MultiSourceCapabilities {
    fn supports(&self, capability: Capability) -> bool {
        !capability.is_masked_for_multi_source() && self.inner.supports(capability)
    }

    fn supports_function(&self, name: &str) -> bool {
        self.inner.supports_function(name)
    }

    fn max_in_criteria_size(&self) -> Option<usize> {
        self.inner.max_in_criteria_size()
    }
}

/// Capabilities to plan with for a source, masked when the query targets a
/// multi-source model
pub fn mask_capabilities(
    capabilities: Arc<dyn SourceCapabilities>,
    is_multi_source: bool,
) -> Arc<dyn SourceCapabilities> {
    if is_multi_source {
        Arc::new(MultiSourceCapabilities::new(capabilities))
    } else {
        capabilities
    }
}
