// Federated Executor
//
// Executes a fan-out result: every surviving branch is rendered for its own
// source and run against that source's connector, with bounded concurrency
// and a per-source timeout. Results are merged with UNION ALL semantics in
// branch order. The first failing source fails the whole request and the
// remaining branches are cancelled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::error::{FederationError, Result};
use crate::models::{ExecutionContext, FanOutResult};
use crate::services::registry::DialectRegistry;
use crate::services::renderer::RenderedCommand;
use crate::validation::SqlValidator;

/// Connection to one physical source
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Run a rendered command and collect its rows
    async fn execute(&self, command: &RenderedCommand) -> anyhow::Result<SourceResult>;
}

/// Rows (or update count) returned by one source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
    #[serde(default)]
    pub update_count: Option<u64>,
}

/// Summary of one source's execution
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceExecution {
    pub binding: String,
    pub sql: String,
    pub row_count: usize,
    pub execution_time_ms: u128,
}

/// Merged result of a federated request
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FederatedResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
    pub update_count: Option<u64>,
    pub sources: Vec<SourceExecution>,
    pub execution_time_ms: u128,
}

#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    /// Sources executed at the same time, across all requests
    pub max_concurrency: usize,
    pub source_timeout: Duration,
    /// Parse rendered SQL before sending it
    pub validate_sql: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get(),
            source_timeout: Duration::from_secs(30),
            validate_sql: false,
        }
    }
}

pub struct FederatedExecutor {
    registry: Arc<DialectRegistry>,
    connectors: HashMap<String, Arc<dyn SourceConnector>>,
    settings: ExecutionSettings,
    permits: Arc<Semaphore>,
}

struct PreparedSource {
    binding: String,
    connector: Arc<dyn SourceConnector>,
    rendered: RenderedCommand,
}

impl FederatedExecutor {
    pub fn new(registry: Arc<DialectRegistry>, settings: ExecutionSettings) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
        Self {
            registry,
            connectors: HashMap::new(),
            settings,
            permits,
        }
    }

    pub fn register_connector(
        &mut self,
        binding: impl Into<String>,
        connector: Arc<dyn SourceConnector>,
    ) {
        self.connectors.insert(binding.into(), connector);
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Execute every branch of `plan`
    ///
    /// All branches are rendered (and validated, if enabled) before any
    /// source is contacted. An `Empty` plan returns an empty result without
    /// I/O. Dropping the returned future cancels all in-flight sources.
    pub async fn execute(
        &self,
        plan: &FanOutResult,
        context: &ExecutionContext,
    ) -> Result<FederatedResult> {
        let start_time = Instant::now();
        let nodes = plan.nodes();
        if nodes.is_empty() {
            info!("Request {} pruned every source, nothing to execute", context.request_id);
            return Ok(FederatedResult::default());
        }

        let mut prepared = Vec::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            let binding = node.connector_binding_id.as_deref().ok_or_else(|| {
                FederationError::internal(format!(
                    "access to '{}' is not bound to a source",
                    node.model_name
                ))
            })?;
            let connector = self.connectors.get(binding).cloned().ok_or_else(|| {
                FederationError::Metadata(format!("No connector registered for source '{}'", binding))
            })?;

            let sub_context = context.sub_request(idx as u32);
            let rendered = self
                .registry
                .render(binding, &node.command, Some(&sub_context))
                .await?;

            if self.settings.validate_sql {
                if let Some(config) = self.registry.dialect(binding) {
                    SqlValidator::validate_rendered(&rendered.sql, config.kind, &node.command)?;
                }
            }

            prepared.push(PreparedSource {
                binding: binding.to_string(),
                connector,
                rendered,
            });
        }

        info!(
            "Executing request {} against {} source(s)",
            context.request_id,
            prepared.len()
        );

        let tasks = prepared.into_iter().map(|source| self.run_source(source));
        let results = futures::future::try_join_all(tasks).await?;

        let mut merged = FederatedResult::default();
        for (execution, result) in results {
            if merged.columns.is_empty() {
                merged.columns = result.columns;
            } else if !result.columns.is_empty() && result.columns.len() != merged.columns.len() {
                return Err(FederationError::execution(
                    &execution.binding,
                    format!(
                        "returned {} columns, expected {}",
                        result.columns.len(),
                        merged.columns.len()
                    ),
                ));
            }
            if let Some(count) = result.update_count {
                merged.update_count = Some(merged.update_count.unwrap_or(0) + count);
            }
            merged.rows.extend(result.rows);
            merged.sources.push(execution);
        }
        merged.execution_time_ms = start_time.elapsed().as_millis();

        Ok(merged)
    }

    async fn run_source(&self, source: PreparedSource) -> Result<(SourceExecution, SourceResult)> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FederationError::internal("execution permits closed"))?;

        let PreparedSource {
            binding,
            connector,
            rendered,
        } = source;
        let start = Instant::now();

        let result = timeout(self.settings.source_timeout, connector.execute(&rendered))
            .await
            .map_err(|_| {
                error!("Source '{}' timed out", binding);
                FederationError::Timeout {
                    binding: binding.clone(),
                    secs: self.settings.source_timeout.as_secs(),
                }
            })?
            .map_err(|e| {
                error!("Source '{}' failed: {}", binding, e);
                FederationError::execution(&binding, e.to_string())
            })?;

        let execution_time_ms = start.elapsed().as_millis();
        debug!(
            "Source '{}' returned {} rows in {} ms",
            binding,
            result.rows.len(),
            execution_time_ms
        );

        Ok((
            SourceExecution {
                binding,
                sql: rendered.sql,
                row_count: result.rows.len(),
                execution_time_ms,
            },
            result,
        ))
    }
}
