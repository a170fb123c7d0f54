use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use vdb_federation::config::Config;
use vdb_federation::models::{AccessPlanNode, Command, ExecutionContext, FanOutResult};
use vdb_federation::services::{
    BoundValue, DialectRegistry, FanOutPlanner, SimpleConstantFolder, StaticPruningOracle,
};

/// Access to explain, read from stdin
#[derive(Debug, Deserialize)]
struct ExplainRequest {
    model_name: String,
    command: Command,
    /// Source used when the model is not multi-source
    #[serde(default)]
    source: Option<String>,
    #[serde(default = "default_request_id")]
    request_id: String,
}

fn default_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Serialize)]
struct ExplainedBranch {
    binding: Option<String>,
    sql: Option<String>,
    bound_values: Vec<BoundValue>,
}

#[derive(Debug, Serialize)]
struct ExplainedPlan {
    model_name: String,
    shape: &'static str,
    branches: Vec<ExplainedBranch>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize logging; stdout carries the plan
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_ansi(config.logging.style != "never")
        .with_writer(std::io::stderr)
        .init();

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    let request: ExplainRequest =
        serde_json::from_str(&input).context("Invalid explain request")?;

    let registry = config.dialect_registry()?;
    let planner = FanOutPlanner::new(Arc::new(config.catalog()?), Arc::new(SimpleConstantFolder));

    info!("Explaining access to '{}'", request.model_name);

    let mut node = AccessPlanNode::new(request.model_name.clone(), request.command);
    node.connector_binding_id = request.source;

    let plan = planner.plan(node, &StaticPruningOracle).map_err(|e| {
        error!("Planning failed: {}", e);
        e
    })?;

    let context = ExecutionContext::new("vdb-explain", request.request_id);
    let explained = explain(&registry, &plan, &context, request.model_name).await?;

    println!("{}", serde_json::to_string_pretty(&explained)?);

    Ok(())
}

async fn explain(
    registry: &DialectRegistry,
    plan: &FanOutResult,
    context: &ExecutionContext,
    model_name: String,
) -> anyhow::Result<ExplainedPlan> {
    let shape = match plan {
        FanOutResult::Empty => "empty",
        FanOutResult::Single(_) => "single",
        FanOutResult::Many(_) => "many",
    };

    let mut branches = Vec::with_capacity(plan.len());
    for (idx, node) in plan.nodes().into_iter().enumerate() {
        let Some(binding) = node.connector_binding_id.clone() else {
            branches.push(ExplainedBranch {
                binding: None,
                sql: None,
                bound_values: Vec::new(),
            });
            continue;
        };

        let rendered = registry
            .render(&binding, &node.command, Some(&context.sub_request(idx as u32)))
            .await
            .with_context(|| format!("Failed to render for source '{}'", binding))?;

        branches.push(ExplainedBranch {
            binding: Some(binding),
            sql: Some(rendered.sql),
            bound_values: rendered.bound_values,
        });
    }

    Ok(ExplainedPlan {
        model_name,
        shape,
        branches,
    })
}
