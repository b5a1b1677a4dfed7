//! CLI helper functions

use crate::{
    banks::{BankPipeline, BankRecord, bank_task_graph},
    config::PipelineConfig,
    etl::{DagRunner, Edge, Extractor, RunReport, TaskState},
};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Trigger one run of the bank pipeline against the configured source
pub async fn run_pipeline(config: PipelineConfig) -> Result<RunReport> {
    let pipeline = BankPipeline::from_config(config)?;
    log::info!("Source: {}", pipeline.config().url.bright_black());
    run_bank_pipeline(pipeline).await
}

/// Trigger one run of the bank pipeline with a given extractor
pub async fn run_with_extractor<E>(config: PipelineConfig, extractor: E) -> Result<RunReport>
where
    E: Extractor<Item = BankRecord> + 'static,
{
    run_bank_pipeline(BankPipeline::new(config, extractor)).await
}

async fn run_bank_pipeline<E>(pipeline: BankPipeline<E>) -> Result<RunReport>
where
    E: Extractor<Item = BankRecord> + 'static,
{
    let config = pipeline.config();
    let runner = DagRunner::try_new(bank_task_graph(), config.retry_policy())?;

    log::info!(
        "Running {} ({} task(s), {} retr{} per task)",
        config.dag_id.cyan(),
        runner.graph().nodes.len(),
        config.retries,
        if config.retries == 1 { "y" } else { "ies" }
    );
    if !config.is_manual() {
        log::debug!(
            "Schedule {:?} is ignored for a manual run",
            config.schedule.as_deref().unwrap_or_default()
        );
    }

    let report = runner.run(Arc::new(pipeline)).await?;
    log_report(&report);
    Ok(report)
}

/// Log the final state of every task
pub fn log_report(report: &RunReport) {
    for outcome in &report.outcomes {
        match &outcome.state {
            TaskState::Success { .. } => {
                log::info!("✓ {}: {}", outcome.task_id.cyan(), outcome.state)
            }
            TaskState::Failed { .. } => {
                log::error!("✗ {}: {}", outcome.task_id.cyan(), outcome.state)
            }
            TaskState::UpstreamFailed => {
                log::warn!("- {}: {}", outcome.task_id.cyan(), outcome.state)
            }
        }
    }

    let failed = report.failed().count();
    if failed == 0 {
        log::info!("✓ Pipeline run succeeded");
    } else {
        log::error!("Pipeline run failed: {} task(s) failed", failed);
    }
}

/// Task graph as printed by the `graph` command
#[derive(Debug, Serialize)]
pub struct GraphView {
    pub dag_id: String,
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
    pub stages: Vec<Vec<String>>,
}

impl GraphView {
    pub fn new(dag_id: impl Into<String>) -> Result<Self> {
        let graph = bank_task_graph();
        let stages = graph.stages()?;
        Ok(Self {
            dag_id: dag_id.into(),
            nodes: graph.nodes,
            edges: graph.edges,
            stages,
        })
    }
}

/// Render the bank task graph as YAML, or pretty JSON
pub fn render_graph(config: &PipelineConfig, json: bool) -> Result<String> {
    let view = GraphView::new(&config.dag_id)?;
    if json {
        serde_json::to_string_pretty(&view).with_context(|| "Failed to serialize graph to JSON")
    } else {
        serde_yaml::to_string(&view).with_context(|| "Failed to serialize graph to YAML")
    }
}

/// Render the effective configuration as YAML
pub fn render_config(config: &PipelineConfig) -> Result<String> {
    serde_yaml::to_string(config).with_context(|| "Failed to serialize configuration to YAML")
}

/// Save the effective configuration as a YAML file
pub fn write_config(config: &PipelineConfig, path: impl AsRef<Path>) -> Result<()> {
    config.write(path.as_ref())?;
    log::info!(
        "✓ Wrote configuration to {}",
        path.as_ref().display().bright_black()
    );
    Ok(())
}
