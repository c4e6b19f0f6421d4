use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use conductor::agent::{AgentRole, AgentRoleKind};
use conductor::handler::{EchoHandler, HandlerRegistry};
use conductor::scheduler::{Execution, TaskState};
use conductor::utils::LoggingConfig;
use conductor::workflow::{definition_from_path, DependencyGraph, WorkflowDefinition};
use conductor::Orchestrator;

#[derive(Parser)]
#[command(name = "conductor", version, about = "Workflow orchestrator CLI", author)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a workflow file: identifiers, dependency endpoints, cycles.
    Validate {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run a workflow file locally with echo handlers for every task kind.
    Run {
        #[arg(long)]
        file: PathBuf,
        /// Execution parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { file } => handle_validate(file)?,
        Command::Run { file, params } => handle_run(file, params).await?,
    }
    Ok(())
}

fn handle_validate(file: PathBuf) -> anyhow::Result<()> {
    let definition = definition_from_path(&file)?;
    let graph = DependencyGraph::build(&definition)?;
    println!("Workflow `{}` is valid", definition.id);
    println!(
        "  tasks: {}, dependencies: {}, agents: {}",
        definition.tasks.len(),
        definition.dependencies.len(),
        definition.agents.len()
    );
    if !graph.is_empty() {
        println!("  order: {}", graph.topological_order().join(" -> "));
    }
    Ok(())
}

async fn handle_run(file: PathBuf, params: Option<String>) -> anyhow::Result<()> {
    let mut definition = definition_from_path(&file)?;
    let parameters: Value = match params {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::json!({}),
    };

    if definition.agents.is_empty() {
        let required: HashSet<String> = definition
            .tasks
            .iter()
            .flat_map(|task| task.required_capabilities.iter().cloned())
            .collect();
        definition
            .agents
            .push(AgentRole::new("local", AgentRoleKind::Executor).with_capabilities(required));
        println!("No agents declared; running everything on a local executor");
    }

    let orchestrator = build_orchestrator(&definition)?;
    let workflow_id = definition.id.clone();
    orchestrator.register_workflow(definition)?;

    let execution_id = orchestrator
        .execute_workflow(&workflow_id, parameters)
        .await?;
    println!("Execution `{execution_id}` started");

    let execution = loop {
        let snapshot = orchestrator.execution_status(&execution_id)?;
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    };

    println!("Execution finished: {}", execution.status.as_str());
    render_task_table(&execution);
    Ok(())
}

/// Echo handlers stand in for real work, one per distinct task kind, and
/// every declared role is registered with exactly its declared capabilities.
fn build_orchestrator(definition: &WorkflowDefinition) -> anyhow::Result<Orchestrator> {
    let mut handlers = HandlerRegistry::new();
    let mut kinds: Vec<&str> = definition
        .tasks
        .iter()
        .map(|task| task.kind.as_str())
        .collect();
    kinds.sort_unstable();
    kinds.dedup();
    for kind in kinds {
        // Handler kinds are &'static str; CLI kinds live for the whole run.
        handlers.register(Arc::new(EchoHandler::new(Box::leak(
            kind.to_string().into_boxed_str(),
        ))));
    }

    let orchestrator = Orchestrator::new(handlers);
    for role in &definition.agents {
        orchestrator.register_agent(role.agent_id.clone(), role.capabilities.iter().cloned())?;
    }
    Ok(orchestrator)
}

fn render_task_table(execution: &Execution) {
    println!(
        "{:<24} {:<10} {:<8} {}",
        "Task", "Status", "Retries", "Agent"
    );
    let mut states: Vec<&TaskState> = execution.tasks.values().collect();
    states.sort_by(|a, b| a.task.id.cmp(&b.task.id));
    for state in states {
        println!(
            "{:<24} {:<10} {:<8} {}",
            state.task.id,
            state.status.as_str(),
            state.retry_count,
            state.assigned_agent.as_deref().unwrap_or("-")
        );
    }
}
