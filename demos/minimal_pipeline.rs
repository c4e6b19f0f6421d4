//! Smallest useful pipeline: three chained tasks, one agent, closure handlers.
//!
//! Run with `cargo run --example minimal_pipeline`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use serde_json::{json, Value};

use conductor::agent::{AgentRole, AgentRoleKind};
use conductor::handler::{FnHandler, HandlerRegistry};
use conductor::scheduler::ExecutionStatus;
use conductor::utils::LoggingConfig;
use conductor::workflow::{WorkflowBuilder, WorkflowTask};
use conductor::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::init();

    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(FnHandler::new("ingest", |invocation| {
        async move {
            let source = invocation.input["source"].as_str().unwrap_or("stdin");
            Ok(json!({ "source": source, "records": 128 }))
        }
        .boxed()
    })));
    handlers.register(Arc::new(FnHandler::new("transform", |_invocation| {
        async move { Ok(json!({ "records": 125, "dropped": 3 })) }.boxed()
    })));
    handlers.register(Arc::new(FnHandler::new("publish", |invocation| {
        async move {
            Ok(json!({
                "destination": invocation.input["destination"],
                "published": true
            }))
        }
        .boxed()
    })));

    let orchestrator = Orchestrator::new(handlers);
    orchestrator.register_agent("local", ["pipeline"])?;

    let mut builder = WorkflowBuilder::new("minimal_pipeline");
    builder
        .with_name("Minimal Pipeline")
        .with_description("Ingest, transform and publish a batch of records")
        .add_agent(AgentRole::new("local", AgentRoleKind::Executor).with_capability("pipeline"))
        .add_task(WorkflowTask::new("ingest", "ingest").require_capability("pipeline"))
        .add_task(WorkflowTask::new("transform", "transform").require_capability("pipeline"))
        .add_task(
            WorkflowTask::new("publish", "publish")
                .require_capability("pipeline")
                .with_input(json!({ "destination": "s3://demo-bucket/batches" })),
        )
        .add_dependency("ingest", "transform")
        .add_dependency("transform", "publish");
    orchestrator.register_workflow(builder.build())?;

    let execution_id = orchestrator
        .execute_workflow("minimal_pipeline", json!({ "source": "demo.csv" }))
        .await?;
    println!("Started execution {execution_id}");

    let mut execution = orchestrator.execution_status(&execution_id)?;
    while execution.status == ExecutionStatus::Running {
        tokio::time::sleep(Duration::from_millis(50)).await;
        execution = orchestrator.execution_status(&execution_id)?;
    }

    println!("Execution finished: {}", execution.status);
    for task_id in ["ingest", "transform", "publish"] {
        if let Some(state) = execution.task(task_id) {
            let output = state
                .output
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<10} {:<10} {}", task_id, state.status.as_str(), output);
        }
    }

    Ok(())
}
