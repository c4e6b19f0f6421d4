//! Fan-out / join demo: a JSON-defined workflow where two parallel branches
//! are gated by capabilities, one agent outranks another for the same work,
//! and one branch recovers through a retry.
//!
//! Run with `cargo run --example fan_out_join`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use serde_json::json;

use conductor::handler::{EchoHandler, FlakyHandler, FnHandler, HandlerRegistry};
use conductor::scheduler::ExecutionStatus;
use conductor::utils::LoggingConfig;
use conductor::workflow::definition_from_str;
use conductor::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::init();

    println!("Fan-out / join demo");
    println!("{}", "=".repeat(60));

    let definition = definition_from_str(
        r#"
        {
          "id": "media_pipeline",
          "description": "Prepare an upload, process it in parallel, then assemble a report",
          "agents": [
            { "agent_id": "prep", "role": "coordinator", "capabilities": ["staging"] },
            { "agent_id": "gpu_worker", "role": "executor", "capabilities": ["imaging"], "priority": 10 },
            { "agent_id": "cpu_worker", "role": "executor", "capabilities": ["imaging", "text"] }
          ],
          "tasks": [
            { "id": "prepare", "kind": "prepare", "required_capabilities": ["staging"] },
            { "id": "resize", "kind": "resize", "required_capabilities": ["imaging"] },
            { "id": "caption", "kind": "caption", "required_capabilities": ["text"], "max_retries": 2 },
            { "id": "assemble", "kind": "assemble" }
          ],
          "dependencies": [
            { "from": "prepare", "to": "resize" },
            { "from": "prepare", "to": "caption" },
            { "from": "resize", "to": "assemble" },
            { "from": "caption", "to": "assemble" }
          ]
        }
        "#,
    )?;

    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(EchoHandler::new("prepare")));
    handlers.register(Arc::new(FnHandler::new("resize", |invocation| {
        async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            let upload = invocation.input["upload"].as_str().unwrap_or("upload");
            Ok(json!({ "thumbnail": format!("{upload}-256.png") }))
        }
        .boxed()
    })));
    // The first caption attempt fails, so the report below shows a retry.
    handlers.register(Arc::new(FlakyHandler::new("caption", 1)));
    handlers.register(Arc::new(EchoHandler::new("assemble")));

    let orchestrator = Orchestrator::new(handlers).with_max_parallel(4);
    for role in &definition.agents {
        orchestrator.register_agent(role.agent_id.clone(), role.capabilities.clone())?;
    }
    orchestrator.register_workflow(definition)?;

    let execution_id = orchestrator
        .execute_workflow("media_pipeline", json!({ "upload": "upload-42" }))
        .await?;

    let mut execution = orchestrator.execution_status(&execution_id)?;
    while execution.status == ExecutionStatus::Running {
        tokio::time::sleep(Duration::from_millis(50)).await;
        execution = orchestrator.execution_status(&execution_id)?;
    }

    println!(
        "Execution {} finished: {}",
        execution.execution_id, execution.status
    );
    for task_id in ["prepare", "resize", "caption", "assemble"] {
        if let Some(state) = execution.task(task_id) {
            println!(
                "  {:<10} {:<10} agent={:<12} retries={}",
                task_id,
                state.status.as_str(),
                state.assigned_agent.as_deref().unwrap_or("-"),
                state.retry_count
            );
        }
    }

    Ok(())
}
