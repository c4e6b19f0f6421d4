use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

use conductor::{
    AgentRole, AgentRoleKind, ConductorError, EchoHandler, Execution, HandlerRegistry,
    Orchestrator, WorkflowBuilder, WorkflowTask,
};

fn echo_orchestrator() -> Orchestrator {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(EchoHandler::new("echo")));
    let orchestrator = Orchestrator::new(handlers);
    orchestrator.register_agent("runner", Vec::<String>::new()).unwrap();
    orchestrator
}

fn echo_workflow(id: &str) -> conductor::WorkflowDefinition {
    let mut builder = WorkflowBuilder::new(id);
    builder
        .add_agent(AgentRole::new("runner", AgentRoleKind::Executor))
        .add_task(WorkflowTask::new("only", "echo").with_input(json!({"payload": id})));
    builder.build()
}

async fn wait_terminal(orchestrator: &Orchestrator, execution_id: &str) -> Execution {
    for _ in 0..400 {
        let snapshot = orchestrator.execution_status(execution_id).unwrap();
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("execution `{execution_id}` did not settle in time");
}

#[tokio::test]
async fn executing_an_unknown_workflow_fails() {
    let orchestrator = echo_orchestrator();
    let err = orchestrator
        .execute_workflow("phantom", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ConductorError::WorkflowNotFound(ref id) if id == "phantom"));
}

#[tokio::test]
async fn unknown_execution_ids_are_reported() {
    let orchestrator = echo_orchestrator();
    assert!(matches!(
        orchestrator.execution_status("exec-nope"),
        Err(ConductorError::ExecutionNotFound(_))
    ));
    assert!(matches!(
        orchestrator.cancel_execution("exec-nope"),
        Err(ConductorError::ExecutionNotFound(_))
    ));
}

#[tokio::test]
async fn malformed_ids_are_rejected_at_the_boundary() {
    let orchestrator = echo_orchestrator();
    assert!(matches!(
        orchestrator.execute_workflow("not a workflow id", json!({})).await,
        Err(ConductorError::InvalidInput(_))
    ));
    assert!(matches!(
        orchestrator.register_agent("spaces here", vec!["x"]),
        Err(ConductorError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn completed_execution_serializes_with_outputs() -> anyhow::Result<()> {
    let orchestrator = echo_orchestrator();
    orchestrator.register_workflow(echo_workflow("round_trip"))?;

    let execution_id = orchestrator
        .execute_workflow("round_trip", json!({}))
        .await?;
    let execution = wait_terminal(&orchestrator, &execution_id).await;

    let value = serde_json::to_value(&execution)?;
    assert_eq!(value["status"], json!("completed"));
    assert_eq!(value["workflow_id"], json!("round_trip"));
    assert_eq!(
        value["tasks"]["only"]["output"],
        json!({"payload": "round_trip"})
    );
    assert_eq!(value["tasks"]["only"]["status"], json!("completed"));
    Ok(())
}

#[tokio::test]
async fn retention_prunes_the_oldest_finished_executions() -> anyhow::Result<()> {
    let mut handlers = HandlerRegistry::new();
    handlers.register(Arc::new(EchoHandler::new("echo")));
    let orchestrator = Orchestrator::new(handlers).with_retention(1);
    orchestrator.register_agent("runner", Vec::<String>::new())?;
    orchestrator.register_workflow(echo_workflow("short"))?;

    let first = orchestrator.execute_workflow("short", json!({})).await?;
    wait_terminal(&orchestrator, &first).await;
    let second = orchestrator.execute_workflow("short", json!({})).await?;
    wait_terminal(&orchestrator, &second).await;
    let third = orchestrator.execute_workflow("short", json!({})).await?;
    wait_terminal(&orchestrator, &third).await;

    // Pruning happens when a new execution is inserted, so starting the
    // third evicted the first; the second and third are still visible.
    assert!(matches!(
        orchestrator.execution_status(&first),
        Err(ConductorError::ExecutionNotFound(_))
    ));
    assert!(orchestrator.execution_status(&second).is_ok());
    assert!(orchestrator.execution_status(&third).is_ok());
    Ok(())
}

#[tokio::test]
async fn cancelling_a_finished_execution_returns_false() -> anyhow::Result<()> {
    let orchestrator = echo_orchestrator();
    orchestrator.register_workflow(echo_workflow("quick"))?;

    let execution_id = orchestrator.execute_workflow("quick", json!({})).await?;
    wait_terminal(&orchestrator, &execution_id).await;

    assert!(!orchestrator.cancel_execution(&execution_id)?);
    Ok(())
}

#[tokio::test]
async fn reregistering_a_workflow_replaces_it() -> anyhow::Result<()> {
    let orchestrator = echo_orchestrator();
    orchestrator.register_workflow(echo_workflow("evolving"))?;

    let mut v2 = WorkflowBuilder::new("evolving");
    v2.add_agent(AgentRole::new("runner", AgentRoleKind::Executor))
        .add_task(WorkflowTask::new("first", "echo"))
        .add_task(WorkflowTask::new("second", "echo"))
        .add_dependency("first", "second");
    orchestrator.register_workflow(v2.build())?;

    let execution_id = orchestrator.execute_workflow("evolving", json!({})).await?;
    let execution = wait_terminal(&orchestrator, &execution_id).await;

    assert_eq!(execution.tasks.len(), 2);
    Ok(())
}
