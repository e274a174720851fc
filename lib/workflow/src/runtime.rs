//! Workflow runtime facade.
//!
//! One entry point ties the collaborators together: load the workflow's
//! records, create the execution row, build the graph, run the executor,
//! and finalize the execution with the results snapshot.
//!
//! Failure policy: a graph that fails validation marks the execution
//! failed before any node runs; any node-level failure marker marks the
//! whole run failed, but the output still carries the complete results
//! map so unrelated branches keep their values.

use crate::definition::WorkflowDefinition;
use crate::error::RuntimeError;
use crate::execution::{Execution, TriggerSource};
use crate::executor::DagExecutor;
use crate::graph::ExecutionGraph;
use crate::store::{StoreError, WorkflowStore};
use crate::tracker::{ExecutionTracker, RunOutcome};
use loomflow_core::WorkflowId;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Admission control for concurrent runs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Cap on executions in flight; excess runs are rejected, not queued.
    pub max_concurrent_executions: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 32,
        }
    }
}

/// Runs workflows end to end.
pub struct WorkflowRuntime {
    workflows: Arc<dyn WorkflowStore>,
    tracker: ExecutionTracker,
    executor: DagExecutor,
    admission: Arc<Semaphore>,
}

impl WorkflowRuntime {
    /// Creates a runtime with default admission control.
    #[must_use]
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        tracker: ExecutionTracker,
        executor: DagExecutor,
    ) -> Self {
        Self::with_config(workflows, tracker, executor, RuntimeConfig::default())
    }

    /// Creates a runtime with explicit admission control.
    #[must_use]
    pub fn with_config(
        workflows: Arc<dyn WorkflowStore>,
        tracker: ExecutionTracker,
        executor: DagExecutor,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            workflows,
            tracker,
            executor,
            admission: Arc::new(Semaphore::new(config.max_concurrent_executions)),
        }
    }

    /// Runs one execution of the workflow to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime is saturated, the workflow is
    /// missing or disabled, its records cannot be loaded, the graph
    /// fails validation (the execution is still recorded as failed), or
    /// the execution lifecycle cannot be persisted.
    pub async fn run(
        &self,
        workflow_id: WorkflowId,
        trigger: TriggerSource,
        input: JsonValue,
    ) -> Result<Execution, RuntimeError> {
        let _permit = self
            .admission
            .clone()
            .try_acquire_owned()
            .map_err(|_| RuntimeError::Saturated)?;

        let workflow = self
            .workflows
            .load_workflow(workflow_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => RuntimeError::WorkflowNotFound { workflow_id },
                other => RuntimeError::Store(other),
            })?;
        if !workflow.enabled {
            return Err(RuntimeError::WorkflowDisabled { workflow_id });
        }

        let nodes = self.workflows.load_nodes(workflow_id).await?;
        let connections = self.workflows.load_connections(workflow_id).await?;

        let execution = self
            .tracker
            .start(workflow_id, trigger, input.clone())
            .await?;
        tracing::info!(workflow = %workflow_id, execution = %execution.id, "execution started");

        // A graph that fails validation aborts before any node runs.
        let graph = match ExecutionGraph::build(nodes, connections) {
            Ok(graph) => graph,
            Err(e) => {
                self.tracker
                    .finish(
                        execution.id,
                        RunOutcome::Failed {
                            error: e.to_string(),
                            output: None,
                        },
                    )
                    .await?;
                return Err(RuntimeError::Graph(e));
            }
        };

        let initial = seed_input(&workflow, input);
        let results = self.executor.execute(&graph, &initial).await;

        let output = results.to_value();
        let outcome = if results.has_failures() {
            let failed: Vec<String> = results
                .failed_nodes()
                .iter()
                .map(ToString::to_string)
                .collect();
            RunOutcome::Failed {
                error: format!("node failures: {}", failed.join(", ")),
                output: Some(output),
            }
        } else {
            RunOutcome::Completed { output }
        };

        let finished = self.tracker.finish(execution.id, outcome).await?;
        tracing::info!(
            workflow = %workflow_id,
            execution = %finished.id,
            status = ?finished.status,
            "execution finished"
        );
        Ok(finished)
    }
}

/// Merges the workflow's variable bag into an object input under `vars`.
fn seed_input(workflow: &WorkflowDefinition, input: JsonValue) -> JsonValue {
    if !workflow.has_variables() {
        return input;
    }
    match input {
        JsonValue::Object(mut map) => {
            map.insert("vars".to_string(), workflow.variables.clone());
            JsonValue::Object(map)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::event::InMemoryEventSink;
    use crate::execution::ExecutionStatus;
    use crate::handlers::builtin_registry;
    use crate::node::{NodeId, NodeRecord};
    use crate::store::{InMemoryExecutionStore, InMemoryWorkflowStore};
    use loomflow_ai::EchoProvider;
    use loomflow_integration::{HttpResponse, MockDispatcher, MockEmailConnector};
    use loomflow_core::UserId;
    use serde_json::json;

    struct Fixture {
        runtime: WorkflowRuntime,
        workflows: Arc<InMemoryWorkflowStore>,
        executions: Arc<InMemoryExecutionStore>,
        sink: Arc<InMemoryEventSink>,
    }

    fn fixture_with_config(config: RuntimeConfig) -> Fixture {
        let workflows = Arc::new(InMemoryWorkflowStore::new());
        let executions = Arc::new(InMemoryExecutionStore::new());
        let sink = Arc::new(InMemoryEventSink::new());

        let registry = builtin_registry(
            Arc::new(EchoProvider),
            Arc::new(MockEmailConnector::new()),
            Arc::new(MockDispatcher::responding(HttpResponse {
                status: 200,
                headers: Default::default(),
                body: json!({}),
            })),
        );

        let tracker = ExecutionTracker::new(executions.clone(), sink.clone());
        let executor = DagExecutor::new(Arc::new(registry));
        let runtime = WorkflowRuntime::with_config(workflows.clone(), tracker, executor, config);

        Fixture {
            runtime,
            workflows,
            executions,
            sink,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_config(RuntimeConfig::default())
    }

    fn manual() -> TriggerSource {
        TriggerSource::Manual { user: UserId::new() }
    }

    fn node_value(output: &JsonValue, node_id: NodeId) -> &JsonValue {
        &output[node_id.as_ulid().to_string()]["value"]
    }

    #[tokio::test]
    async fn input_llm_output_chain_resolves_prompt() {
        let fixture = fixture();

        let definition = WorkflowDefinition::new(UserId::new(), "Scenario A");
        let workflow_id = definition.id;

        let input = NodeRecord::new("input");
        let llm = NodeRecord::new("llm").with_config(json!({"prompt": "{{text}}"}));
        let output = NodeRecord::new("output");
        let (id_input, id_llm, id_output) = (input.id, llm.id, output.id);

        fixture.workflows.insert(
            definition,
            vec![input, llm, output],
            vec![
                Connection::with_default_handles(id_input, id_llm),
                Connection::with_default_handles(id_llm, id_output),
            ],
        );

        let execution = fixture
            .runtime
            .run(workflow_id, manual(), json!({"text": "hi"}))
            .await
            .expect("run");

        assert_eq!(execution.status, ExecutionStatus::Completed);
        let results = execution.output.expect("output");
        // The echo provider returns the resolved prompt.
        assert_eq!(node_value(&results, id_llm)["text"], "hi");
        assert!(results.get(id_output.as_ulid().to_string()).is_some());
    }

    #[tokio::test]
    async fn condition_branches_and_both_outputs_run() {
        let fixture = fixture();

        let definition = WorkflowDefinition::new(UserId::new(), "Scenario B");
        let workflow_id = definition.id;

        let input = NodeRecord::new("input");
        let condition =
            NodeRecord::new("condition").with_config(json!({"condition": "{{score}} == 10"}));
        let out_true = NodeRecord::new("output");
        let out_false = NodeRecord::new("output");
        let (id_input, id_cond, id_true, id_false) =
            (input.id, condition.id, out_true.id, out_false.id);

        fixture.workflows.insert(
            definition,
            vec![input, condition, out_true, out_false],
            vec![
                Connection::with_default_handles(id_input, id_cond),
                Connection::new(id_cond, "true", id_true, "default"),
                Connection::new(id_cond, "false", id_false, "default"),
            ],
        );

        let execution = fixture
            .runtime
            .run(workflow_id, manual(), json!({"score": 10}))
            .await
            .expect("run");

        assert_eq!(execution.status, ExecutionStatus::Completed);
        let results = execution.output.expect("output");

        let condition_value = node_value(&results, id_cond);
        assert_eq!(condition_value["result"], true);
        assert_eq!(condition_value["branch"], "true");

        // Both outputs execute per traversal; branch selection lives in
        // the condition's value.
        assert!(results.get(id_true.as_ulid().to_string()).is_some());
        assert!(results.get(id_false.as_ulid().to_string()).is_some());
    }

    #[tokio::test]
    async fn missing_workflow_is_reported() {
        let fixture = fixture();
        let workflow_id = WorkflowId::new();

        let result = fixture.runtime.run(workflow_id, manual(), json!({})).await;
        assert_eq!(
            result.unwrap_err(),
            RuntimeError::WorkflowNotFound { workflow_id }
        );
    }

    #[tokio::test]
    async fn disabled_workflow_is_rejected() {
        let fixture = fixture();

        let mut definition = WorkflowDefinition::new(UserId::new(), "Off");
        definition.disable();
        let workflow_id = definition.id;
        fixture.workflows.insert(definition, vec![], vec![]);

        let result = fixture.runtime.run(workflow_id, manual(), json!({})).await;
        assert_eq!(
            result.unwrap_err(),
            RuntimeError::WorkflowDisabled { workflow_id }
        );
    }

    #[tokio::test]
    async fn dangling_connection_fails_execution_before_any_node() {
        let fixture = fixture();

        let definition = WorkflowDefinition::new(UserId::new(), "Broken");
        let workflow_id = definition.id;
        let node = NodeRecord::new("input");
        let node_id = node.id;

        fixture.workflows.insert(
            definition,
            vec![node],
            vec![Connection::with_default_handles(node_id, NodeId::new())],
        );

        let result = fixture.runtime.run(workflow_id, manual(), json!({})).await;
        assert!(matches!(result, Err(RuntimeError::Graph(_))));

        // The execution row exists and is failed, with no output at all.
        let rows = fixture.executions.all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ExecutionStatus::Failed);
        assert!(rows[0].output.is_none());
        assert!(rows[0].error.as_deref().unwrap().contains("unknown node"));
    }

    #[tokio::test]
    async fn node_failure_marks_run_failed_with_partial_output() {
        let fixture = fixture();

        let definition = WorkflowDefinition::new(UserId::new(), "Partial");
        let workflow_id = definition.id;

        let input = NodeRecord::new("input");
        // No handler is registered for this tag.
        let broken = NodeRecord::new("webhook");
        let healthy = NodeRecord::new("output");
        let (id_input, id_broken, id_healthy) = (input.id, broken.id, healthy.id);

        fixture.workflows.insert(
            definition,
            vec![input, broken, healthy],
            vec![
                Connection::with_default_handles(id_input, id_broken),
                Connection::with_default_handles(id_input, id_healthy),
            ],
        );

        let execution = fixture
            .runtime
            .run(workflow_id, manual(), json!({"seed": 1}))
            .await
            .expect("run");

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error.as_deref().unwrap().contains("node failures"));

        // Partial output keeps the healthy branch's value.
        let results = execution.output.expect("output");
        assert_eq!(
            results[id_healthy.as_ulid().to_string()]["outcome"],
            "success"
        );
        assert_eq!(
            results[id_broken.as_ulid().to_string()]["outcome"],
            "failure"
        );
    }

    #[tokio::test]
    async fn workflow_variables_reach_node_context() {
        let fixture = fixture();

        let definition = WorkflowDefinition::new(UserId::new(), "Vars")
            .with_variables(json!({"region": "eu"}));
        let workflow_id = definition.id;

        let llm = NodeRecord::new("llm").with_config(json!({"prompt": "{{vars.region}}"}));
        let id_llm = llm.id;
        fixture.workflows.insert(definition, vec![llm], vec![]);

        let execution = fixture
            .runtime
            .run(workflow_id, manual(), json!({}))
            .await
            .expect("run");

        let results = execution.output.expect("output");
        assert_eq!(node_value(&results, id_llm)["text"], "eu");
    }

    #[tokio::test]
    async fn saturated_runtime_rejects_new_runs() {
        let fixture = fixture_with_config(RuntimeConfig {
            max_concurrent_executions: 0,
        });

        let definition = WorkflowDefinition::new(UserId::new(), "Full");
        let workflow_id = definition.id;
        fixture.workflows.insert(definition, vec![], vec![]);

        let result = fixture.runtime.run(workflow_id, manual(), json!({})).await;
        assert_eq!(result.unwrap_err(), RuntimeError::Saturated);
    }

    #[tokio::test]
    async fn run_emits_started_and_finished_events() {
        let fixture = fixture();

        let definition = WorkflowDefinition::new(UserId::new(), "Events");
        let workflow_id = definition.id;
        let node = NodeRecord::new("input");
        fixture.workflows.insert(definition, vec![node], vec![]);

        fixture
            .runtime
            .run(workflow_id, manual(), json!({}))
            .await
            .expect("run");

        let kinds: Vec<&str> = fixture.sink.events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["execution_started", "execution_finished"]);
    }
}
