//! DAG executor.
//!
//! The executor walks a build-validated [`ExecutionGraph`] from its root
//! nodes. For each node it:
//!
//! 1. Returns the memoized entry if the node already ran; a node with
//!    several downstream consumers executes at most once per run
//! 2. Recurses into every predecessor first, then aggregates their
//!    values into an input context keyed by target handle; a node with
//!    no usable upstream data receives the run's initial input
//! 3. Dispatches to the handler registered for the node's type tag,
//!    under the concurrency limiter and the per-handler timeout
//! 4. Records the value, or a failure marker on error, and continues
//!    into the node's successors, so one broken branch never blocks
//!    unrelated branches of the same run
//!
//! Between sibling subtrees no ordering is guaranteed, only
//! predecessor-before-successor.

use crate::error::HandlerError;
use crate::execution::{NodeOutcome, ResultsMap};
use crate::graph::ExecutionGraph;
use crate::handler::HandlerRegistry;
use crate::node::NodeId;
use futures::future::BoxFuture;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Tuning for handler dispatch.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Cap on handler invocations in flight across all runs sharing this
    /// executor.
    pub max_concurrent_handlers: usize,
    /// Time budget per handler invocation; `None` disables the limit.
    pub handler_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_handlers: 8,
            handler_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Executes workflow graphs against a handler registry.
pub struct DagExecutor {
    registry: Arc<HandlerRegistry>,
    limiter: Arc<Semaphore>,
    handler_timeout: Option<Duration>,
}

impl DagExecutor {
    /// Creates an executor with default configuration.
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    /// Creates an executor with explicit configuration.
    #[must_use]
    pub fn with_config(registry: Arc<HandlerRegistry>, config: ExecutorConfig) -> Self {
        Self {
            registry,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_handlers)),
            handler_timeout: config.handler_timeout,
        }
    }

    /// Runs the graph to completion and returns the results map.
    ///
    /// Node-level failures are recorded inline; this method itself never
    /// fails.
    pub async fn execute(&self, graph: &ExecutionGraph, initial_input: &JsonValue) -> ResultsMap {
        let mut results = ResultsMap::new();
        for root in graph.roots() {
            self.visit(graph, root.id, initial_input, &mut results).await;
        }
        results
    }

    fn visit<'a>(
        &'a self,
        graph: &'a ExecutionGraph,
        node_id: NodeId,
        initial_input: &'a JsonValue,
        results: &'a mut ResultsMap,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if results.contains(node_id) {
                return;
            }

            // Every declared predecessor completes (success or failure)
            // before this node's handler is invoked.
            let incoming = graph.incoming(node_id);
            for (source, _) in &incoming {
                if !results.contains(source.id) {
                    self.visit(graph, source.id, initial_input, results).await;
                }
            }

            let mut aggregated = Map::new();
            for (source, connection) in &incoming {
                if let Some(outcome) = results.get(source.id) {
                    let value = outcome.as_input_value();
                    if !value.is_null() {
                        aggregated.insert(connection.target_handle.clone(), value);
                    }
                }
            }
            let context = if aggregated.is_empty() {
                initial_input.clone()
            } else {
                JsonValue::Object(aggregated)
            };

            let outcome = self.dispatch(graph, node_id, &context).await;
            results.insert(node_id, outcome);

            for (target, _) in graph.outgoing(node_id) {
                self.visit(graph, target.id, initial_input, results).await;
            }
        })
    }

    async fn dispatch(
        &self,
        graph: &ExecutionGraph,
        node_id: NodeId,
        context: &JsonValue,
    ) -> NodeOutcome {
        let Some(node) = graph.node(node_id) else {
            return NodeOutcome::Failure {
                error: format!("node not in graph: {node_id}"),
            };
        };

        let Some(handler) = self.registry.get(&node.node_type) else {
            let error = HandlerError::UnknownNodeType {
                node_type: node.node_type.clone(),
            };
            tracing::warn!(node = %node_id, node_type = %node.node_type, "no handler registered");
            return NodeOutcome::Failure {
                error: error.to_string(),
            };
        };

        let _permit = self
            .limiter
            .acquire()
            .await
            .expect("handler limiter closed");

        let invocation = handler.handle(context, node);
        let result = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => Err(HandlerError::Timeout),
            },
            None => invocation.await,
        };

        match result {
            Ok(value) => {
                tracing::debug!(node = %node_id, node_type = %node.node_type, "node completed");
                NodeOutcome::Success { value }
            }
            Err(e) => {
                tracing::warn!(node = %node_id, node_type = %node.node_type, error = %e, "node failed");
                NodeOutcome::Failure {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::handler::NodeHandler;
    use crate::node::NodeRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records invocation order and echoes the context back.
    struct Probe {
        invocations: Arc<Mutex<Vec<NodeId>>>,
    }

    #[async_trait]
    impl NodeHandler for Probe {
        async fn handle(
            &self,
            context: &JsonValue,
            node: &NodeRecord,
        ) -> Result<JsonValue, HandlerError> {
            self.invocations.lock().unwrap().push(node.id);
            Ok(context.clone())
        }
    }

    struct Fixed(JsonValue);

    #[async_trait]
    impl NodeHandler for Fixed {
        async fn handle(
            &self,
            _context: &JsonValue,
            _node: &NodeRecord,
        ) -> Result<JsonValue, HandlerError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl NodeHandler for Failing {
        async fn handle(
            &self,
            _context: &JsonValue,
            _node: &NodeRecord,
        ) -> Result<JsonValue, HandlerError> {
            Err(HandlerError::Collaborator {
                service: "test".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    struct Counting {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NodeHandler for Counting {
        async fn handle(
            &self,
            _context: &JsonValue,
            _node: &NodeRecord,
        ) -> Result<JsonValue, HandlerError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(json!("counted"))
        }
    }

    struct Slow;

    #[async_trait]
    impl NodeHandler for Slow {
        async fn handle(
            &self,
            _context: &JsonValue,
            _node: &NodeRecord,
        ) -> Result<JsonValue, HandlerError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(JsonValue::Null)
        }
    }

    /// A probe handler plus the shared invocation log it writes to.
    fn probe() -> (Arc<dyn NodeHandler>, Arc<Mutex<Vec<NodeId>>>) {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(Probe {
            invocations: invocations.clone(),
        });
        (handler, invocations)
    }

    #[tokio::test]
    async fn linear_chain_runs_predecessors_first() {
        let (handler, invocations) = probe();
        let mut registry = HandlerRegistry::new();
        registry.register("probe", handler);
        let registry = Arc::new(registry);

        let a = NodeRecord::new("probe");
        let b = NodeRecord::new("probe");
        let c = NodeRecord::new("probe");
        let (id_a, id_b, id_c) = (a.id, b.id, c.id);

        let graph = ExecutionGraph::build(
            vec![a, b, c],
            vec![
                Connection::with_default_handles(id_a, id_b),
                Connection::with_default_handles(id_b, id_c),
            ],
        )
        .expect("build");

        let executor = DagExecutor::new(registry);
        let results = executor.execute(&graph, &json!({"seed": 1})).await;

        assert_eq!(results.len(), 3);
        assert_eq!(*invocations.lock().unwrap(), vec![id_a, id_b, id_c]);
    }

    #[tokio::test]
    async fn shared_ancestor_executes_exactly_once() {
        // a -> b -> d, a -> c -> d: a and d both have two consumers/producers.
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(
            "count",
            Arc::new(Counting {
                count: count.clone(),
            }),
        );

        let a = NodeRecord::new("count");
        let b = NodeRecord::new("count");
        let c = NodeRecord::new("count");
        let d = NodeRecord::new("count");
        let (id_a, id_b, id_c, id_d) = (a.id, b.id, c.id, d.id);

        let graph = ExecutionGraph::build(
            vec![a, b, c, d],
            vec![
                Connection::new(id_a, "default", id_b, "in"),
                Connection::new(id_a, "default", id_c, "in"),
                Connection::new(id_b, "default", id_d, "left"),
                Connection::new(id_c, "default", id_d, "right"),
            ],
        )
        .expect("build");

        let executor = DagExecutor::new(Arc::new(registry));
        let results = executor.execute(&graph, &json!({})).await;

        // Four nodes, four invocations: no node ran twice.
        assert_eq!(results.len(), 4);
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failure_does_not_block_unrelated_branch() {
        let (handler, _) = probe();
        let mut registry = HandlerRegistry::new();
        registry.register("boom", Arc::new(Failing));
        registry.register("ok", Arc::new(Fixed(json!("fine"))));
        registry.register("probe", handler);

        let root = NodeRecord::new("probe");
        let failing = NodeRecord::new("boom");
        let sibling = NodeRecord::new("ok");
        let downstream = NodeRecord::new("ok");
        let (id_root, id_fail, id_ok, id_down) = (root.id, failing.id, sibling.id, downstream.id);

        let graph = ExecutionGraph::build(
            vec![root, failing, sibling, downstream],
            vec![
                Connection::with_default_handles(id_root, id_fail),
                Connection::with_default_handles(id_root, id_ok),
                Connection::with_default_handles(id_fail, id_down),
            ],
        )
        .expect("build");

        let executor = DagExecutor::new(Arc::new(registry));
        let results = executor.execute(&graph, &json!({"seed": 1})).await;

        assert_eq!(results.len(), 4);
        assert!(results.get(id_fail).unwrap().is_failure());
        // The sibling branch still ran.
        assert_eq!(
            results.get(id_ok).unwrap(),
            &NodeOutcome::Success {
                value: json!("fine")
            }
        );
        // The downstream node ran too, with the marker in its context.
        assert!(!results.get(id_down).unwrap().is_failure());
    }

    #[tokio::test]
    async fn downstream_of_failure_receives_marker_in_context() {
        let (handler, _) = probe();
        let mut registry = HandlerRegistry::new();
        registry.register("boom", Arc::new(Failing));
        registry.register("probe", handler);

        let failing = NodeRecord::new("boom");
        let downstream = NodeRecord::new("probe");
        let (id_fail, id_down) = (failing.id, downstream.id);

        let graph = ExecutionGraph::build(
            vec![failing, downstream],
            vec![Connection::new(id_fail, "default", id_down, "upstream")],
        )
        .expect("build");

        let executor = DagExecutor::new(Arc::new(registry));
        let results = executor.execute(&graph, &json!({})).await;

        // Probe echoes its context: the failure marker arrived inline.
        match results.get(id_down).unwrap() {
            NodeOutcome::Success { value } => {
                assert!(
                    value["upstream"]["error"]
                        .as_str()
                        .unwrap()
                        .contains("boom")
                );
            }
            NodeOutcome::Failure { error } => panic!("downstream failed: {error}"),
        }
    }

    #[tokio::test]
    async fn root_receives_initial_input() {
        let (handler, _) = probe();
        let mut registry = HandlerRegistry::new();
        registry.register("probe", handler);

        let root = NodeRecord::new("probe");
        let id_root = root.id;
        let graph = ExecutionGraph::build(vec![root], vec![]).expect("build");

        let executor = DagExecutor::new(Arc::new(registry));
        let initial = json!({"text": "hi"});
        let results = executor.execute(&graph, &initial).await;

        assert_eq!(
            results.get(id_root).unwrap(),
            &NodeOutcome::Success {
                value: initial.clone()
            }
        );
    }

    #[tokio::test]
    async fn input_context_is_keyed_by_target_handle() {
        let (handler, _) = probe();
        let mut registry = HandlerRegistry::new();
        registry.register("left_src", Arc::new(Fixed(json!("L"))));
        registry.register("right_src", Arc::new(Fixed(json!("R"))));
        registry.register("probe", handler);

        let left = NodeRecord::new("left_src");
        let right = NodeRecord::new("right_src");
        let join = NodeRecord::new("probe");
        let (id_left, id_right, id_join) = (left.id, right.id, join.id);

        let graph = ExecutionGraph::build(
            vec![left, right, join],
            vec![
                Connection::new(id_left, "default", id_join, "left"),
                Connection::new(id_right, "default", id_join, "right"),
            ],
        )
        .expect("build");

        let executor = DagExecutor::new(Arc::new(registry));
        let results = executor.execute(&graph, &json!({})).await;

        assert_eq!(
            results.get(id_join).unwrap(),
            &NodeOutcome::Success {
                value: json!({"left": "L", "right": "R"})
            }
        );
    }

    #[tokio::test]
    async fn null_upstream_falls_back_to_initial_input() {
        let (handler, _) = probe();
        let mut registry = HandlerRegistry::new();
        registry.register("null_src", Arc::new(Fixed(JsonValue::Null)));
        registry.register("probe", handler);

        let source = NodeRecord::new("null_src");
        let sink = NodeRecord::new("probe");
        let (id_source, id_sink) = (source.id, sink.id);

        let graph = ExecutionGraph::build(
            vec![source, sink],
            vec![Connection::with_default_handles(id_source, id_sink)],
        )
        .expect("build");

        let executor = DagExecutor::new(Arc::new(registry));
        let initial = json!({"seed": 9});
        let results = executor.execute(&graph, &initial).await;

        // A null upstream value carries no data, so the sink sees the
        // run's initial input instead.
        assert_eq!(
            results.get(id_sink).unwrap(),
            &NodeOutcome::Success { value: initial }
        );
    }

    #[tokio::test]
    async fn unknown_node_type_is_recorded_and_traversal_continues() {
        let (handler, _) = probe();
        let mut registry = HandlerRegistry::new();
        registry.register("probe", handler);

        let unknown = NodeRecord::new("webhook");
        let downstream = NodeRecord::new("probe");
        let (id_unknown, id_down) = (unknown.id, downstream.id);

        let graph = ExecutionGraph::build(
            vec![unknown, downstream],
            vec![Connection::with_default_handles(id_unknown, id_down)],
        )
        .expect("build");

        let executor = DagExecutor::new(Arc::new(registry));
        let results = executor.execute(&graph, &json!({})).await;

        match results.get(id_unknown).unwrap() {
            NodeOutcome::Failure { error } => {
                assert!(error.contains("unknown node type: webhook"));
            }
            NodeOutcome::Success { .. } => panic!("expected failure marker"),
        }
        assert!(results.contains(id_down));
    }

    #[tokio::test]
    async fn handler_timeout_becomes_failure_marker() {
        let mut registry = HandlerRegistry::new();
        registry.register("slow", Arc::new(Slow));

        let node = NodeRecord::new("slow");
        let node_id = node.id;
        let graph = ExecutionGraph::build(vec![node], vec![]).expect("build");

        let executor = DagExecutor::with_config(
            Arc::new(registry),
            ExecutorConfig {
                max_concurrent_handlers: 1,
                handler_timeout: Some(Duration::from_millis(50)),
            },
        );
        let results = executor.execute(&graph, &json!({})).await;

        match results.get(node_id).unwrap() {
            NodeOutcome::Failure { error } => assert!(error.contains("timed out")),
            NodeOutcome::Success { .. } => panic!("expected timeout failure"),
        }
    }
}
