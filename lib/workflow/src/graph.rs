//! Execution graph construction.
//!
//! The graph builder turns the flat node and connection lists persisted
//! for one workflow into an adjacency structure over petgraph:
//!
//! - Nodes are [`NodeRecord`]s; edges carry the [`Connection`] with its
//!   source/target handle names
//! - Root nodes are the nodes with no incoming edges, in record order
//! - Dangling connections, duplicate node IDs, and cycles are rejected at
//!   build time, before any handler runs
//!
//! The graph is derived per execution, owned by that execution's
//! traversal, and discarded when the run finishes.

use crate::connection::Connection;
use crate::error::GraphError;
use crate::node::{NodeId, NodeRecord};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// A workflow's derived execution graph.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    /// The underlying directed graph.
    graph: DiGraph<NodeRecord, Connection>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeId, NodeIndex>,
    /// Node IDs in record order, so root derivation is deterministic.
    record_order: Vec<NodeId>,
}

impl ExecutionGraph {
    /// Builds the graph for one workflow from its persisted records.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - two node records share an ID
    /// - a connection references a node absent from the node set
    /// - the connections form a cycle
    pub fn build(
        nodes: Vec<NodeRecord>,
        connections: Vec<Connection>,
    ) -> Result<Self, GraphError> {
        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();
        let mut record_order = Vec::with_capacity(nodes.len());

        for node in nodes {
            let node_id = node.id;
            if node_index_map.contains_key(&node_id) {
                return Err(GraphError::DuplicateNode { node_id });
            }
            let index = graph.add_node(node);
            node_index_map.insert(node_id, index);
            record_order.push(node_id);
        }

        for connection in connections {
            let source = *node_index_map
                .get(&connection.source)
                .ok_or(GraphError::DanglingConnection {
                    node_id: connection.source,
                })?;
            let target = *node_index_map
                .get(&connection.target)
                .ok_or(GraphError::DanglingConnection {
                    node_id: connection.target,
                })?;
            graph.add_edge(source, target, connection);
        }

        // Cycles are rejected here so the traversal can recurse on
        // predecessors without a cycle guard.
        if petgraph::algo::is_cyclic_directed(&graph) {
            return Err(GraphError::CycleDetected);
        }

        Ok(Self {
            graph,
            node_index_map,
            record_order,
        })
    }

    /// Returns a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&NodeRecord> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the nodes with no incoming edges, in record order.
    ///
    /// These are the traversal entry points. A build-validated graph with
    /// at least one node always has at least one root.
    pub fn roots(&self) -> Vec<&NodeRecord> {
        self.record_order
            .iter()
            .filter_map(|node_id| {
                let index = *self.node_index_map.get(node_id)?;
                if self
                    .graph
                    .edges_directed(index, Direction::Incoming)
                    .next()
                    .is_none()
                {
                    self.graph.node_weight(index)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Returns a node's incoming edges as (source node, connection) pairs.
    pub fn incoming(&self, node_id: NodeId) -> Vec<(&NodeRecord, &Connection)> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(index, Direction::Incoming)
            .filter_map(|edge| {
                let source = self.graph.node_weight(edge.source())?;
                Some((source, edge.weight()))
            })
            .collect()
    }

    /// Returns a node's outgoing edges as (target node, connection) pairs.
    pub fn outgoing(&self, node_id: NodeId) -> Vec<(&NodeRecord, &Connection)> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|edge| {
                let target = self.graph.node_weight(edge.target())?;
                Some((target, edge.weight()))
            })
            .collect()
    }
}
