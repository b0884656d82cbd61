//! In-process graph that records declarations instead of executing them
//!
//! `RecordingGraph` implements [`OpGraph`] by appending every declaration to a
//! list and handing out sequential node ids. It is used for dry runs (checking
//! that a stack wires up and declares what it should) and in tests.

use super::{GraphError, NodeHandle, OpDeclaration, OpGraph};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// A node known to the recorder.
///
/// Placeholders (graph inputs created with [`RecordingGraph::placeholder`])
/// carry no declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredNode {
    pub handle: NodeHandle,
    pub declaration: Option<OpDeclaration>,
}

#[derive(Debug, Default)]
pub struct RecordingGraph {
    nodes: Vec<DeclaredNode>,
    persisted: BTreeMap<String, NodeHandle>,
}

impl RecordingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source node (e.g. the input batch or the loss gradient).
    pub fn placeholder(&mut self, name: &str) -> NodeHandle {
        let handle = NodeHandle::new(self.nodes.len() as u64, name);
        self.nodes.push(DeclaredNode {
            handle: handle.clone(),
            declaration: None,
        });
        handle
    }

    pub fn nodes(&self) -> &[DeclaredNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The declaration behind `handle`, if it is a declared (non-placeholder) node.
    pub fn declaration(&self, handle: &NodeHandle) -> Option<&OpDeclaration> {
        self.nodes
            .get(handle.id() as usize)
            .and_then(|node| node.declaration.as_ref())
    }

    /// Declarations in the order they were made.
    pub fn declarations(&self) -> impl Iterator<Item = &OpDeclaration> {
        self.nodes.iter().filter_map(|node| node.declaration.as_ref())
    }

    /// Engine op names in declaration order.
    pub fn op_names(&self) -> Vec<String> {
        self.declarations().map(OpDeclaration::op_name).collect()
    }

    /// The node persisted under `name`.
    pub fn persisted(&self, name: &str) -> Option<&NodeHandle> {
        self.persisted.get(name)
    }

    pub fn persisted_names(&self) -> impl Iterator<Item = &str> {
        self.persisted.keys().map(String::as_str)
    }

    /// Every declaration in the engine's wire encoding.
    pub fn to_wire(&self) -> Result<Value, serde_json::Error> {
        let declarations = self
            .declarations()
            .map(OpDeclaration::to_wire)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(declarations))
    }

    fn check_known(&self, handle: &NodeHandle) -> Result<(), GraphError> {
        if (handle.id() as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(handle.id()))
        }
    }
}

impl OpGraph for RecordingGraph {
    fn declare(&mut self, declaration: OpDeclaration) -> Result<NodeHandle, GraphError> {
        for referenced in declaration.referenced_nodes() {
            self.check_known(referenced)?;
        }

        let op = declaration.op_name();
        let handle = NodeHandle::new(self.nodes.len() as u64, op.as_str());
        debug!(id = handle.id(), op = %op, input = %declaration.input, "declared node");

        self.nodes.push(DeclaredNode {
            handle: handle.clone(),
            declaration: Some(declaration),
        });
        Ok(handle)
    }

    fn persist_op(&mut self, node: &NodeHandle, name: &str) -> Result<(), GraphError> {
        self.check_known(node)?;
        debug!(id = node.id(), name, "persisting node");
        // Re-persisting a name points it at the newer node.
        self.persisted.insert(name.to_string(), node.clone());
        Ok(())
    }
}
