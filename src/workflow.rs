//! Workflow collaborator: read and merge-update node parameters.
//!
//! The chat core never owns node data. It resolves the errored node by name
//! and writes suggested parameters back through `WorkflowProvider`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::WorkflowError;

/// Node parameters as a JSON object.
pub type NodeParameters = serde_json::Map<String, serde_json::Value>;

/// A node as seen through the workflow collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub parameters: NodeParameters,
}

impl WorkflowNode {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            parameters: NodeParameters::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: NodeParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Access to the externally owned workflow graph.
#[async_trait]
pub trait WorkflowProvider: Send + Sync {
    /// Look up a node by name.
    async fn get_node(&self, name: &str) -> Option<WorkflowNode>;

    /// Overwrite the given top-level parameter keys on a node, keeping the rest.
    async fn merge_node_parameters(
        &self,
        name: &str,
        parameters: NodeParameters,
    ) -> Result<(), WorkflowError>;
}

/// Workflow held in memory, keyed by node name.
#[derive(Default)]
pub struct InMemoryWorkflow {
    nodes: RwLock<HashMap<String, WorkflowNode>>,
}

impl InMemoryWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = WorkflowNode>) -> Self {
        Self {
            nodes: RwLock::new(nodes.into_iter().map(|n| (n.name.clone(), n)).collect()),
        }
    }

    /// Insert or replace a node.
    pub async fn upsert(&self, node: WorkflowNode) {
        self.nodes.write().await.insert(node.name.clone(), node);
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[async_trait]
impl WorkflowProvider for InMemoryWorkflow {
    async fn get_node(&self, name: &str) -> Option<WorkflowNode> {
        self.nodes.read().await.get(name).cloned()
    }

    async fn merge_node_parameters(
        &self,
        name: &str,
        parameters: NodeParameters,
    ) -> Result<(), WorkflowError> {
        let mut nodes = self.nodes.write().await;
        let node = nodes.get_mut(name).ok_or_else(|| WorkflowError::NodeNotFound {
            name: name.to_string(),
        })?;

        debug!(node = name, keys = parameters.len(), "Merging node parameters");
        node.parameters.extend(parameters);
        Ok(())
    }
}
