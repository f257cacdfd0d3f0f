//! Shared test utilities for multi-node integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::RwLock;
use url::Url;

use common::crypto::{PublicKey, SecretKey};
use common::enclave::Enclave;
use common::network::NetworkNodes;
use common::node::{Node, PushJob, PushProvider};
use common::storage::{KeyValueStore, MemoryStore};

/// Delivers push jobs straight into the target node, awaiting completion.
#[derive(Debug, Default, Clone)]
pub struct InProcessPush {
    nodes: Arc<RwLock<HashMap<Url, Node>>>,
}

impl InProcessPush {
    pub fn register(&self, url: Url, node: Node) {
        self.nodes.write().insert(url, node);
    }
}

#[async_trait]
impl PushProvider for InProcessPush {
    async fn dispatch(&self, job: PushJob) -> anyhow::Result<()> {
        let node = self
            .nodes
            .read()
            .get(job.url())
            .cloned()
            .ok_or_else(|| anyhow!("no node listening at {}", job.url()))?;
        match job {
            PushJob::Payload { key, envelope, .. } => {
                node.store_pushed(&key, &envelope).await?;
            }
            PushJob::PrivacyGroup { group, .. } => {
                node.store_pushed_privacy_group(&group).await?;
            }
        }
        Ok(())
    }
}

pub struct TestNode {
    pub node: Node,
    pub keys: Vec<PublicKey>,
    pub url: Url,
}

pub fn node_url(index: usize) -> Url {
    Url::parse(&format!("http://node{}.test:8080/", index + 1)).unwrap()
}

/// Build a node holding `key_count` fresh keys on top of `store`.
pub fn test_node(
    index: usize,
    key_count: usize,
    store: Arc<dyn KeyValueStore>,
    push: &InProcessPush,
) -> TestNode {
    let secrets: Vec<SecretKey> = (0..key_count)
        .map(|_| SecretKey::generate().unwrap())
        .collect();
    let keys: Vec<PublicKey> = secrets.iter().map(|k| k.public()).collect();
    let url = node_url(index);

    let registry = Arc::new(NetworkNodes::new());
    registry.set_node_url(url.clone(), &keys);

    let node = Node::builder(Arc::new(Enclave::new(secrets).unwrap()))
        .with_store(store)
        .with_registry(registry)
        .with_push_provider(Arc::new(push.clone()))
        .build();
    push.register(url.clone(), node.clone());

    TestNode { node, keys, url }
}

/// Run one full discovery round: every node merges every other node's
/// snapshot.
pub fn exchange_party_info(nodes: &[TestNode]) {
    let snapshots: Vec<_> = nodes.iter().map(|n| n.node.registry().snapshot()).collect();
    for node in nodes {
        for snapshot in &snapshots {
            node.node.registry().merge_party_info(snapshot);
        }
    }
}

/// In-memory nodes with one key each that already know about each other.
pub fn network(size: usize) -> Vec<TestNode> {
    let push = InProcessPush::default();
    let nodes: Vec<TestNode> = (0..size)
        .map(|i| test_node(i, 1, Arc::new(MemoryStore::new()), &push))
        .collect();
    exchange_party_info(&nodes);
    nodes
}
