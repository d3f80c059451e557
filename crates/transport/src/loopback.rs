//! In-process transport for tests and single-process demos.

use std::collections::HashMap;
use std::sync::Arc;

use corelib::{Error, NodeAddr, NodeCoordinator, Reply, Request, Result, Transport};
use parking_lot::RwLock;

/// Registry-backed [`Transport`]: an invoke is a direct dispatch into the
/// target coordinator on the calling thread. Lets tests assemble multi-node
/// rings in one process without sockets while keeping the blocking call
/// semantics of the real transport.
#[derive(Default)]
pub struct Loopback {
    nodes: RwLock<HashMap<NodeAddr, Arc<NodeCoordinator>>>,
}

impl Loopback {
    pub fn new() -> Self {
        Loopback::default()
    }

    /// Makes `node` reachable at its own address.
    pub fn register(&self, node: Arc<NodeCoordinator>) {
        self.nodes.write().insert(node.addr().clone(), node);
    }
}

impl Transport for Loopback {
    fn invoke(&self, addr: &NodeAddr, request: Request) -> Result<Reply> {
        let node = self
            .nodes
            .read()
            .get(addr)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("no node at {addr}")))?;
        node.handle(request)
    }
}
