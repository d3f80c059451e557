//! TCP server side: inbound calls dispatched into a coordinator.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use corelib::{NodeCoordinator, Request, Result};
use tracing::{debug, error, info};

use crate::codec::{read_frame, write_frame};

/// Accept loop: one handler thread per connection, each serving a single
/// request/reply exchange (the client dials per call). Handlers run in
/// parallel; serialization of node state is the coordinator's concern, not
/// the server's. Runs until the listener fails.
pub fn serve(listener: TcpListener, node: Arc<NodeCoordinator>) {
    info!(addr = %node.addr(), "serving ring calls");
    for conn in listener.incoming() {
        match conn {
            Ok(stream) => {
                let node = Arc::clone(&node);
                thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &node) {
                        debug!(error = %err, "connection failed");
                    }
                });
            }
            Err(err) => error!(error = %err, "accept failed"),
        }
    }
}

/// Runs [`serve`] on a background thread and returns the bound address.
pub fn spawn(listener: TcpListener, node: Arc<NodeCoordinator>) -> std::io::Result<SocketAddr> {
    let bound = listener.local_addr()?;
    thread::spawn(move || serve(listener, node));
    Ok(bound)
}

fn handle_connection(mut stream: TcpStream, node: &NodeCoordinator) -> Result<()> {
    let request: Request = read_frame(&mut stream)?;
    let reply = node.handle(request);
    if let Err(err) = &reply {
        debug!(error = %err, "request failed");
    }
    write_frame(&mut stream, &reply)
}
