//! Blocking TCP client side of the remote-call capability.

use std::net::TcpStream;

use corelib::{NodeAddr, Reply, Request, Result, Transport};

use crate::codec::{read_frame, to_transport, write_frame};

/// [`Transport`] over TCP: dials the target, writes one request frame, and
/// blocks until the reply frame arrives. One connection per call; no
/// timeout, retry, or cancellation; the first error surfaces as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpClient;

impl TcpClient {
    pub fn new() -> Self {
        TcpClient
    }
}

impl Transport for TcpClient {
    fn invoke(&self, addr: &NodeAddr, request: Request) -> Result<Reply> {
        let mut stream =
            TcpStream::connect((addr.host.as_str(), addr.port)).map_err(to_transport)?;
        write_frame(&mut stream, &request)?;
        read_frame::<Result<Reply>>(&mut stream)?
    }
}
