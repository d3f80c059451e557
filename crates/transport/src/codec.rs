//! Length-prefixed bincode framing.
//!
//! Every message on the wire is a 4-byte big-endian length followed by the
//! bincode payload. Requests travel one way, `Result<Reply, Error>` the
//! other, so remote errors are reconstructed losslessly on the caller side.

use std::io::{Read, Write};

use corelib::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Upper bound on an accepted frame. A join handoff carries a table
/// partition, so frames can be large, but a length prefix beyond this is a
/// corrupt or hostile peer.
const MAX_FRAME: u32 = 64 * 1024 * 1024;

pub fn write_frame<T: Serialize>(stream: &mut impl Write, message: &T) -> Result<()> {
    let payload = bincode::serialize(message).map_err(to_transport)?;
    let len = u32::try_from(payload.len()).map_err(to_transport)?;
    if len > MAX_FRAME {
        return Err(Error::Transport(format!("frame too large: {len} bytes")));
    }
    stream.write_all(&len.to_be_bytes()).map_err(to_transport)?;
    stream.write_all(&payload).map_err(to_transport)?;
    stream.flush().map_err(to_transport)
}

pub fn read_frame<T: DeserializeOwned>(stream: &mut impl Read) -> Result<T> {
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).map_err(to_transport)?;
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME {
        return Err(Error::Transport(format!("frame too large: {len} bytes")));
    }
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).map_err(to_transport)?;
    bincode::deserialize(&payload).map_err(to_transport)
}

pub(crate) fn to_transport(err: impl std::fmt::Display) -> Error {
    Error::Transport(err.to_string())
}
