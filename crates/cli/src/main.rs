//! Node launcher and client for the ring.

use std::net::TcpListener;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use corelib::{node, Identifier, NodeAddr, NodeCoordinator, Reply, Request, Transport};
use transport::TcpClient;

#[derive(Parser)]
#[command(name = "ringd", about = "Chord-style distributed hash table node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a fresh single-node ring.
    Start {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long)]
        port: u16,
    },
    /// Join an existing ring through a live peer.
    Join {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long)]
        port: u16,
        /// host:port of any ring member.
        #[arg(long)]
        peer: String,
    },
    /// Look up a key.
    Get {
        #[arg(long)]
        peer: String,
        key: String,
    },
    /// Store a key/value pair.
    Put {
        #[arg(long)]
        peer: String,
        key: String,
        value: String,
    },
    /// Remove a key and print its prior value.
    Delete {
        #[arg(long)]
        peer: String,
        key: String,
    },
    /// Print the node responsible for a key.
    Find {
        #[arg(long)]
        peer: String,
        key: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Start { host, port } => {
            let addr = NodeAddr::new(host, port);
            let listener =
                TcpListener::bind((addr.host.as_str(), addr.port)).context("bind listener")?;
            let node = Arc::new(NodeCoordinator::new_ring(addr, Arc::new(TcpClient::new())));
            transport::serve(listener, node);
            Ok(())
        }
        Command::Join { host, port, peer } => {
            let addr = NodeAddr::new(host, port);
            let peer = parse_peer(&peer)?;
            // A node's ring position is the hash of its own endpoint.
            let target = Identifier::hash_key(&addr.to_string());
            let listener =
                TcpListener::bind((addr.host.as_str(), addr.port)).context("bind listener")?;
            let client: Arc<TcpClient> = Arc::new(TcpClient::new());
            let seed = node::request_join(client.as_ref(), &peer, target, addr.clone())?;
            let coordinator =
                Arc::new(NodeCoordinator::from_seed(addr.clone(), client.clone(), seed)?);
            // Serve before confirming: the ring may route to us the moment
            // the join completes.
            transport::spawn(listener, coordinator).context("spawn server")?;
            node::confirm_join(client.as_ref(), &peer, target, addr)?;
            loop {
                std::thread::park();
            }
        }
        Command::Get { peer, key } => {
            let reply = call(&peer, Request::Get { key })?;
            match reply {
                Reply::Value(value) => {
                    println!("{value}");
                    Ok(())
                }
                reply => bail!("unexpected reply: {reply:?}"),
            }
        }
        Command::Put { peer, key, value } => {
            match call(&peer, Request::Put { key, value })? {
                Reply::Ack => Ok(()),
                reply => bail!("unexpected reply: {reply:?}"),
            }
        }
        Command::Delete { peer, key } => match call(&peer, Request::Delete { key })? {
            Reply::Value(value) => {
                println!("{value}");
                Ok(())
            }
            reply => bail!("unexpected reply: {reply:?}"),
        },
        Command::Find { peer, key } => {
            let id = Identifier::hash_key(&key);
            match call(&peer, Request::Find { id })? {
                Reply::Addr(addr) => {
                    println!("{id} -> {addr}");
                    Ok(())
                }
                reply => bail!("unexpected reply: {reply:?}"),
            }
        }
    }
}

fn call(peer: &str, request: Request) -> anyhow::Result<Reply> {
    let peer = parse_peer(peer)?;
    Ok(TcpClient::new().invoke(&peer, request)?)
}

fn parse_peer(s: &str) -> anyhow::Result<NodeAddr> {
    let (host, port) = s.rsplit_once(':').context("peer must be host:port")?;
    Ok(NodeAddr::new(host, port.parse::<u16>().context("invalid peer port")?))
}
