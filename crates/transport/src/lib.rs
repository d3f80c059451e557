//! Transport adapters for the ring.
//!
//! The core treats remote calls as an abstract blocking
//! `invoke(address, request) -> reply | error` capability; this crate
//! provides the concrete carriers:
//!
//! - [`TcpClient`] + [`serve`]: length-prefixed bincode frames over TCP,
//!   one dialed connection per call, one handler thread per inbound
//!   connection.
//! - [`Loopback`]: an in-process registry dispatching calls directly into
//!   coordinators, for tests and single-process demos.

pub mod client;
pub mod codec;
pub mod loopback;
pub mod server;

pub use client::TcpClient;
pub use loopback::Loopback;
pub use server::{serve, spawn};
