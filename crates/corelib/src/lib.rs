//! Core library for a Chord-style distributed hash table.
//!
//! This crate provides the coordination engine for the ring:
//! - Fixed-width 160-bit ring arithmetic
//! - Ring-arc containment predicates (three boundary conventions)
//! - The interval-bound key/value store with split support
//! - The finger-table routing structure
//! - The per-node coordinator and multi-step join protocol
//!
//! The remote-call transport is abstract here: the coordinator talks to the
//! rest of the ring through the [`Transport`] trait, and any adapter can
//! carry the [`Request`]/[`Reply`] wire types.

pub mod error;
pub mod finger;
pub mod identifier;
pub mod interval;
pub mod node;
pub mod store;

pub use error::{Error, Result};
pub use finger::FingerTable;
pub use identifier::Identifier;
pub use interval::RingRange;
pub use node::{JoinerSeed, NodeAddr, NodeCoordinator, Reply, Request, Transport};
pub use store::OwnershipTable;
