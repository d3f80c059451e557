//! Per-node coordinator: ownership, routing, and the ring-join protocol.
//!
//! A node owns the arc `(predecessor_end, end]` of the ring. Requests for
//! keys outside that arc are forwarded to the closest known predecessor from
//! the finger table; the remote side repeats the step until the owner
//! answers. Joining splices a new node into that chain through a multi-step
//! handshake between the joiner, its computed successor, and the successor's
//! predecessor.
//!
//! All mutable node state lives behind one mutex and every local read or
//! mutation goes through it; the lock is never held across a remote call.
//! The tri-state busy flag remains the gate that keeps two join handshakes
//! from interleaving at the same node.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::finger::FingerTable;
use crate::identifier::{Identifier, ID_BITS};
use crate::interval::RingRange;
use crate::store::OwnershipTable;

/// Transport endpoint of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl NodeAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        NodeAddr {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Abstract remote-call capability.
///
/// A call blocks the calling thread until the reply or a transport error
/// arrives; there is no timeout, retry, or cancellation anywhere in the
/// core. Remote errors come back through the `Err` arm verbatim.
pub trait Transport: Send + Sync {
    fn invoke(&self, addr: &NodeAddr, request: Request) -> Result<Reply>;
}

/// The remote-callable surface of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Get { key: String },
    Put { key: String, value: String },
    Delete { key: String },
    Find { id: Identifier },
    GetPredecessorEnd,
    RegisterJoin { target: Identifier, joiner: NodeAddr },
    RegisterJoinSucc { target: Identifier, joiner: NodeAddr },
    Joined { target: Identifier, joiner: NodeAddr },
    JoinedSucc { target: Identifier, joiner: NodeAddr },
    NotifyPred(JoinNotice),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reply {
    Ack,
    Value(String),
    Addr(NodeAddr),
    Id(Identifier),
    Joiner(Box<JoinerSeed>),
}

/// Phase markers for the predecessor notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinEvent {
    Joining,
    Joined,
}

/// Internal notification a successor sends its predecessor during a join.
/// Carries the joiner's coordinates so the predecessor can repair its finger
/// table without any state of its own about the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinNotice {
    pub event: JoinEvent,
    /// Sender; must match what the receiver computes as its own successor.
    pub caller: NodeAddr,
    /// Joiner's target identifier.
    pub target: Identifier,
    /// Joiner's transport endpoint.
    pub joiner: NodeAddr,
}

/// Everything a joining node needs to start serving: built by the successor
/// during `RegisterJoinSucc` and returned along the caller chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinerSeed {
    /// Arc end of the new node (its target identifier).
    pub end: Identifier,
    pub predecessor: NodeAddr,
    pub predecessor_end: Identifier,
    /// Pre-resolved finger entries, one per ring bit.
    pub fingers: Vec<NodeAddr>,
    /// The handed-off partition of the successor's table.
    pub table: OwnershipTable,
}

/// Busy state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Free,
    /// This node is the accepting party of an in-flight join.
    BusyJoin,
    /// This node's successor is mid-join and asked this node to pause.
    Busy,
}

/// Stashed handoff, pending the joiner's confirmation. Never reverted: if
/// the confirmation does not arrive, the accepting node stays busy with this
/// record indefinitely.
#[derive(Debug)]
struct PendingJoiner {
    target: Identifier,
    addr: NodeAddr,
    handoff: OwnershipTable,
}

struct Inner {
    /// Inclusive upper bound of this node's arc.
    end: Identifier,
    /// Absent only when this node is the sole ring member.
    predecessor: Option<NodeAddr>,
    /// Arc end of the predecessor; meaningful only when one is present.
    predecessor_end: Identifier,
    fingers: FingerTable,
    table: OwnershipTable,
    state: NodeState,
    joiner: Option<PendingJoiner>,
}

impl Inner {
    /// True if this node is responsible for `id`: unconditionally for a sole
    /// ring member, otherwise `(predecessor_end, end]`.
    fn stores_key(&self, id: Identifier) -> bool {
        if self.predecessor.is_none() {
            return true;
        }
        RingRange::successor(self.predecessor_end, self.end).contains(id)
    }

    /// A node already in a busy state cannot be pushed into another one, but
    /// can always be released to `Free`.
    fn set_state(&mut self, new: NodeState) -> Result<()> {
        if new == NodeState::Free || self.state == NodeState::Free {
            self.state = new;
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }
}

/// The per-node state machine. One per process, shared with the transport
/// adapter serving inbound calls.
pub struct NodeCoordinator {
    addr: NodeAddr,
    transport: Arc<dyn Transport>,
    inner: Mutex<Inner>,
}

impl NodeCoordinator {
    /// Creates the sole member of a fresh ring: it owns the entire
    /// identifier space and every finger points back at itself.
    pub fn new_ring(addr: NodeAddr, transport: Arc<dyn Transport>) -> Self {
        let end = Identifier::max_value();
        let fingers = FingerTable::uniform(end, addr.clone());
        let table = OwnershipTable::new(Identifier::zero(), Identifier::zero());
        info!(addr = %addr, "starting fresh ring");
        NodeCoordinator {
            addr,
            transport,
            inner: Mutex::new(Inner {
                end,
                predecessor: None,
                predecessor_end: Identifier::zero(),
                fingers,
                table,
                state: NodeState::Free,
                joiner: None,
            }),
        }
    }

    /// Creates a node from the state its successor prepared during
    /// `RegisterJoinSucc`. The node must be serving before the join is
    /// confirmed with [`confirm_join`].
    pub fn from_seed(addr: NodeAddr, transport: Arc<dyn Transport>, seed: JoinerSeed) -> Result<Self> {
        let fingers = FingerTable::from_entries(seed.end, seed.fingers)?;
        info!(addr = %addr, end = %seed.end, pred = %seed.predecessor, "starting from join handoff");
        Ok(NodeCoordinator {
            addr,
            transport,
            inner: Mutex::new(Inner {
                end: seed.end,
                predecessor: Some(seed.predecessor),
                predecessor_end: seed.predecessor_end,
                fingers,
                table: seed.table,
                state: NodeState::Free,
                joiner: None,
            }),
        })
    }

    pub fn addr(&self) -> &NodeAddr {
        &self.addr
    }

    /// Inclusive upper bound of this node's arc. Over the wire this answers
    /// `GetPredecessorEnd`: the caller is a joining node asking its future
    /// predecessor (us) for the boundary its own arc will start after. A
    /// sole ring member owns through the maximum identifier by construction.
    pub fn arc_end(&self) -> Identifier {
        self.inner.lock().end
    }

    /// Predecessor address and arc end, absent for a sole ring member.
    pub fn predecessor(&self) -> Option<(NodeAddr, Identifier)> {
        let inner = self.inner.lock();
        inner
            .predecessor
            .clone()
            .map(|addr| (addr, inner.predecessor_end))
    }

    /// Bounds of the local table's arc, storage convention.
    pub fn store_bounds(&self) -> (Identifier, Identifier) {
        let inner = self.inner.lock();
        (inner.table.start(), inner.table.end())
    }

    pub fn state(&self) -> NodeState {
        self.inner.lock().state
    }

    /// Target and address of the join this node has accepted but not yet
    /// seen confirmed.
    pub fn pending_joiner(&self) -> Option<(Identifier, NodeAddr)> {
        let inner = self.inner.lock();
        inner
            .joiner
            .as_ref()
            .map(|j| (j.target, j.addr.clone()))
    }

    /// True if this node is responsible for `id`.
    pub fn stores_key(&self, id: Identifier) -> bool {
        self.inner.lock().stores_key(id)
    }

    /// Attempts a busy-state transition; see [`NodeState`]. Atomic with
    /// respect to concurrently arriving remote calls.
    pub fn set_state(&self, new: NodeState) -> Result<()> {
        self.inner.lock().set_state(new)
    }

    /// Looks up a key, serving locally when this node owns it and otherwise
    /// forwarding toward the owner. No hop limit and no cycle detection:
    /// correctness rests on finger tables agreeing with actual membership.
    pub fn get(&self, key: &str) -> Result<String> {
        let id = Identifier::hash_key(key);
        let next = {
            let inner = self.inner.lock();
            if inner.stores_key(id) {
                return inner.table.get(key).map(str::to_owned);
            }
            inner.fingers.lookup(id)?.clone()
        };
        debug!(key, next = %next, "forwarding get");
        match self.transport.invoke(&next, Request::Get { key: key.to_owned() })? {
            Reply::Value(value) => Ok(value),
            reply => Err(unexpected_reply("get", &reply)),
        }
    }

    /// Stores a key/value pair on its owning node.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let id = Identifier::hash_key(key);
        let next = {
            let mut inner = self.inner.lock();
            if inner.stores_key(id) {
                return inner.table.put(key, value);
            }
            inner.fingers.lookup(id)?.clone()
        };
        debug!(key, next = %next, "forwarding put");
        match self.transport.invoke(
            &next,
            Request::Put {
                key: key.to_owned(),
                value: value.to_owned(),
            },
        )? {
            Reply::Ack => Ok(()),
            reply => Err(unexpected_reply("put", &reply)),
        }
    }

    /// Removes a key from its owning node, returning the prior value.
    pub fn delete(&self, key: &str) -> Result<String> {
        let id = Identifier::hash_key(key);
        let next = {
            let mut inner = self.inner.lock();
            if inner.stores_key(id) {
                return inner.table.delete(key);
            }
            inner.fingers.lookup(id)?.clone()
        };
        debug!(key, next = %next, "forwarding delete");
        match self.transport.invoke(&next, Request::Delete { key: key.to_owned() })? {
            Reply::Value(value) => Ok(value),
            reply => Err(unexpected_reply("delete", &reply)),
        }
    }

    /// Resolves the node responsible for `id`.
    pub fn find(&self, id: Identifier) -> Result<NodeAddr> {
        let next = {
            let inner = self.inner.lock();
            if inner.stores_key(id) {
                return Ok(self.addr.clone());
            }
            inner.fingers.lookup(id)?.clone()
        };
        match self.transport.invoke(&next, Request::Find { id })? {
            Reply::Addr(addr) => Ok(addr),
            reply => Err(unexpected_reply("find", &reply)),
        }
    }

    /// Join entry point, invocable on any ring member: routes the request to
    /// the joiner's computed successor.
    pub fn register_join(&self, target: Identifier, joiner: NodeAddr) -> Result<JoinerSeed> {
        let succ = self.find(target)?;
        info!(target = %target, joiner = %joiner, succ = %succ, "routing join to successor");
        match self
            .transport
            .invoke(&succ, Request::RegisterJoinSucc { target, joiner })?
        {
            Reply::Joiner(seed) => Ok(*seed),
            reply => Err(unexpected_reply("register_join", &reply)),
        }
    }

    /// Accepting side of a join; must run on the joiner's successor.
    ///
    /// Gates itself with `BusyJoin`, pauses its predecessor, assembles the
    /// joiner's starting state, and splits off the handoff partition. On any
    /// failure the node releases its own busy flag and surfaces the error;
    /// everything already done elsewhere (a predecessor marked busy, remote
    /// state) stays as it is; there is no rollback in this protocol.
    pub fn register_join_succ(&self, target: Identifier, joiner: NodeAddr) -> Result<JoinerSeed> {
        self.set_state(NodeState::BusyJoin)?;
        match self.admit_joiner(target, &joiner) {
            Ok(seed) => Ok(seed),
            Err(err) => {
                let _ = self.set_state(NodeState::Free);
                Err(err)
            }
        }
    }

    fn admit_joiner(&self, target: Identifier, joiner: &NodeAddr) -> Result<JoinerSeed> {
        let pred = { self.inner.lock().predecessor.clone() };

        if let Some(pred) = &pred {
            let notice = JoinNotice {
                event: JoinEvent::Joining,
                caller: self.addr.clone(),
                target,
                joiner: joiner.clone(),
            };
            expect_ack(self.transport.invoke(pred, Request::NotifyPred(notice))?)?;
        }

        // The joiner slots in between our former predecessor and us; for a
        // sole ring member both roles are ours.
        let joiner_pred = pred.unwrap_or_else(|| self.addr.clone());
        let predecessor_end = match self
            .transport
            .invoke(&joiner_pred, Request::GetPredecessorEnd)?
        {
            Reply::Id(id) => id,
            reply => return Err(unexpected_reply("get_predecessor_end", &reply)),
        };

        // Resolve the joiner's fingers through its predecessor, one lookup
        // per ring bit.
        let mut fingers = Vec::with_capacity(ID_BITS as usize);
        for i in 0..ID_BITS {
            let finger_target = target.wrapping_add(Identifier::pow2(i));
            match self
                .transport
                .invoke(&joiner_pred, Request::Find { id: finger_target })?
            {
                Reply::Addr(addr) => fingers.push(addr),
                reply => return Err(unexpected_reply("find", &reply)),
            }
        }

        let handoff = {
            let mut inner = self.inner.lock();
            let handoff = inner.table.partition(target.next())?;
            inner.joiner = Some(PendingJoiner {
                target,
                addr: joiner.clone(),
                handoff: handoff.clone(),
            });
            handoff
        };
        info!(target = %target, joiner = %joiner, keys = handoff.len(), "admitted joiner, awaiting confirmation");

        Ok(JoinerSeed {
            end: target,
            predecessor: joiner_pred,
            predecessor_end,
            fingers,
            table: handoff,
        })
    }

    /// Join confirmation entry point, invocable on any ring member: routes
    /// to the joiner's successor.
    pub fn joined(&self, target: Identifier, joiner: NodeAddr) -> Result<()> {
        let succ = self.find(target)?;
        match self
            .transport
            .invoke(&succ, Request::JoinedSucc { target, joiner })?
        {
            Reply::Ack => Ok(()),
            reply => Err(unexpected_reply("joined", &reply)),
        }
    }

    /// Completion of a join on the accepting successor: release the
    /// predecessor, repair the local finger table, and rewire the
    /// predecessor link to the joiner.
    pub fn joined_succ(&self, target: Identifier, joiner: NodeAddr) -> Result<()> {
        let pred = { self.inner.lock().predecessor.clone() };

        if let Some(pred) = &pred {
            let notice = JoinNotice {
                event: JoinEvent::Joined,
                caller: self.addr.clone(),
                target,
                joiner: joiner.clone(),
            };
            expect_ack(self.transport.invoke(pred, Request::NotifyPred(notice))?)?;
        }

        let mut inner = self.inner.lock();
        // Fingers whose targets now fall on the joiner's arc. A former sole
        // member had no predecessor: the joiner took over everything from
        // the top of the ring through its target.
        let (lo, hi) = match inner.predecessor {
            Some(_) => (inner.predecessor_end.next(), inner.end.next()),
            None => (inner.end.next(), target.next()),
        };
        inner.fingers.patch_range(lo, hi, &joiner);
        inner.predecessor = Some(joiner.clone());
        inner.predecessor_end = target;
        if let Some(pending) = inner.joiner.take() {
            debug!(stashed = pending.handoff.len(), "clearing joiner record");
        }
        info!(target = %target, joiner = %joiner, "join complete");
        inner.set_state(NodeState::Free)
    }

    /// Notification handler on the successor's predecessor. Rejects callers
    /// that do not match this node's own computed successor.
    pub fn notify_pred(&self, notice: JoinNotice) -> Result<()> {
        let succ = {
            let inner = self.inner.lock();
            inner.fingers.lookup(inner.end.next())?.clone()
        };
        if notice.caller != succ {
            return Err(Error::Caller);
        }
        match notice.event {
            JoinEvent::Joining => {
                debug!(caller = %notice.caller, "successor is admitting a joiner, pausing");
                self.set_state(NodeState::Busy)
            }
            JoinEvent::Joined => {
                let mut inner = self.inner.lock();
                let lo = inner.end.next();
                let hi = notice.target.next();
                inner.fingers.patch_range(lo, hi, &notice.joiner);
                debug!(joiner = %notice.joiner, "successor join complete, resuming");
                inner.set_state(NodeState::Free)
            }
        }
    }

    /// Dispatcher for transport adapters serving inbound calls.
    pub fn handle(&self, request: Request) -> Result<Reply> {
        match request {
            Request::Get { key } => self.get(&key).map(Reply::Value),
            Request::Put { key, value } => self.put(&key, &value).map(|()| Reply::Ack),
            Request::Delete { key } => self.delete(&key).map(Reply::Value),
            Request::Find { id } => self.find(id).map(Reply::Addr),
            Request::GetPredecessorEnd => Ok(Reply::Id(self.arc_end())),
            Request::RegisterJoin { target, joiner } => self
                .register_join(target, joiner)
                .map(|seed| Reply::Joiner(Box::new(seed))),
            Request::RegisterJoinSucc { target, joiner } => self
                .register_join_succ(target, joiner)
                .map(|seed| Reply::Joiner(Box::new(seed))),
            Request::Joined { target, joiner } => {
                self.joined(target, joiner).map(|()| Reply::Ack)
            }
            Request::JoinedSucc { target, joiner } => {
                self.joined_succ(target, joiner).map(|()| Reply::Ack)
            }
            Request::NotifyPred(notice) => self.notify_pred(notice).map(|()| Reply::Ack),
        }
    }
}

/// Client side of the join handshake, steps 1–3: asks any ring member to
/// register the join and returns the starting state the successor prepared.
pub fn request_join(
    transport: &dyn Transport,
    peer: &NodeAddr,
    target: Identifier,
    addr: NodeAddr,
) -> Result<JoinerSeed> {
    match transport.invoke(peer, Request::RegisterJoin { target, joiner: addr })? {
        Reply::Joiner(seed) => Ok(*seed),
        reply => Err(unexpected_reply("request_join", &reply)),
    }
}

/// Client side of the join handshake, step 4: the joiner must already be
/// serving with the seeded state when this confirmation is sent.
pub fn confirm_join(
    transport: &dyn Transport,
    peer: &NodeAddr,
    target: Identifier,
    addr: NodeAddr,
) -> Result<()> {
    match transport.invoke(peer, Request::Joined { target, joiner: addr })? {
        Reply::Ack => Ok(()),
        reply => Err(unexpected_reply("confirm_join", &reply)),
    }
}

fn expect_ack(reply: Reply) -> Result<()> {
    match reply {
        Reply::Ack => Ok(()),
        reply => Err(unexpected_reply("notify", &reply)),
    }
}

fn unexpected_reply(method: &str, reply: &Reply) -> Error {
    Error::Transport(format!("unexpected reply to {method}: {reply:?}"))
}
