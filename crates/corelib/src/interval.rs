//! Ring-arc containment predicates.
//!
//! Three components of the system test membership in a ring arc, and each
//! uses a different boundary policy:
//!
//! - the ownership store uses `[start, end)` where equal bounds mean the arc
//!   covers the **whole ring** (that is how a table spanning the entire
//!   identifier space is represented);
//! - the finger table uses `[start, end)` where equal bounds mean the arc is
//!   **empty**;
//! - the node ownership check uses `(start, end]` where equal bounds mean the
//!   arc is **empty**.
//!
//! The divergence between the equal-bounds rules is deliberate and preserved
//! exactly; do not unify them. All three are configurations of one predicate
//! so the wraparound handling lives in a single place.

use crate::identifier::Identifier;

/// Bound inclusivity for a ring arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bounds {
    /// `[start, end)`
    ClosedOpen,
    /// `(start, end]`
    OpenClosed,
}

/// What an arc with `start == end` matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EqualRule {
    Everything,
    Nothing,
}

/// A contiguous arc of the identifier ring with an explicit boundary policy.
///
/// When `end` is numerically below `start` the arc wraps through the top of
/// the ring: membership is the union of the segment up to `MaxValue` and the
/// low segment up to `end`, with the configured inclusivity at each bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingRange {
    start: Identifier,
    end: Identifier,
    bounds: Bounds,
    on_equal: EqualRule,
}

impl RingRange {
    /// Storage convention: `[start, end)`, equal bounds match everything.
    pub fn storage(start: Identifier, end: Identifier) -> Self {
        RingRange {
            start,
            end,
            bounds: Bounds::ClosedOpen,
            on_equal: EqualRule::Everything,
        }
    }

    /// Routing convention: `[start, end)`, equal bounds match nothing.
    pub fn routing(start: Identifier, end: Identifier) -> Self {
        RingRange {
            start,
            end,
            bounds: Bounds::ClosedOpen,
            on_equal: EqualRule::Nothing,
        }
    }

    /// Successor convention: `(start, end]`, equal bounds match nothing.
    pub fn successor(start: Identifier, end: Identifier) -> Self {
        RingRange {
            start,
            end,
            bounds: Bounds::OpenClosed,
            on_equal: EqualRule::Nothing,
        }
    }

    pub fn start(&self) -> Identifier {
        self.start
    }

    pub fn end(&self) -> Identifier {
        self.end
    }

    /// Tests whether `x` lies on the arc.
    pub fn contains(&self, x: Identifier) -> bool {
        if self.start == self.end {
            return self.on_equal == EqualRule::Everything;
        }
        let zero = Identifier::zero();
        let max = Identifier::max_value();
        let one = Identifier::from_u32(1);
        match self.bounds {
            Bounds::ClosedOpen => {
                if self.start < self.end {
                    // end > start >= 0, so end - 1 cannot underflow
                    x.in_range(self.start, self.end.wrapping_sub(one))
                } else {
                    // wrapped: [start, max] plus [0, end). Decrementing an end
                    // of zero would underflow to max, so the low segment is
                    // guarded out entirely in that case.
                    x.in_range(self.start, max)
                        || (self.end != zero && x.in_range(zero, self.end.wrapping_sub(one)))
                }
            }
            Bounds::OpenClosed => {
                if self.start < self.end {
                    x.in_range(self.start.next(), self.end)
                } else {
                    // wrapped: (start, max] plus [0, end]. A start of max has
                    // an empty high segment; incrementing it would wrap to
                    // zero and match the whole ring.
                    (self.start != max && x.in_range(self.start.next(), max))
                        || x.in_range(zero, self.end)
                }
            }
        }
    }
}
