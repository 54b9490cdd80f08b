//! Sequence Number Handling
//!
//! Selective Repeat interprets sequence numbers modulo a small, fixed
//! sequence space. This module provides a wrapped sequence number type with
//! modular arithmetic and the canonical window-membership test used by both
//! the sender and the receiver.

use std::fmt;
use std::ops::{Add, Sub};

/// Maximum number of unacknowledged packets the sender may have in flight,
/// and the size of the receiver's reassembly window.
pub const WINDOW_SIZE: usize = 6;

/// Modulus for sequence-number arithmetic.
pub const SEQ_SPACE: u16 = 12;

// A receiver cannot tell a retransmitted old packet from a new packet
// reusing the same number unless the space is at least twice the window.
const _: () = assert!(SEQ_SPACE as usize >= 2 * WINDOW_SIZE);

/// Sequence number in `[0, SEQ_SPACE)` with modular wraparound semantics
///
/// All window-membership decisions go through [`SeqNumber::in_window`], the
/// half-open modular interval `[base, base + WINDOW_SIZE)`. Using one test
/// everywhere avoids off-by-one disagreements at the window edges when the
/// space wraps.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SeqNumber(u16);

impl SeqNumber {
    /// Create a new sequence number
    ///
    /// # Panics
    /// Panics if value is not below SEQ_SPACE
    pub fn new(value: u16) -> Self {
        assert!(
            value < SEQ_SPACE,
            "Sequence number {} outside space {}",
            value,
            SEQ_SPACE
        );
        SeqNumber(value)
    }

    /// Create a sequence number, reducing the value modulo SEQ_SPACE
    #[inline]
    pub fn new_unchecked(value: u16) -> Self {
        SeqNumber(value % SEQ_SPACE)
    }

    /// Get the raw sequence number value
    #[inline]
    pub fn as_raw(self) -> u16 {
        self.0
    }

    /// Get the next sequence number
    #[inline]
    pub fn next(self) -> Self {
        SeqNumber((self.0 + 1) % SEQ_SPACE)
    }

    /// Forward distance from `base` to this number, in `[0, SEQ_SPACE)`
    ///
    /// This is the slot offset used to index a window anchored at `base`.
    #[inline]
    pub fn offset_from(self, base: SeqNumber) -> u16 {
        (self.0 + SEQ_SPACE - base.0) % SEQ_SPACE
    }

    /// Whether this number falls inside the window `[base, base + WINDOW_SIZE)`
    ///
    /// Half-open modular interval; numbers behind `base` or at
    /// `base + WINDOW_SIZE` and beyond are outside.
    #[inline]
    pub fn in_window(self, base: SeqNumber) -> bool {
        self.offset_from(base) < WINDOW_SIZE as u16
    }
}

impl fmt::Debug for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNumber({})", self.0)
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SeqNumber {
    fn from(value: u16) -> Self {
        SeqNumber::new_unchecked(value)
    }
}

impl From<SeqNumber> for u16 {
    fn from(seq: SeqNumber) -> u16 {
        seq.0
    }
}

impl Add<u16> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: u16) -> SeqNumber {
        SeqNumber::new_unchecked(self.0.wrapping_add(rhs % SEQ_SPACE))
    }
}

impl Sub<u16> for SeqNumber {
    type Output = SeqNumber;

    fn sub(self, rhs: u16) -> SeqNumber {
        SeqNumber::new_unchecked(self.0 + SEQ_SPACE - rhs % SEQ_SPACE)
    }
}
