//! Lockless transposition table with XOR torn-write detection.
//!
//! Each slot is two `AtomicU64` words (16 bytes).
//!
//! ```text
//! word0:
//!   bits 63-32: key         (upper 32 bits of the fingerprint)
//!   bits 31-27: generation  (5 bits, wraps at 32)
//!   bits 25-24: bound       (2 bits)
//!   bits 23-16: depth       (8 bits)
//!   bits 15-0:  move        (16 bits)
//!
//! word1:
//!   bits 63-32: check       = key XOR (word0 & 0xFFFF_FFFF)
//!   bits 31-16: score       (i16 as u16)
//! ```
//!
//! A probe whose check word disagrees with word0 is treated as a miss. The
//! search is single-threaded, so this only guards against a stale half of a
//! slot, but it keeps the table `Sync` without locks.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use ember_core::Move;

use crate::search::negamax::MATE_THRESHOLD;

/// Bound type stored in a TT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    /// Empty slot.
    None = 0,
    /// The stored score is exact.
    Exact = 1,
    /// The stored score is a lower bound (beta cutoff).
    LowerBound = 2,
    /// The stored score is an upper bound (no move raised alpha).
    UpperBound = 3,
}

impl Bound {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => Bound::Exact,
            2 => Bound::LowerBound,
            3 => Bound::UpperBound,
            _ => Bound::None,
        }
    }
}

/// A decoded table hit.
#[derive(Debug, Clone, Copy)]
pub struct TtEntry {
    /// Best (or refuting) move from an earlier visit. May be null.
    pub best_move: Move,
    /// Remaining depth the entry was searched to.
    pub depth: i32,
    pub bound: Bound,
    /// Score, already converted back to root-relative mate distance.
    pub score: i32,
}

/// Convert a search score to node-relative form for storage.
///
/// A mate found `n` plies below this node is stored as "mate in n from here"
/// so that the same position reached along a different path reports the
/// correct distance.
pub fn score_to_tt(score: i32, ply: usize) -> i16 {
    let ply = ply as i32;
    let adjusted = if score > MATE_THRESHOLD {
        score + ply
    } else if score < -MATE_THRESHOLD {
        score - ply
    } else {
        score
    };
    adjusted.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Reverse [`score_to_tt`].
pub fn score_from_tt(score: i16, ply: usize) -> i32 {
    let score = score as i32;
    let ply = ply as i32;
    if score > MATE_THRESHOLD {
        score - ply
    } else if score < -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

struct Slot {
    word0: AtomicU64,
    word1: AtomicU64,
}

impl Slot {
    const fn new() -> Self {
        Self {
            word0: AtomicU64::new(0),
            word1: AtomicU64::new(0),
        }
    }

    fn pack_word0(key32: u32, generation: u8, bound: Bound, depth: u8, mv: Move) -> u64 {
        ((key32 as u64) << 32)
            | (((generation & 0x1F) as u64) << 27)
            | ((bound as u64) << 24)
            | ((depth as u64) << 16)
            | mv.raw() as u64
    }

    fn pack_word1(w0: u64, score: i16) -> u64 {
        let check = ((w0 >> 32) as u32) ^ (w0 as u32);
        ((check as u64) << 32) | (((score as u16) as u64) << 16)
    }

    fn decode_word0(w0: u64) -> (u8, Bound, u8, Move) {
        let generation = ((w0 >> 27) & 0x1F) as u8;
        let bound = Bound::from_bits(((w0 >> 24) & 0x03) as u8);
        let depth = ((w0 >> 16) & 0xFF) as u8;
        let mv = Move::from_raw((w0 & 0xFFFF) as u16);
        (generation, bound, depth, mv)
    }

    /// Load the slot if it is intact and belongs to `hash`.
    fn load(&self, hash: u64) -> Option<(u64, u64)> {
        let w0 = self.word0.load(Ordering::Relaxed);
        let w1 = self.word1.load(Ordering::Relaxed);

        let key32 = (w0 >> 32) as u32;
        if key32 ^ (w0 as u32) != (w1 >> 32) as u32 {
            return None;
        }
        if key32 != (hash >> 32) as u32 {
            return None;
        }
        Some((w0, w1))
    }

    fn store(&self, w0: u64, w1: u64) {
        self.word0.store(w0, Ordering::Relaxed);
        self.word1.store(w1, Ordering::Relaxed);
    }
}

/// Fixed-size transposition table indexed by the low bits of the fingerprint.
pub struct TranspositionTable {
    slots: Box<[Slot]>,
    mask: u64,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Create a table of roughly `mb` megabytes, rounded down to a power of two slots.
    pub fn new(mb: usize) -> Self {
        let bytes = mb.max(1) * 1024 * 1024;
        let slot_size = std::mem::size_of::<Slot>();
        let count = ((bytes / slot_size).next_power_of_two() >> 1).max(1);

        let slots: Box<[Slot]> = (0..count).map(|_| Slot::new()).collect();

        Self {
            slots,
            mask: (count - 1) as u64,
            generation: AtomicU8::new(0),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false`; a table has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Clear all entries and reset the generation counter.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.store(0, 0);
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Advance the generation counter. Called once per search.
    pub fn new_generation(&self) {
        let current = self.generation.load(Ordering::Relaxed);
        self.generation
            .store(current.wrapping_add(1) & 0x1F, Ordering::Relaxed);
    }

    /// Look up `hash`. `ply` is the distance from the root, used to rebase mate scores.
    pub fn probe(&self, hash: u64, ply: usize) -> Option<TtEntry> {
        let slot = &self.slots[(hash & self.mask) as usize];
        let (w0, w1) = slot.load(hash)?;
        let (_, bound, depth, best_move) = Slot::decode_word0(w0);
        if bound == Bound::None {
            return None;
        }

        let score = ((w1 >> 16) & 0xFFFF) as u16 as i16;
        Some(TtEntry {
            best_move,
            depth: depth as i32,
            bound,
            score: score_from_tt(score, ply),
        })
    }

    /// Record a search result.
    ///
    /// Replaces the resident entry if it is empty, from an older generation,
    /// not deeper than `depth`, or if the new bound is exact. Negative depths
    /// are stored as zero.
    pub fn store(&self, hash: u64, depth: i32, score: i32, best_move: Move, bound: Bound, ply: usize) {
        let slot = &self.slots[(hash & self.mask) as usize];
        let generation = self.generation.load(Ordering::Relaxed);
        let depth = depth.clamp(0, u8::MAX as i32) as u8;

        let (resident_generation, resident_bound, resident_depth, _) =
            Slot::decode_word0(slot.word0.load(Ordering::Relaxed));
        let replace = resident_bound == Bound::None
            || resident_generation != generation
            || depth >= resident_depth
            || bound == Bound::Exact;
        if !replace {
            return;
        }

        let w0 = Slot::pack_word0((hash >> 32) as u32, generation, bound, depth, best_move);
        let w1 = Slot::pack_word1(w0, score_to_tt(score, ply));
        slot.store(w0, w1);
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("slots", &self.slots.len())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}
