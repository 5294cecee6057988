//! Killer moves, history heuristic and the MVV-LVA capture table.

use ember_core::{Color, Move, Piece};

/// Deepest ply the killer table tracks.
pub const MAX_PLY: usize = 1000;

/// Killer slots per side and ply.
pub const KILLER_SLOTS: usize = 3;

/// Quiet moves that caused beta cutoffs, per side and ply, most recent first.
pub struct KillerTable {
    slots: Box<[[[Move; KILLER_SLOTS]; MAX_PLY]; 2]>,
}

impl KillerTable {
    /// Create an empty killer table.
    pub fn new() -> Self {
        Self {
            slots: Box::new([[[Move::NULL; KILLER_SLOTS]; MAX_PLY]; 2]),
        }
    }

    /// Insert `mv` at slot 0, shifting older killers down.
    ///
    /// Re-recording the current slot 0 move is a no-op.
    pub fn store(&mut self, side: Color, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        let slots = &mut self.slots[side.to_index()][ply];
        if slots[0] == mv {
            return;
        }
        slots.copy_within(0..KILLER_SLOTS - 1, 1);
        slots[0] = mv;
    }

    /// Slot index of `mv` if it is a killer at (`side`, `ply`).
    pub fn killer_slot(&self, side: Color, ply: usize, mv: Move) -> Option<usize> {
        if ply >= MAX_PLY || mv.is_null() {
            return None;
        }
        self.slots[side.to_index()][ply]
            .iter()
            .position(|&killer| killer == mv)
    }

    /// Return `true` if `mv` is a killer at (`side`, `ply`).
    pub fn is_killer(&self, side: Color, ply: usize, mv: Move) -> bool {
        self.killer_slot(side, ply, mv).is_some()
    }

    /// The killers at (`side`, `ply`), most recent first.
    pub fn killers(&self, side: Color, ply: usize) -> [Move; KILLER_SLOTS] {
        if ply >= MAX_PLY {
            return [Move::NULL; KILLER_SLOTS];
        }
        self.slots[side.to_index()][ply]
    }

    /// Forget every killer.
    pub fn clear(&mut self) {
        for side in self.slots.iter_mut() {
            side.fill([Move::NULL; KILLER_SLOTS]);
        }
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// History heuristic indexed by `[side][origin][destination]`.
///
/// Accumulates `depth²` for every quiet move that caused a cutoff.
pub struct HistoryTable {
    table: Box<[[[i32; 64]; 64]; 2]>,
}

impl HistoryTable {
    /// Create a zeroed history table.
    pub fn new() -> Self {
        Self {
            table: Box::new([[[0; 64]; 64]; 2]),
        }
    }

    /// Reward a quiet move that caused a beta cutoff at `depth`.
    pub fn record(&mut self, side: Color, mv: Move, depth: i32) {
        let entry = &mut self.table[side.to_index()][mv.source_index()][mv.dest_index()];
        *entry = entry.saturating_add(depth.saturating_mul(depth));
    }

    /// Current history score of `mv` for `side`.
    pub fn score(&self, side: Color, mv: Move) -> i32 {
        self.table[side.to_index()][mv.source_index()][mv.dest_index()]
    }

    /// Halve every entry. Keeps the relative order of entries.
    pub fn age(&mut self) {
        for entry in self.table.iter_mut().flatten().flatten() {
            *entry /= 2;
        }
    }

    /// Zero every entry.
    pub fn clear(&mut self) {
        for entry in self.table.iter_mut().flatten().flatten() {
            *entry = 0;
        }
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Victim base values, indexed by [`Piece::to_index()`].
const MVV_LVA_BASE: [i32; 6] = [100, 200, 300, 400, 500, 600];

/// `[victim][attacker]` capture priorities: most valuable victim first,
/// least valuable attacker breaking ties.
pub const MVV_LVA: [[i32; 6]; 6] = {
    let mut table = [[0; 6]; 6];
    let mut victim = 0;
    while victim < 6 {
        let mut attacker = 0;
        while attacker < 6 {
            table[victim][attacker] = MVV_LVA_BASE[victim] + 6 - MVV_LVA_BASE[attacker] / 100;
            attacker += 1;
        }
        victim += 1;
    }
    table
};

/// Capture priority of `attacker` taking `victim`.
#[inline]
pub fn mvv_lva(victim: Piece, attacker: Piece) -> i32 {
    MVV_LVA[victim.to_index()][attacker.to_index()]
}
