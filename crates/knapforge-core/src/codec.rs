//! Bounded-width encoding of partial solutions.
//!
//! A search state records only which of the most recently decided core
//! items it flipped relative to the break solution. The
//! [`PartialSolutionCodec`] assigns each newly decided position to one of
//! `width` slots in round-robin order; once a slot is reused, the decision
//! of its previous occupant is forgotten for every state and must be
//! recovered by solving the undecided items again.

use std::fmt;

use crate::error::{KnapsackError, Result};

/// Fixed-capacity bitset of `64 * WORDS` decision bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionBits<const WORDS: usize> {
    words: [u64; WORDS],
}

impl<const WORDS: usize> DecisionBits<WORDS> {
    pub const CAPACITY: usize = 64 * WORDS;

    pub const fn empty() -> Self {
        Self { words: [0; WORDS] }
    }

    pub fn get(&self, bit: usize) -> bool {
        debug_assert!(bit < Self::CAPACITY);
        self.words[bit / 64] >> (bit % 64) & 1 == 1
    }

    pub fn set(&mut self, bit: usize) {
        debug_assert!(bit < Self::CAPACITY);
        self.words[bit / 64] |= 1 << (bit % 64);
    }

    pub fn clear(&mut self, bit: usize) {
        debug_assert!(bit < Self::CAPACITY);
        self.words[bit / 64] &= !(1 << (bit % 64));
    }

    /// Returns a copy with `bit` set to `value`.
    pub fn with(mut self, bit: usize, value: bool) -> Self {
        if value {
            self.set(bit);
        } else {
            self.clear(bit);
        }
        self
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Iterates over the set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::CAPACITY).filter(move |&bit| self.get(bit))
    }
}

impl<const WORDS: usize> Default for DecisionBits<WORDS> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const WORDS: usize> fmt::Debug for DecisionBits<WORDS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

/// The code carried by every search state.
pub type PartialCode = DecisionBits<2>;

/// Per-item outcome of decoding a partial solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ForcedIn,
    ForcedOut,
    Undecided,
}

/// Maps decided core positions to bits of a [`PartialCode`].
#[derive(Debug, Clone)]
pub struct PartialSolutionCodec {
    width: usize,
    break_item: usize,
    slots: Vec<Option<usize>>,
    slot_of: Vec<Option<u8>>,
    steps: usize,
    forgotten: Vec<usize>,
}

/// A code frozen together with the slot assignment it was written under.
#[derive(Debug, Clone)]
pub struct CodecSnapshot {
    pub code: PartialCode,
    slots: Vec<Option<usize>>,
    forgotten: usize,
}

impl CodecSnapshot {
    /// Returns true when every decision behind the code is still known.
    pub fn is_complete(&self) -> bool {
        self.forgotten == 0
    }
}

impl PartialSolutionCodec {
    /// Creates a codec of `width` slots for an instance of `len` items whose
    /// break item sits at `break_item`.
    pub fn new(width: usize, break_item: usize, len: usize) -> Result<Self> {
        if width == 0 || width > PartialCode::CAPACITY {
            return Err(KnapsackError::Config(format!(
                "codec width {width} is outside 1..={}",
                PartialCode::CAPACITY
            )));
        }
        Ok(Self {
            width,
            break_item,
            slots: vec![None; width],
            slot_of: vec![None; len],
            steps: 0,
            forgotten: Vec::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Positions whose decisions have been pushed out of the window.
    pub fn forgotten(&self) -> &[usize] {
        &self.forgotten
    }

    /// Gives `position` the next slot, evicting its previous occupant.
    pub fn assign(&mut self, position: usize) -> usize {
        debug_assert!(self.slot_of[position].is_none(), "position decided twice");
        let slot = self.steps % self.width;
        if let Some(evicted) = self.slots[slot].replace(position) {
            self.slot_of[evicted] = None;
            self.forgotten.push(evicted);
        }
        self.slot_of[position] = Some(slot as u8);
        self.steps += 1;
        slot
    }

    /// Slot of `position` if it is inside the window.
    pub fn slot(&self, position: usize) -> Option<usize> {
        self.slot_of
            .get(position)
            .copied()
            .flatten()
            .map(usize::from)
    }

    fn is_left(&self, position: usize) -> bool {
        position < self.break_item
    }

    /// Marks `position` as included. No-op outside the window.
    pub fn add(&self, code: PartialCode, position: usize) -> PartialCode {
        match self.slot(position) {
            Some(slot) => code.with(slot, !self.is_left(position)),
            None => code,
        }
    }

    /// Marks `position` as excluded. No-op outside the window.
    pub fn remove(&self, code: PartialCode, position: usize) -> PartialCode {
        match self.slot(position) {
            Some(slot) => code.with(slot, self.is_left(position)),
            None => code,
        }
    }

    /// Whether `code` includes `position`; `None` outside the window.
    pub fn contains(&self, code: PartialCode, position: usize) -> Option<bool> {
        let slot = self.slot(position)?;
        Some(code.get(slot) != self.is_left(position))
    }

    /// Freezes `code` with the current slot assignment.
    pub fn snapshot(&self, code: PartialCode) -> CodecSnapshot {
        CodecSnapshot {
            code,
            slots: self.slots.clone(),
            forgotten: self.forgotten.len(),
        }
    }

    /// Decodes `code` under the current slot assignment.
    pub fn reconstruct(&self, code: PartialCode) -> Vec<Decision> {
        self.reconstruct_snapshot(&self.snapshot(code))
    }

    /// Decodes a snapshot into one decision per position.
    ///
    /// Positions that were never decided keep their break-solution value,
    /// positions forgotten before the snapshot are `Undecided`.
    pub fn reconstruct_snapshot(&self, snapshot: &CodecSnapshot) -> Vec<Decision> {
        let mut decisions: Vec<Decision> = (0..self.slot_of.len())
            .map(|pos| {
                if self.is_left(pos) {
                    Decision::ForcedIn
                } else {
                    Decision::ForcedOut
                }
            })
            .collect();
        for &pos in &self.forgotten[..snapshot.forgotten] {
            decisions[pos] = Decision::Undecided;
        }
        for (slot, pos) in snapshot.slots.iter().enumerate() {
            if let Some(pos) = *pos {
                let flipped = snapshot.code.get(slot);
                decisions[pos] = if flipped == self.is_left(pos) {
                    Decision::ForcedOut
                } else {
                    Decision::ForcedIn
                };
            }
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits() {
        let mut bits = PartialCode::empty();
        bits.set(3);
        bits.set(100);
        assert!(bits.get(3) && bits.get(100));
        assert_eq!(bits.count_ones(), 2);
        bits.clear(3);
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![100]);
        assert_eq!(PartialCode::CAPACITY, 128);
    }

    #[test]
    fn test_width_is_checked() {
        assert!(PartialSolutionCodec::new(0, 0, 4).is_err());
        assert!(PartialSolutionCodec::new(129, 0, 4).is_err());
        assert!(PartialSolutionCodec::new(128, 0, 4).is_ok());
    }

    #[test]
    fn test_reconstruct_recovers_window_decisions() {
        let mut codec = PartialSolutionCodec::new(8, 5, 10).unwrap();
        let mut code = PartialCode::empty();
        for pos in [5, 4, 6, 3] {
            codec.assign(pos);
        }
        code = codec.add(code, 5);
        code = codec.remove(code, 4);
        code = codec.remove(code, 6);
        code = codec.add(code, 3);

        assert_eq!(codec.contains(code, 5), Some(true));
        assert_eq!(codec.contains(code, 4), Some(false));
        assert_eq!(codec.contains(code, 9), None);

        let decisions = codec.reconstruct(code);
        assert_eq!(decisions[5], Decision::ForcedIn);
        assert_eq!(decisions[4], Decision::ForcedOut);
        assert_eq!(decisions[6], Decision::ForcedOut);
        assert_eq!(decisions[3], Decision::ForcedIn);
        // never decided: break-solution values
        assert_eq!(decisions[0], Decision::ForcedIn);
        assert_eq!(decisions[9], Decision::ForcedOut);
    }

    #[test]
    fn test_outside_window_is_noop() {
        let codec = PartialSolutionCodec::new(4, 2, 6).unwrap();
        let code = PartialCode::empty();
        assert_eq!(codec.add(code, 3), code);
        assert_eq!(codec.remove(code, 1), code);
    }

    #[test]
    fn test_evicted_positions_become_undecided() {
        let mut codec = PartialSolutionCodec::new(2, 3, 8).unwrap();
        let mut code = PartialCode::empty();
        for pos in [3, 2, 4, 1] {
            codec.assign(pos);
            code = codec.add(code, pos);
        }
        assert_eq!(codec.forgotten(), &[3, 2]);
        let snapshot = codec.snapshot(code);
        assert!(!snapshot.is_complete());

        let decisions = codec.reconstruct_snapshot(&snapshot);
        assert_eq!(decisions[3], Decision::Undecided);
        assert_eq!(decisions[2], Decision::Undecided);
        assert_eq!(decisions[4], Decision::ForcedIn);
        assert_eq!(decisions[1], Decision::ForcedIn);
    }

    #[test]
    fn test_snapshot_survives_later_evictions() {
        let mut codec = PartialSolutionCodec::new(2, 2, 6).unwrap();
        codec.assign(2);
        let code = codec.add(PartialCode::empty(), 2);
        let snapshot = codec.snapshot(code);
        codec.assign(1);
        codec.assign(3);

        let decisions = codec.reconstruct_snapshot(&snapshot);
        assert_eq!(decisions[2], Decision::ForcedIn);
        // decided after the snapshot: break-solution values
        assert_eq!(decisions[1], Decision::ForcedIn);
        assert_eq!(decisions[3], Decision::ForcedOut);
    }
}
