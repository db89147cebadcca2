//! Test modes, slot randomization and trial history
//!
//! A trial maps the user-visible slots (A, B, X, ...) to samples. The
//! mapping is redrawn after every recorded choice; the history keeps every
//! choice in order, with an undo cursor.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Most samples casual mode accepts
pub const MAX_CASUAL_SAMPLES: usize = 10;

/// Kind of listening test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Two samples in random order; the user records a preference
    Ab,
    /// A and B in fixed order plus X, a hidden copy of one of them
    Abx,
    /// Three slots, two identical; the user picks the odd one
    Xxy,
    /// Up to ten samples in fixed order, nothing recorded
    #[default]
    Casual,
}

impl TestMode {
    /// Number of slots the user can flip between
    pub fn slots(self, samples: usize) -> usize {
        match self {
            Self::Ab => 2,
            Self::Abx | Self::Xxy => 3,
            Self::Casual => samples,
        }
    }

    /// Whether choices are recorded
    pub fn records_choices(self) -> bool {
        self != Self::Casual
    }

    /// Whether a choice can be right or wrong
    pub fn has_answer(self) -> bool {
        matches!(self, Self::Abx | Self::Xxy)
    }

    /// Whether `slot` is a valid choice
    pub fn selectable(self, slot: usize) -> bool {
        match self {
            Self::Ab | Self::Abx => slot < 2,
            Self::Xxy => slot < 3,
            Self::Casual => false,
        }
    }

    /// Label of a slot ("A", "B", "X", "1", ...)
    pub fn slot_label(self, slot: usize) -> String {
        match (self, slot) {
            (Self::Ab, 0) | (Self::Abx, 0) => "A".into(),
            (Self::Ab, 1) | (Self::Abx, 1) => "B".into(),
            (Self::Abx, 2) => "X".into(),
            _ => (slot + 1).to_string(),
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ab => "A/B",
            Self::Abx => "A/B/X",
            Self::Xxy => "X/X/Y",
            Self::Casual => "casual",
        })
    }
}

/// Mapping from slots to samples for one trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Sample index behind each slot
    pub slots: Vec<usize>,
    /// Slot holding the right answer, for modes that have one
    pub answer: Option<usize>,
}

impl Assignment {
    /// Slot `i` plays sample `i`
    pub fn identity(samples: usize) -> Self {
        Self {
            slots: (0..samples).collect(),
            answer: None,
        }
    }

    /// Draw a fresh assignment for `mode`
    ///
    /// - A/B: the two samples in random order
    /// - A/B/X: A = sample 0, B = sample 1, X equally likely to be either
    /// - X/X/Y: the odd slot is uniform over all three, and the odd sample
    ///   uniform over both
    /// - casual: identity over `samples`
    pub fn draw<R: Rng>(mode: TestMode, samples: usize, rng: &mut R) -> Self {
        match mode {
            TestMode::Ab => {
                let mut slots = vec![0, 1];
                slots.shuffle(rng);
                Self { slots, answer: None }
            }
            TestMode::Abx => {
                let x = rng.gen_range(0..2);
                Self {
                    slots: vec![0, 1, x],
                    answer: Some(x),
                }
            }
            TestMode::Xxy => {
                let odd_slot = rng.gen_range(0..3);
                let odd_sample = rng.gen_range(0..2);
                let slots = (0..3)
                    .map(|s| if s == odd_slot { odd_sample } else { 1 - odd_sample })
                    .collect();
                Self {
                    slots,
                    answer: Some(odd_slot),
                }
            }
            TestMode::Casual => Self::identity(samples),
        }
    }

    /// Sample behind `slot`
    pub fn sample(&self, slot: usize) -> Option<usize> {
        self.slots.get(slot).copied()
    }
}

/// One recorded choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Assignment in force when the choice was made
    pub assignment: Assignment,
    /// Slot the user picked
    pub chosen_slot: usize,
    /// Sample behind that slot
    pub chosen_sample: usize,
    /// Whether the pick matched the answer (always false without one)
    pub correct: bool,
}

impl TrialRecord {
    /// Record picking `slot` under `assignment`
    pub fn new(assignment: Assignment, slot: usize) -> Self {
        let chosen_sample = assignment.sample(slot).unwrap_or(slot);
        let correct = assignment.answer == Some(slot);
        Self {
            assignment,
            chosen_slot: slot,
            chosen_sample,
            correct,
        }
    }
}

/// Ordered list of choices with an undo cursor
///
/// Entries past the cursor are undone choices that can be redone until a
/// new choice overwrites them.
#[derive(Debug, Clone, Default)]
pub struct TrialHistory {
    records: Vec<TrialRecord>,
    cursor: usize,
}

impl TrialHistory {
    /// Empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a choice, discarding any undone ones
    pub fn record(&mut self, record: TrialRecord) {
        self.records.truncate(self.cursor);
        self.records.push(record);
        self.cursor = self.records.len();
    }

    /// Step back one choice; returns false if there is none
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Re-apply the last undone choice; returns false if there is none
    pub fn redo(&mut self) -> bool {
        if self.cursor == self.records.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Choices currently in effect, oldest first
    pub fn records(&self) -> &[TrialRecord] {
        &self.records[..self.cursor]
    }

    /// Number of choices in effect
    pub fn len(&self) -> usize {
        self.cursor
    }

    /// True if no choice is in effect
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Number of correct choices in effect
    pub fn correct(&self) -> usize {
        self.records().iter().filter(|r| r.correct).count()
    }

    /// How often each sample was chosen
    pub fn preferences(&self, samples: usize) -> Vec<usize> {
        let mut counts = vec![0; samples];
        for r in self.records() {
            if let Some(c) = counts.get_mut(r.chosen_sample) {
                *c += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ab_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let a = Assignment::draw(TestMode::Ab, 2, &mut rng);
            let mut sorted = a.slots.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1]);
            assert_eq!(a.answer, None);
        }
    }

    #[test]
    fn abx_fixes_a_and_b() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let a = Assignment::draw(TestMode::Abx, 2, &mut rng);
            assert_eq!(a.slots[..2], [0, 1]);
            let answer = a.answer.unwrap();
            assert_eq!(a.slots[2], a.slots[answer]);
        }
    }

    #[test]
    fn xxy_has_exactly_one_odd_slot() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let a = Assignment::draw(TestMode::Xxy, 2, &mut rng);
            let odd = a.answer.unwrap();
            let others: Vec<usize> = (0..3).filter(|&s| s != odd).map(|s| a.slots[s]).collect();
            assert_eq!(others[0], others[1]);
            assert_ne!(a.slots[odd], others[0]);
        }
    }

    #[test]
    fn casual_is_identity() {
        let a = Assignment::draw(TestMode::Casual, 5, &mut StdRng::seed_from_u64(4));
        assert_eq!(a.slots, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn record_marks_correctness() {
        let assignment = Assignment {
            slots: vec![0, 1, 1],
            answer: Some(1),
        };
        assert!(TrialRecord::new(assignment.clone(), 1).correct);
        let wrong = TrialRecord::new(assignment, 0);
        assert!(!wrong.correct);
        assert_eq!(wrong.chosen_sample, 0);
    }

    #[test]
    fn undo_redo_walks_the_history() {
        let mut h = TrialHistory::new();
        let pick = |slot| TrialRecord::new(Assignment { slots: vec![0, 1, 0], answer: Some(0) }, slot);
        h.record(pick(0));
        h.record(pick(1));
        assert_eq!((h.len(), h.correct()), (2, 1));

        assert!(h.undo());
        assert_eq!((h.len(), h.correct()), (1, 1));
        assert!(h.redo());
        assert_eq!(h.len(), 2);
        assert!(!h.redo());

        assert!(h.undo());
        assert!(h.undo());
        assert!(!h.undo());
        h.record(pick(1));
        assert_eq!(h.len(), 1);
        assert!(!h.redo(), "a new choice discards undone ones");
    }

    #[test]
    fn preferences_count_samples_not_slots() {
        let mut h = TrialHistory::new();
        h.record(TrialRecord::new(Assignment { slots: vec![1, 0], answer: None }, 0));
        h.record(TrialRecord::new(Assignment { slots: vec![0, 1], answer: None }, 1));
        h.record(TrialRecord::new(Assignment { slots: vec![0, 1], answer: None }, 0));
        assert_eq!(h.preferences(2), vec![1, 2]);
    }
}
