use crate::solve::{Penalty, PuzzleType, Solve};

/// Ordered solve history, oldest first. The back is the most recent solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    solves: Vec<Solve>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_solves(mut solves: Vec<Solve>) -> Self {
        // stores may hand back any order; chronological is what stats expect
        solves.sort_by_key(|s| s.created_at);
        Self { solves }
    }

    pub fn push(&mut self, solve: Solve) {
        self.solves.push(solve);
    }

    /// Returns false when the id is unknown
    pub fn set_penalty(&mut self, id: &str, penalty: Penalty) -> bool {
        match self.solves.iter_mut().find(|s| s.id == id) {
            Some(solve) => {
                solve.penalty = penalty;
                true
            }
            None => false,
        }
    }

    /// Removes exactly one entry, keeping the relative order of the rest
    pub fn remove(&mut self, id: &str) -> Option<Solve> {
        let idx = self.solves.iter().position(|s| s.id == id)?;
        Some(self.solves.remove(idx))
    }

    /// Re-keys a solve under the id the server assigned it
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.solves.iter_mut().find(|s| s.id == from) {
            Some(solve) => {
                solve.id = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.solves.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Solve> {
        self.solves.iter().find(|s| s.id == id)
    }

    pub fn last(&self) -> Option<&Solve> {
        self.solves.last()
    }

    /// Most recent solve of a given puzzle
    pub fn last_for(&self, puzzle: PuzzleType) -> Option<&Solve> {
        self.solves.iter().rev().find(|s| s.puzzle_type == puzzle)
    }

    pub fn as_slice(&self) -> &[Solve] {
        &self.solves
    }

    /// Chronological solves of one puzzle, as fed to the statistics engine
    pub fn for_puzzle(&self, puzzle: PuzzleType) -> Vec<Solve> {
        self.solves
            .iter()
            .filter(|s| s.puzzle_type == puzzle)
            .cloned()
            .collect()
    }

    pub fn iter_recent(&self) -> impl Iterator<Item = &Solve> {
        self.solves.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.solves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solves.is_empty()
    }
}
