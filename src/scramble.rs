//! Random-move scramble generation for every supported event.

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::cube::{CubeMove, Face};
use crate::solve::PuzzleType;

/// Produces the scramble shown before an attempt
pub trait Scrambler: Send {
    fn generate(&mut self, puzzle: PuzzleType) -> String;
}

pub struct RandomMoveScrambler {
    rng: StdRng,
}

impl RandomMoveScrambler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn cube(&mut self, size: usize) -> String {
        let (faces, max_depth, length): (&[Face], usize, usize) = match size {
            2 => (&[Face::R, Face::U, Face::F][..], 1, 11),
            3 => (&Face::ALL[..], 1, 20),
            4 => (&Face::ALL[..], 2, 40),
            5 => (&Face::ALL[..], 2, 60),
            6 => (&Face::ALL[..], 3, 80),
            _ => (&Face::ALL[..], 3, 100),
        };

        let mut moves: Vec<CubeMove> = Vec::with_capacity(length);
        while moves.len() < length {
            let face = *faces.choose(&mut self.rng).unwrap_or(&Face::R);
            let depth = self.rng.gen_range(1..=max_depth);
            // 4x4 wide turns stay on U, R and F
            if depth > 1 && size == 4 && !matches!(face, Face::U | Face::R | Face::F) {
                continue;
            }
            let candidate = CubeMove {
                face,
                depth,
                turns: self.rng.gen_range(1..=3),
            };
            if redundant(&moves, candidate) {
                continue;
            }
            moves.push(candidate);
        }

        moves.iter().join(" ")
    }

    fn pyraminx(&mut self) -> String {
        let faces = ["U", "L", "R", "B"];
        let mut out: Vec<String> = Vec::new();
        let mut last: Option<&str> = None;
        while out.len() < 11 {
            let face = faces[self.rng.gen_range(0..faces.len())];
            if last == Some(face) {
                continue;
            }
            last = Some(face);
            out.push(format!("{}{}", face, self.prime()));
        }
        for tip in ["u", "l", "r", "b"] {
            match self.rng.gen_range(0..3) {
                0 => {}
                1 => out.push(tip.to_string()),
                _ => out.push(format!("{tip}'")),
            }
        }
        out.join(" ")
    }

    fn skewb(&mut self) -> String {
        let faces = ["R", "U", "L", "B"];
        let mut out: Vec<String> = Vec::new();
        let mut last: Option<&str> = None;
        while out.len() < 11 {
            let face = faces[self.rng.gen_range(0..faces.len())];
            if last == Some(face) {
                continue;
            }
            last = Some(face);
            out.push(format!("{}{}", face, self.prime()));
        }
        out.join(" ")
    }

    fn megaminx(&mut self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(7);
        for _ in 0..7 {
            let mut line: Vec<String> = Vec::with_capacity(11);
            for i in 0..10 {
                let face = if i % 2 == 0 { "R" } else { "D" };
                let dir = if self.rng.gen_bool(0.5) { "++" } else { "--" };
                line.push(format!("{face}{dir}"));
            }
            line.push(if self.rng.gen_bool(0.5) { "U" } else { "U'" }.to_string());
            lines.push(line.join(" "));
        }
        lines.join("\n")
    }

    fn clock(&mut self) -> String {
        let mut out: Vec<String> = Vec::new();
        for pins in ["UR", "DR", "DL", "UL", "U", "R", "D", "L", "ALL"] {
            out.push(format!("{pins}{}", self.clock_turn()));
        }
        out.push("y2".to_string());
        for pins in ["U", "R", "D", "L", "ALL"] {
            out.push(format!("{pins}{}", self.clock_turn()));
        }
        for pin in ["UR", "DR", "DL", "UL"] {
            if self.rng.gen_bool(0.5) {
                out.push(pin.to_string());
            }
        }
        out.join(" ")
    }

    fn clock_turn(&mut self) -> String {
        let amount: i32 = self.rng.gen_range(-5..=6);
        if amount < 0 {
            format!("{}-", -amount)
        } else {
            format!("{amount}+")
        }
    }

    fn square1(&mut self) -> String {
        let mut state = Square1::new();
        let mut out: Vec<String> = Vec::new();
        while out.len() < 12 {
            let top = self.rng.gen_range(-5..=6);
            let bottom = self.rng.gen_range(-5..=6);
            if top == 0 && bottom == 0 {
                continue;
            }
            if !state.can_twist(top, bottom) {
                continue;
            }
            state.twist(top, bottom);
            state.slash();
            out.push(format!("({top},{bottom}) /"));
        }
        out.join(" ")
    }

    fn prime(&mut self) -> &'static str {
        if self.rng.gen_bool(0.5) {
            ""
        } else {
            "'"
        }
    }
}

impl Default for RandomMoveScrambler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scrambler for RandomMoveScrambler {
    fn generate(&mut self, puzzle: PuzzleType) -> String {
        match puzzle {
            PuzzleType::Pyraminx => self.pyraminx(),
            PuzzleType::Skewb => self.skewb(),
            PuzzleType::Megaminx => self.megaminx(),
            PuzzleType::Clock => self.clock(),
            PuzzleType::Square1 => self.square1(),
            cube => self.cube(cube.cube_size().unwrap_or(3)),
        }
    }
}

/// Rejects repeats of a layer already turned in the trailing same-axis run, and
/// runs longer than two moves on one axis.
fn redundant(moves: &[CubeMove], candidate: CubeMove) -> bool {
    let axis = candidate.face.axis();
    let run: Vec<&CubeMove> = moves
        .iter()
        .rev()
        .take_while(|m| m.face.axis() == axis)
        .collect();

    run.len() >= 2
        || run
            .iter()
            .any(|m| m.face == candidate.face && m.depth == candidate.depth)
}

/// Square-1 layer shapes, tracked well enough to only emit legal slashes.
/// Each layer is 12 thirty-degree units holding a piece id; corners fill two.
#[derive(Debug, Clone)]
struct Square1 {
    top: [u8; 12],
    bottom: [u8; 12],
}

impl Square1 {
    fn new() -> Self {
        Self {
            top: [0, 0, 1, 2, 2, 3, 4, 4, 5, 6, 6, 7],
            bottom: [8, 9, 9, 10, 11, 11, 12, 13, 13, 14, 15, 15],
        }
    }

    fn rotated(layer: &[u8; 12], by: i32) -> [u8; 12] {
        let mut out = [0; 12];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = layer[(i as i32 - by).rem_euclid(12) as usize];
        }
        out
    }

    fn sliceable(layer: &[u8; 12]) -> bool {
        layer[11] != layer[0] && layer[5] != layer[6]
    }

    fn can_twist(&self, top: i32, bottom: i32) -> bool {
        Self::sliceable(&Self::rotated(&self.top, top))
            && Self::sliceable(&Self::rotated(&self.bottom, bottom))
    }

    fn twist(&mut self, top: i32, bottom: i32) {
        self.top = Self::rotated(&self.top, top);
        self.bottom = Self::rotated(&self.bottom, bottom);
    }

    /// Flips the right halves over: each lands reversed on the other layer
    fn slash(&mut self) {
        let top_half: Vec<u8> = self.top[..6].iter().rev().copied().collect();
        let bottom_half: Vec<u8> = self.bottom[..6].iter().rev().copied().collect();
        self.top[..6].copy_from_slice(&bottom_half);
        self.bottom[..6].copy_from_slice(&top_half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::{parse_alg, Cube};
    use strum::IntoEnumIterator;

    #[test]
    fn every_puzzle_gets_a_scramble() {
        let mut s = RandomMoveScrambler::with_seed(7);
        for puzzle in PuzzleType::iter() {
            assert!(!s.generate(puzzle).trim().is_empty(), "{puzzle}");
        }
    }

    #[test]
    fn cube_scrambles_have_standard_lengths() {
        let mut s = RandomMoveScrambler::with_seed(1);
        for (puzzle, len) in [
            (PuzzleType::Cube2, 11),
            (PuzzleType::Cube3, 20),
            (PuzzleType::Cube4, 40),
            (PuzzleType::Cube5, 60),
            (PuzzleType::Cube6, 80),
            (PuzzleType::Cube7, 100),
        ] {
            let scramble = s.generate(puzzle);
            let moves = parse_alg(&scramble).expect("notation parses back");
            assert_eq!(moves.len(), len, "{puzzle}: {scramble}");
            assert!(Cube::scrambled(puzzle.cube_size().unwrap(), &scramble).is_some());
        }
    }

    #[test]
    fn two_by_two_only_turns_r_u_f() {
        let mut s = RandomMoveScrambler::with_seed(3);
        let moves = parse_alg(&s.generate(PuzzleType::Cube2)).unwrap();
        assert!(moves
            .iter()
            .all(|m| matches!(m.face, Face::R | Face::U | Face::F) && m.depth == 1));
    }

    #[test]
    fn no_move_repeats_its_layer_in_an_axis_run() {
        let mut s = RandomMoveScrambler::with_seed(11);
        for _ in 0..20 {
            let moves = parse_alg(&s.generate(PuzzleType::Cube5)).unwrap();
            for pair in moves.windows(2) {
                assert!(!(pair[0].face == pair[1].face && pair[0].depth == pair[1].depth));
            }
            for triple in moves.windows(3) {
                let axes: Vec<usize> = triple.iter().map(|m| m.face.axis()).collect();
                assert!(!(axes[0] == axes[1] && axes[1] == axes[2]));
            }
        }
    }

    #[test]
    fn seeded_scramblers_are_reproducible() {
        let a = RandomMoveScrambler::with_seed(42).generate(PuzzleType::Cube3);
        let b = RandomMoveScrambler::with_seed(42).generate(PuzzleType::Cube3);
        assert_eq!(a, b);
    }

    #[test]
    fn megaminx_has_seven_lines() {
        let mut s = RandomMoveScrambler::with_seed(5);
        let scramble = s.generate(PuzzleType::Megaminx);
        let lines: Vec<&str> = scramble.lines().collect();
        assert_eq!(lines.len(), 7);
        for line in lines {
            assert_eq!(line.split_whitespace().count(), 11);
            assert!(line.ends_with('U') || line.ends_with("U'"));
        }
    }

    #[test]
    fn clock_scramble_flips_once() {
        let mut s = RandomMoveScrambler::with_seed(9);
        let scramble = s.generate(PuzzleType::Clock);
        assert_eq!(scramble.matches("y2").count(), 1);
        assert!(scramble.starts_with("UR"));
    }

    #[test]
    fn square1_twists_stay_sliceable() {
        let mut s = RandomMoveScrambler::with_seed(13);
        let scramble = s.generate(PuzzleType::Square1);
        assert_eq!(scramble.matches('/').count(), 12);

        // replay against a fresh model
        let mut state = Square1::new();
        for token in scramble.split(" /").map(str::trim).filter(|t| !t.is_empty()) {
            let inner = token.trim_start_matches('(').trim_end_matches(')');
            let (top, bottom) = inner.split_once(',').unwrap();
            let (top, bottom): (i32, i32) = (top.parse().unwrap(), bottom.parse().unwrap());
            assert!(state.can_twist(top, bottom), "{token}");
            state.twist(top, bottom);
            state.slash();
        }
    }

    #[test]
    fn square1_half_turn_is_always_legal() {
        let mut state = Square1::new();
        state.twist(2, 0);
        assert!(!Square1::sliceable(&state.top));
        let state = Square1::new();
        assert!(state.can_twist(6, 6));
        assert!(state.can_twist(0, 0));
    }
}
