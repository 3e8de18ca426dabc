//! NxN cube facelet model used to draw a scramble preview.
//!
//! Stickers live in doubled integer coordinates: cubie centres sit at
//! `-(n-1), -(n-3), .., n-1` on every axis, so layer tests and quarter turns
//! stay exact. x points right, y up, z towards the viewer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    U,
    D,
    L,
    R,
    F,
    B,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::U, Face::D, Face::L, Face::R, Face::F, Face::B];

    /// 0 = x (L/R), 1 = y (U/D), 2 = z (F/B)
    pub fn axis(self) -> usize {
        match self {
            Face::L | Face::R => 0,
            Face::U | Face::D => 1,
            Face::F | Face::B => 2,
        }
    }

    fn sign(self) -> i32 {
        match self {
            Face::R | Face::U | Face::F => 1,
            Face::L | Face::D | Face::B => -1,
        }
    }

    fn normal(self) -> [i32; 3] {
        let mut n = [0; 3];
        n[self.axis()] = self.sign();
        n
    }

    pub fn letter(self) -> char {
        match self {
            Face::U => 'U',
            Face::D => 'D',
            Face::L => 'L',
            Face::R => 'R',
            Face::F => 'F',
            Face::B => 'B',
        }
    }

    fn from_letter(c: char) -> Option<Face> {
        Face::ALL.into_iter().find(|f| f.letter() == c)
    }
}

/// A turn of the `depth` outermost layers on `face`, `turns` quarter turns clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeMove {
    pub face: Face,
    pub depth: usize,
    pub turns: u8,
}

impl CubeMove {
    pub fn inverse(self) -> Self {
        Self {
            turns: (4 - self.turns % 4) % 4,
            ..self
        }
    }

    /// Parses WCA outer/wide notation: `R`, `U'`, `F2`, `Rw`, `3Uw'`
    pub fn parse(token: &str) -> Option<Self> {
        let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
        let mut rest = token[digits.len()..].chars();
        let face = Face::from_letter(rest.next()?)?;
        let mut rest: String = rest.collect();

        let wide = rest.starts_with('w');
        if wide {
            rest.remove(0);
        }
        let depth = match (wide, digits.is_empty()) {
            (false, true) => 1,
            (true, true) => 2,
            (true, false) => digits.parse().ok().filter(|d| *d >= 2)?,
            // plain slice moves like `3R` are not part of the notation we emit
            (false, false) => return None,
        };
        let turns = match rest.as_str() {
            "" => 1,
            "'" => 3,
            "2" | "2'" => 2,
            _ => return None,
        };

        Some(Self { face, depth, turns })
    }
}

impl fmt::Display for CubeMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.depth {
            1 => write!(f, "{}", self.face.letter())?,
            2 => write!(f, "{}w", self.face.letter())?,
            d => write!(f, "{}{}w", d, self.face.letter())?,
        }
        match self.turns % 4 {
            2 => write!(f, "2"),
            3 => write!(f, "'"),
            _ => Ok(()),
        }
    }
}

pub fn parse_alg(alg: &str) -> Option<Vec<CubeMove>> {
    alg.split_whitespace().map(CubeMove::parse).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sticker {
    pos: [i32; 3],
    normal: [i32; 3],
    color: Face,
}

/// +90 degrees about `axis`, right-hand rule
fn rotate(v: [i32; 3], axis: usize) -> [i32; 3] {
    let [x, y, z] = v;
    match axis {
        0 => [x, -z, y],
        1 => [z, y, -x],
        _ => [-y, x, z],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cube {
    size: usize,
    stickers: Vec<Sticker>,
}

impl Cube {
    pub fn new(size: usize) -> Self {
        let n = size as i32;
        let coords: Vec<i32> = (0..n).map(|i| 2 * i - (n - 1)).collect();
        let mut stickers = Vec::with_capacity(6 * size * size);

        for face in Face::ALL {
            let axis = face.axis();
            let (a1, a2) = ((axis + 1) % 3, (axis + 2) % 3);
            for &c1 in &coords {
                for &c2 in &coords {
                    let mut pos = [0; 3];
                    pos[axis] = face.sign() * (n - 1);
                    pos[a1] = c1;
                    pos[a2] = c2;
                    stickers.push(Sticker {
                        pos,
                        normal: face.normal(),
                        color: face,
                    });
                }
            }
        }

        Self { size, stickers }
    }

    /// Solved cube with `alg` applied, `None` when the notation is not understood
    pub fn scrambled(size: usize, alg: &str) -> Option<Self> {
        let moves = parse_alg(alg)?;
        let mut cube = Self::new(size);
        for m in moves {
            cube.apply(m);
        }
        Some(cube)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn apply(&mut self, m: CubeMove) {
        let n = self.size as i32;
        let axis = m.face.axis();
        let sign = m.face.sign();
        let depth = m.depth.min(self.size) as i32;
        let threshold = (n - 1) - 2 * (depth - 1);

        // clockwise seen from the face is a negative turn about its own axis
        let plus_quarters = ((4 - (m.turns % 4) as i32) * sign).rem_euclid(4);

        for s in self.stickers.iter_mut() {
            if s.pos[axis] * sign < threshold {
                continue;
            }
            for _ in 0..plus_quarters {
                s.pos = rotate(s.pos, axis);
                s.normal = rotate(s.normal, axis);
            }
        }
    }

    /// Colors of one face as seen in the unfolded net, row 0 on top
    pub fn face_grid(&self, face: Face) -> Vec<Vec<Face>> {
        let n = self.size as i32;
        let mut grid = vec![vec![face; self.size]; self.size];
        let idx = |v: i32| ((v + (n - 1)) / 2) as usize;
        let rev = |v: i32| (((n - 1) - v) / 2) as usize;

        for s in self.stickers.iter().filter(|s| s.normal == face.normal()) {
            let [x, y, z] = s.pos;
            let (row, col) = match face {
                Face::U => (idx(z), idx(x)),
                Face::D => (rev(z), idx(x)),
                Face::F => (rev(y), idx(x)),
                Face::B => (rev(y), rev(x)),
                Face::R => (rev(y), rev(z)),
                Face::L => (rev(y), idx(z)),
            };
            grid[row][col] = s.color;
        }
        grid
    }

    pub fn is_solved(&self) -> bool {
        Face::ALL.into_iter().all(|face| {
            let grid = self.face_grid(face);
            let first = grid[0][0];
            grid.iter().flatten().all(|c| *c == first)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_alg(cube: &mut Cube, alg: &str) {
        for m in parse_alg(alg).unwrap() {
            cube.apply(m);
        }
    }

    #[test]
    fn parses_and_prints_notation() {
        for token in ["R", "U'", "F2", "Rw", "Bw'", "3Uw2", "Lw2"] {
            let m = CubeMove::parse(token).unwrap();
            assert_eq!(m.to_string(), token);
        }
        assert_eq!(CubeMove::parse("R2'").unwrap().to_string(), "R2");
        assert!(CubeMove::parse("3R").is_none());
        assert!(CubeMove::parse("x").is_none());
        assert!(CubeMove::parse("R3").is_none());
        assert!(parse_alg("R U ++").is_none());
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        for size in 2..=7 {
            for face in Face::ALL {
                for depth in 1..=size / 2 {
                    let mut cube = Cube::new(size);
                    let m = CubeMove {
                        face,
                        depth,
                        turns: 1,
                    };
                    for _ in 0..4 {
                        cube.apply(m);
                    }
                    assert!(cube.is_solved(), "{size} {m}");
                }
            }
        }
    }

    #[test]
    fn sexy_move_has_order_six() {
        let mut cube = Cube::new(3);
        apply_alg(&mut cube, "R U R' U'");
        assert!(!cube.is_solved());
        for _ in 0..5 {
            apply_alg(&mut cube, "R U R' U'");
        }
        assert!(cube.is_solved());
    }

    #[test]
    fn r_turn_moves_down_stickers_to_front() {
        let mut cube = Cube::new(3);
        apply_alg(&mut cube, "R");

        let front = cube.face_grid(Face::F);
        for row in &front {
            assert_eq!(row[2], Face::D);
            assert_eq!(row[0], Face::F);
        }
        let up = cube.face_grid(Face::U);
        for row in &up {
            assert_eq!(row[2], Face::F);
        }
    }

    #[test]
    fn u_turn_moves_front_row_to_left() {
        let mut cube = Cube::new(3);
        apply_alg(&mut cube, "U");

        assert_eq!(cube.face_grid(Face::L)[0], vec![Face::F; 3]);
        assert_eq!(cube.face_grid(Face::F)[0], vec![Face::R; 3]);
        assert_eq!(cube.face_grid(Face::F)[1], vec![Face::F; 3]);
    }

    #[test]
    fn wide_turn_moves_two_layers() {
        let mut cube = Cube::new(4);
        apply_alg(&mut cube, "Rw");

        let front = cube.face_grid(Face::F);
        for row in &front {
            assert_eq!(row[..], [Face::F, Face::F, Face::D, Face::D]);
        }
    }

    #[test]
    fn inverse_scramble_restores_the_cube() {
        let alg = "R U2 F' Lw D B2 3Rw' U";
        let moves = parse_alg(alg).unwrap();
        let mut cube = Cube::new(6);
        for m in &moves {
            cube.apply(*m);
        }
        assert!(!cube.is_solved());
        for m in moves.iter().rev() {
            cube.apply(m.inverse());
        }
        assert!(cube.is_solved());
    }

    #[test]
    fn every_color_keeps_its_sticker_count() {
        let cube = Cube::scrambled(5, "R U F' Dw2 Lw B' U2 Rw").unwrap();
        for color in Face::ALL {
            let count = Face::ALL
                .into_iter()
                .flat_map(|f| cube.face_grid(f).into_iter().flatten())
                .filter(|c| *c == color)
                .count();
            assert_eq!(count, 25);
        }
    }
}
