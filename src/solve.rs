use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Time added by a +2 penalty
pub const PLUS_TWO_MS: u64 = 2000;

/// Puzzle events. The string ids double as the wire and database values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
pub enum PuzzleType {
    #[serde(rename = "222")]
    #[strum(to_string = "222", serialize = "2x2")]
    Cube2,
    #[default]
    #[serde(rename = "333")]
    #[strum(to_string = "333", serialize = "3x3")]
    Cube3,
    #[serde(rename = "444")]
    #[strum(to_string = "444", serialize = "4x4")]
    Cube4,
    #[serde(rename = "555")]
    #[strum(to_string = "555", serialize = "5x5")]
    Cube5,
    #[serde(rename = "666")]
    #[strum(to_string = "666", serialize = "6x6")]
    Cube6,
    #[serde(rename = "777")]
    #[strum(to_string = "777", serialize = "7x7")]
    Cube7,
    #[serde(rename = "pyram")]
    #[strum(to_string = "pyram", serialize = "pyraminx")]
    Pyraminx,
    #[serde(rename = "skewb")]
    #[strum(to_string = "skewb")]
    Skewb,
    #[serde(rename = "sq1")]
    #[strum(to_string = "sq1", serialize = "square-1")]
    Square1,
    #[serde(rename = "clock")]
    #[strum(to_string = "clock")]
    Clock,
    #[serde(rename = "minx")]
    #[strum(to_string = "minx", serialize = "megaminx")]
    Megaminx,
}

impl PuzzleType {
    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            PuzzleType::Cube2 => "2x2",
            PuzzleType::Cube3 => "3x3",
            PuzzleType::Cube4 => "4x4",
            PuzzleType::Cube5 => "5x5",
            PuzzleType::Cube6 => "6x6",
            PuzzleType::Cube7 => "7x7",
            PuzzleType::Pyraminx => "Pyraminx",
            PuzzleType::Skewb => "Skewb",
            PuzzleType::Square1 => "Square-1",
            PuzzleType::Clock => "Clock",
            PuzzleType::Megaminx => "Megaminx",
        }
    }

    /// Edge length for NxN cubes, `None` for every other event
    pub fn cube_size(&self) -> Option<usize> {
        match self {
            PuzzleType::Cube2 => Some(2),
            PuzzleType::Cube3 => Some(3),
            PuzzleType::Cube4 => Some(4),
            PuzzleType::Cube5 => Some(5),
            PuzzleType::Cube6 => Some(6),
            PuzzleType::Cube7 => Some(7),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        let all: Vec<PuzzleType> = PuzzleType::iter().collect();
        let idx = all.iter().position(|p| *p == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    pub fn previous(self) -> Self {
        let all: Vec<PuzzleType> = PuzzleType::iter().collect();
        let idx = all.iter().position(|p| *p == self).unwrap_or(0);
        all[(idx + all.len() - 1) % all.len()]
    }
}

/// Penalty annotation on a recorded solve
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum Penalty {
    #[default]
    #[serde(rename = "none")]
    #[strum(to_string = "none")]
    None,
    #[serde(rename = "+2")]
    #[strum(to_string = "+2")]
    PlusTwo,
    #[serde(rename = "DNF")]
    #[strum(to_string = "DNF")]
    Dnf,
}

impl Penalty {
    /// Toggle semantics of the +2 action: same state clears, otherwise replace
    pub fn toggled_plus_two(self) -> Self {
        if self == Penalty::PlusTwo {
            Penalty::None
        } else {
            Penalty::PlusTwo
        }
    }

    pub fn toggled_dnf(self) -> Self {
        if self == Penalty::Dnf {
            Penalty::None
        } else {
            Penalty::Dnf
        }
    }
}

/// One completed timing attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solve {
    pub id: String,
    #[serde(rename = "time")]
    pub raw_time_ms: u64,
    pub scramble: String,
    pub puzzle_type: PuzzleType,
    #[serde(rename = "state", default)]
    pub penalty: Penalty,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Solve {
    pub fn new(raw_time_ms: u64, scramble: String, puzzle_type: PuzzleType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            raw_time_ms,
            scramble,
            puzzle_type,
            penalty: Penalty::None,
            created_at: Utc::now(),
        }
    }

    /// Time that counts for statistics; `None` stands for a DNF (infinite) result
    pub fn effective_ms(&self) -> Option<u64> {
        match self.penalty {
            Penalty::None => Some(self.raw_time_ms),
            Penalty::PlusTwo => Some(self.raw_time_ms + PLUS_TWO_MS),
            Penalty::Dnf => None,
        }
    }

    pub fn is_dnf(&self) -> bool {
        self.penalty == Penalty::Dnf
    }

    /// Display form: `12.34`, `14.34+` for +2, `DNF`
    pub fn display_time(&self) -> String {
        match self.penalty {
            Penalty::Dnf => "DNF".to_string(),
            Penalty::PlusTwo => format!(
                "{}+",
                crate::stats::format_ms(self.effective_ms().map(|ms| ms as f64))
            ),
            Penalty::None => crate::stats::format_ms(Some(self.raw_time_ms as f64)),
        }
    }
}
