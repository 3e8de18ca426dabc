use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{PrismError, Result};
use crate::solve::{Penalty, PuzzleType, Solve};

/// Local key-value style persistence: the whole history in, the whole history out
pub trait SolveStore {
    fn load(&self) -> Result<Vec<Solve>>;
    fn save(&mut self, solves: &[Solve]) -> Result<()>;
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS solves (
        id TEXT PRIMARY KEY,
        seq INTEGER NOT NULL,
        time_ms INTEGER NOT NULL,
        scramble TEXT NOT NULL,
        puzzle_type TEXT NOT NULL,
        state TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_solves_seq ON solves(seq);
"#;

/// SQLite backed store under the state directory
#[derive(Debug)]
pub struct SqliteSolveStore {
    conn: Connection,
}

impl SqliteSolveStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened solve store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM solves", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn text_column_error(idx: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, name.to_string(), rusqlite::types::Type::Text)
}

impl SolveStore for SqliteSolveStore {
    fn load(&self) -> Result<Vec<Solve>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, time_ms, scramble, puzzle_type, state, created_at
            FROM solves
            ORDER BY seq ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let puzzle: String = row.get(3)?;
            let state: String = row.get(4)?;
            let created_at: String = row.get(5)?;

            Ok(Solve {
                id: row.get(0)?,
                raw_time_ms: row.get::<_, i64>(1)?.max(0) as u64,
                scramble: row.get(2)?,
                puzzle_type: PuzzleType::from_str(&puzzle)
                    .map_err(|_| text_column_error(3, "puzzle_type"))?,
                penalty: Penalty::from_str(&state).map_err(|_| text_column_error(4, "state"))?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|_| text_column_error(5, "created_at"))?
                    .with_timezone(&Utc),
            })
        })?;

        let mut solves = Vec::new();
        for solve in rows {
            solves.push(solve?);
        }
        Ok(solves)
    }

    fn save(&mut self, solves: &[Solve]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM solves", [])?;
        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO solves (id, seq, time_ms, scramble, puzzle_type, state, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for (seq, solve) in solves.iter().enumerate() {
                insert.execute(params![
                    solve.id,
                    seq as i64,
                    solve.raw_time_ms as i64,
                    solve.scramble,
                    solve.puzzle_type.to_string(),
                    solve.penalty.to_string(),
                    solve.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = solves.len(), "saved solves");
        Ok(())
    }
}

/// Volatile store; clones share the same contents
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    solves: Arc<Mutex<Vec<Solve>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solves(solves: Vec<Solve>) -> Self {
        Self {
            solves: Arc::new(Mutex::new(solves)),
        }
    }

    pub fn snapshot(&self) -> Vec<Solve> {
        self.solves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl SolveStore for MemoryStore {
    fn load(&self) -> Result<Vec<Solve>> {
        Ok(self.snapshot())
    }

    fn save(&mut self, solves: &[Solve]) -> Result<()> {
        let mut guard = self
            .solves
            .lock()
            .map_err(|_| PrismError::Config("memory store poisoned".into()))?;
        *guard = solves.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Solve> {
        let mut a = Solve::new(12_340, "R U R' U'".into(), PuzzleType::Cube3);
        a.penalty = Penalty::PlusTwo;
        let mut b = Solve::new(45_000, "(1,0) / (3,3) /".into(), PuzzleType::Square1);
        b.penalty = Penalty::Dnf;
        let c = Solve::new(3_100, "U L R' b".into(), PuzzleType::Pyraminx);
        vec![a, b, c]
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() {
        let mut store = SqliteSolveStore::open_in_memory().unwrap();
        let solves = sample();
        store.save(&solves).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 3);
        for (a, b) in loaded.iter().zip(solves.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.raw_time_ms, b.raw_time_ms);
            assert_eq!(a.penalty, b.penalty);
            assert_eq!(a.puzzle_type, b.puzzle_type);
            assert_eq!(a.scramble, b.scramble);
            assert_eq!(a.created_at.timestamp_millis(), b.created_at.timestamp_millis());
        }
    }

    #[test]
    fn save_replaces_previous_contents() {
        let mut store = SqliteSolveStore::open_in_memory().unwrap();
        let solves = sample();
        store.save(&solves).unwrap();
        store.save(&solves[..1]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        store.save(&[]).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("solves.db");
        {
            let mut store = SqliteSolveStore::open(&path).unwrap();
            store.save(&sample()).unwrap();
        }
        let store = SqliteSolveStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn memory_store_clones_share_contents() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap().len(), 3);
    }
}
