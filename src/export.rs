use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::solve::Solve;

const HEADER: [&str; 8] = [
    "id",
    "timestamp",
    "puzzle",
    "time_ms",
    "penalty",
    "effective_ms",
    "display",
    "scramble",
];

pub fn write_csv(solves: &[Solve], path: &Path) -> Result<usize> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    write_rows(solves, &mut writer)
}

/// One row per solve in history order; a DNF has an empty `effective_ms`
pub fn write_rows<W: Write>(solves: &[Solve], writer: &mut csv::Writer<W>) -> Result<usize> {
    writer.write_record(HEADER)?;
    for solve in solves {
        writer.write_record([
            solve.id.clone(),
            solve.created_at.to_rfc3339(),
            solve.puzzle_type.to_string(),
            solve.raw_time_ms.to_string(),
            solve.penalty.to_string(),
            solve.effective_ms().map(|ms| ms.to_string()).unwrap_or_default(),
            solve.display_time(),
            solve.scramble.replace('\n', " "),
        ])?;
    }
    writer.flush()?;
    Ok(solves.len())
}
