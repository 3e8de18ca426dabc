//! Statistics over a chronologically ordered solve slice.
//!
//! Every function is pure and reads effective times only. DNF results never
//! take part in best/worst/mean; inside an average-of-N window a single DNF
//! voids the whole average.

use crate::solve::Solve;

/// Placeholder rendered for a statistic that does not exist yet
pub const PLACEHOLDER: &str = "--";

fn valid_times(solves: &[Solve]) -> impl Iterator<Item = u64> + '_ {
    solves.iter().filter_map(Solve::effective_ms)
}

fn mean(times: &[u64]) -> Option<f64> {
    match times.len() {
        0 => None,
        count => Some(times.iter().sum::<u64>() as f64 / count as f64),
    }
}

fn std_dev(times: &[u64]) -> Option<f64> {
    let avg = mean(times)?;
    let variance = times
        .iter()
        .map(|&t| {
            let diff = avg - t as f64;
            diff * diff
        })
        .sum::<f64>()
        / times.len() as f64;

    Some(variance.sqrt())
}

pub fn personal_best(solves: &[Solve]) -> Option<u64> {
    valid_times(solves).min()
}

pub fn personal_worst(solves: &[Solve]) -> Option<u64> {
    valid_times(solves).max()
}

/// Mean of all non-DNF effective times. DNFs are left out, not counted as infinite.
pub fn current_average(solves: &[Solve]) -> Option<f64> {
    let times: Vec<u64> = valid_times(solves).collect();
    mean(&times)
}

/// Population standard deviation of all non-DNF effective times
pub fn deviation(solves: &[Solve]) -> Option<f64> {
    let times: Vec<u64> = valid_times(solves).collect();
    std_dev(&times)
}

/// Trimmed mean of the `n` most recent solves (single best and worst dropped).
///
/// `None` when fewer than `n` solves exist, when the window holds a DNF, or
/// when `n < 3` leaves nothing to average.
pub fn average_of(solves: &[Solve], n: usize) -> Option<f64> {
    if n < 3 || solves.len() < n {
        return None;
    }

    let window = &solves[solves.len() - n..];
    let mut times: Vec<u64> = valid_times(window).collect();
    if times.len() < n {
        return None;
    }

    times.sort_unstable();
    mean(&times[1..n - 1])
}

/// Milliseconds as seconds with two decimals, or the placeholder
pub fn format_ms(ms: Option<f64>) -> String {
    match ms {
        Some(ms) => format!("{:.2}", ms / 1000.0),
        None => PLACEHOLDER.to_string(),
    }
}

/// Everything the stats panel shows for one puzzle
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub dnf_count: usize,
    pub best: Option<u64>,
    pub worst: Option<u64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub averages: Vec<(usize, Option<f64>)>,
}

impl Summary {
    pub fn compute(solves: &[Solve], windows: &[usize]) -> Self {
        let dnf_count = solves.iter().filter(|s| s.is_dnf()).count();
        Self {
            count: solves.len(),
            dnf_count,
            best: personal_best(solves),
            worst: personal_worst(solves),
            mean: current_average(solves),
            std_dev: deviation(solves),
            averages: windows.iter().map(|&n| (n, average_of(solves, n))).collect(),
        }
    }

    pub fn valid_count(&self) -> usize {
        self.count - self.dnf_count
    }

    /// Label/value rows in display order
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("PB".to_string(), format_ms(self.best.map(|v| v as f64))),
            ("PW".to_string(), format_ms(self.worst.map(|v| v as f64))),
        ];
        rows.extend(
            self.averages
                .iter()
                .map(|(n, avg)| (format!("Ao{n}"), format_ms(*avg))),
        );
        rows.push(("Mean".to_string(), format_ms(self.mean)));
        rows.push(("σ".to_string(), format_ms(self.std_dev)));
        rows
    }
}
