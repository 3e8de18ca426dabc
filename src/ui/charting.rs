use prism::{stats, Solve};

/// `(attempt number, seconds)` for every non-DNF solve; attempt numbers keep
/// counting across DNFs so gaps stay visible
pub fn time_points(solves: &[Solve]) -> Vec<(f64, f64)> {
    solves
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.effective_ms().map(|ms| ((i + 1) as f64, ms as f64 / 1000.0)))
        .collect()
}

/// Rolling average-of-`n` in seconds, one point per attempt where it exists
pub fn rolling_average(solves: &[Solve], n: usize) -> Vec<(f64, f64)> {
    (n..=solves.len())
        .filter_map(|end| {
            stats::average_of(&solves[..end], n).map(|avg| (end as f64, avg / 1000.0))
        })
        .collect()
}

/// Compute X (attempts) and Y (seconds) bounds for the trend chart
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let mut lowest = f64::MAX;
    let mut highest = 0.0;
    for &(_, secs) in points {
        if secs > highest {
            highest = secs;
        }
        if secs < lowest {
            lowest = secs;
        }
    }
    if points.is_empty() {
        lowest = 0.0;
    }

    let last = points.last().map(|p| p.0).unwrap_or(1.0).max(1.0);

    (last, lowest.floor(), highest.ceil().max(lowest.floor() + 1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
