use chrono::{DateTime, Local, Utc};
use prism::{cube::Cube, Penalty, Solve};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::{ui::render_cube_net, App, SortBy};

/// "3 minutes ago" style age of a solve
pub fn relative_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    HumanTime::from_seconds(secs).to_text_en(Accuracy::Rough, Tense::Past)
}

fn time_style(solve: &Solve, best: Option<u64>) -> Style {
    match solve.penalty {
        Penalty::Dnf => Style::default().fg(Color::Red),
        Penalty::PlusTwo => Style::default().fg(Color::Yellow),
        Penalty::None if best == solve.effective_ms() => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        Penalty::None => Style::default(),
    }
}

/// Pure presenter for a single list row
pub fn present_row(
    number: usize,
    solve: &Solve,
    best: Option<u64>,
    now: DateTime<Utc>,
) -> Row<'static> {
    let scramble: String = solve.scramble.replace('\n', " ");
    Row::new(vec![
        Cell::from(number.to_string()).style(Style::default().add_modifier(Modifier::DIM)),
        Cell::from(solve.display_time()).style(time_style(solve, best)),
        Cell::from(solve.puzzle_type.label()),
        Cell::from(relative_age(solve.created_at, now)),
        Cell::from(scramble),
    ])
}

/// Render the solve list screen
pub fn render_solve_list(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Solves table
            Constraint::Length(3), // Instructions
        ])
        .split(area);

    let scope = if app.list.all_puzzles {
        "all puzzles".to_string()
    } else {
        app.session.puzzle().label().to_string()
    };
    let sort = match app.list.sort_by {
        SortBy::Date => "newest first",
        SortBy::Time => "fastest first",
    };
    let solves = app.visible_solves();

    let title = Paragraph::new(format!("{} solves: {scope} ({sort})", solves.len()))
        .block(Block::default().borders(Borders::ALL).title("Solves"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if solves.is_empty() {
        let empty = Paragraph::new("No solves yet. Go back and hold space to start.")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[1]);
    } else {
        let best = prism::stats::personal_best(&solves);
        let now = Utc::now();
        let rows: Vec<Row> = solves
            .iter()
            .enumerate()
            .map(|(i, s)| present_row(i + 1, s, best, now))
            .collect();

        let header = Row::new(vec!["#", "Time", "Puzzle", "When", "Scramble"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Length(16),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default().with_selected(Some(app.list.selected));
        f.render_stateful_widget(table, chunks[1], &mut state);
    }

    let instructions = Paragraph::new(
        "↑/↓ PgUp/PgDn Home/End | (enter) detail | (2) +2 (d) DNF (x) delete\n(f)ilter puzzle/all | (s)ort date/time | (C)lear all | (b)ack",
    )
    .style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    )
    .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}

/// Render one solve with its scramble and, for cubes, the scrambled net
pub fn render_solve_detail(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let Some(solve) = app.selected_solve() else {
        render_solve_list(app, f);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(8), // facts
            Constraint::Length(6), // scramble
            Constraint::Min(0),    // preview
            Constraint::Length(1), // legend
        ])
        .split(area);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let local: DateTime<Local> = solve.created_at.with_timezone(&Local);
    let facts = vec![
        Line::from(vec![
            Span::styled("Time      ", bold),
            Span::styled(solve.display_time(), time_style(&solve, None).patch(bold)),
        ]),
        Line::from(format!(
            "Raw       {}",
            prism::stats::format_ms(Some(solve.raw_time_ms as f64))
        )),
        Line::from(format!("Penalty   {}", solve.penalty)),
        Line::from(format!("Puzzle    {}", solve.puzzle_type.label())),
        Line::from(format!(
            "Recorded  {} ({})",
            local.format("%Y-%m-%d %H:%M:%S"),
            relative_age(solve.created_at, Utc::now())
        )),
    ];
    f.render_widget(
        Paragraph::new(facts).block(Block::default().borders(Borders::ALL).title("Solve")),
        chunks[0],
    );

    let scramble = Paragraph::new(solve.scramble.clone())
        .block(Block::default().borders(Borders::ALL).title("Scramble"))
        .wrap(Wrap { trim: true });
    f.render_widget(scramble, chunks[1]);

    if let Some(cube) = solve
        .puzzle_type
        .cube_size()
        .and_then(|n| Cube::scrambled(n, &solve.scramble))
    {
        render_cube_net(&cube, chunks[2], f.buffer_mut());
    }

    let legend = Paragraph::new("(2) +2 (d) DNF (x) delete | (b)ack")
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    f.render_widget(legend, chunks[3]);
}

fn centered(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub fn render_confirm_clear(app: &mut App, f: &mut Frame) {
    let popup = centered(46, 5, f.area());
    let text = vec![
        Line::from(Span::styled(
            format!("Delete all {} solves?", app.session.history().len()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("(y)es / any other key cancels"),
    ];
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Clear history")
                    .border_style(Style::default().fg(Color::Red)),
            ),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prism::PuzzleType;

    #[test]
    fn test_relative_age_is_past_tense() {
        let now = Utc::now();
        let age = relative_age(now - Duration::minutes(5), now);
        assert!(age.contains("5 minutes"), "{age}");
        assert!(age.contains("ago"), "{age}");
    }

    #[test]
    fn test_future_timestamps_do_not_panic() {
        let now = Utc::now();
        let _ = relative_age(now + Duration::hours(1), now);
    }

    #[test]
    fn test_time_style_marks_penalties() {
        let mut s = Solve::new(1_000, "R".into(), PuzzleType::Cube3);
        assert_eq!(time_style(&s, Some(1_000)).fg, Some(Color::Green));
        s.penalty = Penalty::Dnf;
        assert_eq!(time_style(&s, Some(1_000)).fg, Some(Color::Red));
        s.penalty = Penalty::PlusTwo;
        assert_eq!(time_style(&s, None).fg, Some(Color::Yellow));
    }

    #[test]
    fn test_centered_fits_inside() {
        let r = centered(46, 5, Rect::new(0, 0, 20, 3));
        assert_eq!(r, Rect::new(0, 0, 20, 3));
        let r = centered(10, 2, Rect::new(0, 0, 30, 10));
        assert_eq!(r, Rect::new(10, 4, 10, 2));
    }
}
