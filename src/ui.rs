pub mod charting;
pub mod screen;
pub mod solve_list;

use prism::{
    cube::{Cube, Face},
    gesture::{GestureState, Signal},
    stats,
    sync::SyncHealth,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

/// Solves plotted in the trend chart
const CHART_WINDOW: usize = 100;

fn sticker_color(face: Face) -> Color {
    match face {
        Face::U => Color::White,
        Face::D => Color::Yellow,
        Face::F => Color::Green,
        Face::B => Color::Blue,
        Face::R => Color::Red,
        Face::L => Color::Rgb(255, 165, 0),
    }
}

/// Readout color for the hold feedback
pub fn signal_color(signal: Signal) -> Color {
    match signal {
        Signal::Neutral => Color::Reset,
        Signal::Charging => Color::Red,
        Signal::Ready => Color::Green,
    }
}

/// Draws the unfolded net (U on top, L F R B across, D below), two cells per
/// sticker. Nothing is drawn when the area is too small.
pub fn render_cube_net(cube: &Cube, area: Rect, buf: &mut Buffer) {
    let n = cube.size() as u16;
    let (width, height) = (n * 2 * 4 + 3, n * 3 + 2);
    if area.width < width || area.height < height {
        return;
    }
    let x0 = area.x + (area.width - width) / 2;
    let y0 = area.y + (area.height - height) / 2;

    let mut draw = |face: Face, col: u16, row: u16| {
        for (r, line) in cube.face_grid(face).iter().enumerate() {
            for (c, color) in line.iter().enumerate() {
                let x = x0 + col * (n * 2 + 1) + c as u16 * 2;
                let y = y0 + row * (n + 1) + r as u16;
                buf.set_string(x, y, "██", Style::default().fg(sticker_color(*color)));
            }
        }
    };

    draw(Face::U, 1, 0);
    draw(Face::L, 0, 1);
    draw(Face::F, 1, 1);
    draw(Face::R, 2, 1);
    draw(Face::B, 3, 1);
    draw(Face::D, 1, 2);
}

/// Lines a text needs at a given width, counting display columns
fn wrapped_height(text: &str, width: u16) -> u16 {
    let width = width.max(1) as usize;
    text.lines()
        .map(|line| (line.width().max(1)).div_ceil(width) as u16)
        .sum::<u16>()
        .max(1)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let magenta_style = Style::default().fg(Color::Magenta);
        let cyan_style = Style::default().fg(Color::Cyan);

        let inner_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2);
        let scramble_lines = wrapped_height(session.scramble(), inner_width).min(8);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),              // header
                Constraint::Length(1),              // padding
                Constraint::Length(scramble_lines), // scramble
                Constraint::Length(1),              // padding
                Constraint::Length(3),              // readout
                Constraint::Min(0),                 // stats / chart / preview
                Constraint::Length(1),              // status
                Constraint::Length(1),              // legend
            ])
            .split(area);

        // header
        let sync = match session.sync_health() {
            SyncHealth::Local => Span::styled("local", dim_style),
            SyncHealth::Synced => Span::styled("synced", Style::default().fg(Color::Green)),
            health @ SyncHealth::Offline { .. } => {
                Span::styled(health.label(), Style::default().fg(Color::Red))
            }
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled("prism  ", dim_style),
            Span::styled(session.puzzle().label(), bold_style.fg(Color::Cyan)),
            Span::styled(
                format!("  {} solves   ", session.solves().len()),
                dim_style,
            ),
            sync,
        ]));
        header.render(chunks[0], buf);

        // scramble
        let scramble_alignment = if session.scramble().width() <= inner_width as usize {
            // short scrambles sit centred
            Alignment::Center
        } else {
            Alignment::Left
        };
        Paragraph::new(session.scramble().to_string())
            .style(bold_style)
            .alignment(scramble_alignment)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        // readout
        let (readout, readout_style) = match session.gesture_state() {
            GestureState::Running { .. } => (
                stats::format_ms(session.live_elapsed().map(|ms| ms as f64)),
                bold_style,
            ),
            GestureState::Holding { .. } => (
                "0.00".to_string(),
                bold_style.fg(signal_color(session.signal())),
            ),
            GestureState::Idle => (
                session
                    .last_solve()
                    .map(|s| s.display_time())
                    .unwrap_or_else(|| "0.00".to_string()),
                bold_style,
            ),
        };
        Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(readout, readout_style)),
        ])
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

        // stats | chart | preview
        let preview = session.scramble_preview();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(22),
                Constraint::Min(10),
                Constraint::Length(if preview.is_some() { 60 } else { 0 }),
            ])
            .split(chunks[5]);

        let summary = session.summary();
        let mut stat_lines: Vec<Line> = summary
            .rows()
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{label:<6}"), dim_style),
                    Span::styled(format!("{value:>10}"), bold_style),
                ])
            })
            .collect();
        stat_lines.push(Line::from(Span::styled(
            format!("{}/{} valid", summary.valid_count(), summary.count),
            dim_style,
        )));
        Paragraph::new(stat_lines)
            .block(Block::default().borders(Borders::ALL).title("Stats"))
            .render(columns[0], buf);

        let solves = session.solves();
        let recent = &solves[solves.len().saturating_sub(CHART_WINDOW)..];
        let points = charting::time_points(recent);
        if points.len() >= 2 {
            let window = session.average_windows().first().copied().unwrap_or(5);
            let trend = charting::rolling_average(recent, window);
            let (last, lowest, highest) = charting::compute_chart_params(&points);

            let datasets = vec![
                Dataset::default()
                    .name("time")
                    .marker(ratatui::symbols::Marker::Braille)
                    .style(magenta_style)
                    .graph_type(GraphType::Line)
                    .data(&points),
                Dataset::default()
                    .name(format!("ao{window}"))
                    .marker(ratatui::symbols::Marker::Braille)
                    .style(cyan_style)
                    .graph_type(GraphType::Line)
                    .data(&trend),
            ];

            Chart::new(datasets)
                .block(Block::default().borders(Borders::ALL).title("Trend"))
                .x_axis(Axis::default().bounds([1.0, last]).labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(charting::format_label(last), bold_style),
                ]))
                .y_axis(
                    Axis::default()
                        .title("s")
                        .bounds([lowest, highest])
                        .labels(vec![
                            Span::styled(charting::format_label(lowest), bold_style),
                            Span::styled(charting::format_label(highest), bold_style),
                        ]),
                )
                .render(columns[1], buf);
        } else {
            Paragraph::new(Span::styled("trend shows after two solves", italic_style))
                .block(Block::default().borders(Borders::ALL).title("Trend"))
                .alignment(Alignment::Center)
                .render(columns[1], buf);
        }

        if let Some(cube) = &preview {
            render_cube_net(cube, columns[2], buf);
        }

        // status
        let status = match (session.store_error(), &self.message) {
            (Some(err), _) => Span::styled(
                format!("not saved: {err}"),
                Style::default().fg(Color::Red),
            ),
            (None, Some(msg)) => Span::styled(msg.clone(), italic_style.fg(Color::Cyan)),
            (None, None) => Span::raw(""),
        };
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(chunks[6], buf);

        let legend = Paragraph::new(Span::styled(
            if session.is_busy() {
                "(space) stop / (esc) discard"
            } else {
                "(space) hold+release / (2) +2 / (d)nf / (x) delete / (n)ew scramble / (tab) puzzle / (l)ist / (esc)ape"
            },
            italic_style,
        ));
        legend.render(chunks[7], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_cube_net_draws_every_sticker() {
        let cube = Cube::new(3);
        let area = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(area);
        render_cube_net(&cube, area, &mut buf);

        // 6 faces x 9 stickers x 2 cells
        let filled = buf.content().iter().filter(|c| c.symbol() == "█").count();
        assert_eq!(filled, 6 * 9 * 2);
    }

    #[test]
    fn test_cube_net_skips_small_areas() {
        let cube = Cube::new(7);
        let area = Rect::new(0, 0, 30, 10);
        let mut buf = Buffer::empty(area);
        render_cube_net(&cube, area, &mut buf);
        assert!(!buffer_text(&buf).contains('█'));
    }

    #[test]
    fn test_cube_net_colors_follow_faces() {
        let cube = Cube::new(2);
        let area = Rect::new(0, 0, 19, 8);
        let mut buf = Buffer::empty(area);
        render_cube_net(&cube, area, &mut buf);

        // first U sticker sits one face width in
        assert_eq!(buf[(5, 0)].fg, Color::White);
        // first F sticker on the middle band
        assert_eq!(buf[(5, 3)].fg, Color::Green);
    }

    #[test]
    fn test_wrapped_height() {
        assert_eq!(wrapped_height("", 10), 1);
        assert_eq!(wrapped_height("R U R' U'", 20), 1);
        assert_eq!(wrapped_height("R U R' U'", 4), 3);
        assert_eq!(wrapped_height("a\nb\nc", 10), 3);
    }

    #[test]
    fn test_signal_colors() {
        assert_eq!(signal_color(Signal::Ready), Color::Green);
        assert_eq!(signal_color(Signal::Charging), Color::Red);
        assert_eq!(signal_color(Signal::Neutral), Color::Reset);
    }
}
