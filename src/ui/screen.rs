use ratatui::Frame;

use crate::{
    ui::solve_list::{render_confirm_clear, render_solve_detail, render_solve_list},
    App, AppState,
};

/// A UI Screen boundary; key handling stays on `App`
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Timer screen - scramble, readout, stats, trend and preview via the App widget
pub struct TimerScreen;

impl Screen for TimerScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

pub struct ListScreen;

impl Screen for ListScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_solve_list(app, f);
    }
}

pub struct DetailScreen;

impl Screen for DetailScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_solve_detail(app, f);
    }
}

/// List with the clear-all confirmation on top
pub struct ConfirmClearScreen;

impl Screen for ConfirmClearScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_solve_list(app, f);
        render_confirm_clear(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Timer => Box::new(TimerScreen),
        AppState::List => Box::new(ListScreen),
        AppState::Detail => Box::new(DetailScreen),
        AppState::ConfirmClear => Box::new(ConfirmClearScreen),
    }
}
