pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use prism::{
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    export,
    gesture::GestureOutcome,
    logging,
    remote::RestClient,
    runtime::{
        CrosstermEventSource, FixedTicker, ReleaseInference, Runner, TimerEvent, TriggerEdge,
        TriggerInput,
    },
    scramble::{RandomMoveScrambler, Scrambler},
    store::{MemoryStore, SolveStore, SqliteSolveStore},
    PuzzleType, Session, SessionConfig, Solve,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tracing::{info, warn};

use crate::ui::screen::current_screen;

/// terminal speed-cubing timer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal speed-cubing timer: hold space to arm, release to start, press to stop. Scrambles for every WCA puzzle, +2/DNF penalties, rolling averages and an optional remote account."
)]
pub struct Cli {
    /// puzzle to time: 222..777, pyram, skewb, sq1, clock, minx
    #[clap(short = 'p', long, global = true)]
    puzzle: Option<PuzzleType>,

    /// milliseconds space must be held before a release starts the timer
    #[clap(long)]
    hold_ms: Option<u64>,

    /// keep solves in memory only
    #[clap(long)]
    no_persist: bool,

    /// ignore the configured remote account
    #[clap(long)]
    offline: bool,

    /// path to an alternative config file
    #[clap(long)]
    config: Option<PathBuf>,

    /// log more to the state dir (-v info, -vv debug, -vvv trace)
    #[clap(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// print scrambles and exit
    Scramble {
        #[clap(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// print the statistics of a puzzle and exit
    Stats,
    /// write every solve to a CSV file
    Export { path: PathBuf },
}

impl Cli {
    /// Command line flags win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(puzzle) = self.puzzle {
            config.puzzle_type = puzzle;
        }
        if let Some(hold) = self.hold_ms {
            config.hold_duration_ms = hold;
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Timer,
    List,
    Detail,
    ConfirmClear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Date,
    Time,
}

#[derive(Debug)]
pub struct ListState {
    pub selected: usize,
    pub sort_by: SortBy,
    pub all_puzzles: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            selected: 0,
            sort_by: SortBy::Date,
            all_puzzles: false,
        }
    }
}

pub struct App {
    pub session: Session,
    pub trigger: TriggerInput,
    pub state: AppState,
    pub list: ListState,
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: Session, trigger: TriggerInput) -> Self {
        Self {
            session,
            trigger,
            state: AppState::Timer,
            list: ListState::default(),
            message: None,
            should_quit: false,
        }
    }

    /// Solves shown in the list, most recent first unless sorted by time
    pub fn visible_solves(&self) -> Vec<Solve> {
        let mut solves: Vec<Solve> = if self.list.all_puzzles {
            self.session.history().iter_recent().cloned().collect()
        } else {
            let mut s = self.session.solves();
            s.reverse();
            s
        };
        if self.list.sort_by == SortBy::Time {
            // DNF sorts last
            solves.sort_by_key(|s| s.effective_ms().unwrap_or(u64::MAX));
        }
        solves
    }

    pub fn selected_solve(&self) -> Option<Solve> {
        self.visible_solves().into_iter().nth(self.list.selected)
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // releases reach the gesture on every screen so a key still down
        // after a stop cannot leave it waiting for one
        if key.code == KeyCode::Char(' ')
            && (self.state == AppState::Timer || key.kind == KeyEventKind::Release)
        {
            let now = self.session.now_ms();
            if let Some(edge) = self.trigger.on_key(key.kind, now) {
                self.on_trigger(edge);
            }
            return;
        }

        // commands act on presses only; enhanced terminals also report releases
        if key.kind != KeyEventKind::Press {
            return;
        }

        match self.state {
            AppState::Timer => self.on_timer_key(key),
            AppState::List => self.on_list_key(key),
            AppState::Detail => self.on_detail_key(key),
            AppState::ConfirmClear => {
                if key.code == KeyCode::Char('y') {
                    self.session.clear();
                    self.list.selected = 0;
                    self.message = Some("history cleared".to_string());
                }
                self.state = AppState::List;
            }
        }
    }

    /// Returns true when the screen needs a redraw
    pub fn on_tick(&mut self) -> bool {
        let before = self.session.sync_health();
        let now = self.session.now_ms();
        let edge = self.trigger.on_tick(now);
        if let Some(edge) = edge {
            self.on_trigger(edge);
        }
        let after = self.session.poll_sync();
        edge.is_some() || before != after || self.session.is_busy()
    }

    fn on_trigger(&mut self, edge: TriggerEdge) {
        let outcome = match edge {
            TriggerEdge::Press(at) => self.session.press_at(at),
            TriggerEdge::Release(at) => self.session.release_at(at),
        };
        match outcome {
            GestureOutcome::Stopped { .. } => {
                self.message = self
                    .session
                    .last_solve()
                    .map(|s| format!("recorded {}", s.display_time()));
            }
            GestureOutcome::Armed | GestureOutcome::Started { .. } => self.message = None,
            GestureOutcome::Cancelled | GestureOutcome::Ignored => {}
        }
    }

    fn on_timer_key(&mut self, key: KeyEvent) {
        if self.session.is_busy() {
            if key.code == KeyCode::Esc {
                self.session.abort();
                self.trigger.reset();
                self.message = Some("attempt discarded".to_string());
            }
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('2') => {
                if self.session.toggle_plus_two_last() {
                    self.message = self.describe_last("penalty");
                }
            }
            KeyCode::Char('d') => {
                if self.session.toggle_dnf_last() {
                    self.message = self.describe_last("penalty");
                }
            }
            KeyCode::Char('x') | KeyCode::Backspace => {
                let shown = self.session.last_solve().map(Solve::display_time);
                if self.session.delete_last() {
                    self.message = shown.map(|t| format!("deleted {t}"));
                }
            }
            KeyCode::Char('n') => {
                self.session.new_scramble();
            }
            KeyCode::Tab => self.session.next_puzzle(),
            KeyCode::BackTab => self.session.previous_puzzle(),
            KeyCode::Char('l') => {
                self.list.selected = 0;
                self.state = AppState::List;
            }
            _ => {}
        }
    }

    fn on_list_key(&mut self, key: KeyEvent) {
        let len = self.visible_solves().len();
        let last = len.saturating_sub(1);

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('b') => self.state = AppState::Timer,
            KeyCode::Up => self.list.selected = self.list.selected.saturating_sub(1),
            KeyCode::Down => self.list.selected = (self.list.selected + 1).min(last),
            KeyCode::PageUp => self.list.selected = self.list.selected.saturating_sub(10),
            KeyCode::PageDown => self.list.selected = (self.list.selected + 10).min(last),
            KeyCode::Home => self.list.selected = 0,
            KeyCode::End => self.list.selected = last,
            KeyCode::Enter => {
                if len > 0 {
                    self.state = AppState::Detail;
                }
            }
            KeyCode::Char('f') => {
                self.list.all_puzzles = !self.list.all_puzzles;
                self.list.selected = 0;
            }
            KeyCode::Char('s') => {
                self.list.sort_by = match self.list.sort_by {
                    SortBy::Date => SortBy::Time,
                    SortBy::Time => SortBy::Date,
                };
                self.list.selected = 0;
            }
            KeyCode::Char('C') => {
                if !self.session.history().is_empty() {
                    self.state = AppState::ConfirmClear;
                }
            }
            KeyCode::Char('2') | KeyCode::Char('d') | KeyCode::Char('x') => {
                self.edit_selected(key.code);
            }
            _ => {}
        }
    }

    fn on_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('b') => self.state = AppState::List,
            KeyCode::Char('2') | KeyCode::Char('d') => self.edit_selected(key.code),
            KeyCode::Char('x') => {
                self.edit_selected(key.code);
                self.state = AppState::List;
            }
            _ => {}
        }
    }

    fn edit_selected(&mut self, code: KeyCode) {
        let Some(solve) = self.selected_solve() else {
            return;
        };
        match code {
            KeyCode::Char('2') => {
                self.session.toggle_plus_two(&solve.id);
            }
            KeyCode::Char('d') => {
                self.session.toggle_dnf(&solve.id);
            }
            KeyCode::Char('x') => {
                if self.session.delete(&solve.id) {
                    self.message = Some(format!("deleted {}", solve.display_time()));
                }
                let len = self.visible_solves().len();
                self.list.selected = self.list.selected.min(len.saturating_sub(1));
            }
            _ => {}
        }
    }

    fn describe_last(&self, what: &str) -> Option<String> {
        self.session
            .last_solve()
            .map(|s| format!("{what}: {} -> {}", s.penalty, s.display_time()))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = cli.config_store();
    let mut config = config_store.load();
    cli.apply(&mut config);

    if let Some(log_path) = AppDirs::log_path() {
        if let Err(e) = logging::init(&log_path, cli.verbose) {
            eprintln!("logging disabled: {e}");
        }
    }

    match &cli.command {
        Some(Command::Scramble { count }) => {
            let mut scrambler = RandomMoveScrambler::new();
            for _ in 0..*count {
                println!("{}", scrambler.generate(config.puzzle_type));
            }
            return Ok(());
        }
        Some(Command::Stats) => {
            let session = build_session(&cli, &config)?;
            print_stats(&session);
            return Ok(());
        }
        Some(Command::Export { path }) => {
            let session = build_session(&cli, &config)?;
            let count = export::write_csv(session.history().as_slice(), path)?;
            println!("exported {count} solves to {}", path.display());
            return Ok(());
        }
        None => {}
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let session = build_session(&cli, &config)?;

    enable_raw_mode()?;
    let enhanced = matches!(supports_keyboard_enhancement(), Ok(true));

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Windows consoles report releases without any enhancement
    let trigger = if enhanced || cfg!(windows) {
        TriggerInput::Native
    } else {
        TriggerInput::Inferred(ReleaseInference::new(
            config.release_inference.initial_gap_ms,
            config.release_inference.repeat_gap_ms,
        ))
    };
    info!(enhanced, "terminal ready");

    let mut app = App::new(session, trigger);
    let result = start_tui(
        &mut terminal,
        &mut app,
        Duration::from_millis(config.display_tick_ms.max(1)),
    );

    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // only the puzzle choice is remembered; other flags stay one-off
    let mut stored = config_store.load();
    stored.puzzle_type = app.session.puzzle();
    if let Err(e) = config_store.save(&stored) {
        warn!(error = %e, "could not save config");
    }

    result
}

fn build_session(cli: &Cli, config: &Config) -> prism::Result<Session> {
    let store: Box<dyn SolveStore> = if cli.no_persist {
        Box::new(MemoryStore::new())
    } else {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("prism.db"));
        Box::new(SqliteSolveStore::open(path)?)
    };

    let mut session = Session::new(
        SessionConfig::from(config),
        Box::new(SystemClock::new()),
        Box::new(RandomMoveScrambler::new()),
        store,
    );
    if let Err(e) = session.load() {
        warn!(error = %e, "could not read local history, starting empty");
    }

    if !cli.offline {
        if let Some(remote) = config.signed_in() {
            session.attach_remote(RestClient::new(&remote.base_url, &remote.token)?);
        }
    }
    Ok(session)
}

fn print_stats(session: &Session) {
    let summary = session.summary();
    println!(
        "{}  {} solves ({} DNF)",
        session.puzzle().label(),
        summary.count,
        summary.dnf_count
    );
    for (label, value) in summary.rows() {
        println!("{label:<6}{value:>10}");
    }
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tick: Duration,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(tick));
    terminal.draw(|f| ui(app, f))?;

    while !app.should_quit {
        match runner.step() {
            TimerEvent::Tick => {
                if app.on_tick() {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            TimerEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            TimerEvent::Key(key) => {
                app.on_key(key);
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    current_screen(&app.state).render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crossterm::event::KeyEventState;
    use prism::{clock::ManualClock, Penalty};
    use ratatui::{backend::TestBackend, Terminal};

    fn test_app() -> (App, ManualClock) {
        let clock = ManualClock::new(0);
        let session = Session::new(
            SessionConfig::default(),
            Box::new(clock.clone()),
            Box::new(RandomMoveScrambler::with_seed(4)),
            Box::new(MemoryStore::new()),
        );
        (App::new(session, TriggerInput::Native), clock)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn space(kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(' '),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn do_solve(app: &mut App, clock: &ManualClock, ms: i64) {
        app.on_key(space(KeyEventKind::Press));
        clock.advance(400);
        app.on_key(space(KeyEventKind::Release));
        clock.advance(ms);
        app.on_key(space(KeyEventKind::Press));
        app.on_key(space(KeyEventKind::Release));
    }

    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 36)).unwrap();
        terminal.draw(|f| ui(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["prism"]);
        assert_eq!(cli.puzzle, None);
        assert_eq!(cli.hold_ms, None);
        assert!(!cli.no_persist);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["prism", "-p", "sq1", "--hold-ms", "500", "-vv"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.puzzle_type, PuzzleType::Square1);
        assert_eq!(config.hold_duration_ms, 500);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_subcommands() {
        let cli = Cli::parse_from(["prism", "scramble", "-n", "5", "-p", "222"]);
        assert_eq!(cli.command, Some(Command::Scramble { count: 5 }));
        assert_eq!(cli.puzzle, Some(PuzzleType::Cube2));

        let cli = Cli::parse_from(["prism", "export", "out.csv"]);
        assert_eq!(
            cli.command,
            Some(Command::Export {
                path: PathBuf::from("out.csv")
            })
        );
        assert!(Cli::try_parse_from(["prism", "-p", "8x8"]).is_err());
    }

    #[test]
    fn test_space_gesture_records_a_solve() {
        let (mut app, clock) = test_app();
        do_solve(&mut app, &clock, 9_870);

        let last = app.session.last_solve().unwrap();
        assert_eq!(last.raw_time_ms, 9_870);
        assert_eq!(app.message.as_deref(), Some("recorded 9.87"));
    }

    #[test]
    fn test_commands_are_ignored_while_running() {
        let (mut app, clock) = test_app();
        do_solve(&mut app, &clock, 1_000);

        app.on_key(space(KeyEventKind::Press));
        clock.advance(400);
        app.on_key(space(KeyEventKind::Release));
        assert!(app.session.is_running());

        app.on_key(key(KeyCode::Char('x')));
        app.on_key(key(KeyCode::Char('q')));
        assert_eq!(app.session.history().len(), 1);
        assert!(!app.should_quit);

        app.on_key(key(KeyCode::Esc));
        assert!(!app.session.is_running());
        assert_eq!(app.session.history().len(), 1);
    }

    #[test]
    fn test_penalty_and_delete_keys() {
        let (mut app, clock) = test_app();
        do_solve(&mut app, &clock, 5_000);

        app.on_key(key(KeyCode::Char('2')));
        assert_eq!(app.session.last_solve().unwrap().penalty, Penalty::PlusTwo);
        app.on_key(key(KeyCode::Char('d')));
        assert_eq!(app.session.last_solve().unwrap().penalty, Penalty::Dnf);
        app.on_key(key(KeyCode::Backspace));
        assert!(app.session.history().is_empty());
    }

    #[test]
    fn test_release_events_do_not_trigger_commands() {
        let (mut app, _) = test_app();
        let mut release = key(KeyCode::Char('l'));
        release.kind = KeyEventKind::Release;
        app.on_key(release);
        assert_eq!(app.state, AppState::Timer);
    }

    #[test]
    fn test_space_release_on_another_screen_rearms_the_timer() {
        let (mut app, clock) = test_app();
        app.on_key(space(KeyEventKind::Press));
        clock.advance(400);
        app.on_key(space(KeyEventKind::Release));
        clock.advance(5_000);
        app.on_key(space(KeyEventKind::Press));
        assert_eq!(app.session.history().len(), 1);

        // space is still down while the list opens; its release lands there
        app.on_key(key(KeyCode::Char('l')));
        app.on_key(space(KeyEventKind::Release));
        assert_eq!(app.state, AppState::List);
        app.on_key(key(KeyCode::Char('b')));

        app.on_key(space(KeyEventKind::Press));
        assert!(app.session.is_busy());
    }

    #[test]
    fn test_list_navigation_and_clear() {
        let (mut app, clock) = test_app();
        for ms in [3_000, 1_000, 2_000] {
            do_solve(&mut app, &clock, ms);
        }

        app.on_key(key(KeyCode::Char('l')));
        assert_eq!(app.state, AppState::List);
        assert_eq!(app.selected_solve().unwrap().raw_time_ms, 2_000);

        app.on_key(key(KeyCode::Char('s')));
        assert_eq!(app.selected_solve().unwrap().raw_time_ms, 1_000);
        app.on_key(key(KeyCode::End));
        assert_eq!(app.selected_solve().unwrap().raw_time_ms, 3_000);
        app.on_key(key(KeyCode::Down));
        assert_eq!(app.list.selected, 2);

        app.on_key(key(KeyCode::Char('d')));
        assert!(app.session.history().as_slice()[0].is_dnf());

        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state, AppState::Detail);
        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.state, AppState::List);

        app.on_key(key(KeyCode::Char('C')));
        assert_eq!(app.state, AppState::ConfirmClear);
        app.on_key(key(KeyCode::Char('n')));
        assert_eq!(app.session.history().len(), 3);

        app.on_key(key(KeyCode::Char('C')));
        app.on_key(key(KeyCode::Char('y')));
        assert!(app.session.history().is_empty());
        assert_eq!(app.state, AppState::List);
    }

    #[test]
    fn test_list_filter_covers_other_puzzles() {
        let (mut app, clock) = test_app();
        do_solve(&mut app, &clock, 1_000);
        app.on_key(key(KeyCode::Tab));
        do_solve(&mut app, &clock, 2_000);

        app.on_key(key(KeyCode::Char('l')));
        assert_eq!(app.visible_solves().len(), 1);
        app.on_key(key(KeyCode::Char('f')));
        assert_eq!(app.visible_solves().len(), 2);
    }

    #[test]
    fn test_inferred_release_starts_the_timer_on_tick() {
        let clock = ManualClock::new(0);
        let session = Session::new(
            SessionConfig::default(),
            Box::new(clock.clone()),
            Box::new(RandomMoveScrambler::with_seed(4)),
            Box::new(MemoryStore::new()),
        );
        let mut app = App::new(
            session,
            TriggerInput::Inferred(ReleaseInference::new(550, 120)),
        );

        app.on_key(space(KeyEventKind::Press));
        for t in (500..=800).step_by(33) {
            clock.set(t);
            app.on_key(space(KeyEventKind::Press));
        }
        clock.set(1_000);
        assert!(app.on_tick());
        assert!(app.session.is_running());
    }

    #[test]
    fn test_ui_renders_every_screen() {
        let (mut app, clock) = test_app();
        do_solve(&mut app, &clock, 12_340);

        let timer = rendered(&mut app);
        assert!(timer.contains("12.34"));
        assert!(timer.contains("3x3"));

        app.on_key(key(KeyCode::Char('l')));
        assert!(rendered(&mut app).contains("12.34"));

        app.on_key(key(KeyCode::Enter));
        let detail = rendered(&mut app);
        assert!(detail.contains(app.session.last_solve().unwrap().scramble.split(' ').next().unwrap()));

        app.on_key(key(KeyCode::Char('b')));
        app.on_key(key(KeyCode::Char('C')));
        assert!(rendered(&mut app).contains("Clear"));
    }

    #[test]
    fn test_ui_survives_tiny_terminals() {
        let (mut app, clock) = test_app();
        do_solve(&mut app, &clock, 1_000);
        for (w, h) in [(1, 1), (10, 5), (30, 10)] {
            let mut terminal = Terminal::new(TestBackend::new(w, h)).unwrap();
            terminal.draw(|f| ui(&mut app, f)).unwrap();
        }
    }
}
