// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod cube;
pub mod error;
pub mod export;
pub mod gesture;
pub mod history;
pub mod logging;
pub mod remote;
pub mod runtime;
pub mod scramble;
pub mod session;
pub mod solve;
pub mod stats;
pub mod store;
pub mod sync;

pub use error::{PrismError, Result};
pub use session::{Session, SessionConfig};
pub use solve::{Penalty, PuzzleType, Solve};
