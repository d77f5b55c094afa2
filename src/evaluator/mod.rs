pub mod report;
pub mod runner;
pub mod simulator;
pub mod window;

pub use report::{BatchReport, SignalOutcome, SkipReason};
pub use runner::ClosedSignalEvaluator;
pub use simulator::{compute_return, round_to_cents, simulate_trade};
pub use window::history_window;
