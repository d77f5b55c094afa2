pub mod outcome;
pub mod price;
pub mod signal;
pub mod window;

pub use outcome::{ExitReason, TieBreak, TradeResult};
pub use price::{PricePoint, PriceSeries};
pub use signal::{Signal, SignalType};
pub use window::TimeWindow;
