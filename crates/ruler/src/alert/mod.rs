mod event;
mod state;
mod table;

pub use event::{AlertEvent, AlertStatus};
pub use state::AlertState;
pub use table::{bind_samples, AlertContext, AlertInstance, AlertTable, ALERTS_METRIC};
