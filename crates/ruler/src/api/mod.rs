mod health;
mod metrics;
mod reload;
mod rules;
mod server;
mod state;

pub use server::{router, serve};
pub use state::AppState;
