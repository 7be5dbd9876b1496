pub mod duration;
pub mod fingerprint;
pub mod labels;
pub mod retry;
pub mod time;

pub use labels::Labels;
