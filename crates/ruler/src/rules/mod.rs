mod file;
mod group;
mod loader;
mod rule;
pub mod template;

pub use group::{GroupDef, RuleSet};
pub use loader::{load_files, load_from_str, ConfigError};
pub use rule::{Rule, RuleKind};
