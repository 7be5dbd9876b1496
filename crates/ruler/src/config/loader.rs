use std::net::SocketAddr;
use std::path::Path;

use sentinel_common::labels::is_valid_label_name;

use super::schema::RulerConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_from_file(path: &Path) -> Result<RulerConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    let mut cfg = load_from_str(&contents)?;
    if let Some(base) = path.parent() {
        for file in &mut cfg.rule_files {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
    }
    Ok(cfg)
}

pub fn load_from_str(yaml: &str) -> Result<RulerConfig, LoadError> {
    let cfg: RulerConfig = serde_yaml::from_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &RulerConfig) -> Result<(), LoadError> {
    if cfg.rule_files.is_empty() {
        return Err(LoadError::Validation("rule_files must not be empty".into()));
    }
    if cfg.evaluation_interval.is_zero() {
        return Err(LoadError::Validation("evaluation_interval must be > 0".into()));
    }
    if cfg.eval_timeout.is_some_and(|d| d.is_zero()) {
        return Err(LoadError::Validation("eval_timeout must be > 0".into()));
    }
    if cfg.max_concurrent_groups == 0 {
        return Err(LoadError::Validation("max_concurrent_groups must be > 0".into()));
    }
    if cfg.notifier.queue_capacity == 0 {
        return Err(LoadError::Validation("notifier.queue_capacity must be > 0".into()));
    }
    if cfg.api_addr.parse::<SocketAddr>().is_err() {
        return Err(LoadError::Validation(format!(
            "api_addr {:?} is not a socket address",
            cfg.api_addr
        )));
    }
    if let Some(name) = cfg
        .external_labels
        .iter()
        .map(|(k, _)| k)
        .find(|k| !is_valid_label_name(k))
    {
        return Err(LoadError::Validation(format!(
            "external label name {name:?} is invalid"
        )));
    }
    for (field, url) in [
        ("query.url", cfg.query.as_ref().map(|q| q.url.as_str())),
        ("storage.import_url", cfg.storage.as_ref().map(|s| s.import_url.as_str())),
        ("notifier.webhook_url", cfg.notifier.webhook_url.as_deref()),
    ] {
        if url.is_some_and(|u| u.trim().is_empty()) {
            return Err(LoadError::Validation(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn valid_config() {
        let cfg = load_from_str("rule_files: [rules.yml]\nevaluation_interval: 15s\n").unwrap();
        assert_eq!(cfg.rule_files, vec![PathBuf::from("rules.yml")]);
    }

    #[test]
    fn empty_rule_files_rejected() {
        let err = load_from_str("rule_files: []\n").unwrap_err();
        assert!(err.to_string().contains("rule_files"));
    }

    #[test]
    fn zero_interval_rejected() {
        let err = load_from_str("rule_files: [a.yml]\nevaluation_interval: 0s\n").unwrap_err();
        assert!(err.to_string().contains("evaluation_interval"));
    }

    #[test]
    fn bad_duration_is_a_parse_error() {
        let err = load_from_str("rule_files: [a.yml]\nevaluation_interval: soon\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn bad_api_addr_rejected() {
        let err = load_from_str("rule_files: [a.yml]\napi_addr: localhost\n").unwrap_err();
        assert!(err.to_string().contains("api_addr"));
    }

    #[test]
    fn invalid_external_label_rejected() {
        let err = load_from_str("rule_files: [a.yml]\nexternal_labels:\n  9bad: x\n").unwrap_err();
        assert!(err.to_string().contains("9bad"));
    }

    #[test]
    fn load_from_file_resolves_rule_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ruler.yml");
        std::fs::write(&path, "rule_files: [rules/, /etc/abs.yml]\n").unwrap();

        let cfg = load_from_file(&path).unwrap();
        assert_eq!(cfg.rule_files[0], dir.path().join("rules/"));
        assert_eq!(cfg.rule_files[1], PathBuf::from("/etc/abs.yml"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_from_file(Path::new("/nonexistent/ruler.yml")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
