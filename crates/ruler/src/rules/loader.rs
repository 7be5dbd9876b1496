use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sentinel_common::duration::parse_duration;
use sentinel_common::labels::{is_valid_label_name, is_valid_metric_name};
use sentinel_common::Labels;

use super::file::{RuleEntry, RuleFile, RuleGroupFile};
use super::group::{GroupDef, RuleSet};
use super::rule::{Rule, RuleKind};
use super::template::unsupported_action;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("group {name:?} defined in both {first} and {second}")]
    DuplicateGroup {
        name: String,
        first: String,
        second: String,
    },
    #[error("{file}: group {group:?}: {reason}")]
    InvalidGroup {
        file: String,
        group: String,
        reason: String,
    },
    #[error("{file}: group {group:?}, rule {index} ({name}): {reason}")]
    InvalidRule {
        file: String,
        group: String,
        index: usize,
        name: String,
        reason: String,
    },
    #[error("no rule files matched {0}")]
    NoFiles(String),
}

pub fn load_files(paths: &[PathBuf], default_interval: Duration) -> Result<RuleSet, ConfigError> {
    let files = expand_paths(paths)?;
    let mut groups = Vec::new();
    let mut origin: HashMap<String, String> = HashMap::new();

    for file in files {
        let display = file.display().to_string();
        let contents = std::fs::read_to_string(&file).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        for group in load_from_str(&contents, &display, default_interval)? {
            if let Some(first) = origin.get(&group.name) {
                return Err(ConfigError::DuplicateGroup {
                    name: group.name,
                    first: first.clone(),
                    second: display,
                });
            }
            origin.insert(group.name.clone(), display.clone());
            groups.push(group);
        }
    }

    Ok(RuleSet::new(groups))
}

pub fn load_from_str(
    yaml: &str,
    source: &str,
    default_interval: Duration,
) -> Result<Vec<GroupDef>, ConfigError> {
    let parsed: RuleFile = if yaml.trim().is_empty() {
        RuleFile { groups: Vec::new() }
    } else {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: source.to_string(),
            source: e,
        })?
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(parsed.groups.len());
    for group in parsed.groups {
        if !seen.insert(group.name.clone()) {
            return Err(ConfigError::DuplicateGroup {
                name: group.name,
                first: source.to_string(),
                second: source.to_string(),
            });
        }
        out.push(build_group(group, source, default_interval)?);
    }
    Ok(out)
}

fn build_group(
    raw: RuleGroupFile,
    file: &str,
    default_interval: Duration,
) -> Result<GroupDef, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidGroup {
        file: file.to_string(),
        group: raw.name.clone(),
        reason,
    };

    if raw.name.trim().is_empty() {
        return Err(invalid("group name must not be empty".into()));
    }

    let interval = match &raw.interval {
        Some(s) => parse_duration(s).map_err(|e| invalid(format!("interval: {e}")))?,
        None => default_interval,
    };
    if interval.is_zero() {
        return Err(invalid("interval must be greater than zero".into()));
    }

    let mut group = GroupDef::new(raw.name.clone(), interval);
    group.file = file.to_string();

    for (index, entry) in raw.rules.into_iter().enumerate() {
        let rule = build_rule(entry).map_err(|(name, reason)| ConfigError::InvalidRule {
            file: file.to_string(),
            group: raw.name.clone(),
            index,
            name,
            reason,
        })?;
        group.rules.push(Arc::new(rule));
    }

    Ok(group)
}

fn build_rule(entry: RuleEntry) -> Result<Rule, (String, String)> {
    let display = entry
        .alert
        .clone()
        .or_else(|| entry.record.clone())
        .unwrap_or_else(|| "<unnamed>".into());
    let fail = |reason: &str| (display.clone(), reason.to_string());

    if entry.expr.trim().is_empty() {
        return Err(fail("expr must not be empty"));
    }

    for name in entry.labels.keys() {
        if !is_valid_label_name(name) {
            return Err(fail(&format!("invalid label name {name:?}")));
        }
        if name.starts_with("__") {
            return Err(fail(&format!("label name {name:?} is reserved")));
        }
    }
    let labels = Labels::from(entry.labels);

    let kind = match (entry.alert, entry.record) {
        (Some(_), Some(_)) => return Err(fail("only one of 'alert' or 'record' may be set")),
        (None, None) => return Err(fail("one of 'alert' or 'record' must be set")),
        (Some(name), None) => {
            if name.trim().is_empty() {
                return Err(fail("alert name must not be empty"));
            }
            let for_duration = match entry.for_duration.as_deref() {
                Some(raw) => parse_duration(raw).map_err(|e| fail(&format!("for: {e}")))?,
                None => Duration::ZERO,
            };
            let annotations = entry.annotations.unwrap_or_default();
            for (key, template) in &annotations {
                if !is_valid_label_name(key) {
                    return Err(fail(&format!("invalid annotation name {key:?}")));
                }
                if let Some(action) = unsupported_action(template) {
                    return Err(fail(&format!(
                        "annotation {key:?}: unsupported template action {action}"
                    )));
                }
            }
            RuleKind::Alerting {
                name,
                for_duration,
                annotations,
            }
        }
        (None, Some(metric)) => {
            if !is_valid_metric_name(&metric) {
                return Err(fail(&format!("invalid recording rule name {metric:?}")));
            }
            if entry.for_duration.is_some() {
                return Err(fail("'for' is only valid on alerting rules"));
            }
            if entry.annotations.is_some() {
                return Err(fail("'annotations' is only valid on alerting rules"));
            }
            RuleKind::Recording { metric }
        }
    };

    Ok(Rule {
        kind,
        expr: entry.expr.trim().to_string(),
        labels,
    })
}

fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let mut found: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| is_rule_file(p))
                .collect();
            if found.is_empty() {
                return Err(ConfigError::NoFiles(path.display().to_string()));
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_rule_file(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        )
}
