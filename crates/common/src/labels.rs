use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const METRIC_NAME: &str = "__name__";
pub const ALERT_NAME: &str = "alertname";
pub const ALERT_STATE: &str = "alertstate";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn metric_name(&self) -> Option<&str> {
        self.get(METRIC_NAME)
    }

    pub fn without_metric_name(&self) -> Labels {
        let mut out = self.clone();
        out.remove(METRIC_NAME);
        out
    }

    pub fn overlay(&mut self, other: &Labels) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    pub fn fill_missing(&mut self, defaults: &Labels) {
        for (k, v) in defaults.iter() {
            self.0
                .entry(k.to_string())
                .or_insert_with(|| v.to_string());
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for Labels {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<std::collections::HashMap<String, String>> for Labels {
    fn from(map: std::collections::HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.metric_name() {
            f.write_str(name)?;
        }
        f.write_str("{")?;
        let mut first = true;
        for (k, v) in self.iter().filter(|(k, _)| *k != METRIC_NAME) {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{k}=\"{}\"", escape_value(v))?;
        }
        f.write_str("}")
    }
}

pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_puts_metric_name_first() {
        let l = Labels::from_pairs([("__name__", "up"), ("job", "api"), ("instance", "a:1")]);
        assert_eq!(l.to_string(), r#"up{instance="a:1", job="api"}"#);
    }

    #[test]
    fn display_escapes_values() {
        let l = Labels::from_pairs([("msg", "say \"hi\"\n")]);
        assert_eq!(l.to_string(), r#"{msg="say \"hi\"\n"}"#);
    }

    #[test]
    fn overlay_replaces_existing() {
        let mut l = Labels::from_pairs([("severity", "page"), ("team", "infra")]);
        l.overlay(&Labels::from_pairs([("severity", "ticket")]));
        assert_eq!(l.get("severity"), Some("ticket"));
        assert_eq!(l.get("team"), Some("infra"));
    }

    #[test]
    fn fill_missing_keeps_existing() {
        let mut l = Labels::from_pairs([("job", "query")]);
        l.fill_missing(&Labels::from_pairs([("job", "static"), ("env", "prod")]));
        assert_eq!(l.get("job"), Some("query"));
        assert_eq!(l.get("env"), Some("prod"));
    }

    #[test]
    fn equal_sets_compare_equal_regardless_of_insert_order() {
        let a = Labels::from_pairs([("a", "1"), ("b", "2")]);
        let b = Labels::from_pairs([("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn name_validation() {
        assert!(is_valid_label_name("service"));
        assert!(is_valid_label_name("_x1"));
        assert!(!is_valid_label_name("1abc"));
        assert!(!is_valid_label_name("a-b"));
        assert!(is_valid_metric_name("job:http_requests:rate5m"));
        assert!(!is_valid_metric_name("9lives"));
        assert!(!is_valid_metric_name(""));
    }

    #[test]
    fn serializes_as_plain_map() {
        let l = Labels::from_pairs([("service", "x")]);
        assert_eq!(serde_json::to_string(&l).unwrap(), r#"{"service":"x"}"#);
    }
}
