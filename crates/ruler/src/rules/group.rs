use std::sync::Arc;
use std::time::Duration;

use super::rule::Rule;

#[derive(Debug, Clone)]
pub struct GroupDef {
    pub name: String,
    pub file: String,
    pub interval: Duration,
    pub rules: Vec<Arc<Rule>>,
}

impl GroupDef {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            file: String::new(),
            interval,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// True when evaluation behaviour is identical (interval and every rule,
    /// in order). The source file is ignored.
    pub fn same_definition(&self, other: &GroupDef) -> bool {
        self.name == other.name
            && self.interval == other.interval
            && self.rules.len() == other.rules.len()
            && self.rules.iter().zip(&other.rules).all(|(a, b)| a == b)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub groups: Vec<GroupDef>,
}

impl RuleSet {
    pub fn new(groups: Vec<GroupDef>) -> Self {
        Self { groups }
    }

    pub fn group(&self, name: &str) -> Option<&GroupDef> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> GroupDef {
        GroupDef::new("aiops_alerts", Duration::from_secs(60))
            .with_rule(Rule::alerting("HighLatency", "latency > 0.5").with_for(Duration::from_secs(300)))
    }

    #[test]
    fn identical_groups_are_same_definition() {
        let mut other = group();
        other.file = "elsewhere.yml".into();
        assert!(group().same_definition(&other));
    }

    #[test]
    fn changed_expr_or_interval_differs() {
        let mut other = group();
        other.interval = Duration::from_secs(30);
        assert!(!group().same_definition(&other));

        let other = GroupDef::new("aiops_alerts", Duration::from_secs(60))
            .with_rule(Rule::alerting("HighLatency", "latency > 0.7").with_for(Duration::from_secs(300)));
        assert!(!group().same_definition(&other));
    }

    #[test]
    fn rule_set_lookup() {
        let set = RuleSet::new(vec![group()]);
        assert!(set.group("aiops_alerts").is_some());
        assert!(set.group("missing").is_none());
        assert_eq!(set.rule_count(), 1);
    }
}
