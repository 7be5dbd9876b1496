use std::hash::{Hash, Hasher};

use crate::labels::Labels;

pub fn fingerprint(group: &str, rule: &str, labels: &Labels) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    group.hash(&mut hasher);
    rule.hash(&mut hasher);
    labels.hash(&mut hasher);
    hasher.finish()
}

pub fn fingerprint_string(group: &str, rule: &str, labels: &Labels) -> String {
    format!("{:016x}", fingerprint(group, rule, labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let l = Labels::from_pairs([("service", "x")]);
        assert_eq!(fingerprint("g", "HighLatency", &l), fingerprint("g", "HighLatency", &l));
    }

    #[test]
    fn different_labels_different_fingerprint() {
        let a = Labels::from_pairs([("service", "x")]);
        let b = Labels::from_pairs([("service", "y")]);
        assert_ne!(fingerprint("g", "r", &a), fingerprint("g", "r", &b));
    }

    #[test]
    fn string_is_hex() {
        let s = fingerprint_string("g", "r", &Labels::new());
        assert_eq!(s.len(), 16);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
