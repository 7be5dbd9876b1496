use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use sentinel_common::Labels;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\$(labels|externalLabels)\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}|\{\{\s*\$value\s*\}\}")
        .expect("placeholder pattern")
});

static ANY_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}]*\}\}").expect("action pattern"));

pub struct TemplateData<'a> {
    pub labels: &'a Labels,
    pub external_labels: &'a Labels,
    pub value: f64,
}

pub fn render(template: &str, data: &TemplateData<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match (caps.get(1), caps.get(2)) {
            (Some(scope), Some(name)) => {
                let source = if scope.as_str() == "labels" {
                    data.labels
                } else {
                    data.external_labels
                };
                source.get(name.as_str()).unwrap_or_default().to_string()
            }
            _ => data.value.to_string(),
        })
        .into_owned()
}

pub fn render_all(
    templates: &BTreeMap<String, String>,
    data: &TemplateData<'_>,
) -> BTreeMap<String, String> {
    templates
        .iter()
        .map(|(k, t)| (k.clone(), render(t, data)))
        .collect()
}

pub fn unsupported_action(template: &str) -> Option<String> {
    ANY_ACTION
        .find_iter(template)
        .map(|m| m.as_str())
        .find(|action| !PLACEHOLDER.is_match(action))
        .map(str::to_string)
}
