use sentinel_common::labels::{is_valid_label_name, is_valid_metric_name, METRIC_NAME};
use sentinel_common::Labels;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOp {
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

impl Matcher {
    pub fn matches(&self, labels: &Labels) -> bool {
        let actual = labels.get(&self.name).unwrap_or("");
        match self.op {
            MatchOp::Equal => actual == self.value,
            MatchOp::NotEqual => actual != self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub matchers: Vec<Matcher>,
}

impl Selector {
    pub fn matches(&self, labels: &Labels) -> bool {
        self.matchers.iter().all(|m| m.matches(labels))
    }
}

pub fn parse_selector(expr: &str) -> Result<Selector, String> {
    let expr = expr.trim();
    let (name, rest) = match expr.find('{') {
        Some(idx) => (expr[..idx].trim(), &expr[idx..]),
        None => (expr, ""),
    };

    let mut matchers = Vec::new();
    if !name.is_empty() {
        if !is_valid_metric_name(name) {
            return Err(format!("unsupported expression {expr:?}"));
        }
        matchers.push(Matcher {
            name: METRIC_NAME.to_string(),
            op: MatchOp::Equal,
            value: name.to_string(),
        });
    }

    if !rest.is_empty() {
        let body = rest
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .ok_or_else(|| format!("unterminated selector {expr:?}"))?;
        matchers.extend(parse_matchers(body)?);
    }

    if matchers.is_empty() {
        return Err("empty selector".to_string());
    }
    Ok(Selector { matchers })
}

fn parse_matchers(body: &str) -> Result<Vec<Matcher>, String> {
    let mut out = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }
        if !is_valid_label_name(&name) {
            return Err(format!("invalid label name {name:?}"));
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let op = match chars.next() {
            Some('=') => MatchOp::Equal,
            Some('!') if chars.peek() == Some(&'=') => {
                chars.next();
                MatchOp::NotEqual
            }
            _ => return Err(format!("unsupported matcher for label {name:?}")),
        };
        if chars.peek() == Some(&'~') {
            return Err("regex matchers are not supported".to_string());
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.next() != Some('"') {
            return Err(format!("expected quoted value for label {name:?}"));
        }
        let mut value = String::new();
        loop {
            match chars.next() {
                Some('\\') => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some(c) => value.push(c),
                    None => return Err("unterminated escape".to_string()),
                },
                Some('"') => break,
                Some(c) => value.push(c),
                None => return Err("unterminated label value".to_string()),
            }
        }

        out.push(Matcher { name, op, value });
    }

    Ok(out)
}
