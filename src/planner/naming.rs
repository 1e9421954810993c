use std::collections::HashMap;
use stitch_core::TypeRef;

/// `IDependency` → `dependency`, `HTTPClient` → `httpClient`
///
/// A leading interface `I` is dropped when it starts a capitalized word.
pub fn lower_camel(name: &str) -> String {
    let chars: Vec<char> = name.chars().filter(|c| c.is_alphanumeric()).collect();
    let start = match chars.as_slice() {
        ['I', second, third, ..] if second.is_uppercase() && third.is_lowercase() => 1,
        _ => 0,
    };
    let word = &chars[start..];

    // Lowercase the leading run of capitals, keeping the last one if it
    // starts the next word
    let run = word.iter().take_while(|c| c.is_uppercase()).count();
    let lower_until = if run > 1 && run < word.len() { run - 1 } else { run };

    let out: String = word
        .iter()
        .enumerate()
        .map(|(i, c)| if i < lower_until { c.to_ascii_lowercase() } else { *c })
        .collect();

    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        format!("value{}", out)
    } else {
        out
    }
}

/// Counter-suffixed identifiers, unique within one naming scope
#[derive(Debug, Default, Clone)]
pub struct Names {
    prefix: String,
    counters: HashMap<String, usize>,
}

impl Names {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counters: HashMap::new(),
        }
    }

    /// Next name for a value of `ty`
    pub fn fresh(&mut self, ty: &TypeRef) -> String {
        self.fresh_named(&ty.short_name())
    }

    pub fn fresh_named(&mut self, base: &str) -> String {
        let base = lower_camel(base);
        let counter = self.counters.entry(base.clone()).or_insert(0);
        *counter += 1;
        format!("{}{}{}", self.prefix, base, counter)
    }
}
