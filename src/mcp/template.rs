//! URI templates for parameterised resources.
//!
//! A resource URI containing `{placeholder}` segments is a template. Only
//! simple expansion is supported:
//!
//! - `{name}` matches one or more characters other than `/`
//! - `{+name}` matches one or more characters including `/`

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

/// Matches a single brace-delimited placeholder.
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([+]?)([^{}]+)\}").expect("placeholder pattern is valid"))
}

/// Returns `true` if `uri` contains at least one `{placeholder}`.
#[must_use]
pub fn is_template(uri: &str) -> bool {
    placeholder_regex().is_match(uri)
}

/// A parsed URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    raw: String,
    pattern: Regex,
    names: Vec<String>,
    literal_len: usize,
}

impl UriTemplate {
    /// Parses `raw`. Returns `None` if it has no placeholders.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if !is_template(raw) {
            return None;
        }

        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut literal_len = 0;
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(raw) {
            let whole = caps.get(0)?;
            let literal = &raw[last..whole.start()];
            literal_len += literal.len();
            pattern.push_str(&regex::escape(literal));

            let reserved = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            pattern.push_str(if reserved { "(.+)" } else { "([^/]+)" });
            names.push(caps.get(2)?.as_str().trim().to_string());

            last = whole.end();
        }

        let tail = &raw[last..];
        literal_len += tail.len();
        pattern.push_str(&regex::escape(tail));
        pattern.push('$');

        // Escaped literals and fixed groups always compile.
        let pattern = Regex::new(&pattern).ok()?;

        Some(Self {
            raw: raw.to_string(),
            pattern,
            names,
            literal_len,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of literal characters; more means more specific.
    #[must_use]
    pub const fn specificity(&self) -> usize {
        self.literal_len
    }

    /// Matches `uri` against the template, returning the placeholder values.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<IndexMap<String, String>> {
        let caps = self.pattern.captures(uri)?;
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                caps.get(i + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect()
    }
}
