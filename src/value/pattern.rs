use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::LazyLock;

// Matches nothing; used when even the escaped literal exceeds the regex size limit.
static NEVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\s\S]").expect("static regex compiles"));

/// A compiled regular expression that remembers its source and flags.
///
/// Equality compares the source and the case-insensitive flag, not the
/// compiled automaton.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// # Errors
    /// Returns the underlying `regex::Error` when `source` is not a valid expression.
    pub fn new(source: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source).case_insensitive(case_insensitive).build()?;
        Ok(Self { source: source.to_string(), case_insensitive, regex })
    }

    /// Compiles `source`, falling back to a literal match when it is not a valid expression.
    #[must_use]
    pub fn lenient(source: &str, case_insensitive: bool) -> Self {
        match Self::new(source, case_insensitive) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("pattern {source:?} matched literally: {e}");
                let escaped = regex::escape(source);
                let regex = RegexBuilder::new(&escaped)
                    .case_insensitive(case_insensitive)
                    .build()
                    .unwrap_or_else(|_| NEVER.clone());
                Self { source: escaped, case_insensitive, regex }
            }
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    #[must_use]
    pub fn flags(&self) -> &'static str {
        if self.case_insensitive { "i" } else { "" }
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_match() {
        let p = Pattern::new("testing", true).unwrap();
        assert!(p.is_match("Some TESTING here"));
        assert_eq!(p.to_string(), "/testing/i");
    }

    #[test]
    fn invalid_source_is_literal() {
        let p = Pattern::lenient("a(b", false);
        assert!(p.is_match("xa(bx"));
        assert!(!p.is_match("ab"));
    }
}
