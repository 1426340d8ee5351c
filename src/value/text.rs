//! Text folding used by the `normalize` formatter.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Strips diacritics: `"Bé"` becomes `"Be"`.
#[must_use]
pub fn deburr(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Splits text into words on non-alphanumerics, camel-case humps and letter/digit edges.
#[must_use]
pub fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut cur = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            continue;
        }
        if let Some(prev) = cur.chars().last() {
            let next = chars.get(i + 1).copied();
            let hump = prev.is_lowercase() && c.is_uppercase();
            // "XMLHttp": split before the last capital of an upper-case run
            let acronym_end = prev.is_uppercase()
                && c.is_uppercase()
                && next.is_some_and(char::is_lowercase);
            let digit_edge = prev.is_ascii_digit() != c.is_ascii_digit();
            if hump || acronym_end || digit_edge {
                out.push(std::mem::take(&mut cur));
            }
        }
        cur.push(c);
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Folds text into lower-case, diacritic-free words separated by single spaces.
#[must_use]
pub fn normalize(s: &str) -> String {
    words(&deburr(s)).iter().map(|w| w.to_lowercase()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_punctuation_and_accents() {
        assert_eq!(normalize("Bé_ free!"), "be free");
        assert_eq!(normalize("Bê smart!"), "be smart");
        assert_eq!(normalize("Bé Test"), "be test");
    }

    #[test]
    fn splits_humps_and_digits() {
        assert_eq!(normalize("fooBar"), "foo bar");
        assert_eq!(normalize("XMLHttpRequest"), "xml http request");
        assert_eq!(normalize("abc123"), "abc 123");
        assert_eq!(normalize("   "), "");
    }
}
