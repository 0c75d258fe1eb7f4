//! Assertion-pattern validation and expansion.
//!
//! A pattern is a phrase template: literal text, optional `[flag]`
//! tokens, and `(a|b|c)` alternation tokens. Expansion produces every
//! concrete phrase the pattern can match, each tagged with the flag
//! values implied by that match. `"to [not] be (ok|fine)"` expands to
//! four phrases; a pattern with k flags and alternations of sizes
//! n1..nm expands to exactly 2^k * n1 * ... * nm phrases.

use crate::errors::{EngineError, EngineResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flag values implied by a matched phrase.
pub type FlagMap = BTreeMap<String, bool>;

/// One concrete registrable phrase produced by expanding a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedPhrase {
    /// The phrase text as it must be written at the call site.
    pub text: String,
    /// Flag values that hold when this phrase is the one matched.
    pub flags: FlagMap,
}

/// Matches one `[flag]` or `(a|b)` token.
static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]+\]|\([^)]+\)").expect("invalid token regex"));

/// Absorbs the space following a flag token, so expanding with the flag
/// omitted leaves no doubled space.
static FLAG_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\[[^\]]+\]) ?").expect("invalid flag spacing regex"));

fn pattern_error(pattern: &str, message: impl Into<String>) -> EngineError {
    EngineError::Pattern {
        pattern: pattern.to_string(),
        message: message.into(),
    }
}

/// Validate a pattern without expanding it.
///
/// Rejects empty patterns, surrounding whitespace, unbalanced or nested
/// brackets/parentheses, interleaved token spans, empty flags, and
/// empty alternation members.
pub fn ensure_valid_pattern(pattern: &str) -> EngineResult<()> {
    if pattern.is_empty() {
        return Err(pattern_error(pattern, "patterns must be a non-empty string"));
    }
    if pattern.starts_with(char::is_whitespace) || pattern.ends_with(char::is_whitespace) {
        return Err(pattern_error(
            pattern,
            "patterns must not start or end with whitespace",
        ));
    }
    ensure_valid_token_structure(pattern)
}

/// Single scan tracking bracket/parenthesis counts; a closing char is
/// only judged while its kind is currently open.
fn ensure_valid_token_structure(pattern: &str) -> EngineResult<()> {
    let mut open_brackets = 0usize;
    let mut close_brackets = 0usize;
    let mut open_parens = 0usize;
    let mut close_parens = 0usize;
    let mut prev: Option<char> = None;

    for c in pattern.chars() {
        match c {
            '[' => open_brackets += 1,
            ']' => close_brackets += 1,
            '(' => open_parens += 1,
            ')' => close_parens += 1,
            _ => {}
        }

        if c == ']' && open_brackets >= close_brackets {
            if open_brackets == close_brackets + 1 {
                return Err(pattern_error(pattern, "flags must not contain brackets"));
            }
            if open_parens != close_parens {
                return Err(pattern_error(pattern, "flags must not contain parentheses"));
            }
            if prev == Some('[') {
                return Err(pattern_error(pattern, "flags must not be empty"));
            }
        } else if c == ')' && open_parens >= close_parens {
            if open_parens == close_parens + 1 {
                return Err(pattern_error(
                    pattern,
                    "alternations must not contain parentheses",
                ));
            }
            if open_brackets != close_brackets {
                return Err(pattern_error(
                    pattern,
                    "alternations must not contain brackets",
                ));
            }
        }

        if (c == ')' || c == '|') && open_parens >= close_parens {
            if prev == Some('(') || prev == Some('|') {
                return Err(pattern_error(
                    pattern,
                    "alternations must not have empty members",
                ));
            }
        }

        prev = Some(c);
    }

    if open_brackets != close_brackets {
        return Err(pattern_error(pattern, "unbalanced brackets"));
    }
    if open_parens != close_parens {
        return Err(pattern_error(pattern, "unbalanced parentheses"));
    }
    Ok(())
}

/// Expand a pattern into every concrete phrase it can match.
///
/// Validation runs first; a pattern consisting solely of flag tokens is
/// rejected because every expansion with all flags off would be empty.
pub fn expand_pattern(pattern: &str) -> EngineResult<Vec<ExpandedPhrase>> {
    ensure_valid_pattern(pattern)?;
    let spaced = FLAG_SPACING.replace_all(pattern, "$1");
    let tokens = tokenize(&spaced);
    let mut expanded = permutations(&tokens);
    for phrase in &mut expanded {
        phrase.text = phrase.text.trim().to_string();
        if phrase.text.is_empty() {
            return Err(pattern_error(
                pattern,
                "patterns must not consist of flags alone",
            ));
        }
    }
    Ok(expanded)
}

/// Split out bracket/paren token spans, preserving the literal spans
/// between them.
fn tokenize(pattern: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for found in TOKEN.find_iter(pattern) {
        if found.start() > last {
            tokens.push(pattern[last..found.start()].to_string());
        }
        tokens.push(found.as_str().to_string());
        last = found.end();
    }
    if last < pattern.len() {
        tokens.push(pattern[last..].to_string());
    }
    tokens
}

fn is_flag(token: &str) -> bool {
    token.starts_with('[') && token.ends_with(']')
}

fn is_alternation(token: &str) -> bool {
    token.starts_with('(') && token.ends_with(')')
}

/// Build every `(text, flags)` continuation for the token suffix. A
/// flag token doubles the set (true-variants first), an alternation
/// multiplies it, a literal prefixes its text onto each continuation.
fn permutations(tokens: &[String]) -> Vec<ExpandedPhrase> {
    let (token, rest) = match tokens.split_first() {
        Some(split) => split,
        None => {
            return vec![ExpandedPhrase {
                text: String::new(),
                flags: FlagMap::new(),
            }]
        }
    };
    let tail = permutations(rest);

    if is_flag(token) {
        let flag = &token[1..token.len() - 1];
        let mut result = Vec::with_capacity(tail.len() * 2);
        for phrase in &tail {
            let mut flags = FlagMap::new();
            flags.insert(flag.to_string(), true);
            flags.extend(phrase.flags.clone());
            result.push(ExpandedPhrase {
                text: format!("{} {}", flag, phrase.text),
                flags,
            });
        }
        for phrase in &tail {
            let mut flags = FlagMap::new();
            flags.insert(flag.to_string(), false);
            flags.extend(phrase.flags.clone());
            result.push(ExpandedPhrase {
                text: phrase.text.clone(),
                flags,
            });
        }
        result
    } else if is_alternation(token) {
        let mut result = Vec::new();
        for alternative in token[1..token.len() - 1].split('|') {
            for phrase in &tail {
                result.push(ExpandedPhrase {
                    text: format!("{}{}", alternative, phrase.text),
                    flags: phrase.flags.clone(),
                });
            }
        }
        result
    } else {
        tail.into_iter()
            .map(|phrase| ExpandedPhrase {
                text: format!("{}{}", token, phrase.text),
                flags: phrase.flags,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(expanded: &[ExpandedPhrase]) -> Vec<&str> {
        expanded.iter().map(|phrase| phrase.text.as_str()).collect()
    }

    #[test]
    fn test_expand_plain_pattern() {
        let expanded = expand_pattern("to equal").unwrap();
        assert_eq!(texts(&expanded), vec!["to equal"]);
        assert!(expanded[0].flags.is_empty());
    }

    #[test]
    fn test_expand_flag_and_alternation() {
        let expanded = expand_pattern("to [not] be (ok|fine)").unwrap();
        assert_eq!(
            texts(&expanded),
            vec![
                "to not be ok",
                "to not be fine",
                "to be ok",
                "to be fine",
            ]
        );
        assert_eq!(expanded[0].flags.get("not"), Some(&true));
        assert_eq!(expanded[2].flags.get("not"), Some(&false));
    }

    #[test]
    fn test_expansion_count() {
        // 2 flags, alternations of 2 and 3: 2^2 * 2 * 3 = 24 phrases.
        let expanded = expand_pattern("[a] to [b] be (x|y) or (p|q|r)").unwrap();
        assert_eq!(expanded.len(), 24);
        let mut unique: Vec<&str> = texts(&expanded);
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 24);
    }

    #[test]
    fn test_flag_spacing_absorbed() {
        let expanded = expand_pattern("to [not] be").unwrap();
        assert_eq!(texts(&expanded), vec!["to not be", "to be"]);
    }

    #[test]
    fn test_leading_flag() {
        let expanded = expand_pattern("[not] to be").unwrap();
        assert_eq!(texts(&expanded), vec!["not to be", "to be"]);
    }

    #[test]
    fn test_flags_only_pattern_rejected() {
        assert!(matches!(
            expand_pattern("[a][b]"),
            Err(EngineError::Pattern { .. })
        ));
    }

    #[test]
    fn test_invalid_patterns() {
        for pattern in &["", " to be", "to be ", "[]", "(a|)", "(|a)", "(a", "[a(b]c)", "[a[b]]", "((a))"] {
            assert!(
                ensure_valid_pattern(pattern).is_err() || expand_pattern(pattern).is_err(),
                "pattern {:?} should be rejected",
                pattern
            );
        }
    }

    #[test]
    fn test_unbalanced_patterns() {
        assert!(matches!(
            ensure_valid_pattern("(a"),
            Err(EngineError::Pattern { .. })
        ));
        assert!(matches!(
            ensure_valid_pattern("[a"),
            Err(EngineError::Pattern { .. })
        ));
    }

    #[test]
    fn test_interleaved_spans_rejected() {
        assert!(matches!(
            ensure_valid_pattern("[a(b]c)"),
            Err(EngineError::Pattern { .. })
        ));
    }

    #[test]
    fn test_empty_alternation_member_rejected() {
        assert!(matches!(
            ensure_valid_pattern("(a|)"),
            Err(EngineError::Pattern { .. })
        ));
        assert!(matches!(
            ensure_valid_pattern("(a||b)"),
            Err(EngineError::Pattern { .. })
        ));
    }
}
