//! Phrase-to-handler registry.

use crate::engine::Handler;
use crate::errors::{EngineError, EngineResult};
use crate::pattern::{expand_pattern, FlagMap};
use std::collections::{BTreeMap, BTreeSet};

/// One registered phrase with its handler and implied flag values.
///
/// Created at registration time, immutable afterwards.
#[derive(Clone)]
pub struct AssertionEntry {
    /// The concrete phrase text this entry is keyed by.
    pub phrase: String,
    /// The handler shared by every phrase of the registering pattern.
    pub handler: Handler,
    /// Flag values implied when this phrase is the one matched.
    pub flags: FlagMap,
}

impl std::fmt::Debug for AssertionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionEntry")
            .field("phrase", &self.phrase)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Registered assertions keyed by concrete phrase text.
///
/// Iteration order is deterministic (sorted by phrase); the suggestion
/// ranking relies on it to break distance ties stably.
#[derive(Clone, Default)]
pub struct AssertionRegistry {
    entries: BTreeMap<String, AssertionEntry>,
}

impl AssertionRegistry {
    pub fn new() -> Self {
        AssertionRegistry::default()
    }

    /// Register `handler` under every phrase the patterns expand to.
    ///
    /// Two patterns of the same call may legally expand to the same
    /// text; a text already owned by an earlier call is a redefinition
    /// error.
    pub fn register(&mut self, patterns: &[&str], handler: Handler) -> EngineResult<()> {
        let mut seen_in_this_call = BTreeSet::new();
        for pattern in patterns {
            for expanded in expand_pattern(pattern)? {
                if self.entries.contains_key(&expanded.text) {
                    if !seen_in_this_call.contains(&expanded.text) {
                        return Err(EngineError::Redefinition {
                            phrase: expanded.text,
                        });
                    }
                } else {
                    seen_in_this_call.insert(expanded.text.clone());
                    self.entries.insert(
                        expanded.text.clone(),
                        AssertionEntry {
                            phrase: expanded.text,
                            handler: handler.clone(),
                            flags: expanded.flags,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Exact-match lookup. Callers strip recognized flag prefixes
    /// before resolving; no stripping happens at this layer.
    pub fn resolve(&self, phrase: &str) -> Option<&AssertionEntry> {
        self.entries.get(phrase)
    }

    /// All registered phrase texts, in iteration order.
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for AssertionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionRegistry")
            .field("phrases", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn noop() -> Handler {
        Rc::new(|_| Ok(()))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = AssertionRegistry::new();
        registry.register(&["to [not] be ok"], noop()).unwrap();

        assert_eq!(registry.len(), 2);
        let entry = registry.resolve("to not be ok").unwrap();
        assert_eq!(entry.flags.get("not"), Some(&true));
        let entry = registry.resolve("to be ok").unwrap();
        assert_eq!(entry.flags.get("not"), Some(&false));
        assert!(registry.resolve("to be").is_none());
    }

    #[test]
    fn test_redefinition_across_calls_rejected() {
        let mut registry = AssertionRegistry::new();
        registry.register(&["to foo"], noop()).unwrap();
        let result = registry.register(&["to foo"], noop());
        assert!(matches!(
            result,
            Err(EngineError::Redefinition { phrase }) if phrase == "to foo"
        ));
    }

    #[test]
    fn test_same_call_may_repeat_expansion() {
        let mut registry = AssertionRegistry::new();
        // Both patterns expand to "to be ok"; one call owns both.
        registry
            .register(&["to be ok", "to [maybe] be ok"], noop())
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("to be ok").is_some());
        assert!(registry.resolve("to maybe be ok").is_some());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut registry = AssertionRegistry::new();
        assert!(matches!(
            registry.register(&["(a|)"], noop()),
            Err(EngineError::Pattern { .. })
        ));
    }

    #[test]
    fn test_phrases_iterate_sorted() {
        let mut registry = AssertionRegistry::new();
        registry.register(&["to equal"], noop()).unwrap();
        registry.register(&["to be"], noop()).unwrap();
        let phrases: Vec<&str> = registry.phrases().collect();
        assert_eq!(phrases, vec!["to be", "to equal"]);
    }
}
