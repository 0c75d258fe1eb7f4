#![doc(html_root_url = "https://docs.rs/phrased/0.1.0")]

//! Extensible phrase-driven assertion engine.
//!
//! Callers describe an expectation with a natural-language phrase
//! ("to be", "to equal", "[not] to satisfy"), supply a subject and
//! expected values, and the engine resolves the phrase to a registered
//! handler and produces a pass/fail outcome with a readable explanation
//! on failure.
//!
//! Everything is extensible at runtime: third parties register new
//! assertion patterns and new comparable value types, and the engine
//! composes them — nested assertions, negated flags, inheritance-based
//! type dispatch, and cycle-safe generic operations over arbitrary
//! registered types.
//!
//! ```
//! use phrased::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine
//!     .add_assertion(&["to [not] equal"], |ctx| {
//!         let expected = ctx.arg(0).cloned().unwrap_or(Value::Null);
//!         let equal = ctx.engine().equal(ctx.subject(), &expected)?;
//!         if equal != ctx.flag("not") {
//!             Ok(())
//!         } else {
//!             ctx.fail("values compare {0}", &[Value::from(equal)])
//!         }
//!     })
//!     .unwrap();
//!
//! engine.expect(42, "to equal", &[Value::from(42)]).unwrap();
//! engine.expect(42, "to not equal", &[Value::from(43)]).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`pattern`] - Expands `[flag]` / `(a|b)` patterns into phrases
//! - [`registry`] - Phrase-to-handler registry
//! - [`types`] - Type registry with single-inheritance fallback
//! - [`operations`] - Cycle-safe equal / inspect / sanitize
//! - [`engine`] - Assertion resolution and execution
//! - [`suggest`] - Did-you-mean suggestions for unknown phrases
//! - [`output`] - Failure-explanation documents
//! - [`value`] - Dynamic values with reference identity
//! - [`errors`] - Error types for the engine

pub mod engine;
pub mod errors;
pub mod operations;
pub mod output;
pub mod pattern;
pub mod registry;
pub mod suggest;
pub mod types;
pub mod value;

// Re-exports for convenient access to core types
pub use engine::{AssertionContext, AssertionFailure, Engine, ErrorMode, Handler};
pub use errors::{EngineError, EngineResult};
pub use output::{Document, OutputFormat};
pub use pattern::{ensure_valid_pattern, expand_pattern, ExpandedPhrase, FlagMap};
pub use registry::{AssertionEntry, AssertionRegistry};
pub use suggest::{levenshtein, suggest};
pub use types::{ResolvedType, TypeDef, TypeRegistry};
pub use value::Value;

#[cfg(test)]
mod tests;
