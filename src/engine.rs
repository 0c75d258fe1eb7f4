//! Assertion resolution and execution.
//!
//! The engine resolves a phrase against the assertion registry, builds
//! a per-call [`AssertionContext`], and runs the registered handler.
//! Handlers issue sub-assertions through the context; a nested failure
//! is rewritten at the point where nesting returns to zero, according
//! to the error mode the handler declared.

use crate::errors::{EngineError, EngineResult};
use crate::operations;
use crate::output::{Document, OutputFormat};
use crate::pattern::FlagMap;
use crate::registry::AssertionRegistry;
use crate::suggest;
use crate::types::{ResolvedType, TypeDef, TypeRegistry};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Handler invoked when a registered phrase matches.
pub type Handler = Rc<dyn Fn(&AssertionContext<'_>) -> EngineResult<()>>;

/// Policy governing how a nested assertion's failure is represented in
/// the enclosing assertion's failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Replace the nested failure with this assertion's standard
    /// message, discarding the nested detail.
    Default,
    /// Re-raise the nested failure unchanged.
    Bubble,
    /// Standard message with the nested failure indented beneath it.
    Nested,
}

impl FromStr for ErrorMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(ErrorMode::Default),
            "bubble" => Ok(ErrorMode::Bubble),
            "nested" => Ok(ErrorMode::Nested),
            other => Err(EngineError::UnknownErrorMode(other.to_string())),
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMode::Default => write!(f, "default"),
            ErrorMode::Bubble => write!(f, "bubble"),
            ErrorMode::Nested => write!(f, "nested"),
        }
    }
}

/// A failed expectation.
///
/// Carried by [`EngineError::Failure`], which marks engine-raised
/// failures apart from ordinary runtime errors; only marked failures
/// are ever rewritten by the error-mode protocol.
#[derive(Debug, Clone)]
pub struct AssertionFailure {
    output: Document,
    message: String,
}

impl AssertionFailure {
    fn new(output: Document, format: OutputFormat) -> Self {
        let message = output.render(format);
        AssertionFailure { output, message }
    }

    /// The failure explanation document.
    pub fn output(&self) -> &Document {
        &self.output
    }

    /// The explanation rendered through the engine's output format.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Rewrites `[flag]` / `[!flag]` tokens in nested phrases.
static FLAG_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(!?)([^\]]+)\] ?").expect("invalid flag syntax regex"));

/// Matches `{0}`, `{1}`, ... placeholders in failure messages.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("invalid placeholder regex"));

/// One isolated set of registered assertions and types plus output
/// configuration.
///
/// `clone` shallow-copies the assertion map and type list (handlers and
/// descriptors are shared), so registration on a clone never mutates
/// the original. Clones share the output-document prototype.
#[derive(Clone)]
pub struct Engine {
    assertions: AssertionRegistry,
    types: TypeRegistry,
    output: Rc<Document>,
    format: OutputFormat,
}

impl Engine {
    /// Fresh engine with empty registries.
    pub fn new() -> Self {
        Engine {
            assertions: AssertionRegistry::new(),
            types: TypeRegistry::new(),
            output: Rc::new(Document::new()),
            format: OutputFormat::default(),
        }
    }

    /// Execute an assertion against `subject`.
    ///
    /// Returns `Ok(())` on success; an unknown phrase fails with ranked
    /// suggestions, and an unmet expectation fails with the rendered
    /// explanation as the error's message.
    pub fn expect(
        &self,
        subject: impl Into<Value>,
        phrase: &str,
        args: &[Value],
    ) -> EngineResult<()> {
        self.execute(subject.into(), phrase, args)
    }

    fn execute(&self, subject: Value, phrase: &str, args: &[Value]) -> EngineResult<()> {
        let entry = match self.assertions.resolve(phrase) {
            Some(entry) => entry,
            None => {
                let suggestions = suggest::suggest(self.assertions.phrases(), phrase);
                return Err(EngineError::UnknownAssertion {
                    phrase: phrase.to_string(),
                    suggestions,
                });
            }
        };
        let context = AssertionContext {
            engine: self,
            phrase: entry.phrase.clone(),
            flags: entry.flags.clone(),
            subject,
            args: args.to_vec(),
            error_mode: Cell::new(ErrorMode::Default),
            nesting: Cell::new(0),
        };
        (entry.handler)(&context)
    }

    /// Register a handler for one or more patterns; chainable.
    pub fn add_assertion(
        &mut self,
        patterns: &[&str],
        handler: impl Fn(&AssertionContext<'_>) -> EngineResult<()> + 'static,
    ) -> EngineResult<&mut Self> {
        self.assertions.register(patterns, Rc::new(handler))?;
        Ok(self)
    }

    /// Register a value type; chainable.
    pub fn add_type(&mut self, def: TypeDef) -> EngineResult<&mut Self> {
        self.types.add(def)?;
        Ok(self)
    }

    /// Invoke `plugin` with this engine so it can register assertions
    /// and types; chainable.
    pub fn install_plugin(
        &mut self,
        plugin: impl FnOnce(&mut Engine) -> EngineResult<()>,
    ) -> EngineResult<&mut Self> {
        plugin(self)?;
        Ok(self)
    }

    /// Compare two values through the registered types.
    pub fn equal(&self, a: &Value, b: &Value) -> EngineResult<bool> {
        operations::equal(&self.types, a, b)
    }

    /// Render a value. `depth` defaults to 3.
    pub fn inspect(&self, value: &Value, depth: Option<usize>) -> Document {
        operations::inspect(&self.types, &self.output, value, depth)
    }

    /// Project a value to plain JSON for snapshotting and diffing.
    pub fn sanitize(&self, value: &Value) -> serde_json::Value {
        operations::sanitize(&self.types, value)
    }

    /// Raise an explicit failure. `{0}`, `{1}`, ... placeholders are
    /// substituted from `args`.
    pub fn fail(&self, message: &str, args: &[Value]) -> EngineResult<()> {
        let text = self.substitute(message, args);
        let output = self.doc().text(text);
        Err(EngineError::Failure(AssertionFailure::new(
            output,
            self.format,
        )))
    }

    /// Look up a registered type by name.
    pub fn get_type(&self, name: &str) -> Option<Rc<ResolvedType>> {
        self.types.get(name)
    }

    /// The rendering format used when stringifying failures.
    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Set the rendering format.
    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    /// A fresh document from the shared prototype.
    fn doc(&self) -> Document {
        self.output.as_ref().clone()
    }

    fn substitute(&self, message: &str, args: &[Value]) -> String {
        PLACEHOLDER
            .replace_all(message, |caps: &Captures<'_>| {
                let index: usize = match caps[1].parse() {
                    Ok(index) => index,
                    Err(_) => return caps[0].to_string(),
                };
                match args.get(index) {
                    Some(value) => self.inspect(value, None).render(self.format),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl fmt::Display for Engine {
    /// Lists every registered phrase, one per line, sorted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, phrase) in self.assertions.phrases().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            f.write_str(phrase)?;
        }
        Ok(())
    }
}

/// Per-call context handed to a handler.
///
/// Carries the matched phrase, the flags its expansion implied, the
/// subject and extra arguments, the declared error mode, and the
/// nesting counter shared by this handler's sub-assertions.
pub struct AssertionContext<'a> {
    engine: &'a Engine,
    phrase: String,
    flags: FlagMap,
    subject: Value,
    args: Vec<Value>,
    error_mode: Cell<ErrorMode>,
    nesting: Cell<usize>,
}

impl<'a> AssertionContext<'a> {
    /// The matched phrase text.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// The value under test.
    pub fn subject(&self) -> &Value {
        &self.subject
    }

    /// Extra arguments given at the call site.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// One extra argument, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Whether `name` was toggled on by the matched phrase.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// How a nested failure is represented in this assertion's failure.
    pub fn error_mode(&self) -> ErrorMode {
        self.error_mode.get()
    }

    /// Declare the error mode before issuing sub-assertions.
    pub fn set_error_mode(&self, mode: ErrorMode) {
        self.error_mode.set(mode);
    }

    /// The engine this assertion runs in.
    pub fn engine(&self) -> &Engine {
        self.engine
    }

    /// Issue a sub-assertion.
    ///
    /// `[flag]` and `[!flag]` tokens in the phrase are resolved against
    /// this assertion's flags: the word stays when the flag state
    /// matches (`!` inverts the check) and is dropped otherwise.
    pub fn expect(
        &self,
        subject: impl Into<Value>,
        phrase: &str,
        args: &[Value],
    ) -> EngineResult<()> {
        let rewritten = self.rewrite_flags(phrase);
        let subject = subject.into();
        self.call_in_nested_context(|| self.engine.execute(subject, &rewritten, args))
    }

    /// Fail this assertion with a formatted message (`{0}`, `{1}`, ...
    /// substituted from `args`). Subject to the declared error mode
    /// like any nested failure.
    pub fn fail(&self, message: &str, args: &[Value]) -> EngineResult<()> {
        self.call_in_nested_context(|| self.engine.fail(message, args))
    }

    /// `expected <subject> <phrase>` plus inspected arguments.
    pub fn standard_error_message(&self) -> Document {
        let mut out = self.engine.doc().text("expected ");
        out = out.block(&self.engine.inspect(&self.subject, None));
        out = out.text(" ").text(self.phrase.as_str());
        for (idx, arg) in self.args.iter().enumerate() {
            out = out.text(if idx == 0 { " " } else { ", " });
            out = out.block(&self.engine.inspect(arg, None));
        }
        out
    }

    fn rewrite_flags(&self, phrase: &str) -> String {
        FLAG_SYNTAX
            .replace_all(phrase, |caps: &Captures<'_>| {
                let negated = !caps[1].is_empty();
                let flag = &caps[2];
                if self.flag(flag) != negated {
                    format!("{} ", flag)
                } else {
                    String::new()
                }
            })
            .trim()
            .to_string()
    }

    /// Run `callback` one nesting level deeper. A failure surfacing
    /// while the counter returns to zero is rewritten per the declared
    /// error mode; everything else propagates untouched.
    fn call_in_nested_context(
        &self,
        callback: impl FnOnce() -> EngineResult<()>,
    ) -> EngineResult<()> {
        self.nesting.set(self.nesting.get() + 1);
        let result = callback();
        self.nesting.set(self.nesting.get() - 1);
        match result {
            Err(EngineError::Failure(failure)) if self.nesting.get() == 0 => {
                Err(EngineError::Failure(self.wrap_failure(failure)))
            }
            other => other,
        }
    }

    fn wrap_failure(&self, failure: AssertionFailure) -> AssertionFailure {
        let format = self.engine.output_format();
        match self.error_mode.get() {
            ErrorMode::Bubble => failure,
            ErrorMode::Default => {
                AssertionFailure::new(self.standard_error_message(), format)
            }
            ErrorMode::Nested => {
                let output = self
                    .standard_error_message()
                    .nl()
                    .indent_lines()
                    .i()
                    .block(failure.output());
                AssertionFailure::new(output, format)
            }
        }
    }
}
