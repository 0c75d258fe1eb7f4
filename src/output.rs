//! Failure-explanation documents.
//!
//! The engine composes every failure explanation through [`Document`]
//! and never looks inside it; handlers receive the same interface via
//! [`crate::engine::AssertionContext::standard_error_message`].

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use unicode_width::UnicodeWidthStr;

/// Render target used when stringifying failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text.
    Text,
    /// Terminal output. The engine emits no styling of its own, so this
    /// renders the same text; hosts layer color on top.
    Ansi,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

impl FromStr for OutputFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "ansi" => Ok(OutputFormat::Ansi),
            other => Err(EngineError::UnknownOutputFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Ansi => write!(f, "ansi"),
        }
    }
}

/// A line-oriented builder for failure explanations.
///
/// Methods chain by value. `indent_lines` raises the indent level that
/// [`i`](Document::i) writes; [`block`](Document::block) embeds another
/// document aligned at the current column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    lines: Vec<String>,
    indent: usize,
}

const INDENT_WIDTH: usize = 2;

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    /// Append text to the current line.
    pub fn text(mut self, s: impl Into<String>) -> Self {
        let text = s.into();
        match self.lines.last_mut() {
            Some(last) => last.push_str(&text),
            None => self.lines.push(text),
        }
        self
    }

    /// Start a new line.
    pub fn nl(mut self) -> Self {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.push(String::new());
        self
    }

    /// Raise the indent level written by [`i`](Document::i).
    pub fn indent_lines(mut self) -> Self {
        self.indent += 1;
        self
    }

    /// Write the current indentation into the current line.
    pub fn i(self) -> Self {
        let prefix = " ".repeat(self.indent * INDENT_WIDTH);
        self.text(prefix)
    }

    /// Embed another document, aligned at the current column.
    pub fn block(mut self, doc: &Document) -> Self {
        let column = self
            .lines
            .last()
            .map(|line| UnicodeWidthStr::width(line.as_str()))
            .unwrap_or(0);
        let mut block_lines = doc.lines.iter();
        if let Some(first) = block_lines.next() {
            match self.lines.last_mut() {
                Some(last) => last.push_str(first),
                None => self.lines.push(first.clone()),
            }
        }
        let padding = " ".repeat(column);
        for line in block_lines {
            self.lines.push(format!("{}{}", padding, line));
        }
        self
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }

    /// Render the document in the given format.
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text | OutputFormat::Ansi => self.lines.join("\n"),
        }
    }
}
