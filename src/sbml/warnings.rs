//! Warning accumulation
//!
//! Non-fatal findings are collected in a [`WarningCollector`] owned by the
//! caller and passed to the parser explicitly. Each warning is also emitted
//! through the `log` facade.

use std::fmt::{self, Display};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarningCollector {
    messages: Vec<String>,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.messages.push(message);
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// All warnings, one per line.
    pub fn text(&self) -> String {
        self.messages.join("\n")
    }

    /// Removes and returns all collected warnings.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

impl Display for WarningCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}
