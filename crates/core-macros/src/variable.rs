//! Macro variables: named placeholders whose expansion text is computed on
//! demand instead of replayed as keystrokes.

use chrono::Local;
use core_surface::Dialog;
use serde::{Deserialize, Serialize};

use crate::MacrosError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableKind {
    /// Computed by the editor: `Date`, `Time`, `Year`, `Filename`, `Line`, `Newline`.
    Builtin,
    /// Process environment variable named by `value` (or the variable name).
    Environment,
    /// Literal `value`.
    Fixed,
    /// Ask through the dialog on every expansion.
    Input,
    /// Ask once, then reuse the answer.
    InputOnce,
    /// `value` is a template whose `@name@` references expand recursively.
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip)]
    cached: Option<String>,
}

/// Editor facts builtin variables read.
pub struct ExpandContext<'a> {
    pub filename: &'a str,
    pub line: usize,
    pub dialog: &'a mut dyn Dialog,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
            prompt: None,
            cached: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Expansion of everything except templates, which need the registry.
    pub(crate) fn expand_simple(&mut self, ctx: &mut ExpandContext<'_>) -> Result<String, MacrosError> {
        match self.kind {
            VariableKind::Builtin => self.builtin(ctx),
            VariableKind::Environment => {
                let key = if self.value.is_empty() { &self.name } else { &self.value };
                Ok(std::env::var(key).unwrap_or_default())
            }
            VariableKind::Fixed => Ok(self.value.clone()),
            VariableKind::Input => self.ask(ctx),
            VariableKind::InputOnce => {
                if let Some(cached) = &self.cached {
                    return Ok(cached.clone());
                }
                let answer = self.ask(ctx)?;
                self.cached = Some(answer.clone());
                Ok(answer)
            }
            VariableKind::Template => Ok(self.value.clone()),
        }
    }

    fn ask(&self, ctx: &mut ExpandContext<'_>) -> Result<String, MacrosError> {
        let title = self.prompt.as_deref().unwrap_or(&self.name);
        ctx.dialog
            .prompt_text(title, &self.value)
            .ok_or_else(|| MacrosError::Cancelled(self.name.clone()))
    }

    fn builtin(&self, ctx: &ExpandContext<'_>) -> Result<String, MacrosError> {
        let now = Local::now();
        let text = match self.name.as_str() {
            "Date" => now.format("%Y-%m-%d").to_string(),
            "Time" => now.format("%H:%M:%S").to_string(),
            "Year" => now.format("%Y").to_string(),
            "Datetime" => now.format("%Y-%m-%d %H:%M:%S").to_string(),
            "Filename" => ctx.filename.to_string(),
            "Line" => (ctx.line + 1).to_string(),
            "Newline" => "\n".to_string(),
            _ => return Err(MacrosError::UnknownVariable(self.name.clone())),
        };
        Ok(text)
    }
}
