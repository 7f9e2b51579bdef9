//! Macro registry: recorded keystroke macros and named variables.
//!
//! The registry is owned by the editor session and shared by every engine of
//! that session (`Rc<RefCell<Macros>>`). Names are case-distinguishing.
//! Writing an existing macro name overwrites it.
//!
//! On disk the registry is a TOML document:
//!
//! ```toml
//! [macros]
//! a = "ihello\u001b"
//!
//! [[variable]]
//! name = "Author"
//! kind = "input-once"
//! prompt = "Author name"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::MacrosError;
use crate::variable::{ExpandContext, Variable, VariableKind};

/// Nesting limit for template expansion.
pub const MAX_TEMPLATE_DEPTH: usize = 16;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    macros: BTreeMap<String, String>,
    #[serde(default, rename = "variable")]
    variables: Vec<Variable>,
}

#[derive(Debug, Default)]
pub struct Macros {
    macros: BTreeMap<String, String>,
    variables: BTreeMap<String, Variable>,
    last: Option<String>,
    modified: bool,
    path: Option<PathBuf>,
}

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    /// Macro names must be non-empty and made of alphanumerics, `_` or `-`.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    }

    pub fn from_toml_str(content: &str) -> Result<Self, MacrosError> {
        let doc: Document = toml::from_str(content)?;
        let mut macros = Self::new();
        for (name, text) in doc.macros {
            if !Self::is_valid_name(&name) {
                return Err(MacrosError::InvalidName(name));
            }
            macros.macros.insert(name, text);
        }
        for variable in doc.variables {
            if !Self::is_valid_name(&variable.name) {
                return Err(MacrosError::InvalidName(variable.name));
            }
            macros.variables.insert(variable.name.clone(), variable);
        }
        Ok(macros)
    }

    pub fn to_toml_string(&self) -> Result<String, MacrosError> {
        let doc = Document {
            macros: self.macros.clone(),
            variables: self.variables.values().cloned().collect(),
        };
        Ok(toml::to_string(&doc)?)
    }

    /// Load the registry stored at `path`. A missing file yields an empty
    /// registry bound to that path.
    pub fn load_document(path: &Path) -> Result<Self> {
        let mut macros = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading macros from {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("parsing macros in {}", path.display()))?
        } else {
            debug!(target: "vi.macros", path = %path.display(), "registry_missing_empty");
            Self::new()
        };
        macros.path = Some(path.to_path_buf());
        info!(
            target: "vi.macros",
            path = %path.display(),
            macros = macros.macros.len(),
            variables = macros.variables.len(),
            "registry_loaded"
        );
        Ok(macros)
    }

    /// Write back to the load path when something changed. Returns whether a
    /// write happened.
    pub fn save_document(&mut self) -> Result<bool> {
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };
        if !self.modified {
            return Ok(false);
        }
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, self.to_toml_string()?)
            .with_context(|| format!("writing macros to {}", path.display()))?;
        self.modified = false;
        info!(target: "vi.macros", path = %path.display(), "registry_saved");
        Ok(true)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    pub fn is_recorded(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Store `text` under `name`, replacing any previous recording.
    pub fn set(&mut self, name: &str, text: &str) {
        let replaced = self.macros.insert(name.to_string(), text.to_string()).is_some();
        self.modified = true;
        debug!(target: "vi.macros", name, len = text.len(), replaced, "macro_stored");
    }

    pub fn erase(&mut self, name: &str) -> bool {
        let removed = self.macros.remove(name).is_some();
        self.modified |= removed;
        removed
    }

    pub fn macro_names(&self) -> Vec<String> {
        self.macros.keys().cloned().collect()
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
        self.modified = true;
    }

    /// Sorted macro and variable names starting with `prefix`.
    pub fn candidates(&self, prefix: &str) -> Vec<String> {
        self.macros
            .keys()
            .chain(self.variables.keys())
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Most recently recorded or played macro.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    pub fn set_last(&mut self, name: &str) {
        self.last = Some(name.to_string());
    }

    /// Expand variable `name`, following template references.
    pub fn expand(&mut self, name: &str, ctx: &mut ExpandContext<'_>) -> Result<String, MacrosError> {
        self.expand_at(name, ctx, 0)
    }

    /// Replace every `@name@` naming a known variable in `template`. Other
    /// `@` characters are kept verbatim.
    pub fn expand_template(
        &mut self,
        template: &str,
        ctx: &mut ExpandContext<'_>,
    ) -> Result<String, MacrosError> {
        self.expand_template_at(template, ctx, 0)
    }

    fn expand_at(
        &mut self,
        name: &str,
        ctx: &mut ExpandContext<'_>,
        depth: usize,
    ) -> Result<String, MacrosError> {
        if depth > MAX_TEMPLATE_DEPTH {
            return Err(MacrosError::TemplateDepth(name.to_string()));
        }
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| MacrosError::UnknownVariable(name.to_string()))?;
        let kind = variable.kind;
        let text = variable.expand_simple(ctx)?;
        if kind != VariableKind::Template {
            return Ok(text);
        }
        self.expand_template_at(&text, ctx, depth + 1)
    }

    fn expand_template_at(
        &mut self,
        template: &str,
        ctx: &mut ExpandContext<'_>,
        depth: usize,
    ) -> Result<String, MacrosError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('@') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('@') {
                Some(end) if self.variables.contains_key(&after[..end]) => {
                    out.push_str(&self.expand_at(&after[..end], ctx, depth)?);
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('@');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}
