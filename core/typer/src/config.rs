//! Typer configuration.
//!
//! Settings live in the `[typer]` table of a TOML document:
//!
//! ```toml
//! [typer]
//! max-passes = 64
//! last-chance = true
//! script-class = "Script"
//! ```
//!
//! Every key is optional. Other tables in the same document are ignored,
//! so the settings can sit in a larger project manifest.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct TyperConfig {
    /// Upper bound on worklist passes. `None` runs until the worklist
    /// settles, which always terminates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<usize>,

    /// Retry once with branch-tolerant `if` typing before giving up.
    pub last_chance: bool,

    /// Class name for top-level code when the script node has no name.
    pub script_class: String,
}

impl Default for TyperConfig {
    fn default() -> Self {
        Self {
            max_passes: None,
            last_chance: true,
            script_class: default_script_class(),
        }
    }
}

fn default_script_class() -> String {
    String::from("Script")
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    typer: TyperConfig,
}

impl TyperConfig {
    /// Reads the `[typer]` table of a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a key has the wrong type.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let document: ConfigDocument =
            toml::from_str(source).context("Failed to parse typer configuration")?;
        Ok(document.typer)
    }

    /// Reads the `[typer]` table of a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("In {}", path.display()))
    }

    /// Serializes the settings as a `[typer]` table.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Document<'a> {
            typer: &'a TyperConfig,
        }
        toml::to_string_pretty(&Document { typer: self })
            .context("Failed to serialize typer configuration")
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
