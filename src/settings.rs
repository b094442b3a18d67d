//! Settings read with the `config` crate.
//!
//! Sources, later ones winning: built-in defaults, an optional `pierre.json` (or the
//! file passed explicitly), and `PIERRE_*` environment variables where nested keys
//! are separated by `__` (for example `PIERRE_RENDER__FORMAT=tex`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::document::EvalOptions;
use crate::error::{PierreError, Result};
use crate::render::{OutputFormat, RenderStyle};

pub const DEFAULT_CONFIG_FILE: &str = "pierre.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub precision: usize,
    pub block_indent: usize,
    pub log_level: String,
    pub render: RenderSettings,
}
impl Default for Settings {
    fn default() -> Self {
        let options = EvalOptions::default();
        Self {
            precision: options.precision,
            block_indent: options.block_indent,
            log_level: "info".to_string(),
            render: RenderSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub format: OutputFormat,
    pub stylesheet: Option<PathBuf>,
    pub percent_digits: usize,
    pub value_digits: usize,
}
impl Default for RenderSettings {
    fn default() -> Self {
        let style = RenderStyle::default();
        Self {
            format: OutputFormat::default(),
            stylesheet: None,
            percent_digits: style.percent_digits,
            value_digits: style.value_digits,
        }
    }
}

impl Settings {
    /// Loads settings. An explicitly given file must exist; the default one may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("PIERRE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        debug!(?settings, "settings loaded");
        Ok(settings)
    }
    pub fn validate(&self) -> Result<()> {
        if !(1..=15).contains(&self.precision) {
            return Err(PierreError::Config(format!(
                "precision must be between 1 and 15, got {}",
                self.precision
            )));
        }
        // anything shallower would no longer be read back as a block
        if self.block_indent < 4 {
            return Err(PierreError::Config(format!(
                "block_indent must be at least 4, got {}",
                self.block_indent
            )));
        }
        Ok(())
    }
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            precision: self.precision,
            block_indent: self.block_indent,
        }
    }
    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            percent_digits: self.render.percent_digits,
            value_digits: self.render.value_digits,
        }
    }
}
