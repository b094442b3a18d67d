use clap::ValueEnum;
use serde::Deserialize;

use crate::error::Result;
use crate::hypothesis::HypothesisTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Yaml,
}

/// Serializes the table as one array of probabilities per hypothesis, in
/// declaration order.
pub fn export(hypotheses: &HypothesisTable, format: ExportFormat) -> Result<String> {
    let mut out = match format {
        ExportFormat::Json => serde_json::to_string(hypotheses)?,
        ExportFormat::Yaml => serde_yaml::to_string(hypotheses)?,
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
