//! Command implementations

use crate::OutputFormat;
use crate::output::{self, Summary};
use anyhow::{Context, Result};
use cimpl_core::config::ConfigLoader;
use cimpl_core::model::{ModelDocument, Specifications};
use std::path::Path;
use tracing::{debug, info};

/// Load, expand and write one model document
pub fn expand_command(
    model: &Path,
    output_path: Option<&Path>,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<Summary> {
    let start_dir = model.parent().filter(|dir| !dir.as_os_str().is_empty());
    let config = ConfigLoader::load(config_path, start_dir)
        .with_context(|| "Failed to load configuration")?;
    debug!("Using configuration: {:?}", config);

    let document = ModelDocument::from_path(model)?;
    let specifications = Specifications::from_document(document)
        .with_context(|| format!("Invalid model document '{}'", model.display()))?;
    info!(
        "Loaded {} data elements from {}",
        specifications.data_elements.len(),
        model.display()
    );

    let expansion = cimpl_core::expand(&specifications, &config);
    let summary = output::report(expansion.diagnostics.diagnostics(), format)?;

    let expanded = expansion.specifications.to_document();
    match output_path {
        Some(path) => {
            expanded.write_to(path)?;
            info!("Wrote expanded model to {}", path.display());
        }
        None => println!("{}", expanded.to_json_pretty()?),
    }
    Ok(summary)
}
