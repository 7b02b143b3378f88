//! Serialized form of a model

use super::{CodeSystem, DataElement, ElementMapping, Namespace, ValueSet};
use crate::error::CimplError;
use crate::result::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk representation of a [`Specifications`](super::Specifications)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelDocument {
    pub namespaces: Vec<Namespace>,
    pub data_elements: Vec<DataElement>,
    pub value_sets: Vec<ValueSet>,
    pub code_systems: Vec<CodeSystem>,
    pub mappings: Vec<ElementMapping>,
}

impl ModelDocument {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CimplError::io_error(path, e))?;
        Self::from_json_str(&content).map_err(|e| {
            CimplError::document_error(format!("Failed to load '{}': {}", path.display(), e))
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        fs::write(path, json).map_err(|e| CimplError::io_error(path, e))
    }
}
