use crate::error::CimplError;
use crate::model::Identifier;
use crate::result::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const ENVELOPE_FIELDS: &[&str] = &[
    "ShrId",
    "EntryId",
    "EntryType",
    "FocalSubject",
    "SubjectIsThirdPartyFlag",
    "Narrative",
    "Informant",
    "Author",
    "AssociatedEncounter",
    "OriginalCreationDate",
    "LastUpdateDate",
    "Language",
];

/// Engine configuration; every field falls back to its default when absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpanderConfig {
    /// Types whose descendants accept code and value set constraints
    pub code_bearing_types: Vec<Identifier>,

    /// The common envelope element of entries
    pub entry_element: Identifier,

    /// Envelope fields assumed when the envelope element is not defined
    pub entry_fallback_fields: Vec<Identifier>,

    /// Per mapping target: item -> the items it is based on
    pub targets: IndexMap<String, IndexMap<String, Vec<String>>>,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        let mut entry_fallback_fields = vec![Identifier::new("shr.core", "Version")];
        entry_fallback_fields.extend(
            ENVELOPE_FIELDS
                .iter()
                .map(|name| Identifier::new("shr.base", *name)),
        );
        Self {
            code_bearing_types: vec![
                Identifier::new("shr.core", "Coding"),
                Identifier::new("shr.core", "CodeableConcept"),
            ],
            entry_element: Identifier::new("shr.base", "Entry"),
            entry_fallback_fields,
            targets: IndexMap::new(),
        }
    }
}

impl ExpanderConfig {
    /// Load from a TOML, YAML or JSON file, chosen by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CimplError::io_error(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content).map_err(|e| CimplError::config_error(e.to_string())),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| CimplError::config_error(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| CimplError::config_error(e.to_string()))
            }
            _ => Err(CimplError::config_error(
                "Unsupported file extension (expected .toml, .yaml, .yml, or .json)",
            )),
        }
    }

    pub fn is_entry_fallback_field(&self, identifier: &Identifier) -> bool {
        self.entry_fallback_fields.contains(identifier)
    }
}
