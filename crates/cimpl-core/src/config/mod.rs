//! Configuration for the expansion engine
//!
//! The engine needs a handful of domain facts that are not part of the model
//! itself: which types make a value code-bearing, which element is the common
//! envelope of entries, and how the items of each mapping target relate.
//!
//! ## Configuration Files
//!
//! The following files are discovered, in priority order, by walking up from
//! the working directory:
//! - `cimpl.toml`
//! - `cimpl.yaml` / `cimpl.yml`
//! - `cimpl.json`
//!
//! ## Example Configuration
//!
//! ```toml
//! codeBearingTypes = ["shr.core.Coding", "shr.core.CodeableConcept"]
//! entryElement = "shr.base.Entry"
//!
//! [targets.FHIR_R4]
//! Observation = ["DomainResource"]
//! DomainResource = ["Resource"]
//! ```

mod expander_config;
mod loader;
mod targets;

pub use expander_config::ExpanderConfig;
pub use loader::ConfigLoader;
pub use targets::{ConfiguredTargets, TargetCapabilities};
