//! CIMPL Core
//!
//! Model expansion and constraint consolidation for CIMPL/SHR data element
//! models. This crate takes an unexpanded model, where elements only state
//! what they add to their bases, and produces the expanded model in which
//! every element carries its full structure, consolidated constraints and
//! provenance.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expand;
pub mod model;
pub mod result;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfiguredTargets, ExpanderConfig, TargetCapabilities};
pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticSink, Scope, Severity};
pub use error::{CimplError, ErrorKind, ExpansionError};
pub use expand::{Expander, Expansion, InheritanceGraph, expand};
pub use model::{ModelDocument, Specifications};
pub use result::Result;

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    init_tracing_with_filter("cimpl_core=info,cimpl=info");
}

/// Initialize tracing with a default filter, still overridable by `RUST_LOG`
pub fn init_tracing_with_filter(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
