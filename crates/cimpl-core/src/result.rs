//! Result type alias for fallible operations around the engine

use crate::error::CimplError;

/// Standard Result type for configuration, document and registry operations
pub type Result<T> = std::result::Result<T, CimplError>;
