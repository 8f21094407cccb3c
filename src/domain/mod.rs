//! Domain models and types for the semantic layer.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Entity identifiers** ([`EntityName`], [`Namespace`], [`Layer`])
//! - **Relations** ([`Table`], [`Column`], [`Value`], [`DataType`])
//! - **Error types** ([`SemanticError`], [`CastError`], [`SourceError`])
//! - **Result type alias** ([`Result`])
//!
//! # Entity names
//!
//! Relations are addressed as `<namespace>.<relation>`. A bare relation name
//! resolves to the `business` namespace:
//!
//! ```rust
//! use hrms_semantic::domain::{EntityName, Namespace};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let name: EntityName = "employee_summary".parse()?;
//! assert_eq!(name.namespace(), Namespace::Business);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SemanticError>`]:
//!
//! ```rust
//! use hrms_semantic::domain::{SemanticError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = hrms_semantic::config::SemanticConfig::from_file("hrms.toml")?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod result;
pub mod table;
pub mod value;

// Re-export commonly used types for convenience
pub use errors::{CastError, SemanticError, SourceError};
pub use ids::{EntityName, Layer, Namespace};
pub use result::Result;
pub use table::{Column, Row, SortKey, SortOrder, Table};
pub use value::{DataType, Value};
