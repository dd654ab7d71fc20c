//! mazure-core: Shared types, configuration, and error handling for Mazure.
//!
//! This crate provides the foundational types used across all Mazure components:
//! - `Resource` records and their ARM query-row rendering
//! - `RelationshipEdge` and the open `RelationType` vocabulary
//! - Dotted-path lookup over JSON property bags
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod path;
pub mod types;

pub use config::MazureConfig;
pub use error::MazureError;
pub use types::{EdgeId, RelationType, RelationshipEdge, Resource, ResourceUpdate, Row};
