//! Mazure Query — read-side engines over the resource store.
//!
//! - [`QueryEngine`]: executes a pipelined Resource Graph query
//!   (`Resources | where ... | project ... | take n`) over a snapshot of the
//!   store and paginates the result.
//! - [`odata`]: the `$filter` / `$orderby` subset used for directory objects.
//! - [`DirectoryService`]: Graph-style users / groups / members listing.
//!
//! Both grammars are lenient: clauses they don't recognize are logged and
//! skipped rather than rejected.

pub mod directory;
pub mod engine;
pub mod error;
pub mod odata;
pub mod pipeline;
pub mod stages;

pub use directory::{DirectoryService, ListParams, ODataPage};
pub use engine::{QueryEngine, QueryOptions, QueryRequest, QueryResponse};
pub use error::{DirectoryError, QueryError};
pub use pipeline::{Condition, QueryPipeline, Stage, Table};
