//! CLI entry point for the Mazure engines.
//!
//! Reads request bodies as JSON from stdin where a command takes one and
//! writes exactly one JSON document to stdout. Logs go to stderr.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use mazure_core::MazureConfig;
use mazure_query::{DirectoryError, DirectoryService, ListParams, QueryEngine, QueryRequest};
use mazure_relations::{RelationshipEngine, ValidateRequest};
use mazure_store::{Neo4jStore, RelationshipStore, ResourceStore};

#[derive(Parser)]
#[command(name = "mazure")]
#[command(about = "Resource Graph queries and relationship-aware operations over a mock Azure estate")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: mazure).
    #[arg(short, long, default_value = "mazure", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Resource Graph query (reads the request JSON from stdin).
    Query,
    /// Delete a resource, optionally cascading to its dependents.
    Delete {
        #[arg(long)]
        resource_id: String,
        #[arg(long)]
        cascade: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Check that a new resource's references exist (reads JSON from stdin).
    Validate,
    /// Show what a resource depends on and what depends on it.
    Dependencies {
        #[arg(long)]
        resource_id: String,
        /// Levels to expand; 0 is unbounded.
        #[arg(long, default_value_t = 1)]
        depth: u32,
        #[arg(long)]
        no_dependents: bool,
    },
    /// Estimate the impact of deleting or modifying a resource.
    Impact {
        #[arg(long)]
        resource_id: String,
        #[arg(long, default_value = "delete")]
        operation: String,
    },
    /// List directory users, or fetch one with --id.
    Users(DirectoryArgs),
    /// List directory groups, or fetch one with --id.
    Groups(DirectoryArgs),
    /// List the members of a directory group.
    Members {
        #[arg(long)]
        group_id: String,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long)]
        skip: Option<usize>,
    },
    /// Create the Neo4j constraints and indexes.
    InitSchema,
}

#[derive(Args)]
struct DirectoryArgs {
    /// Fetch a single object instead of listing.
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    top: Option<usize>,
    #[arg(long)]
    skip: Option<usize>,
    /// Comma-separated property names.
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,
    #[arg(long)]
    filter: Option<String>,
    #[arg(long)]
    orderby: Option<String>,
}

impl DirectoryArgs {
    fn params(&self) -> ListParams {
        ListParams {
            top: self.top,
            skip: self.skip,
            select: self.select.clone(),
            filter: self.filter.clone(),
            orderby: self.orderby.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = MazureConfig::load(&cli.config)?;

    let store = Arc::new(Neo4jStore::connect(&config.neo4j).await?);
    let resources: Arc<dyn ResourceStore> = store.clone();
    let relationships: Arc<dyn RelationshipStore> = store.clone();

    let output = match cli.command {
        Command::Query => {
            let request: QueryRequest = read_stdin()?;
            let engine = QueryEngine::new(resources, config.query);
            serde_json::to_value(engine.execute(&request).await?)?
        }
        Command::Delete {
            ref resource_id,
            cascade,
            dry_run,
        } => {
            let engine = RelationshipEngine::new(resources, Some(relationships));
            serde_json::to_value(engine.delete_with_dependents(resource_id, cascade, dry_run).await)?
        }
        Command::Validate => {
            let request: ValidateRequest = read_stdin()?;
            let engine = RelationshipEngine::new(resources, Some(relationships));
            let outcome = engine
                .validate_create(
                    &request.resource_type,
                    &request.properties,
                    request.subscription_id.as_deref(),
                    request.resource_group.as_deref(),
                )
                .await;
            serde_json::to_value(outcome)?
        }
        Command::Dependencies {
            ref resource_id,
            depth,
            no_dependents,
        } => {
            let engine = RelationshipEngine::new(resources, Some(relationships));
            serde_json::to_value(
                engine
                    .get_resource_dependencies(resource_id, depth, !no_dependents)
                    .await,
            )?
        }
        Command::Impact {
            ref resource_id,
            ref operation,
        } => {
            let engine = RelationshipEngine::new(resources, Some(relationships));
            serde_json::to_value(engine.analyze_impact(resource_id, operation).await)?
        }
        Command::Users(ref args) => {
            let service = DirectoryService::new(resources, Some(relationships), config.directory);
            match &args.id {
                Some(id) => graph_body(service.get_user(id, args.select.as_deref()).await)?,
                None => graph_body(service.list_users(&args.params()).await)?,
            }
        }
        Command::Groups(ref args) => {
            let service = DirectoryService::new(resources, Some(relationships), config.directory);
            match &args.id {
                Some(id) => graph_body(service.get_group(id, args.select.as_deref()).await)?,
                None => graph_body(service.list_groups(&args.params()).await)?,
            }
        }
        Command::Members {
            ref group_id,
            top,
            skip,
        } => {
            let service = DirectoryService::new(resources, Some(relationships), config.directory);
            graph_body(service.list_group_members(group_id, top, skip).await)?
        }
        Command::InitSchema => {
            store.ensure_schema().await?;
            tracing::info!(uri = %config.neo4j.uri, "Schema initialized");
            serde_json::json!({"status": "ok"})
        }
    };

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn read_stdin<T: serde::de::DeserializeOwned>() -> anyhow::Result<T> {
    let input = std::io::read_to_string(std::io::stdin())?;
    Ok(serde_json::from_str(&input)?)
}

/// Directory results render like the Graph API: the payload on success,
/// the `{error: {...}}` envelope on failure.
fn graph_body<T: serde::Serialize>(result: Result<T, DirectoryError>) -> anyhow::Result<Value> {
    match result {
        Ok(body) => Ok(serde_json::to_value(body)?),
        Err(e) => {
            tracing::warn!(status = e.status_code(), error = %e, "Directory request failed");
            Ok(e.to_body())
        }
    }
}
