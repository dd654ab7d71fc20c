//! Configuration management for Mazure services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`MAZURE__` prefix, `__` separator)
//! 2. Config file (`mazure.toml` unless another prefix is given)
//! 3. Defaults

use serde::Deserialize;

use crate::error::MazureError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MazureConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub query: QuerySettings,

    #[serde(default)]
    pub directory: DirectorySettings,
}

impl MazureConfig {
    /// Load from `{file_prefix}.toml` (optional) and `MAZURE__*` variables.
    pub fn load(file_prefix: &str) -> Result<Self, MazureError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("MAZURE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: MazureConfig = cfg.try_deserialize()?;
        tracing::debug!(
            neo4j_uri = %loaded.neo4j.uri,
            default_top = loaded.query.default_top,
            "Loaded configuration"
        );
        Ok(loaded)
    }
}

/// Connection settings for the Neo4j-backed store.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Resource Graph query defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct QuerySettings {
    /// Page size when the request carries no `top`.
    #[serde(default = "default_query_top")]
    pub default_top: usize,

    /// Pseudo resource group holding directory objects; hidden from `Resources`.
    #[serde(default = "default_directory_group")]
    pub directory_resource_group: String,

    /// Tenant id reported on subscription containers.
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,

    /// Location reported on resource-group containers.
    #[serde(default = "default_container_location")]
    pub container_location: String,
}

/// Directory (users/groups) query defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySettings {
    #[serde(default = "default_directory_subscription")]
    pub subscription_id: String,

    #[serde(default = "default_directory_group")]
    pub resource_group: String,

    #[serde(default = "default_directory_top")]
    pub default_top: usize,

    /// Base for `@odata.context` and `@odata.nextLink`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "mazure-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_query_top() -> usize {
    1000
}

fn default_directory_group() -> String {
    "EntraID".to_string()
}

fn default_tenant_id() -> String {
    "mock-tenant-id".to_string()
}

fn default_container_location() -> String {
    "eastus".to_string()
}

fn default_directory_subscription() -> String {
    "Tenant".to_string()
}

fn default_directory_top() -> usize {
    100
}

fn default_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_top: default_query_top(),
            directory_resource_group: default_directory_group(),
            tenant_id: default_tenant_id(),
            container_location: default_container_location(),
        }
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            subscription_id: default_directory_subscription(),
            resource_group: default_directory_group(),
            default_top: default_directory_top(),
            base_url: default_base_url(),
        }
    }
}
