//! Resource Graph query execution: table resolution, stages, pagination.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use mazure_core::config::QuerySettings;
use mazure_core::Row;
use mazure_store::ResourceStore;

use crate::error::QueryError;
use crate::pipeline::{QueryPipeline, Table};
use crate::stages::apply_stage;

/// Pagination options. Accepts both `skip`/`top` and `$skip`/`$top`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default, alias = "$skip", skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(default, alias = "$top", skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
}

/// Body of `POST /providers/Microsoft.ResourceGraph/resources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub subscriptions: Vec<String>,
    pub query: String,
    #[serde(default)]
    pub options: QueryOptions,
}

/// Resource Graph response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub total_records: usize,
    pub count: usize,
    pub data: Vec<Row>,
    pub facets: Vec<Value>,
    /// `"true"` or `"false"`, as the real service returns it.
    pub result_truncated: String,
    #[serde(rename = "$skipToken", default, skip_serializing_if = "Option::is_none")]
    pub skip_token: Option<String>,
}

/// Executes pipelined queries over a snapshot of the resource store.
pub struct QueryEngine {
    resources: Arc<dyn ResourceStore>,
    settings: QuerySettings,
}

impl QueryEngine {
    pub fn new(resources: Arc<dyn ResourceStore>, settings: QuerySettings) -> Self {
        Self {
            resources,
            settings,
        }
    }

    /// Validate and run an HTTP-shaped request.
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryResponse, QueryError> {
        if request.subscriptions.is_empty() {
            return Err(QueryError::InvalidQuery(
                "At least one subscription must be provided".to_string(),
            ));
        }
        self.query(&request.subscriptions, &request.query, &request.options)
            .await
    }

    /// Run `text` against the given subscriptions.
    ///
    /// # Errors
    ///
    /// `QueryError::InvalidQuery` for an unsupported table; store failures
    /// propagate as `QueryError::Store`.
    pub async fn query(
        &self,
        subscriptions: &[String],
        text: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, QueryError> {
        let pipeline = QueryPipeline::parse(text)?;

        let mut rows = self.load_table(pipeline.table, subscriptions).await?;
        tracing::debug!(table = ?pipeline.table, rows = rows.len(), "Loaded table snapshot");

        for stage in &pipeline.stages {
            rows = apply_stage(rows, stage);
            tracing::debug!(?stage, rows = rows.len(), "Applied stage");
        }

        let skip = options.skip.unwrap_or(0);
        let top = options.top.unwrap_or(self.settings.default_top);
        Ok(paginate(rows, skip, top))
    }

    async fn load_table(&self, table: Table, subscriptions: &[String]) -> Result<Vec<Row>, QueryError> {
        match table {
            Table::Resources => self.load_resources(subscriptions).await,
            Table::ResourceContainers => self.load_containers(subscriptions).await,
        }
    }

    async fn load_resources(&self, subscriptions: &[String]) -> Result<Vec<Row>, QueryError> {
        let mut rows = Vec::new();
        for subscription_id in subscriptions {
            let resources = self.resources.list_resources(subscription_id, None).await?;
            rows.extend(
                resources
                    .iter()
                    .filter(|r| r.resource_group != self.settings.directory_resource_group)
                    .map(|r| r.to_row()),
            );
        }
        Ok(rows)
    }

    async fn load_containers(&self, subscriptions: &[String]) -> Result<Vec<Row>, QueryError> {
        let mut rows = Vec::new();
        for subscription_id in subscriptions {
            rows.push(container_row([
                ("id", format!("/subscriptions/{subscription_id}")),
                ("name", subscription_id.clone()),
                ("type", "microsoft.resources/subscriptions".to_string()),
                ("tenantId", self.settings.tenant_id.clone()),
                ("subscriptionId", subscription_id.clone()),
            ]));

            let groups: BTreeSet<String> = self
                .resources
                .list_resources(subscription_id, None)
                .await?
                .into_iter()
                .map(|r| r.resource_group)
                .filter(|rg| !rg.is_empty() && *rg != self.settings.directory_resource_group)
                .collect();

            for group in groups {
                rows.push(container_row([
                    ("id", format!("/subscriptions/{subscription_id}/resourceGroups/{group}")),
                    ("name", group),
                    ("type", "microsoft.resources/resourcegroups".to_string()),
                    ("location", self.settings.container_location.clone()),
                    ("subscriptionId", subscription_id.clone()),
                ]));
            }
        }
        Ok(rows)
    }
}

fn container_row(fields: [(&str, String); 5]) -> Row {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v)))
        .collect::<Map<_, _>>()
}

/// Slice `rows[skip..skip+top]` and compute the truncation markers.
pub fn paginate(rows: Vec<Row>, skip: usize, top: usize) -> QueryResponse {
    let total = rows.len();
    let end = skip.saturating_add(top);
    let truncated = end < total;

    let data: Vec<Row> = rows.into_iter().skip(skip).take(top).collect();

    QueryResponse {
        total_records: total,
        count: data.len(),
        data,
        facets: Vec::new(),
        result_truncated: truncated.to_string(),
        skip_token: truncated.then(|| end.to_string()),
    }
}
