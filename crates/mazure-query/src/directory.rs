//! Users and groups rendered as Microsoft Graph directory objects.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use mazure_core::config::DirectorySettings;
use mazure_core::{RelationType, Resource};
use mazure_store::{RelationshipStore, ResourceStore};

use crate::error::DirectoryError;
use crate::odata::{apply_filter, apply_order_by};

pub const USER_TYPE: &str = "Microsoft.Graph/User";
pub const GROUP_TYPE: &str = "Microsoft.Graph/Group";

/// OData query parameters for a collection request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default, alias = "$top")]
    pub top: Option<usize>,
    #[serde(default, alias = "$skip")]
    pub skip: Option<usize>,
    #[serde(default, alias = "$select")]
    pub select: Option<Vec<String>>,
    #[serde(default, alias = "$filter")]
    pub filter: Option<String>,
    #[serde(default, alias = "$orderby")]
    pub orderby: Option<String>,
}

/// OData collection envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ODataPage {
    #[serde(rename = "@odata.context")]
    pub context: String,
    pub value: Vec<Map<String, Value>>,
    #[serde(rename = "@odata.nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    User,
    Group,
}

impl Kind {
    fn resource_type(self) -> &'static str {
        match self {
            Self::User => USER_TYPE,
            Self::Group => GROUP_TYPE,
        }
    }

    fn collection(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
        }
    }
}

/// Directory queries over resources seeded into the tenant pseudo-subscription.
pub struct DirectoryService {
    resources: Arc<dyn ResourceStore>,
    relationships: Option<Arc<dyn RelationshipStore>>,
    settings: DirectorySettings,
}

impl DirectoryService {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        relationships: Option<Arc<dyn RelationshipStore>>,
        settings: DirectorySettings,
    ) -> Self {
        Self {
            resources,
            relationships,
            settings,
        }
    }

    pub async fn list_users(&self, params: &ListParams) -> Result<ODataPage, DirectoryError> {
        self.list(Kind::User, params).await
    }

    pub async fn list_groups(&self, params: &ListParams) -> Result<ODataPage, DirectoryError> {
        self.list(Kind::Group, params).await
    }

    pub async fn get_user(
        &self,
        user_id: &str,
        select: Option<&[String]>,
    ) -> Result<Map<String, Value>, DirectoryError> {
        let user = self.find(Kind::User, user_id).await?;
        Ok(format_user(&user, select))
    }

    pub async fn get_group(
        &self,
        group_id: &str,
        select: Option<&[String]>,
    ) -> Result<Map<String, Value>, DirectoryError> {
        let group = self.find(Kind::Group, group_id).await?;
        Ok(format_group(&group, select))
    }

    /// Members of a group, following `has_member` edges from `graph://group/{id}`.
    pub async fn list_group_members(
        &self,
        group_id: &str,
        top: Option<usize>,
        skip: Option<usize>,
    ) -> Result<ODataPage, DirectoryError> {
        let context = self.context("directoryObjects");
        let Some(relationships) = &self.relationships else {
            return Ok(ODataPage {
                context,
                value: Vec::new(),
                next_link: None,
            });
        };

        let top = top.unwrap_or(self.settings.default_top);
        let skip = skip.unwrap_or(0);
        let source = format!("graph://group/{group_id}");
        let edges = relationships
            .find_outbound(&source, Some(&[RelationType::HasMember]))
            .await?;
        let total = edges.len();

        let mut value = Vec::new();
        for edge in edges.iter().skip(skip).take(top) {
            if let Some(member) = self.resources.get_resource(&edge.target_id).await? {
                value.push(format_directory_object(&member));
            }
        }

        let end = skip.saturating_add(top);
        let next_link = (end < total).then(|| {
            format!(
                "{}/groups/{group_id}/members?$skip={end}&$top={top}",
                self.settings.base_url
            )
        });
        Ok(ODataPage {
            context,
            value,
            next_link,
        })
    }

    async fn list(&self, kind: Kind, params: &ListParams) -> Result<ODataPage, DirectoryError> {
        let mut rows = self.directory_objects(kind).await?;
        if let Some(filter) = &params.filter {
            rows = apply_filter(rows, filter);
        }
        if let Some(orderby) = &params.orderby {
            rows = apply_order_by(rows, orderby);
        }

        let total = rows.len();
        let top = params.top.unwrap_or(self.settings.default_top);
        let skip = params.skip.unwrap_or(0);
        let select = params.select.as_deref();

        let value = rows
            .iter()
            .skip(skip)
            .take(top)
            .map(|r| match kind {
                Kind::User => format_user(r, select),
                Kind::Group => format_group(r, select),
            })
            .collect();

        let end = skip.saturating_add(top);
        let next_link = (end < total).then(|| {
            format!(
                "{}/{}?$skip={end}&$top={top}",
                self.settings.base_url,
                kind.collection()
            )
        });

        tracing::debug!(collection = kind.collection(), total, "Listed directory objects");
        Ok(ODataPage {
            context: self.context(kind.collection()),
            value,
            next_link,
        })
    }

    async fn directory_objects(&self, kind: Kind) -> Result<Vec<Resource>, DirectoryError> {
        let resources = self
            .resources
            .list_resources(&self.settings.subscription_id, Some(kind.resource_type()))
            .await?;
        Ok(resources
            .into_iter()
            .filter(|r| r.resource_group == self.settings.resource_group)
            .collect())
    }

    /// Match by id substring (case-insensitive), then by exact name.
    async fn find(&self, kind: Kind, id: &str) -> Result<Resource, DirectoryError> {
        let candidates = self.directory_objects(kind).await?;
        let needle = id.to_lowercase();

        candidates
            .iter()
            .find(|r| r.id.to_lowercase().contains(&needle))
            .or_else(|| candidates.iter().find(|r| r.name == id))
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound {
                kind: kind.label(),
                id: id.to_string(),
            })
    }

    fn context(&self, collection: &str) -> String {
        format!("{}/$metadata#{collection}", self.settings.base_url)
    }
}

// ── Formatting ───────────────────────────────────────────────────

fn prop(resource: &Resource, key: &str) -> Value {
    resource.properties.get(key).cloned().unwrap_or(Value::Null)
}

fn prop_or(resource: &Resource, key: &str, default: Value) -> Value {
    resource.properties.get(key).cloned().unwrap_or(default)
}

fn graph_id(resource: &Resource) -> Value {
    Value::String(
        resource
            .tags
            .get("graph_id")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
    )
}

fn select_fields(object: Value, select: Option<&[String]>) -> Map<String, Value> {
    let Value::Object(map) = object else {
        return Map::new();
    };
    match select {
        Some(fields) if !fields.is_empty() => map
            .into_iter()
            .filter(|(k, _)| k == "id" || fields.iter().any(|f| f == k))
            .collect(),
        _ => map,
    }
}

pub fn format_user(resource: &Resource, select: Option<&[String]>) -> Map<String, Value> {
    let name = Value::String(resource.name.clone());
    let user = json!({
        "id": graph_id(resource),
        "userPrincipalName": prop_or(resource, "userPrincipalName", name.clone()),
        "displayName": prop_or(resource, "displayName", name),
        "givenName": prop(resource, "givenName"),
        "surname": prop(resource, "surname"),
        "mail": prop(resource, "mail"),
        "mailNickname": prop(resource, "mailNickname"),
        "jobTitle": prop(resource, "jobTitle"),
        "department": prop(resource, "department"),
        "officeLocation": prop(resource, "officeLocation"),
        "mobilePhone": prop(resource, "mobilePhone"),
        "businessPhones": prop_or(resource, "businessPhones", json!([])),
        "accountEnabled": prop_or(resource, "accountEnabled", json!(true)),
        "userType": prop_or(resource, "userType", json!("Member")),
    });
    select_fields(user, select)
}

pub fn format_group(resource: &Resource, select: Option<&[String]>) -> Map<String, Value> {
    let group = json!({
        "id": graph_id(resource),
        "displayName": prop_or(resource, "displayName", Value::String(resource.name.clone())),
        "description": prop(resource, "description"),
        "mailEnabled": prop_or(resource, "mailEnabled", json!(false)),
        "mailNickname": prop(resource, "mailNickname"),
        "mail": prop(resource, "mail"),
        "securityEnabled": prop_or(resource, "securityEnabled", json!(true)),
        "groupTypes": prop_or(resource, "groupTypes", json!([])),
        "visibility": prop_or(resource, "visibility", json!("Private")),
        "createdDateTime": prop(resource, "createdDateTime"),
    });
    select_fields(group, select)
}

/// A member entry, tagged with its `@odata.type`.
pub fn format_directory_object(resource: &Resource) -> Map<String, Value> {
    let (mut object, odata_type) = match resource.resource_type.as_str() {
        USER_TYPE => (format_user(resource, None), "#microsoft.graph.user".to_string()),
        GROUP_TYPE => (format_group(resource, None), "#microsoft.graph.group".to_string()),
        other => {
            let mut object = Map::new();
            object.insert("id".to_string(), graph_id(resource));
            object.insert("displayName".to_string(), Value::String(resource.name.clone()));
            let kind = other.rsplit('/').next().unwrap_or(other).to_lowercase();
            (object, format!("#microsoft.graph.{kind}"))
        }
    };
    object.insert("@odata.type".to_string(), Value::String(odata_type));
    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazure_store::InMemoryStore;

    fn directory_user(graph_id: &str, name: &str, props: Value) -> Resource {
        Resource::new("Tenant", "EntraID", USER_TYPE, name, "global")
            .with_id(format!("graph://user/{graph_id}"))
            .with_tag("graph_id", graph_id)
            .with_properties(props)
    }

    fn directory_group(graph_id: &str, name: &str) -> Resource {
        Resource::new("Tenant", "EntraID", GROUP_TYPE, name, "global")
            .with_id(format!("graph://group/{graph_id}"))
            .with_tag("graph_id", graph_id)
            .with_properties(json!({"displayName": name, "securityEnabled": false}))
    }

    async fn seeded() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let users = [
            ("u1", "alice@contoso.com", json!({"displayName": "Alice", "department": "Eng"})),
            ("u2", "bob@contoso.com", json!({"displayName": "Bob", "accountEnabled": false})),
            ("u3", "carol@contoso.com", json!({"displayName": "Carol", "department": "Eng"})),
        ];
        for (id, name, props) in users {
            store.create_resource(directory_user(id, name, props)).await.unwrap();
        }
        store.create_resource(directory_group("g1", "Admins")).await.unwrap();
        store
            .create_relationship("graph://group/g1", "graph://user/u1", RelationType::HasMember, 1.0, Map::new())
            .await
            .unwrap();
        store
            .create_relationship("graph://group/g1", "graph://user/u3", RelationType::HasMember, 1.0, Map::new())
            .await
            .unwrap();
        store
    }

    fn service(store: Arc<InMemoryStore>, with_relationships: bool) -> DirectoryService {
        let relationships: Option<Arc<dyn RelationshipStore>> = if with_relationships {
            Some(store.clone())
        } else {
            None
        };
        DirectoryService::new(store, relationships, DirectorySettings::default())
    }

    #[tokio::test]
    async fn test_list_users_paginates_with_next_link() {
        let svc = service(seeded().await, true);
        let page = svc
            .list_users(&ListParams {
                top: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.context, "https://graph.microsoft.com/v1.0/$metadata#users");
        assert_eq!(page.value.len(), 2);
        assert_eq!(page.value[0]["id"], "u1");
        assert_eq!(page.value[0]["userPrincipalName"], "alice@contoso.com");
        assert_eq!(page.value[0]["accountEnabled"], true);
        assert_eq!(page.value[0]["userType"], "Member");
        assert_eq!(
            page.next_link.as_deref(),
            Some("https://graph.microsoft.com/v1.0/users?$skip=2&$top=2")
        );
    }

    #[tokio::test]
    async fn test_list_users_filter_order_and_select() {
        let svc = service(seeded().await, true);
        let page = svc
            .list_users(&ListParams {
                filter: Some("department eq 'Eng'".into()),
                orderby: Some("displayName desc".into()),
                select: Some(vec!["displayName".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = page.value.iter().map(|u| u["displayName"].clone()).collect();
        assert_eq!(names, vec![json!("Carol"), json!("Alice")]);
        assert_eq!(page.value[0].len(), 2, "select keeps id plus listed fields");
        assert!(page.next_link.is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_id_then_name() {
        let svc = service(seeded().await, true);
        let by_id = svc.get_user("U2", None).await.unwrap();
        assert_eq!(by_id["displayName"], "Bob");
        assert_eq!(by_id["accountEnabled"], false);

        let by_name = svc.get_user("carol@contoso.com", None).await.unwrap();
        assert_eq!(by_name["id"], "u3");

        let missing = svc.get_user("nobody", None).await.unwrap_err();
        assert_eq!(missing.status_code(), 404);
        assert_eq!(missing.to_body()["error"]["code"], "NotFound");
    }

    #[tokio::test]
    async fn test_groups_and_members() {
        let svc = service(seeded().await, true);
        let groups = svc.list_groups(&ListParams::default()).await.unwrap();
        assert_eq!(groups.value.len(), 1);
        assert_eq!(groups.value[0]["securityEnabled"], false);
        assert_eq!(groups.value[0]["visibility"], "Private");

        let group = svc.get_group("g1", Some(&["description".to_string()])).await.unwrap();
        assert_eq!(group.len(), 2);

        let members = svc.list_group_members("g1", Some(1), None).await.unwrap();
        assert_eq!(members.value.len(), 1);
        assert_eq!(members.value[0]["@odata.type"], "#microsoft.graph.user");
        assert_eq!(members.value[0]["id"], "u1");
        assert_eq!(
            members.next_link.as_deref(),
            Some("https://graph.microsoft.com/v1.0/groups/g1/members?$skip=1&$top=1")
        );
    }

    #[tokio::test]
    async fn test_members_without_relationship_tracking_is_empty() {
        let svc = service(seeded().await, false);
        let members = svc.list_group_members("g1", None, None).await.unwrap();
        assert!(members.value.is_empty());
        assert!(members.next_link.is_none());
    }

    #[tokio::test]
    async fn test_huge_page_sizes_do_not_overflow() {
        let svc = service(seeded().await, true);
        let page = svc
            .list_users(&ListParams {
                top: Some(usize::MAX),
                skip: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.value.len(), 2);
        assert!(page.next_link.is_none());

        let members = svc.list_group_members("g1", Some(usize::MAX), Some(1)).await.unwrap();
        assert_eq!(members.value.len(), 1);
        assert_eq!(members.value[0]["id"], "u3");
        assert!(members.next_link.is_none());
    }

    #[test]
    fn test_other_directory_objects_get_generic_shape() {
        let sp = Resource::new("Tenant", "EntraID", "Microsoft.Graph/ServicePrincipal", "app", "global");
        let object = format_directory_object(&sp);
        assert_eq!(object["id"], "unknown");
        assert_eq!(object["@odata.type"], "#microsoft.graph.serviceprincipal");
    }
}
