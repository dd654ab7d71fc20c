//! Create-time reference validation.

use serde_json::Value;

use mazure_core::path::{get_path, get_str};

use crate::error::Result;
use crate::types::{ValidationOutcome, ValidationReport};
use crate::RelationshipEngine;

const VIRTUAL_MACHINE: &str = "Microsoft.Compute/virtualMachines";
const NETWORK_INTERFACE: &str = "Microsoft.Network/networkInterfaces";

/// A resource id a new resource points at, labelled for error messages.
#[derive(Debug, PartialEq)]
struct Reference<'a> {
    label: &'static str,
    id: &'a str,
}

impl RelationshipEngine {
    /// Check that every resource referenced by `properties` exists.
    ///
    /// Virtual machines reference NICs and a managed OS disk; NICs reference
    /// subnets, public IPs, and an NSG. Types are matched exactly; anything
    /// else, including a differently cased type, always validates. Missing
    /// references are reported in `errors`, never raised.
    pub async fn validate_create(
        &self,
        resource_type: &str,
        properties: &Value,
        subscription_id: Option<&str>,
        resource_group: Option<&str>,
    ) -> ValidationOutcome {
        tracing::debug!(
            resource_type,
            subscription_id = subscription_id.unwrap_or_default(),
            resource_group = resource_group.unwrap_or_default(),
            "Validating references"
        );
        match self.check_references(resource_type, properties).await {
            Ok(errors) => ValidationOutcome::Report(ValidationReport {
                valid: errors.is_empty(),
                errors,
                warnings: Vec::new(),
            }),
            Err(e) => {
                tracing::error!(resource_type, error = %e, "Validation failed");
                ValidationOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn check_references(&self, resource_type: &str, properties: &Value) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        for reference in collect_references(resource_type, properties) {
            if self.resources.get_resource(reference.id).await?.is_none() {
                errors.push(format!("Referenced {} not found: {}", reference.label, reference.id));
            }
        }
        Ok(errors)
    }
}

fn array_at<'a>(value: &'a Value, path: &str) -> &'a [Value] {
    get_path(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// References to check, in reporting order.
fn collect_references<'a>(resource_type: &str, properties: &'a Value) -> Vec<Reference<'a>> {
    let mut refs = Vec::new();

    if resource_type == VIRTUAL_MACHINE {
        for nic in array_at(properties, "networkProfile.networkInterfaces") {
            if let Some(id) = get_str(nic, "id") {
                refs.push(Reference {
                    label: "network interface",
                    id,
                });
            }
        }
        if let Some(id) = get_str(properties, "storageProfile.osDisk.managedDisk.id") {
            refs.push(Reference { label: "OS disk", id });
        }
    } else if resource_type == NETWORK_INTERFACE {
        for config in array_at(properties, "ipConfigurations") {
            if let Some(id) = get_str(config, "subnet.id") {
                refs.push(Reference { label: "subnet", id });
            }
            if let Some(id) = get_str(config, "publicIPAddress.id") {
                refs.push(Reference {
                    label: "public IP",
                    id,
                });
            }
        }
        if let Some(id) = get_str(properties, "networkSecurityGroup.id") {
            refs.push(Reference {
                label: "network security group",
                id,
            });
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use mazure_core::Resource;
    use mazure_store::{InMemoryStore, ResourceStore};

    use super::*;

    async fn store_with(ids: &[&str]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for id in ids {
            store
                .create_resource(Resource::new("sub-1", "rg", "Microsoft.Test/things", *id, "eastus").with_id(*id))
                .await
                .unwrap();
        }
        store
    }

    fn report(outcome: ValidationOutcome) -> ValidationReport {
        match outcome {
            ValidationOutcome::Report(r) => r,
            ValidationOutcome::Failed { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[tokio::test]
    async fn test_vm_with_missing_nic() {
        let engine = RelationshipEngine::new(store_with(&[]).await, None);
        let outcome = engine
            .validate_create(
                "Microsoft.Compute/virtualMachines",
                &json!({"networkProfile": {"networkInterfaces": [{"id": "nic-missing"}]}}),
                None,
                None,
            )
            .await;
        assert_eq!(
            report(outcome),
            ValidationReport {
                valid: false,
                errors: vec!["Referenced network interface not found: nic-missing".into()],
                warnings: vec![],
            }
        );
    }

    #[tokio::test]
    async fn test_vm_with_existing_references_is_valid() {
        let engine = RelationshipEngine::new(store_with(&["nic1", "disk1"]).await, None);
        let props = json!({
            "networkProfile": {"networkInterfaces": [{"id": "nic1"}]},
            "storageProfile": {"osDisk": {"managedDisk": {"id": "disk1"}}}
        });
        let r = report(
            engine
                .validate_create("Microsoft.Compute/virtualMachines", &props, Some("sub-1"), Some("rg"))
                .await,
        );
        assert!(r.valid);
        assert!(r.errors.is_empty());
    }

    #[tokio::test]
    async fn test_nic_reports_each_missing_reference_in_order() {
        let engine = RelationshipEngine::new(store_with(&["subnet1"]).await, None);
        let props = json!({
            "ipConfigurations": [
                {"subnet": {"id": "subnet1"}, "publicIPAddress": {"id": "pip1"}},
                {"subnet": {"id": "subnet2"}}
            ],
            "networkSecurityGroup": {"id": "nsg1"}
        });
        let r = report(
            engine
                .validate_create("Microsoft.Network/networkInterfaces", &props, None, None)
                .await,
        );
        assert!(!r.valid);
        assert_eq!(
            r.errors,
            vec![
                "Referenced public IP not found: pip1",
                "Referenced subnet not found: subnet2",
                "Referenced network security group not found: nsg1",
            ]
        );
    }

    #[tokio::test]
    async fn test_types_without_checks_always_validate() {
        let engine = RelationshipEngine::new(store_with(&[]).await, None);
        for ty in [
            "Microsoft.Network/publicIPAddresses",
            "Microsoft.Storage/storageAccounts",
            "Contoso.Widgets/gadgets",
        ] {
            let r = report(engine.validate_create(ty, &json!({"subnet": {"id": "x"}}), None, None).await);
            assert!(r.valid, "{ty} should validate");
        }
    }

    #[tokio::test]
    async fn test_type_dispatch_is_case_sensitive() {
        let engine = RelationshipEngine::new(store_with(&[]).await, None);
        let props = json!({"networkProfile": {"networkInterfaces": [{"id": "nic-missing"}]}});
        let r = report(
            engine
                .validate_create("microsoft.compute/virtualmachines", &props, None, None)
                .await,
        );
        assert!(r.valid);
        assert!(r.errors.is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_is_a_structured_error() {
        let store = store_with(&[]).await;
        store.set_offline(true);
        let engine = RelationshipEngine::new(store, None);
        let outcome = engine
            .validate_create(
                "Microsoft.Network/networkInterfaces",
                &json!({"networkSecurityGroup": {"id": "nsg1"}}),
                None,
                None,
            )
            .await;
        assert!(matches!(outcome, ValidationOutcome::Failed { .. }));
    }

    #[test]
    fn test_empty_and_malformed_references_are_ignored() {
        let props = json!({
            "networkProfile": {"networkInterfaces": [{"id": ""}, {"name": "no-id"}, "bogus"]},
            "storageProfile": {"osDisk": {"managedDisk": null}}
        });
        assert!(collect_references(VIRTUAL_MACHINE, &props).is_empty());
    }
}
