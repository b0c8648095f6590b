use serde_json::Value;
use shared::{schemas::SchemaVersion, utilities::errors::AppError};
use tracing::debug;

use crate::features::{
    resources::{ResourceKind, SubKind, paths},
    translator::rules::{DefaultValue, FieldValue, Hook, Rename, SchemaRule, rule_for},
};

/// Destination facts the translation depends on. Id-maps are not needed here.
#[derive(Clone, Debug)]
pub struct TranslationContext {
    pub target: SchemaVersion,
    pub destination_cluster_id: String,
    pub convert_storage: bool,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Translated {
    pub payload: Value,
    pub sub_kind: Option<SubKind>,
}

/// Maps a source resource to the destination's creation payload shape.
///
/// The source value is never mutated; every call builds a fresh payload.
pub fn translate(
    kind: ResourceKind,
    source: &Value,
    context: &TranslationContext,
) -> Result<Translated, AppError> {
    let rule = rule_for(kind).ok_or_else(|| AppError::UnknownKind(kind.to_string()))?;

    for field in rule.required {
        if !paths::is_present(source, field) {
            return Err(AppError::missing_field(kind, *field));
        }
    }

    let sub_kind = kind.sub_kind_of(source);
    let mut payload = source.clone();

    if rule.flatten_spec {
        flatten_spec(&mut payload, sub_kind.as_ref());
    }
    if !rule.keep.is_empty() {
        payload = paths::project(&payload, rule.keep);
    }
    for field in rule.strip {
        paths::remove(&mut payload, field);
    }
    for rename in rule.renames_for(context.target) {
        apply_rename(&mut payload, rename)?;
    }
    for field in rule.null_to_empty {
        if paths::get(&payload, field).is_none() {
            paths::set(&mut payload, field, Value::Array(Vec::new()));
        }
    }
    for field in rule.omit_if_null {
        paths::visit_parents_mut(&mut payload, field, &mut |map, key| {
            if map.get(key).is_some_and(Value::is_null) {
                map.remove(key);
            }
            Ok(())
        })?;
    }
    for default in rule.defaults_for(context.target) {
        if paths::get(&payload, default.path).is_none() {
            paths::set(&mut payload, default.path, resolve_value(default, context));
        }
    }
    for value in rule.overrides_for(context.target) {
        paths::set(&mut payload, value.path, resolve_value(value, context));
    }
    for hook in rule.hooks {
        apply_hook(*hook, rule, &mut payload, sub_kind.as_ref(), context)?;
    }

    debug!("translated {} payload: {}", kind, payload);

    Ok(Translated { payload, sub_kind })
}

/// Moves `from` to its sibling `to`. A `to` key already present is kept and `from` is dropped.
fn apply_rename(payload: &mut Value, rename: &Rename) -> Result<(), AppError> {
    paths::visit_parents_mut(payload, rename.from, &mut |map, key| {
        if let Some(value) = map.remove(key) {
            if map.contains_key(rename.to) {
                debug!("keeping existing '{}', dropping renamed '{}'", rename.to, key);
            } else {
                map.insert(rename.to.to_string(), value);
            }
        }
        Ok(())
    })
}

fn resolve_value(field: &FieldValue, context: &TranslationContext) -> Value {
    match field.value {
        DefaultValue::EmptyList => Value::Array(Vec::new()),
        DefaultValue::Int(n) => Value::from(n),
        DefaultValue::DestinationCluster => Value::String(context.destination_cluster_id.clone()),
    }
}

/// Merges `spec[kind]` into `spec` and drops the `meta.kind` discriminator.
fn flatten_spec(payload: &mut Value, sub_kind: Option<&SubKind>) {
    if let Some(sub_kind) = sub_kind {
        if let Some(Value::Object(spec)) = payload.get_mut("spec") {
            let nested = spec
                .remove(sub_kind.as_str())
                .or_else(|| spec.remove(&sub_kind.spec_key()));
            if let Some(Value::Object(nested)) = nested {
                for (key, value) in nested {
                    spec.insert(key, value);
                }
            }
        }
    }
    paths::remove(payload, "meta.kind");
}

fn apply_hook(
    hook: Hook,
    rule: &SchemaRule,
    payload: &mut Value,
    sub_kind: Option<&SubKind>,
    context: &TranslationContext,
) -> Result<(), AppError> {
    match hook {
        Hook::SynthesizeSecretName => {
            if paths::get_str(payload, "spec.existingSecretName").is_some_and(|s| !s.is_empty()) {
                return Ok(());
            }
            let sub_kind =
                sub_kind.ok_or_else(|| AppError::missing_field(rule.kind, "meta.kind"))?;
            let name = paths::get_str(payload, "meta.name")
                .ok_or_else(|| AppError::missing_field(rule.kind, "meta.name"))?;
            let secret = format!("{}-{}", sub_kind.as_str().to_lowercase(), name);
            paths::set(payload, "spec.existingSecretName", Value::String(secret));
        }
        Hook::ConvertStorage => {
            let is_pvc = sub_kind.is_some_and(|s| s.as_str().eq_ignore_ascii_case("pvc"));
            if context.convert_storage && is_pvc {
                paths::set(payload, "spec.existingPvc", Value::Bool(true));
                paths::remove(payload, "spec.claimInfo");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(target: SchemaVersion) -> TranslationContext {
        TranslationContext {
            target,
            destination_cluster_id: "ba0cf6ed-23f2-4393-9611-4396a6243379".to_string(),
            convert_storage: false,
        }
    }

    #[test]
    fn org_unit_department_uses_resources_and_limit() {
        let department = json!({
            "id": 3,
            "name": "research",
            "nodePoolsResources": [{
                "id": "nr-1",
                "nodePool": {"id": 5, "name": "gpu-pool"},
                "gpu": {"deserved": 2, "maxAllowed": 4, "overQuotaWeight": 1}
            }]
        });
        let translated =
            translate(ResourceKind::Department, &department, &context(SchemaVersion::OrgUnit))
                .unwrap();
        assert_eq!(
            translated.payload,
            json!({
                "name": "research",
                "clusterId": "ba0cf6ed-23f2-4393-9611-4396a6243379",
                "resources": [{
                    "nodePool": {"id": 5, "name": "gpu-pool"},
                    "gpu": {"deserved": 2, "limit": 4, "overQuotaWeight": 1}
                }]
            })
        );
    }

    #[test]
    fn legacy_department_keeps_max_allowed() {
        let department = json!({
            "name": "research",
            "nodePoolsResources": [{
                "nodePool": {"id": 5, "name": "gpu-pool"},
                "gpu": {"deserved": 2, "maxAllowed": 4, "overQuotaWeight": 1}
            }]
        });
        let translated =
            translate(ResourceKind::Department, &department, &context(SchemaVersion::Legacy))
                .unwrap();
        assert_eq!(translated.payload["nodePoolsResources"][0]["gpu"]["maxAllowed"], 4);
        assert!(translated.payload.get("clusterId").is_none());
    }

    #[test]
    fn project_nulls_are_coalesced_and_limits_omitted() {
        let project = json!({
            "id": 17,
            "name": "vision",
            "departmentId": 3,
            "clusterUuid": "302809a4-d8e9-45be-b9ef-6eef5d793900",
            "defaultNodePools": null,
            "permissions": {"users": null, "groups": ["ml"], "applications": ["app-1"]},
            "nodeAffinity": null,
            "interactiveJobTimeLimitSecs": null,
            "trainingJobTimeLimitSecs": 3600,
            "nodePoolsResources": []
        });
        let translated =
            translate(ResourceKind::Project, &project, &context(SchemaVersion::OrgUnit)).unwrap();
        let payload = translated.payload;
        assert_eq!(payload["permissions"]["users"], json!([]));
        assert_eq!(payload["permissions"]["groups"], json!(["ml"]));
        assert_eq!(payload["permissions"]["applications"], json!([]));
        assert_eq!(payload["defaultNodePools"], json!([]));
        assert_eq!(payload["nodeAffinity"], json!([]));
        assert!(payload.get("interactiveJobTimeLimitSecs").is_none());
        assert_eq!(payload["trainingJobTimeLimitSecs"], 3600);
        assert!(payload.get("id").is_none());
    }

    #[test]
    fn project_without_department_is_rejected() {
        let project = json!({"name": "vision", "departmentId": null});
        let err = translate(ResourceKind::Project, &project, &context(SchemaVersion::OrgUnit))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingRequiredField { ref field, .. } if field == "departmentId"
        ));
    }

    #[test]
    fn node_pool_gets_default_over_provisioning_ratio() {
        let pool = json!({
            "id": 5,
            "name": "gpu-pool",
            "labelKey": "pool",
            "labelValue": "gpu",
            "placementStrategy": {"cpu": "spread", "gpu": "binpack"},
            "status": "Ready"
        });
        let translated =
            translate(ResourceKind::NodePool, &pool, &context(SchemaVersion::OrgUnit)).unwrap();
        assert_eq!(
            translated.payload,
            json!({
                "name": "gpu-pool",
                "labelKey": "pool",
                "labelValue": "gpu",
                "placementStrategy": {"cpu": "spread", "gpu": "binpack"},
                "overProvisioningRatio": 1
            })
        );
    }

    #[test]
    fn access_rule_loses_server_managed_fields() {
        let rule = json!({
            "id": 8,
            "subjectId": "u1",
            "subjectType": "user",
            "roleId": 3,
            "roleName": "ml-engineer",
            "scopeType": "project",
            "scopeId": "17",
            "scopeName": "vision",
            "clusterId": "302809a4-d8e9-45be-b9ef-6eef5d793900",
            "createdAt": "2024-05-01T00:00:00Z"
        });
        let translated =
            translate(ResourceKind::AccessRule, &rule, &context(SchemaVersion::OrgUnit)).unwrap();
        assert_eq!(
            translated.payload,
            json!({
                "subjectId": "u1",
                "subjectType": "user",
                "roleId": 3,
                "scopeType": "project",
                "scopeId": "17"
            })
        );
    }

    #[test]
    fn access_rule_needs_only_a_scope_type() {
        let rule = json!({
            "scopeType": "project",
            "scopeId": "17",
            "roleName": "ml-engineer",
            "subjectId": "u1"
        });
        let translated =
            translate(ResourceKind::AccessRule, &rule, &context(SchemaVersion::OrgUnit)).unwrap();
        assert_eq!(
            translated.payload,
            json!({"scopeType": "project", "scopeId": "17", "subjectId": "u1"})
        );

        let err = translate(
            ResourceKind::AccessRule,
            &json!({"subjectId": "u1"}),
            &context(SchemaVersion::OrgUnit),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingRequiredField { ref field, .. } if field == "scopeType"
        ));
    }

    #[test]
    fn rename_keeps_an_existing_target_key() {
        let rename = Rename {
            from: "items[].gpu.maxAllowed",
            to: "limit",
            versions: &[SchemaVersion::OrgUnit],
        };
        let mut payload = json!({"items": [
            {"gpu": {"maxAllowed": 4, "limit": 6}},
            {"gpu": {"maxAllowed": 2}}
        ]});
        apply_rename(&mut payload, &rename).unwrap();
        assert_eq!(
            payload,
            json!({"items": [{"gpu": {"limit": 6}}, {"gpu": {"limit": 2}}]})
        );
    }

    #[test]
    fn credential_gets_a_synthesized_secret_name() {
        let credential = json!({
            "meta": {"id": "c-1", "name": "prod-key", "scope": "tenant", "kind": "AccessKey"},
            "spec": {"accessKey": {"accessKeyId": "AKIA"}}
        });
        let translated =
            translate(ResourceKind::Credential, &credential, &context(SchemaVersion::OrgUnit))
                .unwrap();
        assert_eq!(translated.sub_kind, Some(SubKind::new("AccessKey")));
        assert_eq!(
            translated.payload,
            json!({
                "meta": {"name": "prod-key", "scope": "tenant"},
                "spec": {"accessKeyId": "AKIA", "existingSecretName": "accesskey-prod-key"}
            })
        );
    }

    #[test]
    fn existing_secret_names_are_kept() {
        let credential = json!({
            "meta": {"name": "prod-key", "scope": "tenant", "kind": "Password"},
            "spec": {"existingSecretName": "vault-prod"}
        });
        let translated =
            translate(ResourceKind::Credential, &credential, &context(SchemaVersion::OrgUnit))
                .unwrap();
        assert_eq!(translated.payload["spec"]["existingSecretName"], "vault-prod");
    }

    #[test]
    fn pvc_datasource_converts_to_existing_claim_when_enabled() {
        let datasource = json!({
            "meta": {"name": "datasets", "scope": "project", "projectId": 17, "kind": "pvc"},
            "spec": {"pvc": {"claimName": "datasets", "claimInfo": {"size": "1Ti"}}}
        });
        let mut ctx = context(SchemaVersion::OrgUnit);
        let untouched = translate(ResourceKind::Datasource, &datasource, &ctx).unwrap();
        assert!(untouched.payload["spec"].get("claimInfo").is_some());

        ctx.convert_storage = true;
        let converted = translate(ResourceKind::Datasource, &datasource, &ctx).unwrap();
        assert_eq!(
            converted.payload["spec"],
            json!({"claimName": "datasets", "existingPvc": true})
        );
    }

    #[test]
    fn source_payload_is_left_untouched() {
        let project = json!({"name": "vision", "departmentId": 3, "permissions": {"users": null}});
        let before = project.clone();
        translate(ResourceKind::Project, &project, &context(SchemaVersion::OrgUnit)).unwrap();
        assert_eq!(project, before);
    }
}
