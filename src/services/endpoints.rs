use shared::schemas::SchemaVersion;

use crate::features::resources::{ResourceKind, SubKind};

/// Collection path a kind is listed from.
pub fn list_path(kind: ResourceKind, cluster_id: &str) -> String {
    match kind {
        ResourceKind::NodePool => format!("/v1/k8s/clusters/{cluster_id}/node-pools"),
        ResourceKind::Department => format!("/v1/k8s/clusters/{cluster_id}/departments"),
        ResourceKind::Project => format!("/v1/k8s/clusters/{cluster_id}/projects"),
        ResourceKind::NodeType => format!("/v1/k8s/clusters/{cluster_id}/nodetypes"),
        ResourceKind::AccessRule => "/api/v1/authorization/access-rules".to_string(),
        asset => format!("/api/v1/asset/{}", asset.as_str()),
    }
}

/// Path a creation payload of `kind` is posted to under the given schema.
pub fn create_path(
    kind: ResourceKind,
    sub_kind: Option<&SubKind>,
    cluster_id: &str,
    schema: SchemaVersion,
) -> String {
    match (kind, schema) {
        (ResourceKind::Department, SchemaVersion::OrgUnit) => {
            "/api/v1/org-unit/departments".to_string()
        }
        (asset, _) if asset.is_asset() => match sub_kind {
            Some(sub_kind) => format!("/api/v1/asset/{}/{}", asset.as_str(), sub_kind.path_segment()),
            None => format!("/api/v1/asset/{}", asset.as_str()),
        },
        _ => list_path(kind, cluster_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER: &str = "ba0cf6ed-23f2-4393-9611-4396a6243379";

    #[test]
    fn departments_follow_the_target_schema() {
        assert_eq!(
            create_path(ResourceKind::Department, None, CLUSTER, SchemaVersion::OrgUnit),
            "/api/v1/org-unit/departments"
        );
        assert_eq!(
            create_path(ResourceKind::Department, None, CLUSTER, SchemaVersion::Legacy),
            format!("/v1/k8s/clusters/{CLUSTER}/departments")
        );
    }

    #[test]
    fn credential_sub_kinds_get_their_own_endpoint() {
        let access_key = SubKind::new("AccessKey");
        assert_eq!(
            create_path(
                ResourceKind::Credential,
                Some(&access_key),
                CLUSTER,
                SchemaVersion::OrgUnit
            ),
            "/api/v1/asset/credentials/access-key"
        );
        assert_eq!(
            list_path(ResourceKind::Credential, CLUSTER),
            "/api/v1/asset/credentials"
        );
    }

    #[test]
    fn cluster_scoped_kinds_use_the_cluster_id() {
        assert_eq!(
            create_path(ResourceKind::NodeType, None, CLUSTER, SchemaVersion::OrgUnit),
            format!("/v1/k8s/clusters/{CLUSTER}/nodetypes")
        );
        assert_eq!(
            list_path(ResourceKind::AccessRule, CLUSTER),
            "/api/v1/authorization/access-rules"
        );
    }
}
