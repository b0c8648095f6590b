use shared::schemas::SchemaVersion;

use crate::features::resources::ResourceKind;

// ============================================
// RULE TYPES
// ============================================

const ALL_VERSIONS: &[SchemaVersion] = &[SchemaVersion::Legacy, SchemaVersion::OrgUnit];
const ORG_UNIT: &[SchemaVersion] = &[SchemaVersion::OrgUnit];

#[derive(Clone, Copy, Debug)]
pub enum DefaultValue {
    EmptyList,
    Int(i64),
    DestinationCluster,
}

#[derive(Debug)]
pub struct FieldValue {
    pub path: &'static str,
    pub value: DefaultValue,
    pub versions: &'static [SchemaVersion],
}

/// Moves the last segment of `from` to the sibling key `to`.
#[derive(Debug)]
pub struct Rename {
    pub from: &'static str,
    pub to: &'static str,
    pub versions: &'static [SchemaVersion],
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hook {
    /// Credentials without a secret name get `{kind}-{name}`.
    SynthesizeSecretName,
    /// PVC datasources point at the existing claim instead of creating one.
    ConvertStorage,
}

#[derive(Debug)]
pub struct SchemaRule {
    pub kind: ResourceKind,
    /// Checked on the source payload before anything else runs.
    pub required: &'static [&'static str],
    pub flatten_spec: bool,
    /// Empty means the whole payload is kept.
    pub keep: &'static [&'static str],
    pub strip: &'static [&'static str],
    pub renames: &'static [Rename],
    pub null_to_empty: &'static [&'static str],
    pub omit_if_null: &'static [&'static str],
    /// Applied only when the field is absent or null.
    pub defaults: &'static [FieldValue],
    /// Always applied.
    pub overrides: &'static [FieldValue],
    pub hooks: &'static [Hook],
}

impl SchemaRule {
    pub fn renames_for(&self, version: SchemaVersion) -> impl Iterator<Item = &Rename> {
        self.renames
            .iter()
            .filter(move |rename| rename.versions.contains(&version))
    }

    pub fn defaults_for(&self, version: SchemaVersion) -> impl Iterator<Item = &FieldValue> {
        self.defaults
            .iter()
            .filter(move |default| default.versions.contains(&version))
    }

    pub fn overrides_for(&self, version: SchemaVersion) -> impl Iterator<Item = &FieldValue> {
        self.overrides
            .iter()
            .filter(move |value| value.versions.contains(&version))
    }
}

pub fn rule_for(kind: ResourceKind) -> Option<&'static SchemaRule> {
    SCHEMA_RULES.iter().find(|rule| rule.kind == kind)
}

// ============================================
// TABLE
// ============================================

const JOB_LIMIT_FIELDS: &[&str] = &[
    "interactiveJobTimeLimitSecs",
    "interactiveJobMaxIdleDurationSecs",
    "interactivePreemptibleJobMaxIdleDurationSecs",
    "trainingJobTimeLimitSecs",
    "trainingJobMaxIdleDurationSecs",
];

const ASSET_KEEP: &[&str] = &["meta", "spec"];

const ASSET_STRIP: &[&str] = &[
    "meta.id",
    "meta.createdAt",
    "meta.updatedAt",
    "meta.createdBy",
    "meta.updatedBy",
    "meta.tenantId",
    "meta.projectName",
    "meta.departmentName",
    "meta.workloadSupportedTypes",
];

const ASSET_REQUIRED: &[&str] = &["meta.name", "meta.scope"];

pub static SCHEMA_RULES: &[SchemaRule] = &[
    SchemaRule {
        kind: ResourceKind::NodePool,
        required: &["name"],
        flatten_spec: false,
        keep: &[
            "name",
            "labelKey",
            "labelValue",
            "placementStrategy.cpu",
            "placementStrategy.gpu",
            "overProvisioningRatio",
        ],
        strip: &["id"],
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &["labelKey", "labelValue"],
        defaults: &[FieldValue {
            path: "overProvisioningRatio",
            value: DefaultValue::Int(1),
            versions: ALL_VERSIONS,
        }],
        overrides: &[],
        hooks: &[],
    },
    SchemaRule {
        kind: ResourceKind::Department,
        required: &["name"],
        flatten_spec: false,
        keep: &[
            "name",
            "nodePoolsResources[].nodePool.name",
            "nodePoolsResources[].nodePool.id",
            "nodePoolsResources[].gpu.deserved",
            "nodePoolsResources[].gpu.maxAllowed",
            "nodePoolsResources[].gpu.overQuotaWeight",
        ],
        strip: &["id"],
        renames: &[
            // Inner field first, its parent is renamed right after.
            Rename {
                from: "nodePoolsResources[].gpu.maxAllowed",
                to: "limit",
                versions: ORG_UNIT,
            },
            Rename {
                from: "nodePoolsResources",
                to: "resources",
                versions: ORG_UNIT,
            },
        ],
        null_to_empty: &[],
        omit_if_null: &[],
        defaults: &[],
        overrides: &[FieldValue {
            path: "clusterId",
            value: DefaultValue::DestinationCluster,
            versions: ORG_UNIT,
        }],
        hooks: &[],
    },
    SchemaRule {
        kind: ResourceKind::Project,
        required: &["name", "departmentId"],
        flatten_spec: false,
        keep: &[
            "name",
            "departmentId",
            "clusterUuid",
            "defaultNodePools",
            "permissions.users",
            "permissions.groups",
            "nodeAffinity",
            "interactiveJobTimeLimitSecs",
            "interactiveJobMaxIdleDurationSecs",
            "interactivePreemptibleJobMaxIdleDurationSecs",
            "trainingJobTimeLimitSecs",
            "trainingJobMaxIdleDurationSecs",
            "nodePoolsResources",
        ],
        strip: &["id"],
        renames: &[],
        null_to_empty: &[
            "defaultNodePools",
            "permissions.users",
            "permissions.groups",
            "nodeAffinity",
            "nodePoolsResources",
        ],
        omit_if_null: JOB_LIMIT_FIELDS,
        defaults: &[],
        overrides: &[FieldValue {
            path: "permissions.applications",
            value: DefaultValue::EmptyList,
            versions: ALL_VERSIONS,
        }],
        hooks: &[],
    },
    SchemaRule {
        kind: ResourceKind::NodeType,
        required: &["name"],
        flatten_spec: false,
        keep: &["name", "description"],
        strip: &[],
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &["description"],
        defaults: &[],
        overrides: &[],
        hooks: &[],
    },
    SchemaRule {
        kind: ResourceKind::AccessRule,
        required: &["scopeType"],
        flatten_spec: false,
        keep: &[],
        strip: &[
            "roleName",
            "scopeName",
            "createdAt",
            "updatedAt",
            "createdBy",
            "id",
            "tenantId",
            "clusterId",
        ],
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &[],
        defaults: &[],
        overrides: &[],
        hooks: &[],
    },
    SchemaRule {
        kind: ResourceKind::Environment,
        required: ASSET_REQUIRED,
        flatten_spec: false,
        keep: ASSET_KEEP,
        strip: ASSET_STRIP,
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &[],
        defaults: &[],
        overrides: &[],
        hooks: &[],
    },
    SchemaRule {
        kind: ResourceKind::Compute,
        required: ASSET_REQUIRED,
        flatten_spec: false,
        keep: ASSET_KEEP,
        strip: ASSET_STRIP,
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &[],
        defaults: &[],
        overrides: &[],
        hooks: &[],
    },
    SchemaRule {
        kind: ResourceKind::Credential,
        required: &["meta.name", "meta.scope", "meta.kind"],
        flatten_spec: true,
        keep: ASSET_KEEP,
        strip: ASSET_STRIP,
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &[],
        defaults: &[],
        overrides: &[],
        hooks: &[Hook::SynthesizeSecretName],
    },
    SchemaRule {
        kind: ResourceKind::Datasource,
        required: &["meta.name", "meta.scope", "meta.kind"],
        flatten_spec: true,
        keep: ASSET_KEEP,
        strip: ASSET_STRIP,
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &[],
        defaults: &[],
        overrides: &[],
        hooks: &[Hook::ConvertStorage],
    },
    SchemaRule {
        kind: ResourceKind::WorkloadTemplate,
        required: ASSET_REQUIRED,
        flatten_spec: false,
        keep: ASSET_KEEP,
        strip: ASSET_STRIP,
        renames: &[],
        null_to_empty: &[],
        omit_if_null: &[],
        defaults: &[],
        overrides: &[],
        hooks: &[],
    },
];
