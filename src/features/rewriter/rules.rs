use crate::features::resources::ResourceKind;

/// Which id space a reference slot points into.
#[derive(Clone, Copy, Debug)]
pub enum Target {
    Kind(ResourceKind),
    /// A kind with a fixed sub-kind, e.g. password credentials.
    KindWithSubKind(ResourceKind, &'static str),
    /// A kind whose sub-kind is read from the given field of the slot itself.
    SubKindFrom(ResourceKind, &'static str),
    /// project, department or cluster, selected by the named sibling field.
    Scope(&'static str),
    DestinationCluster,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lookup {
    /// The slot is the id.
    ById,
    /// The slot is `{name, id}`; the id is replaced using the name.
    ByName,
    /// Name when the slot carries one, id otherwise.
    IdOrName,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Encoding {
    Text,
    /// Numeric JSON when the new id is an integer.
    Native,
}

#[derive(Clone, Copy, Debug)]
pub struct ReferenceField {
    pub path: &'static str,
    pub target: Target,
    pub lookup: Lookup,
    pub encoding: Encoding,
}

const fn field(path: &'static str, target: Target, lookup: Lookup, encoding: Encoding) -> ReferenceField {
    ReferenceField {
        path,
        target,
        lookup,
        encoding,
    }
}

const ASSET_OWNERS: [ReferenceField; 3] = [
    field("meta.projectId", Target::Kind(ResourceKind::Project), Lookup::ById, Encoding::Native),
    field("meta.departmentId", Target::Kind(ResourceKind::Department), Lookup::ById, Encoding::Text),
    field("meta.clusterId", Target::DestinationCluster, Lookup::ById, Encoding::Text),
];

static NODE_POOL: &[ReferenceField] = &[];

static DEPARTMENT: &[ReferenceField] = &[
    field(
        "nodePoolsResources[].nodePool",
        Target::Kind(ResourceKind::NodePool),
        Lookup::ByName,
        Encoding::Text,
    ),
    field(
        "resources[].nodePool",
        Target::Kind(ResourceKind::NodePool),
        Lookup::ByName,
        Encoding::Text,
    ),
];

static PROJECT: &[ReferenceField] = &[
    field("departmentId", Target::Kind(ResourceKind::Department), Lookup::ById, Encoding::Native),
    field("clusterUuid", Target::DestinationCluster, Lookup::ById, Encoding::Text),
    field(
        "nodePoolsResources[].nodePool",
        Target::Kind(ResourceKind::NodePool),
        Lookup::ByName,
        Encoding::Native,
    ),
    field(
        "nodeAffinity.*.selectedTypes[]",
        Target::Kind(ResourceKind::NodeType),
        Lookup::ByName,
        Encoding::Native,
    ),
];

static NODE_TYPE: &[ReferenceField] = &[];

static ACCESS_RULE: &[ReferenceField] = &[field(
    "scopeId",
    Target::Scope("scopeType"),
    Lookup::ById,
    Encoding::Text,
)];

static PLAIN_ASSET: &[ReferenceField] = &ASSET_OWNERS;

static DATASOURCE: &[ReferenceField] = &[
    ASSET_OWNERS[0],
    ASSET_OWNERS[1],
    ASSET_OWNERS[2],
    field(
        "spec.passwordAssetId",
        Target::KindWithSubKind(ResourceKind::Credential, "Password"),
        Lookup::ById,
        Encoding::Text,
    ),
    field(
        "spec.accessKeyAssetId",
        Target::KindWithSubKind(ResourceKind::Credential, "AccessKey"),
        Lookup::ById,
        Encoding::Text,
    ),
];

static WORKLOAD_TEMPLATE: &[ReferenceField] = &[
    ASSET_OWNERS[0],
    ASSET_OWNERS[1],
    ASSET_OWNERS[2],
    field(
        "spec.assets.environment",
        Target::Kind(ResourceKind::Environment),
        Lookup::IdOrName,
        Encoding::Text,
    ),
    field(
        "spec.assets.compute",
        Target::Kind(ResourceKind::Compute),
        Lookup::IdOrName,
        Encoding::Text,
    ),
    field(
        "spec.assets.datasources[]",
        Target::SubKindFrom(ResourceKind::Datasource, "kind"),
        Lookup::IdOrName,
        Encoding::Text,
    ),
];

/// Reference fields of a kind's creation payload, in rewrite order.
pub fn references_for(kind: ResourceKind) -> &'static [ReferenceField] {
    match kind {
        ResourceKind::NodePool => NODE_POOL,
        ResourceKind::Department => DEPARTMENT,
        ResourceKind::Project => PROJECT,
        ResourceKind::NodeType => NODE_TYPE,
        ResourceKind::AccessRule => ACCESS_RULE,
        ResourceKind::Environment | ResourceKind::Compute | ResourceKind::Credential => PLAIN_ASSET,
        ResourceKind::Datasource => DATASOURCE,
        ResourceKind::WorkloadTemplate => WORKLOAD_TEMPLATE,
    }
}
