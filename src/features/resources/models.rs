use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::resources::paths;

// ============================================
// KINDS
// ============================================

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    NodePool,
    Department,
    Project,
    NodeType,
    AccessRule,
    Environment,
    Compute,
    Credential,
    Datasource,
    WorkloadTemplate,
}

/// Global replay order. Every kind only references kinds listed before it,
/// except project node affinity, which resolves against node types already
/// present in the destination.
pub const REPLAY_ORDER: [ResourceKind; 10] = [
    ResourceKind::NodePool,
    ResourceKind::Department,
    ResourceKind::Project,
    ResourceKind::NodeType,
    ResourceKind::AccessRule,
    ResourceKind::Environment,
    ResourceKind::Compute,
    ResourceKind::Credential,
    ResourceKind::Datasource,
    ResourceKind::WorkloadTemplate,
];

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodePool => "node-pool",
            Self::Department => "department",
            Self::Project => "project",
            Self::NodeType => "node-type",
            Self::AccessRule => "access-rule",
            Self::Environment => "environment",
            Self::Compute => "compute",
            Self::Credential => "credentials",
            Self::Datasource => "datasource",
            Self::WorkloadTemplate => "workload-template",
        }
    }

    /// Assets wrap their fields in a `{meta, spec}` envelope.
    pub fn is_asset(&self) -> bool {
        matches!(
            self,
            Self::Environment
                | Self::Compute
                | Self::Credential
                | Self::Datasource
                | Self::WorkloadTemplate
        )
    }

    /// Kinds whose identity space is partitioned by `meta.kind`.
    pub fn has_sub_kind(&self) -> bool {
        matches!(self, Self::Credential | Self::Datasource)
    }

    /// Kinds that exist implicitly in every deployment under the name "default".
    pub fn has_implicit_default(&self) -> bool {
        matches!(self, Self::NodePool | Self::Department)
    }

    pub fn sub_kind_of(&self, resource: &Value) -> Option<SubKind> {
        if !self.has_sub_kind() {
            return None;
        }
        paths::get_str(resource, "meta.kind").map(SubKind::new)
    }

    pub fn space_of(&self, resource: &Value) -> IdSpace {
        match self.sub_kind_of(resource) {
            Some(sub_kind) => IdSpace::with_sub_kind(*self, sub_kind),
            None => IdSpace::of(*self),
        }
    }

    /// Human readable name used in logs and the name tables.
    pub fn display_name(&self, resource: &Value) -> Option<String> {
        match self {
            Self::AccessRule => self.natural_key(resource),
            kind if kind.is_asset() => paths::get_str(resource, "meta.name").map(str::to_string),
            _ => paths::get_str(resource, "name").map(str::to_string),
        }
    }

    /// Server-assigned id of a resource as returned by a listing or a creation call.
    pub fn id_of(&self, resource: &Value) -> Option<Identifier> {
        let path = if self.is_asset() { "meta.id" } else { "id" };
        paths::get(resource, path).and_then(Identifier::from_value)
    }

    /// Identity used to find a resource inside a destination listing.
    pub fn natural_key(&self, resource: &Value) -> Option<String> {
        match self {
            Self::AccessRule => {
                let parts = ["subjectType", "subjectId", "roleId", "scopeType", "scopeId"]
                    .map(|field| {
                        paths::get(resource, field)
                            .and_then(Identifier::from_value)
                            .map(|id| id.0)
                            .unwrap_or_default()
                    });
                Some(parts.join("/"))
            }
            kind if kind.is_asset() => {
                let name = paths::get_str(resource, "meta.name")?;
                let scope = kind.scope_key(resource)?;
                Some(format!("{scope}/{name}"))
            }
            _ => paths::get_str(resource, "name").map(str::to_string),
        }
    }

    /// `{scope}/{owner}` of an asset, e.g. `project/99` or `tenant/`.
    pub fn scope_key(&self, resource: &Value) -> Option<String> {
        if !self.is_asset() {
            return None;
        }
        let scope = paths::get_str(resource, "meta.scope").unwrap_or("tenant");
        let owner = match scope {
            "project" => paths::get(resource, "meta.projectId"),
            "department" => paths::get(resource, "meta.departmentId"),
            "cluster" => paths::get(resource, "meta.clusterId"),
            _ => None,
        }
        .and_then(Identifier::from_value)
        .map(|id| id.0)
        .unwrap_or_default();
        Some(format!("{scope}/{owner}"))
    }

    /// Key of the name tables. Asset names are only unique within their scope owner.
    pub fn name_key(&self, resource: &Value) -> Option<String> {
        if self.is_asset() {
            self.natural_key(resource)
        } else {
            self.display_name(resource)
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// SUB KINDS AND ID SPACES
// ============================================

/// Inner discriminator of credentials and datasources, e.g. `AccessKey` or `pvc`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SubKind(String);

impl SubKind {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Endpoint segment, `AccessKey` and `accessKey` both become `access-key`.
    pub fn path_segment(&self) -> String {
        let mut segment = String::with_capacity(self.0.len() + 4);
        for (i, ch) in self.0.chars().enumerate() {
            if ch == '_' || ch == ' ' {
                segment.push('-');
            } else if ch.is_ascii_uppercase() {
                if i > 0 && !segment.ends_with('-') {
                    segment.push('-');
                }
                segment.push(ch.to_ascii_lowercase());
            } else {
                segment.push(ch);
            }
        }
        segment
    }

    /// Canonical spelling used inside id spaces, so `AccessKey` and `access-key` share a table.
    pub fn normalized(&self) -> Self {
        Self(self.path_segment())
    }

    /// Key the kind-specific spec block is nested under, `access-key` becomes `accessKey`.
    pub fn spec_key(&self) -> String {
        let mut key = String::with_capacity(self.0.len());
        let mut upper_next = false;
        for (i, ch) in self.0.chars().enumerate() {
            if ch == '-' || ch == '_' {
                upper_next = true;
            } else if i == 0 {
                key.push(ch.to_ascii_lowercase());
            } else if upper_next {
                key.push(ch.to_ascii_uppercase());
                upper_next = false;
            } else {
                key.push(ch);
            }
        }
        key
    }
}

impl fmt::Display for SubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct IdSpace {
    pub kind: ResourceKind,
    pub sub_kind: Option<SubKind>,
}

impl IdSpace {
    pub fn of(kind: ResourceKind) -> Self {
        Self {
            kind,
            sub_kind: None,
        }
    }

    pub fn with_sub_kind(kind: ResourceKind, sub_kind: SubKind) -> Self {
        Self {
            kind,
            sub_kind: Some(sub_kind.normalized()),
        }
    }
}

impl fmt::Display for IdSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_kind {
            Some(sub_kind) => write!(f, "{}/{}", self.kind, sub_kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

// ============================================
// IDENTIFIERS
// ============================================

/// Resource identifier normalised to text. `17` and `"17"` are the same identifier.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[serde(transparent)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric JSON when the identifier is an integer, text otherwise.
    pub fn to_native_value(&self) -> Value {
        match self.0.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(self.0.clone()),
        }
    }

    pub fn to_text_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
