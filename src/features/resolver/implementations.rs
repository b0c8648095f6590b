use std::collections::{BTreeMap, HashMap};

use shared::utilities::errors::AppError;
use tracing::debug;

use crate::features::resources::{IdSpace, Identifier};

type Table = HashMap<Identifier, Identifier>;
type NameTable = HashMap<String, Identifier>;

/// Old-id to new-id and name to id tables, one pair per id space.
///
/// Built fresh for every run and owned by the replay driver.
#[derive(Clone, Debug)]
pub struct IdentityResolver {
    ids: HashMap<IdSpace, Table>,
    names: HashMap<IdSpace, NameTable>,
    destination_cluster: String,
}

impl IdentityResolver {
    pub fn new(destination_cluster: impl Into<String>) -> Self {
        Self {
            ids: HashMap::new(),
            names: HashMap::new(),
            destination_cluster: destination_cluster.into(),
        }
    }

    pub fn destination_cluster(&self) -> &str {
        &self.destination_cluster
    }

    /// Links a source id to its destination id. The first mapping for an old id wins.
    pub fn register(&mut self, space: &IdSpace, old: Identifier, new: Identifier) -> bool {
        let table = self.ids.entry(space.clone()).or_default();
        if let Some(existing) = table.get(&old) {
            if *existing != new {
                debug!(
                    "keeping {} mapping {} -> {}, ignoring {}",
                    space, old, existing, new
                );
            }
            return false;
        }
        debug!("registered {} {} -> {}", space, old, new);
        table.insert(old, new);
        true
    }

    pub fn resolve(&self, space: &IdSpace, old: &Identifier) -> Result<Identifier, AppError> {
        self.ids
            .get(space)
            .and_then(|table| table.get(old))
            .cloned()
            .ok_or_else(|| AppError::unresolved(space, old.as_str()))
    }

    /// Adds a destination name. Names already known are never overwritten.
    pub fn register_name(&mut self, space: &IdSpace, name: impl Into<String>, id: Identifier) -> bool {
        let names = self.names.entry(space.clone()).or_default();
        let name = name.into();
        if names.contains_key(&name) {
            return false;
        }
        names.insert(name, id);
        true
    }

    /// Loads a destination listing into the name table of `space`.
    pub fn seed_names<I>(&mut self, space: &IdSpace, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, Identifier)>,
    {
        entries
            .into_iter()
            .filter(|(name, id)| self.register_name(space, name.clone(), id.clone()))
            .count()
    }

    pub fn resolve_by_name(&self, space: &IdSpace, name: &str) -> Result<Identifier, AppError> {
        self.names
            .get(space)
            .and_then(|names| names.get(name))
            .cloned()
            .ok_or_else(|| AppError::unresolved(space, name))
    }

    /// Resolves an asset name seen from `scope` (`{scope}/{owner}`).
    ///
    /// An asset in the same scope owner wins. Otherwise the name must be unique
    /// across every scope of the space.
    pub fn resolve_scoped_name(
        &self,
        space: &IdSpace,
        scope: &str,
        name: &str,
    ) -> Result<Identifier, AppError> {
        let Some(names) = self.names.get(space) else {
            return Err(AppError::unresolved(space, name));
        };
        if let Some(id) = names.get(&format!("{scope}/{name}")) {
            return Ok(id.clone());
        }

        let mut candidates = names
            .iter()
            .filter(|(key, _)| key.splitn(3, '/').nth(2) == Some(name));
        match (candidates.next(), candidates.next()) {
            (Some((key, id)), None) => {
                debug!("{} '{}' seen from {} resolved to {}", space, name, scope, key);
                Ok(id.clone())
            }
            (Some(_), Some(_)) => {
                debug!("{} '{}' is ambiguous outside {}", space, name, scope);
                Err(AppError::unresolved(space, name))
            }
            _ => Err(AppError::unresolved(space, name)),
        }
    }

    /// Snapshot of every id-map keyed by the space's display form, sorted for stable output.
    pub fn id_maps(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.ids
            .iter()
            .map(|(space, table)| {
                let table = table
                    .iter()
                    .map(|(old, new)| (old.0.clone(), new.0.clone()))
                    .collect();
                (space.to_string(), table)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::resources::{ResourceKind, SubKind};

    #[test]
    fn first_mapping_wins() {
        let mut resolver = IdentityResolver::new("cluster");
        let space = IdSpace::of(ResourceKind::Project);
        assert!(resolver.register(&space, "17".into(), "99".into()));
        assert!(!resolver.register(&space, "17".into(), "100".into()));
        assert_eq!(
            resolver.resolve(&space, &"17".into()).unwrap(),
            Identifier::new("99")
        );
    }

    #[test]
    fn unknown_ids_are_unresolved() {
        let resolver = IdentityResolver::new("cluster");
        let err = resolver
            .resolve(&IdSpace::of(ResourceKind::Department), &"3".into())
            .unwrap_err();
        assert!(matches!(err, AppError::UnresolvedReference { .. }));
    }

    #[test]
    fn seeded_names_are_never_overwritten() {
        let mut resolver = IdentityResolver::new("cluster");
        let space = IdSpace::of(ResourceKind::NodePool);
        resolver.seed_names(&space, [("gpu-pool".to_string(), Identifier::new("42"))]);
        assert!(!resolver.register_name(&space, "gpu-pool", Identifier::new("43")));
        assert_eq!(
            resolver.resolve_by_name(&space, "gpu-pool").unwrap(),
            Identifier::new("42")
        );
    }

    #[test]
    fn scoped_names_prefer_the_same_owner() {
        let mut resolver = IdentityResolver::new("cluster");
        let git = IdSpace::with_sub_kind(ResourceKind::Datasource, SubKind::new("git"));
        resolver.seed_names(
            &git,
            [
                ("project/99/datasets".to_string(), Identifier::new("asset-44")),
                ("project/100/datasets".to_string(), Identifier::new("asset-45")),
                ("tenant//shared".to_string(), Identifier::new("asset-46")),
            ],
        );

        assert_eq!(
            resolver.resolve_scoped_name(&git, "project/100", "datasets").unwrap(),
            Identifier::new("asset-45")
        );
        // Unique names are visible from any scope.
        assert_eq!(
            resolver.resolve_scoped_name(&git, "project/100", "shared").unwrap(),
            Identifier::new("asset-46")
        );
        // Two owners share the name and neither is the caller's.
        assert!(resolver.resolve_scoped_name(&git, "project/101", "datasets").is_err());
    }

    #[test]
    fn sub_kinds_partition_the_tables() {
        let mut resolver = IdentityResolver::new("cluster");
        let password = IdSpace::with_sub_kind(ResourceKind::Credential, SubKind::new("Password"));
        let access_key = IdSpace::with_sub_kind(ResourceKind::Credential, SubKind::new("AccessKey"));
        resolver.register(&password, "c-1".into(), "n-1".into());
        assert!(resolver.resolve(&access_key, &"c-1".into()).is_err());
        assert_eq!(
            resolver.id_maps()["credentials/password"]["c-1"],
            "n-1".to_string()
        );
    }
}
