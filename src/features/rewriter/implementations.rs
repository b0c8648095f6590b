use serde_json::Value;
use shared::utilities::errors::AppError;

use crate::features::{
    resolver::IdentityResolver,
    resources::{IdSpace, Identifier, ResourceKind, SubKind, paths},
    rewriter::rules::{Encoding, Lookup, ReferenceField, Target, references_for},
};

/// Replaces every registered reference in a translated payload with its destination id.
///
/// Fails on the first reference that has no destination counterpart. Absent and
/// null slots carry no reference and are left untouched.
pub fn rewrite(
    kind: ResourceKind,
    mut payload: Value,
    resolver: &IdentityResolver,
) -> Result<Value, AppError> {
    for field in references_for(kind) {
        // Owner fields come first in the table, so the scope is already in destination ids.
        let scope = kind.scope_key(&payload);
        rewrite_field(field, &mut payload, scope.as_deref(), resolver)?;
    }
    Ok(payload)
}

fn rewrite_field(
    field: &ReferenceField,
    payload: &mut Value,
    scope: Option<&str>,
    resolver: &IdentityResolver,
) -> Result<(), AppError> {
    // Array elements have no named parent field to read a discriminator from.
    if field.path.ends_with("[]") {
        return paths::visit_mut(payload, field.path, &mut |slot| {
            rewrite_slot(field, slot, None, scope, resolver)
        });
    }

    paths::visit_parents_mut(payload, field.path, &mut |parent, key| {
        let discriminator = match field.target {
            Target::Scope(sibling) => parent
                .get(sibling)
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        match parent.get_mut(key) {
            Some(slot) => rewrite_slot(field, slot, discriminator.as_deref(), scope, resolver),
            None => Ok(()),
        }
    })
}

enum Resolution {
    Space(IdSpace),
    Cluster,
}

fn resolution_for(
    target: Target,
    slot: &Value,
    discriminator: Option<&str>,
) -> Result<Resolution, AppError> {
    let resolution = match target {
        Target::Kind(kind) => Resolution::Space(IdSpace::of(kind)),
        Target::KindWithSubKind(kind, sub_kind) => {
            Resolution::Space(IdSpace::with_sub_kind(kind, SubKind::new(sub_kind)))
        }
        Target::SubKindFrom(kind, sibling) => match slot.get(sibling).and_then(Value::as_str) {
            Some(sub_kind) => Resolution::Space(IdSpace::with_sub_kind(kind, SubKind::new(sub_kind))),
            None => return Err(AppError::missing_field(kind, sibling)),
        },
        Target::Scope(sibling) => match discriminator {
            Some("project") => Resolution::Space(IdSpace::of(ResourceKind::Project)),
            Some("department") => Resolution::Space(IdSpace::of(ResourceKind::Department)),
            Some("cluster") => Resolution::Cluster,
            Some(other) => return Err(AppError::UnknownScope(other.to_string())),
            None => return Err(AppError::UnknownScope(format!("missing {sibling}"))),
        },
        Target::DestinationCluster => Resolution::Cluster,
    };
    Ok(resolution)
}

fn rewrite_slot(
    field: &ReferenceField,
    slot: &mut Value,
    discriminator: Option<&str>,
    scope: Option<&str>,
    resolver: &IdentityResolver,
) -> Result<(), AppError> {
    if slot.is_null() {
        return Ok(());
    }

    let space = match resolution_for(field.target, slot, discriminator)? {
        Resolution::Cluster => {
            *slot = Value::String(resolver.destination_cluster().to_string());
            return Ok(());
        }
        Resolution::Space(space) => space,
    };

    let name = slot
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty());

    let new_id = match (field.lookup, name) {
        (Lookup::ByName, Some(name)) | (Lookup::IdOrName, Some(name)) => {
            match scope {
                Some(scope) if space.kind.is_asset() => {
                    resolver.resolve_scoped_name(&space, scope, name)?
                }
                _ => resolver.resolve_by_name(&space, name)?,
            }
        }
        (Lookup::ByName, None) => return Err(AppError::missing_field(space, "name")),
        (Lookup::ById, _) | (Lookup::IdOrName, None) => {
            let old = old_id(slot).ok_or_else(|| AppError::missing_field(&space, "id"))?;
            resolver.resolve(&space, &old)?
        }
    };

    let encoded = match field.encoding {
        Encoding::Text => new_id.to_text_value(),
        Encoding::Native => new_id.to_native_value(),
    };

    match slot {
        Value::Object(map) => {
            map.insert("id".to_string(), encoded);
        }
        _ => *slot = encoded,
    }
    Ok(())
}

fn old_id(slot: &Value) -> Option<Identifier> {
    match slot {
        Value::Object(map) => map.get("id").and_then(Identifier::from_value),
        other => Identifier::from_value(other),
    }
}
