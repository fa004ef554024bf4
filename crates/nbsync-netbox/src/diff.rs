//! The JSON-shape diff and the priority-aware merge.
//!
//! Both operate on wire maps produced by `to_wire()`: JSON objects keyed by
//! API field names, with foreign keys already reduced to `{"id": n}` or
//! `null` and many-to-many lists to id-sorted `[{"id": n}]`. Working at
//! this level keeps the comparison uniform across all entity families.

use serde_json::{json, Map, Value};

use nbsync_core::constants::{CF_LAST_SEEN, CF_ORPHANED_SINCE};

use crate::objects::{Id, JsonMap};

/// Compute the minimal patch turning `current` into `desired`.
///
/// Only keys present in `desired` are considered, so a field the draft
/// never set cannot clobber a stored value. An explicit `null` in
/// `desired` clears the stored field. Custom fields diff as a whole: if
/// any key differs the full merged mapping is emitted, nulls included.
pub fn diff_wire_maps(desired: &JsonMap, current: &JsonMap) -> JsonMap {
    let mut patch = JsonMap::new();
    for (key, want) in desired {
        if key == "id" {
            continue;
        }
        let have = current.get(key);
        match key.as_str() {
            "custom_fields" => {
                if custom_fields_differ(want, have) {
                    patch.insert(key.clone(), want.clone());
                }
            }
            _ => {
                let differs = match have {
                    Some(existing) => existing != want,
                    // Both "absent" and "null" mean unset on the remote.
                    None => !want.is_null(),
                };
                if differs {
                    patch.insert(key.clone(), want.clone());
                }
            }
        }
    }
    patch
}

/// Key-wise comparison of two custom field mappings. A desired key set to
/// `null` counts as a difference only if the stored side has a value.
fn custom_fields_differ(want: &Value, have: Option<&Value>) -> bool {
    let want = match want.as_object() {
        Some(map) => map,
        None => return false,
    };
    let empty = Map::new();
    let have = have.and_then(Value::as_object).unwrap_or(&empty);
    want.iter().any(|(k, v)| {
        let stored = have.get(k).unwrap_or(&Value::Null);
        stored != v
    })
}

/// Merge a stored wire map with a draft according to source priority.
///
/// When `draft_wins` (the draft's source has priority less than or equal
/// to the stored writer's) every key the draft carries overwrites the
/// stored value, explicit nulls included. Otherwise the draft only fills
/// keys the stored map lacks or has null.
///
/// Two slots are special regardless of priority: tags merge as the
/// id-sorted union of both sides (minus the orphan tag, so a re-observed
/// orphan is unmarked), and the freshness custom fields (`last_seen`,
/// `orphaned_since`) always come from the draft — every touch refreshes
/// them.
pub fn merge_wire_maps(
    existing: &JsonMap,
    draft: &JsonMap,
    draft_wins: bool,
    orphan_tag_id: Option<Id>,
) -> JsonMap {
    let mut merged = existing.clone();
    for (key, dval) in draft {
        match key.as_str() {
            "tags" => {
                let union = tag_union(existing.get(key), dval, orphan_tag_id);
                merged.insert(key.clone(), union);
            }
            "custom_fields" => {
                let combined =
                    merge_custom_fields(existing.get(key), dval, draft_wins);
                merged.insert(key.clone(), combined);
            }
            _ => {
                let fill = match merged.get(key) {
                    None | Some(Value::Null) => true,
                    Some(_) => draft_wins,
                };
                if fill {
                    merged.insert(key.clone(), dval.clone());
                }
            }
        }
    }
    merged
}

fn tag_union(existing: Option<&Value>, draft: &Value, orphan_tag_id: Option<Id>) -> Value {
    let mut ids: Vec<Id> = Vec::new();
    for side in [existing.unwrap_or(&Value::Null), draft] {
        if let Some(list) = side.as_array() {
            for item in list {
                if let Some(id) = item.get("id").and_then(Value::as_i64) {
                    ids.push(id);
                }
            }
        }
    }
    ids.sort_unstable();
    ids.dedup();
    if let Some(orphan) = orphan_tag_id {
        ids.retain(|id| *id != orphan);
    }
    Value::Array(ids.into_iter().map(|id| json!({ "id": id })).collect())
}

fn merge_custom_fields(existing: Option<&Value>, draft: &Value, draft_wins: bool) -> Value {
    let mut merged = existing
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(draft_map) = draft.as_object() {
        for (k, v) in draft_map {
            let always_fresh = k == CF_LAST_SEEN || k == CF_ORPHANED_SINCE;
            let fill = always_fresh
                || draft_wins
                || matches!(merged.get(k), None | Some(Value::Null));
            if fill {
                merged.insert(k.clone(), v.clone());
            }
        }
    }
    Value::Object(merged)
}

/// Lower a wire map into a POST body: `{"id": n}` references become bare
/// ids and `[{"id": n}]` lists become id arrays, matching what the write
/// API expects on create.
pub fn lower_for_create(wire: &JsonMap) -> JsonMap {
    let mut body = JsonMap::new();
    for (key, value) in wire {
        body.insert(key.clone(), lower_value(key, value));
    }
    body
}

fn lower_value(key: &str, value: &Value) -> Value {
    if key == "custom_fields" {
        return value.clone();
    }
    match value {
        Value::Object(map) => match sole_id(map) {
            Some(id) => json!(id),
            None => value.clone(),
        },
        Value::Array(items) => {
            let ids: Option<Vec<Id>> = items
                .iter()
                .map(|item| item.as_object().and_then(sole_id))
                .collect();
            match ids {
                Some(ids) => json!(ids),
                None => value.clone(),
            }
        }
        _ => value.clone(),
    }
}

fn sole_id(map: &Map<String, Value>) -> Option<Id> {
    if map.len() == 1 {
        map.get("id").and_then(Value::as_i64)
    } else {
        None
    }
}

/// Whether a wire map references an entity that was never persisted.
/// Foreign-key closure demands every referent carry a non-zero id.
pub fn references_unpersisted(wire: &JsonMap) -> bool {
    wire.iter().any(|(key, value)| {
        if key == "custom_fields" {
            return false;
        }
        match value {
            Value::Object(map) => sole_id(map) == Some(0),
            Value::Array(items) => items
                .iter()
                .any(|item| item.as_object().and_then(sole_id) == Some(0)),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{
        Cluster, ClusterGroup, ClusterStatus, ClusterType, NetboxEntity, NetboxObject, Site,
        SiteStatus, Tag, Tenant,
    };
    use std::sync::Arc;

    fn tag(id: Id, name: &str) -> Arc<Tag> {
        Arc::new(Tag {
            base: NetboxObject { id, ..Default::default() },
            name: name.into(),
            slug: name.to_lowercase(),
            color: "000000".into(),
        })
    }

    #[test]
    fn no_difference_yields_empty_patch() {
        let desired = Tag {
            name: "Test".into(),
            slug: "test".into(),
            color: "000000".into(),
            base: NetboxObject { description: "Test tag".into(), ..Default::default() },
        };
        let existing = Tag {
            base: NetboxObject { id: 1, description: "Test tag".into(), ..Default::default() },
            ..desired.clone()
        };
        assert!(diff_wire_maps(&desired.to_wire(), &existing.to_wire()).is_empty());
    }

    #[test]
    fn changed_scalar_fields() {
        let desired = Tag {
            name: "Test Changed".into(),
            slug: "test-changed".into(),
            color: "000000".into(),
            base: NetboxObject { description: "Changed tag".into(), ..Default::default() },
        };
        let existing = Tag {
            base: NetboxObject { id: 1, description: "Test tag".into(), ..Default::default() },
            name: "Test".into(),
            slug: "test".into(),
            color: "000000".into(),
        };
        let patch = diff_wire_maps(&desired.to_wire(), &existing.to_wire());
        assert_eq!(
            Value::Object(patch),
            json!({
                "name": "Test Changed",
                "slug": "test-changed",
                "description": "Changed tag",
            })
        );
    }

    #[test]
    fn tag_set_growth_replaces_whole_list() {
        let desired = ClusterGroup {
            base: NetboxObject {
                tags: vec![tag(1, "Test"), tag(2, "Test2"), tag(3, "Test3")],
                description: "New group".into(),
                ..Default::default()
            },
            name: "New Group".into(),
            slug: "new-group".into(),
        };
        let existing = ClusterGroup {
            base: NetboxObject {
                id: 7,
                tags: vec![tag(1, "Test"), tag(2, "Test2")],
                description: "New group".into(),
                ..Default::default()
            },
            name: "New Group".into(),
            slug: "new-group".into(),
        };
        let patch = diff_wire_maps(&desired.to_wire(), &existing.to_wire());
        assert_eq!(
            Value::Object(patch),
            json!({ "tags": [{"id": 1}, {"id": 2}, {"id": 3}] })
        );
    }

    #[test]
    fn cluster_complex_diff() {
        let cluster_type = Arc::new(ClusterType {
            base: NetboxObject { id: 2, ..Default::default() },
            name: "oVirt".into(),
            slug: "ovirt".into(),
        });
        let desired = Cluster {
            base: NetboxObject {
                description: "New Description".into(),
                tags: vec![tag(1, "Test"), tag(3, "Test3"), tag(4, "TestX")],
                ..Default::default()
            },
            name: "Hosting".into(),
            cluster_type: Some(cluster_type.clone()),
            group: Some(Arc::new(ClusterGroup {
                base: NetboxObject { id: 4, ..Default::default() },
                name: "New Cluster Group".into(),
                slug: "new-cluster-group".into(),
            })),
            status: Some(ClusterStatus::Active),
            site: None,
            tenant: None,
        };
        let existing = Cluster {
            base: NetboxObject {
                id: 7,
                description: "Hosting cluster".into(),
                tags: vec![tag(2, "Netbox-synced")],
                ..Default::default()
            },
            name: "Hosting".into(),
            cluster_type: Some(cluster_type),
            group: Some(Arc::new(ClusterGroup {
                base: NetboxObject { id: 3, ..Default::default() },
                name: "Hosting".into(),
                slug: "hosting".into(),
            })),
            status: Some(ClusterStatus::Active),
            tenant: Some(Arc::new(Tenant {
                base: NetboxObject { id: 1, ..Default::default() },
                name: "Default".into(),
                slug: "default".into(),
                group: None,
            })),
            site: Some(Arc::new(Site {
                base: NetboxObject { id: 2, ..Default::default() },
                name: "New York".into(),
                slug: "new-york".into(),
                status: Some(SiteStatus::Active),
                ..Default::default()
            })),
        };
        let patch = diff_wire_maps(&desired.to_wire(), &existing.to_wire());
        assert_eq!(
            Value::Object(patch),
            json!({
                "description": "New Description",
                "group": {"id": 4},
                "site": null,
                "tags": [{"id": 1}, {"id": 3}, {"id": 4}],
                "tenant": null,
            })
        );
    }

    #[test]
    fn absent_key_never_clobbers() {
        let desired: JsonMap = json!({"name": "x"}).as_object().unwrap().clone();
        let current: JsonMap = json!({"name": "x", "serial": "ABC"}).as_object().unwrap().clone();
        assert!(diff_wire_maps(&desired, &current).is_empty());
    }

    #[test]
    fn null_clears_only_set_values() {
        let desired: JsonMap =
            json!({"tenant": null, "platform": null}).as_object().unwrap().clone();
        let current: JsonMap =
            json!({"tenant": {"id": 5}, "platform": null}).as_object().unwrap().clone();
        let patch = diff_wire_maps(&desired, &current);
        assert_eq!(Value::Object(patch), json!({"tenant": null}));
    }

    #[test]
    fn custom_fields_emit_full_merged_mapping() {
        let desired: JsonMap = json!({
            "custom_fields": {"source_name": "a", "last_seen": "2025-07-02", "owner": null}
        })
        .as_object()
        .unwrap()
        .clone();
        let current: JsonMap = json!({
            "custom_fields": {"source_name": "a", "last_seen": "2025-07-01", "owner": "bob"}
        })
        .as_object()
        .unwrap()
        .clone();
        let patch = diff_wire_maps(&desired, &current);
        assert_eq!(
            Value::Object(patch),
            json!({
                "custom_fields": {
                    "source_name": "a",
                    "last_seen": "2025-07-02",
                    "owner": null,
                }
            })
        );
    }

    #[test]
    fn merge_stronger_draft_overwrites() {
        let existing: JsonMap =
            json!({"name": "n", "tenant": {"id": 1}, "serial": "OLD"}).as_object().unwrap().clone();
        let draft: JsonMap =
            json!({"name": "n", "tenant": null, "serial": "NEW"}).as_object().unwrap().clone();
        let merged = merge_wire_maps(&existing, &draft, true, None);
        assert_eq!(merged["tenant"], Value::Null);
        assert_eq!(merged["serial"], json!("NEW"));
    }

    #[test]
    fn merge_weaker_draft_only_fills_gaps() {
        let existing: JsonMap =
            json!({"name": "n", "tenant": {"id": 1}, "platform": null}).as_object().unwrap().clone();
        let draft: JsonMap = json!({"name": "n", "tenant": {"id": 9}, "platform": {"id": 3}, "serial": "S"})
            .as_object()
            .unwrap()
            .clone();
        let merged = merge_wire_maps(&existing, &draft, false, None);
        assert_eq!(merged["tenant"], json!({"id": 1}));
        assert_eq!(merged["platform"], json!({"id": 3}));
        assert_eq!(merged["serial"], json!("S"));
    }

    #[test]
    fn merge_strips_orphan_tag() {
        let existing: JsonMap =
            json!({"tags": [{"id": 2}, {"id": 9}]}).as_object().unwrap().clone();
        let draft: JsonMap = json!({"tags": [{"id": 2}, {"id": 5}]}).as_object().unwrap().clone();
        let merged = merge_wire_maps(&existing, &draft, false, Some(9));
        assert_eq!(merged["tags"], json!([{"id": 2}, {"id": 5}]));
    }

    #[test]
    fn merge_always_refreshes_last_seen() {
        let existing: JsonMap = json!({
            "custom_fields": {"source_name": "strong", "last_seen": "2025-07-01"}
        })
        .as_object()
        .unwrap()
        .clone();
        let draft: JsonMap = json!({
            "custom_fields": {"source_name": "weak", "last_seen": "2025-07-02"}
        })
        .as_object()
        .unwrap()
        .clone();
        let merged = merge_wire_maps(&existing, &draft, false, None);
        assert_eq!(
            merged["custom_fields"],
            json!({"source_name": "strong", "last_seen": "2025-07-02"})
        );
    }

    #[test]
    fn lowering_create_bodies() {
        let cluster = Cluster {
            base: NetboxObject {
                description: "Test Description".into(),
                tags: vec![tag(1, "Test"), tag(3, "Test3"), tag(4, "Test3")],
                ..Default::default()
            },
            name: "Test".into(),
            status: Some(ClusterStatus::Active),
            cluster_type: Some(Arc::new(ClusterType {
                base: NetboxObject { id: 2, ..Default::default() },
                name: "oVirt".into(),
                slug: "ovirt".into(),
            })),
            group: Some(Arc::new(ClusterGroup {
                base: NetboxObject { id: 4, ..Default::default() },
                name: "New Cluster Group".into(),
                slug: "new-cluster-group".into(),
            })),
            site: Some(Arc::new(Site {
                base: NetboxObject { id: 2, ..Default::default() },
                name: "New York".into(),
                slug: "new-york".into(),
                status: Some(SiteStatus::Active),
                ..Default::default()
            })),
            tenant: Some(Arc::new(Tenant {
                base: NetboxObject { id: 1, ..Default::default() },
                name: "Default".into(),
                slug: "default".into(),
                group: None,
            })),
        };
        let body = lower_for_create(&cluster.to_wire());
        assert_eq!(
            Value::Object(body),
            json!({
                "description": "Test Description",
                "group": 4,
                "name": "Test",
                "site": 2,
                "status": "active",
                "tags": [1, 3, 4],
                "tenant": 1,
                "type": 2,
            })
        );
    }

    #[test]
    fn detects_unpersisted_references() {
        let ok: JsonMap = json!({"site": {"id": 2}}).as_object().unwrap().clone();
        let bad: JsonMap = json!({"site": {"id": 0}}).as_object().unwrap().clone();
        let bad_list: JsonMap =
            json!({"tags": [{"id": 1}, {"id": 0}]}).as_object().unwrap().clone();
        assert!(!references_unpersisted(&ok));
        assert!(references_unpersisted(&bad));
        assert!(references_unpersisted(&bad_list));
    }
}
