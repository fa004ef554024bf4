//! Shared wiremock scaffolding for the NetBox layer tests.

use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Keys whose integer values are object references in create bodies and
/// must be echoed back in nested form, the way NetBox itself responds.
const FK_KEYS: &[&str] = &[
    "tenant",
    "group",
    "site",
    "platform",
    "role",
    "device_type",
    "manufacturer",
    "cluster",
    "type",
    "parent",
    "bridge",
    "lag",
    "untagged_vlan",
    "virtual_machine",
    "device",
    "contact",
    "vlan",
    "primary_ip4",
    "primary_ip6",
];
const FK_LIST_KEYS: &[&str] = &["tags", "tagged_vlans", "vdcs"];

/// Re-inflate a lowered create body into the nested form the read API
/// uses: bare reference ids become `{"id": n}`.
pub fn inflate(mut body: Value) -> Value {
    if let Some(map) = body.as_object_mut() {
        for key in FK_KEYS {
            if let Some(n) = map.get(*key).and_then(Value::as_i64) {
                map.insert((*key).into(), json!({"id": n}));
            }
        }
        for key in FK_LIST_KEYS {
            if let Some(list) = map.get(*key).and_then(Value::as_array).cloned() {
                let inflated: Vec<Value> = list
                    .into_iter()
                    .map(|item| match item.as_i64() {
                        Some(n) => json!({"id": n}),
                        None => item,
                    })
                    .collect();
                map.insert((*key).into(), Value::Array(inflated));
            }
        }
    }
    body
}

/// Responds to POSTs by echoing the submitted body with the next id
/// assigned, mimicking a create.
pub struct CreateResponder {
    next_id: AtomicI64,
}

impl CreateResponder {
    pub fn starting_at(id: i64) -> Self {
        Self {
            next_id: AtomicI64::new(id),
        }
    }
}

impl Respond for CreateResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let mut body = inflate(body);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        body["id"] = json!(id);
        ResponseTemplate::new(201).set_body_json(body)
    }
}

/// Responds to PATCHes by merging the submitted fields over a fixed base
/// object, mimicking NetBox returning the full updated object.
pub struct PatchResponder {
    base: Value,
}

impl PatchResponder {
    pub fn over(base: Value) -> Self {
        Self { base }
    }
}

impl Respond for PatchResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let fields: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let mut merged = self.base.clone();
        if let (Some(base), Some(patch)) = (merged.as_object_mut(), fields.as_object()) {
            for (k, v) in patch {
                base.insert(k.clone(), v.clone());
            }
        }
        ResponseTemplate::new(200).set_body_json(merged)
    }
}

pub fn page(results: Vec<Value>) -> Value {
    json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results,
    })
}

/// Mount the baseline a bare NetBox presents: a version endpoint, empty
/// list responses for every family, and create responders for the
/// bootstrap objects the inventory provisions at init.
pub async fn mount_empty_netbox(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "netbox-version": "4.1.3",
        })))
        .mount(server)
        .await;

    // Any list endpoint not specifically mocked is empty.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .with_priority(200)
        .mount(server)
        .await;

    for create_path in [
        "/api/extras/tags/",
        "/api/extras/custom-fields/",
        "/api/tenancy/contact-roles/",
        "/api/dcim/sites/",
        "/api/ipam/vlan-groups/",
    ] {
        Mock::given(method("POST"))
            .and(path(create_path))
            .respond_with(CreateResponder::starting_at(9000))
            .with_priority(100)
            .mount(server)
            .await;
    }
}

/// A tag object as the read API returns it.
pub fn tag_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "color": "07426b",
        "description": "",
    })
}
