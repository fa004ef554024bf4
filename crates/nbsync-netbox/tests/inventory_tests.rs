//! Inventory behavior against a mock NetBox: idempotent upserts, natural
//! key dedup under concurrency, priority-based merging and the orphan
//! lifecycle.

mod common;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nbsync_netbox::inventory::InventoryConfig;
use nbsync_netbox::objects::{
    NetboxEntity, NetboxObject, Site, Tenant,
};
use nbsync_netbox::{NetboxClient, NetboxInventory};

use common::{mount_empty_netbox, page, tag_json, CreateResponder, PatchResponder};

fn config() -> InventoryConfig {
    InventoryConfig {
        source_priority: vec!["vmware".into(), "proxmox".into()],
        ssot_tag_name: "netbox-ssot".into(),
        ssot_tag_color: "07426b".into(),
        remove_orphans_after_days: 5,
    }
}

async fn inventory(server: &MockServer) -> NetboxInventory {
    let client = Arc::new(NetboxClient::new(&server.uri(), "token", true, 10, None).unwrap());
    NetboxInventory::new(config(), client)
}

/// When tags pre-exist on the server, init refreshes their descriptions.
async fn mount_tag_updates(server: &MockServer) {
    for (id, name) in [(1, "netbox-ssot"), (2, "netbox-ssot-orphan")] {
        Mock::given(method("PATCH"))
            .and(path(format!("/api/extras/tags/{id}/")))
            .respond_with(PatchResponder::over(tag_json(id, name)))
            .mount(server)
            .await;
    }
}

fn tenant_draft(name: &str, source: &str, description: &str) -> Tenant {
    let mut base = NetboxObject {
        description: description.into(),
        ..Default::default()
    };
    base.set_custom("source_name", json!(source));
    Tenant {
        base,
        name: name.into(),
        slug: String::new(),
        group: None,
    }
}

#[tokio::test]
async fn repeated_add_is_idempotent() {
    let server = MockServer::start().await;
    mount_empty_netbox(&server).await;
    Mock::given(method("POST"))
        .and(path(Tenant::API_PATH))
        .respond_with(CreateResponder::starting_at(50))
        .expect(1)
        .mount(&server)
        .await;
    // The second add must not reach the API at all.
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .with_priority(150)
        .mount(&server)
        .await;

    let nbi = inventory(&server).await;
    nbi.init().await.unwrap();

    let first = nbi
        .add_tenant(tenant_draft("Stark Industries", "vmware", "Tony's shop"))
        .await
        .unwrap();
    let second = nbi
        .add_tenant(tenant_draft("Stark Industries", "vmware", "Tony's shop"))
        .await
        .unwrap();

    assert_eq!(first.id(), 50);
    assert_eq!(second.id(), 50);
    assert!(nbi.get_tenant("Stark Industries").await.is_some());
}

#[tokio::test]
async fn concurrent_adds_create_exactly_once() {
    let server = MockServer::start().await;
    mount_empty_netbox(&server).await;
    Mock::given(method("POST"))
        .and(path(Tenant::API_PATH))
        .respond_with(CreateResponder::starting_at(60))
        .expect(1)
        .mount(&server)
        .await;

    let nbi = Arc::new(inventory(&server).await);
    nbi.init().await.unwrap();

    let a = {
        let nbi = nbi.clone();
        tokio::spawn(async move {
            nbi.add_tenant(tenant_draft("Wayne Enterprises", "vmware", "Gotham"))
                .await
        })
    };
    let b = {
        let nbi = nbi.clone();
        tokio::spawn(async move {
            nbi.add_tenant(tenant_draft("Wayne Enterprises", "vmware", "Gotham"))
                .await
        })
    };
    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(a.id(), b.id());
}

/// The stored attribute ends up equal to the stronger source's value
/// regardless of which source syncs first.
#[tokio::test]
async fn stronger_source_wins_in_both_orders() {
    for (first_src, first_desc, second_src, second_desc, expect_patch) in [
        // weak then strong: the strong write patches over.
        ("proxmox", "weak view", "vmware", "strong view", true),
        // strong then weak: the weak write must not change anything.
        ("vmware", "strong view", "proxmox", "weak view", false),
    ] {
        let server = MockServer::start().await;
        mount_empty_netbox(&server).await;
        Mock::given(method("POST"))
            .and(path(Tenant::API_PATH))
            .respond_with(CreateResponder::starting_at(70))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/tenancy/tenants/70/"))
            .respond_with(PatchResponder::over(json!({
                "id": 70,
                "name": "Acme",
                "slug": "acme",
                "description": first_desc,
                "tags": [],
                "custom_fields": {"source_name": first_src},
            })))
            .expect(u64::from(expect_patch))
            .mount(&server)
            .await;

        let nbi = inventory(&server).await;
        nbi.init().await.unwrap();

        nbi.add_tenant(tenant_draft("Acme", first_src, first_desc))
            .await
            .unwrap();
        let stored = nbi
            .add_tenant(tenant_draft("Acme", second_src, second_desc))
            .await
            .unwrap();

        assert_eq!(
            stored.base.description, "strong view",
            "stored attribute must equal the stronger source's value \
             (first={first_src}, second={second_src})"
        );
        server.verify().await;
    }
}

#[tokio::test]
async fn untouched_managed_objects_become_orphans() {
    let server = MockServer::start().await;
    // Tags already exist on the server, so init adopts them.
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            tag_json(1, "netbox-ssot"),
            tag_json(2, "netbox-ssot-orphan"),
        ])))
        .mount(&server)
        .await;
    // One managed site that no source will touch this run.
    Mock::given(method("GET"))
        .and(path(Site::API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![json!({
            "id": 77,
            "name": "Abandoned DC",
            "slug": "abandoned-dc",
            "status": {"value": "active", "label": "Active"},
            "tags": [tag_json(1, "netbox-ssot")],
            "custom_fields": {"source_name": "vmware"},
        })])))
        .mount(&server)
        .await;
    mount_empty_netbox(&server).await;
    mount_tag_updates(&server).await;

    let delete = Mock::given(method("DELETE"))
        .and(path("/api/dcim/sites/77/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1);
    delete.mount(&server).await;

    let nbi = inventory(&server).await;
    nbi.init().await.unwrap();

    assert!(nbi.is_orphan_candidate(Site::API_PATH, 77).await);
    nbi.delete_orphans(true).await;
    assert_eq!(nbi.orphan_count().await, 0);
    server.verify().await;
}

#[tokio::test]
async fn soft_delete_tags_then_promotes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            tag_json(1, "netbox-ssot"),
            tag_json(2, "netbox-ssot-orphan"),
        ])))
        .mount(&server)
        .await;
    // Two stale sites: one freshly orphaned, one marked long ago.
    Mock::given(method("GET"))
        .and(path(Site::API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            json!({
                "id": 80,
                "name": "Fresh Orphan",
                "slug": "fresh-orphan",
                "tags": [tag_json(1, "netbox-ssot")],
                "custom_fields": {},
            }),
            json!({
                "id": 81,
                "name": "Old Orphan",
                "slug": "old-orphan",
                "tags": [tag_json(1, "netbox-ssot"), tag_json(2, "netbox-ssot-orphan")],
                "custom_fields": {"orphaned_since": "2020-01-01"},
            }),
        ])))
        .mount(&server)
        .await;
    mount_empty_netbox(&server).await;
    mount_tag_updates(&server).await;

    // Fresh orphan gets the tag and the stamp.
    Mock::given(method("PATCH"))
        .and(path("/api/dcim/sites/80/"))
        .and(body_partial_json(json!({"tags": [{"id": 1}, {"id": 2}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 80})))
        .expect(1)
        .mount(&server)
        .await;
    // Old orphan is past the five day window and gets deleted.
    Mock::given(method("DELETE"))
        .and(path("/api/dcim/sites/81/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let nbi = inventory(&server).await;
    nbi.init().await.unwrap();
    nbi.delete_orphans(false).await;
    server.verify().await;
}

#[tokio::test]
async fn drafts_referencing_unpersisted_objects_are_rejected() {
    let server = MockServer::start().await;
    mount_empty_netbox(&server).await;

    let nbi = inventory(&server).await;
    nbi.init().await.unwrap();

    let ghost_site = Arc::new(Site {
        base: NetboxObject::default(), // id 0: never persisted
        name: "ghost".into(),
        slug: "ghost".into(),
        ..Default::default()
    });
    let err = nbi
        .add_device(nbsync_netbox::objects::Device {
            name: "fw-01".into(),
            site: Some(ghost_site),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("never persisted"));
}
