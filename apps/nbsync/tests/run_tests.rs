//! Orchestrator lifecycle against a mock NetBox: a run with no sources
//! hydrates, creates the bootstrap objects and reaps orphans.

use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use nbsync::config::{Config, LoggerConfig, NetboxConfig};
use nbsync::run::run;

struct CreateResponder {
    next_id: AtomicI64,
}

impl Respond for CreateResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        if let Some(tags) = body.get("tags").and_then(Value::as_array).cloned() {
            let inflated: Vec<Value> = tags
                .into_iter()
                .map(|t| t.as_i64().map_or(t.clone(), |n| json!({"id": n})))
                .collect();
            body["tags"] = Value::Array(inflated);
        }
        body["id"] = json!(self.next_id.fetch_add(1, Ordering::SeqCst));
        ResponseTemplate::new(201).set_body_json(body)
    }
}

fn netbox_config(server: &MockServer) -> Config {
    let url = server.uri();
    let rest = url.strip_prefix("http://").unwrap();
    let (host, port) = rest.split_once(':').unwrap();
    Config {
        logger: LoggerConfig::default(),
        netbox: NetboxConfig {
            api_token: "token".into(),
            hostname: host.to_string(),
            port: port.parse().unwrap(),
            http_scheme: "http".into(),
            tag: "netbox-ssot".into(),
            tag_color: "07426b".into(),
            remove_orphans: true,
            ..Default::default()
        },
        sources: vec![],
    }
}

#[tokio::test]
async fn empty_run_bootstraps_and_reaps_orphans() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/status/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"netbox-version": "4.1.0"})),
        )
        .mount(&server)
        .await;
    // One stale managed device type from a previous run.
    Mock::given(method("GET"))
        .and(path("/api/dcim/device-types/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "results": [{
                "id": 33,
                "model": "Retired Model",
                "slug": "retired-model",
                "tags": [{"id": 1, "name": "netbox-ssot", "slug": "netbox-ssot", "color": "07426b"}],
            }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "results": [
                {"id": 1, "name": "netbox-ssot", "slug": "netbox-ssot", "color": "07426b",
                 "description": "Tag applied to every object managed by nbsync"},
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 0, "next": null, "results": [],
        })))
        .with_priority(200)
        .mount(&server)
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
            .respond_with(CreateResponder {
                next_id: AtomicI64::new(9000),
            })
            .with_priority(100)
            .mount(&server)
            .await;
    }
    // removeOrphans = true: the stale device type is hard deleted.
    Mock::given(method("DELETE"))
        .and(path("/api/dcim/device-types/33/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    run(netbox_config(&server)).await.unwrap();
    server.verify().await;
}
