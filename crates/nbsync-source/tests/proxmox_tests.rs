//! End-to-end adapter test: a mock Proxmox cluster projected into a mock
//! NetBox through the full init -> sync pipeline.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use nbsync_netbox::inventory::InventoryConfig;
use nbsync_netbox::{NetboxClient, NetboxInventory};
use nbsync_source::{new_source, SourceConfig};

/// Echoes create bodies back with ids, re-nesting lowered references the
/// way the read API would.
struct CreateResponder {
    next_id: AtomicI64,
}

impl CreateResponder {
    fn starting_at(id: i64) -> Self {
        Self {
            next_id: AtomicI64::new(id),
        }
    }
}

impl Respond for CreateResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        if let Some(map) = body.as_object_mut() {
            for key in [
                "tenant", "group", "site", "platform", "role", "device_type", "manufacturer",
                "cluster", "type", "parent", "untagged_vlan", "device", "vlan", "primary_ip4",
            ] {
                if let Some(n) = map.get(key).and_then(Value::as_i64) {
                    map.insert(key.into(), json!({"id": n}));
                }
            }
            for key in ["tags", "tagged_vlans"] {
                if let Some(list) = map.get(key).and_then(Value::as_array).cloned() {
                    let inflated: Vec<Value> = list
                        .into_iter()
                        .map(|item| match item.as_i64() {
                            Some(n) => json!({"id": n}),
                            None => item,
                        })
                        .collect();
                    map.insert(key.into(), Value::Array(inflated));
                }
            }
        }
        body["id"] = json!(self.next_id.fetch_add(1, Ordering::SeqCst));
        ResponseTemplate::new(201).set_body_json(body)
    }
}

fn empty_page() -> Value {
    json!({"count": 0, "next": null, "results": []})
}

async fn mount_netbox(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/status/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"netbox-version": "4.1.0"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .with_priority(200)
        .mount(server)
        .await;

    for (create_path, first_id) in [
        ("/api/extras/tags/", 10),
        ("/api/extras/custom-fields/", 20),
        ("/api/tenancy/contact-roles/", 30),
        ("/api/tenancy/tenants/", 40),
        ("/api/dcim/sites/", 50),
        ("/api/ipam/vlan-groups/", 60),
        ("/api/virtualization/cluster-types/", 70),
        ("/api/virtualization/cluster-groups/", 80),
        ("/api/dcim/manufacturers/", 90),
        ("/api/dcim/device-types/", 100),
        ("/api/dcim/device-roles/", 110),
        ("/api/dcim/interfaces/", 200),
        ("/api/ipam/ip-addresses/", 300),
        ("/api/ipam/prefixes/", 400),
    ] {
        Mock::given(method("POST"))
            .and(path(create_path))
            .respond_with(CreateResponder::starting_at(first_id))
            .with_priority(100)
            .mount(server)
            .await;
    }
}

async fn mount_proxmox(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"type": "cluster", "name": "pve-lab", "quorate": 1},
                {"type": "node", "name": "pve1", "online": 1, "ip": "10.10.0.10"},
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/cluster/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"type": "node", "node": "pve1", "maxcpu": 16},
                {
                    "type": "qemu",
                    "vmid": 105,
                    "name": "web01",
                    "node": "pve1",
                    "status": "running",
                    "maxcpu": 4.0,
                    "maxmem": 8589934592u64,
                    "maxdisk": 34359738368u64,
                },
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/network"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"iface": "vmbr0", "type": "bridge", "cidr": "10.10.0.10/24", "active": 1},
                {"iface": "docker0", "type": "bridge", "cidr": "172.17.0.1/16", "active": 1},
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn proxmox_cluster_is_projected_into_netbox() {
    let netbox = MockServer::start().await;
    mount_netbox(&netbox).await;
    let pve = MockServer::start().await;
    mount_proxmox(&pve).await;

    // The projection creates exactly one cluster, one device and one VM,
    // and backpatches the device's primary address.
    Mock::given(method("POST"))
        .and(path("/api/virtualization/clusters/"))
        .respond_with(CreateResponder::starting_at(150))
        .expect(1)
        .mount(&netbox)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/devices/"))
        .respond_with(CreateResponder::starting_at(500))
        .expect(1)
        .mount(&netbox)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/virtualization/virtual-machines/"))
        .respond_with(CreateResponder::starting_at(600))
        .expect(1)
        .mount(&netbox)
        .await;
    Mock::given(method("PATCH"))
        .and(path_regex(r"^/api/dcim/devices/\d+/$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 500, "name": "pve1", "primary_ip4": {"id": 300}})),
        )
        .expect(1)
        .mount(&netbox)
        .await;

    let client =
        Arc::new(NetboxClient::new(&netbox.uri(), "token", true, 10, None).unwrap());
    let nbi = Arc::new(NetboxInventory::new(
        InventoryConfig {
            source_priority: vec!["lab-pve".into()],
            ssot_tag_name: "netbox-ssot".into(),
            ssot_tag_color: "07426b".into(),
            remove_orphans_after_days: 30,
        },
        client,
    ));
    nbi.init().await.unwrap();

    let pve_url = url::Url::parse(&pve.uri()).unwrap();
    let mut config = SourceConfig {
        name: "lab-pve".into(),
        source_type: "proxmox".into(),
        http_scheme: "http".into(),
        hostname: pve_url.host_str().unwrap().to_string(),
        port: i64::from(pve_url.port().unwrap()),
        api_token: "svc@pve!nbsync=secret".into(),
        // Container bridges are noise.
        interface_filter: "^docker".into(),
        ..Default::default()
    };
    config.apply_defaults();

    let mut source = new_source(&config, &nbi).await.unwrap();
    source.init().await.unwrap();
    source.sync(&nbi).await.unwrap();

    let device = nbi.get_device("pve1", 50).await.expect("node became a device");
    assert_eq!(device.name, "pve1");
    let vm = nbi.get_vm("web01", 150).await.expect("guest became a vm");
    assert_eq!(vm.memory, Some(8192));
    assert_eq!(vm.disk, Some(32));
    assert!(nbi.get_ip_address("10.10.0.10/24").await.is_some());
    assert!(nbi.get_interface(500, "vmbr0").await.is_some());
    // The filtered interface never made it across.
    assert!(nbi.get_interface(500, "docker0").await.is_none());
    assert!(nbi.get_prefix("10.10.0.0/24").await.is_some());

    netbox.verify().await;
}
