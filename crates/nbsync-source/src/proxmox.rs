//! Proxmox VE adapter.
//!
//! Reads the cluster topology over the PVE JSON API (API-token auth) and
//! projects it as cluster -> nodes (devices) -> node interfaces and
//! addresses -> guests (VMs).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use nbsync_core::net::{prefix_and_mask, remove_zone_index, reverse_lookup};
use nbsync_netbox::objects::{
    content_types, Cluster, ClusterGroup, ClusterStatus, ClusterType, Device, DeviceRole,
    DeviceStatus, DeviceType, IPAddress, IPAddressStatus, Interface, InterfaceType, Manufacturer,
    NetboxObject, Prefix, PrefixStatus, Vm, VmStatus,
};
use nbsync_netbox::NetboxInventory;

use crate::matchers::{
    match_cluster_to_site, match_host_to_site, match_name_to_role, match_name_to_tenant,
};
use crate::{Source, SourceContext, SourceError};

pub struct ProxmoxSource {
    ctx: SourceContext,
    http: Client,
    base_url: String,

    cluster_name: String,
    nodes: Vec<PveNode>,
    guests: Vec<PveGuest>,
    networks: HashMap<String, Vec<PveNetwork>>,
}

#[derive(Debug, Deserialize)]
struct PveEnvelope<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
struct PveStatusEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    online: Option<u8>,
    #[serde(default)]
    ip: Option<String>,
}

#[derive(Debug, Clone)]
struct PveNode {
    name: String,
    online: bool,
    ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PveResource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    vmid: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    maxcpu: Option<f64>,
    #[serde(default)]
    maxmem: Option<u64>,
    #[serde(default)]
    maxdisk: Option<u64>,
}

#[derive(Debug, Clone)]
struct PveGuest {
    kind: String,
    vmid: u64,
    name: String,
    node: String,
    running: bool,
    maxcpu: Option<f64>,
    maxmem: Option<u64>,
    maxdisk: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct PveNetwork {
    iface: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    cidr: Option<String>,
    #[serde(default)]
    active: Option<u8>,
}

impl ProxmoxSource {
    pub fn new(ctx: SourceContext) -> Result<Self, SourceError> {
        if ctx.config.api_token.is_empty() {
            return Err(SourceError::Config(format!(
                "source {} needs an apiToken of the form user@realm!tokenid=secret",
                ctx.config.name
            )));
        }
        let http = ctx.http_client()?;
        let base_url = ctx.config.base_url();
        Ok(Self {
            ctx,
            http,
            base_url,
            cluster_name: String::new(),
            nodes: Vec::new(),
            guests: Vec::new(),
            networks: HashMap::new(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}/api2/json{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(
                header::AUTHORIZATION,
                format!("PVEAPIToken={}", self.ctx.config.api_token),
            )
            .send()
            .await
            .map_err(|e| SourceError::connection_with_source(format!("GET {url}"), e))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                url,
                message,
            });
        }
        let envelope: PveEnvelope<T> = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("decoding {url}: {e}")))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl Source for ProxmoxSource {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    async fn init(&mut self) -> Result<(), SourceError> {
        let status: Vec<PveStatusEntry> = self.fetch("/cluster/status").await?;
        self.cluster_name = status
            .iter()
            .find(|e| e.kind == "cluster")
            .map(|e| e.name.clone())
            .unwrap_or_else(|| self.ctx.config.hostname.clone());
        self.nodes = status
            .into_iter()
            .filter(|e| e.kind == "node")
            .map(|e| PveNode {
                name: e.name,
                online: e.online == Some(1),
                ip: e.ip,
            })
            .collect();

        let resources: Vec<PveResource> = self.fetch("/cluster/resources").await?;
        self.guests = resources
            .into_iter()
            .filter(|r| r.kind == "qemu" || r.kind == "lxc")
            .filter_map(|r| {
                Some(PveGuest {
                    kind: r.kind,
                    vmid: r.vmid?,
                    name: r.name?,
                    node: r.node?,
                    running: r.status.as_deref() == Some("running"),
                    maxcpu: r.maxcpu,
                    maxmem: r.maxmem,
                    maxdisk: r.maxdisk,
                })
            })
            .collect();

        for node in &self.nodes {
            let networks: Vec<PveNetwork> =
                self.fetch(&format!("/nodes/{}/network", node.name)).await?;
            self.networks.insert(node.name.clone(), networks);
        }

        info!(
            source = self.ctx.name(),
            cluster = %self.cluster_name,
            nodes = self.nodes.len(),
            guests = self.guests.len(),
            "proxmox snapshot fetched"
        );
        Ok(())
    }

    async fn sync(&self, nbi: &Arc<NetboxInventory>) -> Result<(), SourceError> {
        let cluster = self.sync_cluster(nbi).await?;
        self.sync_nodes(nbi, &cluster).await?;
        self.sync_guests(nbi, &cluster).await;
        Ok(())
    }
}

impl ProxmoxSource {
    async fn sync_cluster(
        &self,
        nbi: &Arc<NetboxInventory>,
    ) -> Result<Arc<Cluster>, SourceError> {
        let cluster_type = nbi
            .add_cluster_type(ClusterType {
                name: "Proxmox VE".into(),
                slug: "proxmox-ve".into(),
                ..Default::default()
            })
            .await?;

        let group = match self
            .ctx
            .relations
            .datacenter_cluster_group
            .match_value(&self.cluster_name)
        {
            Some(group_name) => Some(
                nbi.add_cluster_group(ClusterGroup {
                    name: group_name.to_string(),
                    slug: nbsync_core::slugify(group_name),
                    ..Default::default()
                })
                .await?,
            ),
            None => None,
        };
        let site =
            match_cluster_to_site(nbi, &self.cluster_name, &self.ctx.relations.cluster_site)
                .await?;
        let tenant =
            match_name_to_tenant(nbi, &self.cluster_name, &self.ctx.relations.cluster_tenant)
                .await?;

        let mut base = NetboxObject::default();
        self.ctx.stamp(&mut base, &self.cluster_name);
        let cluster = nbi
            .add_cluster(Cluster {
                base,
                name: self.cluster_name.clone(),
                cluster_type: Some(cluster_type),
                group,
                status: Some(ClusterStatus::Active),
                site,
                tenant,
            })
            .await?;
        Ok(cluster)
    }

    async fn sync_nodes(
        &self,
        nbi: &Arc<NetboxInventory>,
        cluster: &Arc<Cluster>,
    ) -> Result<(), SourceError> {
        let manufacturer = nbi
            .add_manufacturer(Manufacturer {
                name: "Proxmox".into(),
                slug: "proxmox".into(),
                ..Default::default()
            })
            .await?;
        let device_type = nbi
            .add_device_type(DeviceType {
                manufacturer: Some(manufacturer),
                model: "Proxmox VE Node".into(),
                slug: "proxmox-ve-node".into(),
                ..Default::default()
            })
            .await?;

        for node in &self.nodes {
            let role = match match_name_to_role(nbi, &node.name, &self.ctx.relations.host_role, false)
                .await?
            {
                Some(role) => role,
                None => {
                    nbi.add_device_role(DeviceRole {
                        name: "Hypervisor".into(),
                        slug: "hypervisor".into(),
                        color: "e57000".into(),
                        vm_role: false,
                        ..Default::default()
                    })
                    .await?
                }
            };
            let site = match match_host_to_site(nbi, &node.name, &self.ctx.relations.host_site)
                .await?
            {
                Some(site) => site,
                None => cluster.site.clone().unwrap_or_else(|| nbi.default_site()),
            };
            let tenant =
                match_name_to_tenant(nbi, &node.name, &self.ctx.relations.host_tenant).await?;

            let mut base = NetboxObject::default();
            self.ctx.stamp(&mut base, &node.name);
            let device = nbi
                .add_device(Device {
                    base,
                    name: node.name.clone(),
                    device_role: Some(role),
                    device_type: Some(device_type.clone()),
                    site: Some(site),
                    status: Some(if node.online {
                        DeviceStatus::Active
                    } else {
                        DeviceStatus::Offline
                    }),
                    cluster: Some(cluster.clone()),
                    tenant,
                    ..Default::default()
                })
                .await?;

            let primary = self.sync_node_interfaces(nbi, node, &device).await?;
            if let Some(primary_ip) = primary {
                // Second phase of the device <-> address cycle: the
                // address exists now, so the device can point at it.
                let mut patched = (*device).clone();
                patched.primary_ip4 = Some(primary_ip);
                nbi.add_device(patched).await?;
            }
        }
        Ok(())
    }

    /// Project one node's interfaces and addresses; returns the address
    /// matching the node's management IP, if any, for the primary_ip4
    /// backpatch.
    async fn sync_node_interfaces(
        &self,
        nbi: &Arc<NetboxInventory>,
        node: &PveNode,
        device: &Arc<Device>,
    ) -> Result<Option<Arc<IPAddress>>, SourceError> {
        let Some(networks) = self.networks.get(&node.name) else {
            return Ok(None);
        };
        let mut primary = None;
        for network in networks {
            if !self.ctx.interface_permitted(&network.iface) {
                debug!(iface = %network.iface, "skipped by interface filter");
                continue;
            }
            let iface_type = match network.kind.as_str() {
                "bridge" | "OVSBridge" => InterfaceType::BRIDGE,
                "bond" => InterfaceType::LAG,
                "vlan" => InterfaceType::VIRTUAL,
                _ => InterfaceType::OTHER,
            };
            let mut base = NetboxObject::default();
            self.ctx.stamp(&mut base, &format!("{}/{}", node.name, network.iface));
            let interface = nbi
                .add_interface(Interface {
                    base,
                    device: Some(device.clone()),
                    name: network.iface.clone(),
                    enabled: Some(network.active == Some(1)),
                    r#type: Some(iface_type),
                    ..Default::default()
                })
                .await?;

            let Some(cidr) = network.cidr.as_deref() else {
                continue;
            };
            let address = remove_zone_index(cidr);
            if !self.ctx.ip_permitted(&address) {
                continue;
            }
            let dns_name = reverse_lookup(&address).await;
            let mut ip_base = NetboxObject::default();
            self.ctx.stamp(&mut ip_base, &format!("{}/{}", node.name, network.iface));
            let ip = nbi
                .add_ip_address(IPAddress {
                    base: ip_base,
                    address: address.clone(),
                    status: Some(IPAddressStatus::Active),
                    dns_name,
                    assigned_object_type: Some(content_types::DCIM_INTERFACE.to_string()),
                    assigned_object_id: Some(interface.base.id),
                    ..Default::default()
                })
                .await?;

            if let Ok((prefix, _mask)) = prefix_and_mask(&address) {
                let mut prefix_base = NetboxObject::default();
                self.ctx.stamp(&mut prefix_base, "");
                nbi.add_prefix(Prefix {
                    base: prefix_base,
                    prefix,
                    status: Some(PrefixStatus::Active),
                    ..Default::default()
                })
                .await?;
            }

            let bare = address.split('/').next().unwrap_or(&address).to_string();
            if node.ip.as_deref() == Some(bare.as_str()) {
                primary = Some(ip);
            }
        }
        Ok(primary)
    }

    async fn sync_guests(&self, nbi: &Arc<NetboxInventory>, cluster: &Arc<Cluster>) {
        stream::iter(&self.guests)
            .for_each_concurrent(None, |guest| async {
                let _slot = self.ctx.worker_slot().await;
                if let Err(e) = self.sync_guest(nbi, cluster, guest).await {
                    // One bad guest must not abort the source.
                    warn!(
                        source = self.ctx.name(),
                        guest = %guest.name,
                        error = %e,
                        "guest sync failed"
                    );
                }
            })
            .await;
    }

    async fn sync_guest(
        &self,
        nbi: &Arc<NetboxInventory>,
        cluster: &Arc<Cluster>,
        guest: &PveGuest,
    ) -> Result<(), SourceError> {
        let tenant =
            match_name_to_tenant(nbi, &guest.name, &self.ctx.relations.vm_tenant).await?;
        let role = match_name_to_role(nbi, &guest.name, &self.ctx.relations.vm_role, true).await?;

        let mut base = NetboxObject::default();
        self.ctx
            .stamp(&mut base, &format!("{}/{}", guest.kind, guest.vmid));
        nbi.add_vm(Vm {
            base,
            name: guest.name.clone(),
            cluster: Some(cluster.clone()),
            status: Some(if guest.running {
                VmStatus::Active
            } else {
                VmStatus::Offline
            }),
            site: cluster.site.clone(),
            tenant,
            role,
            vcpus: guest.maxcpu,
            memory: guest.maxmem.map(|bytes| bytes / (1024 * 1024)),
            disk: guest.maxdisk.map(|bytes| bytes / (1024 * 1024 * 1024)),
            ..Default::default()
        })
        .await?;
        Ok(())
    }
}
