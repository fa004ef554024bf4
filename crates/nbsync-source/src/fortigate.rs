//! FortiGate adapter.
//!
//! Reads the firewall over the FortiOS REST API (bearer-token auth) and
//! projects it as a single device with its interfaces, VLANs, addresses
//! and, optionally, the addresses learned from the ARP table.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use nbsync_core::net::{mask_to_bits, prefix_and_mask, reverse_lookup};
use nbsync_netbox::objects::{
    content_types, Device, DeviceRole, DeviceStatus, DeviceType, IPAddress, IPAddressStatus,
    Interface, InterfaceMode, InterfaceType, Manufacturer, NetboxObject, Prefix, PrefixStatus,
    Vlan, VlanStatus,
};
use nbsync_netbox::NetboxInventory;

use crate::matchers::{
    match_host_to_site, match_name_to_role, match_name_to_tenant, match_vlan_to_group,
    match_vlan_to_site,
};
use crate::{Source, SourceContext, SourceError};

pub struct FortigateSource {
    ctx: SourceContext,
    http: Client,
    base_url: String,

    status: FgStatus,
    serial: String,
    interfaces: Vec<FgInterface>,
    arp_table: Vec<FgArpEntry>,
}

#[derive(Debug, Deserialize)]
struct FgMonitor<T> {
    #[serde(default)]
    results: T,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct FgStatus {
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    model_name: String,
    #[serde(default)]
    model_number: String,
}

#[derive(Debug, Deserialize)]
struct FgStatusEnvelope {
    #[serde(default)]
    version: String,
    #[serde(default)]
    serial: String,
    #[serde(default)]
    results: FgStatus,
}

#[derive(Debug, Clone, Deserialize)]
struct FgInterface {
    name: String,
    /// `"10.0.0.1 255.255.255.0"`, or `"0.0.0.0 0.0.0.0"` when unset.
    #[serde(default)]
    ip: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    vlanid: u16,
    /// Parent interface for VLAN subinterfaces.
    #[serde(default, rename = "interface")]
    parent: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    alias: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FgArpEntry {
    #[serde(default)]
    ip: String,
    #[serde(default)]
    interface: String,
}

impl FortigateSource {
    pub fn new(ctx: SourceContext) -> Result<Self, SourceError> {
        // The validator enforces this too; adapters stay safe standalone.
        if ctx.config.api_token.is_empty() {
            return Err(SourceError::Config(format!(
                "source {} needs an apiToken",
                ctx.config.name
            )));
        }
        let http = ctx.http_client()?;
        let base_url = ctx.config.base_url();
        Ok(Self {
            ctx,
            http,
            base_url,
            status: FgStatus::default(),
            serial: String::new(),
            interfaces: Vec::new(),
            arp_table: Vec::new(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.ctx.config.api_token),
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
        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("decoding {url}: {e}")))
    }

    /// Split FortiOS's `"address netmask"` form into CIDR notation.
    fn cidr_of(ip_field: &str) -> Option<String> {
        let (address, netmask) = ip_field.split_once(' ')?;
        if address == "0.0.0.0" {
            return None;
        }
        let bits = mask_to_bits(netmask.trim()).ok()?;
        Some(format!("{address}/{bits}"))
    }
}

#[async_trait]
impl Source for FortigateSource {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    async fn init(&mut self) -> Result<(), SourceError> {
        let FgStatusEnvelope {
            version,
            serial,
            mut results,
        } = self.fetch("/api/v2/monitor/system/status").await?;
        if results.hostname.is_empty() {
            results.hostname = self.ctx.config.hostname.clone();
        }
        self.status = results;
        self.serial = serial;
        debug!(%version, "fortigate status fetched");

        let interfaces: FgMonitor<Vec<FgInterface>> =
            self.fetch("/api/v2/cmdb/system/interface").await?;
        self.interfaces = interfaces.results;

        if self.ctx.config.collect_arp_data {
            let arp: FgMonitor<Vec<FgArpEntry>> =
                self.fetch("/api/v2/monitor/network/arp").await?;
            self.arp_table = arp.results;
        }

        info!(
            source = self.ctx.name(),
            hostname = %self.status.hostname,
            interfaces = self.interfaces.len(),
            arp_entries = self.arp_table.len(),
            "fortigate snapshot fetched"
        );
        Ok(())
    }

    async fn sync(&self, nbi: &Arc<NetboxInventory>) -> Result<(), SourceError> {
        let device = self.sync_device(nbi).await?;
        self.sync_interfaces(nbi, &device).await?;
        if self.ctx.config.collect_arp_data {
            self.sync_arp_table(nbi).await;
        }
        Ok(())
    }
}

impl FortigateSource {
    async fn sync_device(&self, nbi: &Arc<NetboxInventory>) -> Result<Arc<Device>, SourceError> {
        let manufacturer = nbi
            .add_manufacturer(Manufacturer {
                name: "Fortinet".into(),
                slug: "fortinet".into(),
                ..Default::default()
            })
            .await?;
        let model = if self.status.model_number.is_empty() {
            "FortiGate".to_string()
        } else {
            format!("{} {}", self.status.model_name, self.status.model_number)
        };
        let device_type = nbi
            .add_device_type(DeviceType {
                manufacturer: Some(manufacturer),
                model,
                slug: String::new(),
                ..Default::default()
            })
            .await?;
        let role = match match_name_to_role(
            nbi,
            &self.status.hostname,
            &self.ctx.relations.host_role,
            false,
        )
        .await?
        {
            Some(role) => role,
            None => {
                nbi.add_device_role(DeviceRole {
                    name: "Firewall".into(),
                    slug: "firewall".into(),
                    color: "f44336".into(),
                    vm_role: false,
                    ..Default::default()
                })
                .await?
            }
        };
        let site = match match_host_to_site(
            nbi,
            &self.status.hostname,
            &self.ctx.relations.host_site,
        )
        .await?
        {
            Some(site) => site,
            None => nbi.default_site(),
        };
        let tenant =
            match_name_to_tenant(nbi, &self.status.hostname, &self.ctx.relations.host_tenant)
                .await?;

        let mut base = NetboxObject::default();
        self.ctx.stamp(&mut base, &self.serial);
        let serial_number = if self.ctx.config.ignore_serial_numbers {
            String::new()
        } else {
            self.serial.clone()
        };
        let device = nbi
            .add_device(Device {
                base,
                name: self.status.hostname.clone(),
                device_role: Some(role),
                device_type: Some(device_type),
                site: Some(site),
                status: Some(DeviceStatus::Active),
                serial_number,
                tenant,
                ..Default::default()
            })
            .await?;
        Ok(device)
    }

    async fn sync_interfaces(
        &self,
        nbi: &Arc<NetboxInventory>,
        device: &Arc<Device>,
    ) -> Result<(), SourceError> {
        let mut primary = None;
        for fg_iface in &self.interfaces {
            if !self.ctx.interface_permitted(&fg_iface.name) {
                debug!(iface = %fg_iface.name, "skipped by interface filter");
                continue;
            }

            let (iface_type, untagged) = if fg_iface.vlanid > 0 {
                let group = match_vlan_to_group(
                    nbi,
                    &fg_iface.name,
                    &self.ctx.relations.vlan_group,
                    &self.ctx.relations.vlan_group_site,
                )
                .await?;
                let tenant =
                    match_name_to_tenant(nbi, &fg_iface.name, &self.ctx.relations.vlan_tenant)
                        .await?;
                let site =
                    match_vlan_to_site(nbi, &fg_iface.name, &self.ctx.relations.vlan_site)
                        .await?;
                let mut vlan_base = NetboxObject::default();
                self.ctx.stamp(&mut vlan_base, "");
                let vlan = nbi
                    .add_vlan(Vlan {
                        base: vlan_base,
                        name: fg_iface.name.clone(),
                        vid: fg_iface.vlanid,
                        group: Some(group),
                        status: Some(VlanStatus::Active),
                        tenant,
                        site,
                        ..Default::default()
                    })
                    .await?;
                (InterfaceType::VIRTUAL, Some(vlan))
            } else {
                (
                    match fg_iface.kind.as_str() {
                        "aggregate" => InterfaceType::LAG,
                        "tunnel" | "loopback" => InterfaceType::VIRTUAL,
                        _ => InterfaceType::GE1_FIXED,
                    },
                    None,
                )
            };

            let parent = if fg_iface.parent.is_empty() {
                None
            } else {
                nbi.get_interface(device.base.id, &fg_iface.parent).await
            };

            let mut base = NetboxObject {
                description: fg_iface.alias.clone(),
                ..Default::default()
            };
            self.ctx.stamp(&mut base, &fg_iface.name);
            let mode = untagged.is_some().then_some(InterfaceMode::Access);
            let interface = nbi
                .add_interface(Interface {
                    base,
                    device: Some(device.clone()),
                    name: fg_iface.name.clone(),
                    enabled: Some(fg_iface.status != "down"),
                    r#type: Some(iface_type),
                    parent,
                    mode,
                    untagged_vlan: untagged,
                    ..Default::default()
                })
                .await?;

            let Some(cidr) = Self::cidr_of(&fg_iface.ip) else {
                continue;
            };
            if !self.ctx.ip_permitted(&cidr) {
                continue;
            }
            let dns_name = reverse_lookup(&cidr).await;
            let mut ip_base = NetboxObject::default();
            self.ctx.stamp(&mut ip_base, &fg_iface.name);
            let ip = nbi
                .add_ip_address(IPAddress {
                    base: ip_base,
                    address: cidr.clone(),
                    status: Some(IPAddressStatus::Active),
                    dns_name,
                    assigned_object_type: Some(content_types::DCIM_INTERFACE.to_string()),
                    assigned_object_id: Some(interface.base.id),
                    ..Default::default()
                })
                .await?;
            if primary.is_none() {
                primary = Some(ip);
            }

            if let Ok((prefix, _)) = prefix_and_mask(&cidr) {
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
        }

        if let Some(primary_ip) = primary {
            // The address cycle breaks in two phases: device first, then
            // the primary_ip backpatch once the address exists.
            let mut patched = (**device).clone();
            patched.primary_ip4 = Some(primary_ip);
            nbi.add_device(patched).await?;
        }
        Ok(())
    }

    /// Addresses learned from the ARP table are unassigned but kept for
    /// IPAM completeness; failures here only cost single entries.
    async fn sync_arp_table(&self, nbi: &Arc<NetboxInventory>) {
        for entry in &self.arp_table {
            if entry.ip.is_empty() || !self.ctx.ip_permitted(&entry.ip) {
                continue;
            }
            let mut base = NetboxObject {
                description: format!("ARP entry on {}", entry.interface),
                ..Default::default()
            };
            self.ctx.stamp(&mut base, "");
            let result = nbi
                .add_ip_address(IPAddress {
                    base,
                    address: format!("{}/32", entry.ip),
                    status: Some(IPAddressStatus::Dhcp),
                    ..Default::default()
                })
                .await;
            if let Err(e) = result {
                warn!(source = self.ctx.name(), ip = %entry.ip, error = %e, "arp entry sync failed");
            }
        }
    }
}
