//! Wireless: WLAN groups and wireless LANs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ipam::Vlan;
use super::{choice_opt, fk_wire, JsonMap, NetboxEntity, NetboxObject};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirelessLanGroup {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: Option<Arc<WirelessLanGroup>>,
}

impl NetboxEntity for WirelessLanGroup {
    const API_PATH: &'static str = "/api/wireless/wireless-lan-groups/";
    const OBJECT_TYPE: &'static str = "wireless.wirelesslangroup";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("name".into(), json!(self.name));
        map.insert("slug".into(), json!(self.slug));
        map.insert("parent".into(), fk_wire(&self.parent));
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WirelessLanStatus {
    Active,
    Reserved,
    Disabled,
    Deprecated,
}

impl WirelessLanStatus {
    pub fn as_value(&self) -> &'static str {
        match self {
            WirelessLanStatus::Active => "active",
            WirelessLanStatus::Reserved => "reserved",
            WirelessLanStatus::Disabled => "disabled",
            WirelessLanStatus::Deprecated => "deprecated",
        }
    }
}

/// A wireless LAN, keyed by its SSID.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirelessLan {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub group: Option<Arc<WirelessLanGroup>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub status: Option<WirelessLanStatus>,
    #[serde(default)]
    pub vlan: Option<Arc<Vlan>>,
}

impl NetboxEntity for WirelessLan {
    const API_PATH: &'static str = "/api/wireless/wireless-lans/";
    const OBJECT_TYPE: &'static str = "wireless.wirelesslan";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("ssid".into(), json!(self.ssid));
        map.insert("group".into(), fk_wire(&self.group));
        if let Some(status) = self.status {
            map.insert("status".into(), json!(status.as_value()));
        }
        map.insert("vlan".into(), fk_wire(&self.vlan));
        map
    }
}
