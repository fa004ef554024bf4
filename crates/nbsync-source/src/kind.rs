//! The closed set of supported source kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Ovirt,
    Vmware,
    Dnac,
    Proxmox,
    Paloalto,
    Fortigate,
    Fmc,
    Iosxe,
}

impl SourceKind {
    pub fn all() -> &'static [SourceKind] {
        &[
            SourceKind::Ovirt,
            SourceKind::Vmware,
            SourceKind::Dnac,
            SourceKind::Proxmox,
            SourceKind::Paloalto,
            SourceKind::Fortigate,
            SourceKind::Fmc,
            SourceKind::Iosxe,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Ovirt => "ovirt",
            SourceKind::Vmware => "vmware",
            SourceKind::Dnac => "dnac",
            SourceKind::Proxmox => "proxmox",
            SourceKind::Paloalto => "paloalto",
            SourceKind::Fortigate => "fortigate",
            SourceKind::Fmc => "fmc",
            SourceKind::Iosxe => "iosxe",
        }
    }

    /// Default color of the per-type provenance tag.
    pub fn tag_color(&self) -> &'static str {
        match self {
            SourceKind::Ovirt => "aa1409",
            SourceKind::Vmware => "607d8b",
            SourceKind::Dnac => "2196f3",
            SourceKind::Proxmox => "e57000",
            SourceKind::Paloalto => "f04e23",
            SourceKind::Fortigate => "ee3124",
            SourceKind::Fmc => "2c5e9e",
            SourceKind::Iosxe => "1ba0d7",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ovirt" => Ok(SourceKind::Ovirt),
            "vmware" => Ok(SourceKind::Vmware),
            "dnac" => Ok(SourceKind::Dnac),
            "proxmox" => Ok(SourceKind::Proxmox),
            "paloalto" => Ok(SourceKind::Paloalto),
            "fortigate" => Ok(SourceKind::Fortigate),
            "fmc" => Ok(SourceKind::Fmc),
            "iosxe" => Ok(SourceKind::Iosxe),
            other => Err(other.to_string()),
        }
    }
}
