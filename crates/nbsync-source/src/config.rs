//! Per-source configuration as it appears in the YAML file.
//!
//! Fields are parsed permissively (ports as plain integers, the type as a
//! string) so the validator can produce precise messages instead of serde
//! ones; `apply_defaults` fills in everything the file may omit.

use serde::Deserialize;

use crate::{SourceError, SourceKind};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub http_scheme: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub port: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub validate_cert: bool,
    #[serde(default)]
    pub ca_file: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub tag_color: String,
    #[serde(default)]
    pub permitted_subnets: Vec<String>,
    #[serde(default)]
    pub ignored_subnets: Vec<String>,
    #[serde(default)]
    pub interface_filter: String,
    #[serde(default)]
    pub collect_arp_data: bool,
    #[serde(default)]
    pub ignore_serial_numbers: bool,
    /// Cap on concurrent per-entity workers within this source.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    #[serde(default)]
    pub host_site_relations: Vec<String>,
    #[serde(default)]
    pub cluster_site_relations: Vec<String>,
    #[serde(default)]
    pub cluster_tenant_relations: Vec<String>,
    #[serde(default)]
    pub host_tenant_relations: Vec<String>,
    #[serde(default)]
    pub vm_tenant_relations: Vec<String>,
    #[serde(default)]
    pub host_role_relations: Vec<String>,
    #[serde(default)]
    pub vm_role_relations: Vec<String>,
    #[serde(default)]
    pub vlan_group_relations: Vec<String>,
    #[serde(default)]
    pub vlan_tenant_relations: Vec<String>,
    #[serde(default)]
    pub vlan_site_relations: Vec<String>,
    #[serde(default)]
    pub vlan_group_site_relations: Vec<String>,
    #[serde(default)]
    pub wlan_tenant_relations: Vec<String>,
    #[serde(default)]
    pub datacenter_cluster_group_relations: Vec<String>,
    #[serde(default)]
    pub custom_field_mappings: Vec<String>,
}

impl SourceConfig {
    /// The validated source kind; the validator guarantees this succeeds
    /// for configs that passed parsing.
    pub fn kind(&self) -> Result<SourceKind, SourceError> {
        self.source_type
            .parse()
            .map_err(|_| SourceError::Config(format!("unknown source type {}", self.source_type)))
    }

    /// Fill in the defaults the YAML may omit. Called by the parser
    /// after basic validation so error messages refer to the raw input.
    pub fn apply_defaults(&mut self) {
        if self.http_scheme.is_empty() {
            self.http_scheme = "https".to_string();
        }
        if self.port == 0 {
            self.port = 443;
        }
        if self.tag.is_empty() {
            self.tag = format!("Source: {}", self.name);
        }
        if self.tag_color.is_empty() {
            if let Ok(kind) = self.kind() {
                self.tag_color = kind.tag_color().to_string();
            }
        }
    }

    /// Base URL of the source API.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.http_scheme, self.hostname, self.port)
    }
}
