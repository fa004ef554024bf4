//! Configuration file parsing and validation.
//!
//! Numbers and enums are parsed permissively (plain integers and
//! strings) so validation can report precise, stable messages instead of
//! serde's. Defaults are applied only after the raw input validated.

use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use nbsync_core::constants::{
    DEFAULT_API_TIMEOUT_SECS, DEFAULT_REMOVE_ORPHANS_AFTER_DAYS, DEFAULT_SSOT_TAG_COLOR,
    DEFAULT_SSOT_TAG_NAME,
};
use nbsync_core::relations::{string_pairs, RelationMap};
use nbsync_core::net::verify_subnet;
use nbsync_netbox::inventory::InventoryConfig;
use nbsync_source::{SourceConfig, SourceKind};

/// A configuration error; displays exactly the validation message.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError(message.into())
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub netbox: NetboxConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoggerConfig {
    /// 0 = debug, 1 = info, 2 = warning, 3 = error.
    #[serde(default = "default_log_level")]
    pub level: i64,
    /// Log file path; empty logs to stderr.
    #[serde(default)]
    pub dest: String,
}

fn default_log_level() -> i64 {
    1
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dest: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetboxConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub port: i64,
    #[serde(default)]
    pub http_scheme: String,
    #[serde(default)]
    pub validate_cert: bool,
    /// API timeout in seconds; defaults when absent.
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub ca_file: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub tag_color: String,
    #[serde(default)]
    pub remove_orphans: bool,
    #[serde(default)]
    pub remove_orphans_after_days: Option<i64>,
    #[serde(default)]
    pub source_priority: Vec<String>,
}

impl NetboxConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.http_scheme, self.hostname, self.port)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout
            .map(|t| t as u64)
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS)
    }

    pub fn orphan_window_days(&self) -> u32 {
        self.remove_orphans_after_days
            .map(|d| d as u32)
            .unwrap_or(DEFAULT_REMOVE_ORPHANS_AFTER_DAYS)
    }

    pub fn inventory_config(&self) -> InventoryConfig {
        InventoryConfig {
            source_priority: self.source_priority.clone(),
            ssot_tag_name: self.tag.clone(),
            ssot_tag_color: self.tag_color.clone(),
            remove_orphans_after_days: self.orphan_window_days(),
        }
    }
}

/// Load, validate and default-fill the configuration file.
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            invalid(format!("open {}: no such file or directory", path.display()))
        }
        _ => invalid(format!("open {}: {e}", path.display())),
    })?;
    let mut config: Config =
        serde_yaml::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

    validate_logger(&config.logger)?;
    validate_netbox(&config.netbox, &config.sources)?;
    validate_sources(&config.sources)?;

    apply_defaults(&mut config);
    Ok(config)
}

fn validate_logger(logger: &LoggerConfig) -> Result<(), ConfigError> {
    if !(0..=3).contains(&logger.level) {
        return Err(invalid("logger.level: must be between 0 and 3"));
    }
    Ok(())
}

fn validate_netbox(netbox: &NetboxConfig, sources: &[SourceConfig]) -> Result<(), ConfigError> {
    if netbox.api_token.is_empty() {
        return Err(invalid("netbox.apiToken: cannot be empty"));
    }
    if netbox.hostname.is_empty() {
        return Err(invalid("netbox.hostname: cannot be empty"));
    }
    if !(0..=65535).contains(&netbox.port) {
        return Err(invalid(format!(
            "netbox.port: must be between 0 and 65535. Is {}",
            netbox.port
        )));
    }
    if !netbox.http_scheme.is_empty() && netbox.http_scheme != "http" && netbox.http_scheme != "https"
    {
        return Err(invalid(format!(
            "netbox.httpScheme: must be either http or https. Is {}",
            netbox.http_scheme
        )));
    }
    if matches!(netbox.timeout, Some(t) if t < 0) {
        return Err(invalid("netbox.timeout: cannot be negative"));
    }
    if !netbox.ca_file.is_empty() && !Path::new(&netbox.ca_file).exists() {
        return Err(invalid(format!(
            "netbox.caFile: open {}: no such file or directory",
            netbox.ca_file
        )));
    }
    if !netbox.tag_color.is_empty() {
        validate_tag_color("netbox.tagColor", &netbox.tag_color)?;
    }
    if netbox.remove_orphans && netbox.remove_orphans_after_days.is_some() {
        return Err(invalid(
            "netbox.removeOrphansAfterDays has no effect when netbox.removeOrphans is set to true",
        ));
    }
    if matches!(netbox.remove_orphans_after_days, Some(d) if d <= 0) {
        return Err(invalid(
            "netbox.RemoveOrphansAfterDays: must be positive integer",
        ));
    }
    if !netbox.source_priority.is_empty() {
        if netbox.source_priority.len() != sources.len() {
            return Err(invalid(
                "netbox.sourcePriority: len(config.Netbox.SourcePriority) != len(config.Sources)",
            ));
        }
        for name in &netbox.source_priority {
            if !sources.iter().any(|s| &s.name == name) {
                return Err(invalid(format!(
                    "netbox.sourcePriority: source[{name}] doesn't exist in the sources array"
                )));
            }
        }
    }
    Ok(())
}

fn validate_tag_color(field: &str, color: &str) -> Result<(), ConfigError> {
    if color.len() != 6 {
        return Err(invalid(format!(
            "{field}: must be a string of 6 hexadecimal characters"
        )));
    }
    if !color
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(invalid(format!(
            "{field}: must be a string of 6 lowercase hexadecimal characters"
        )));
    }
    Ok(())
}

fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    for source in sources {
        let name = &source.name;
        if name.is_empty() {
            return Err(invalid("source[].name: cannot be empty"));
        }
        let kind: SourceKind = source
            .source_type
            .parse()
            .map_err(|_| invalid(format!("source[{name}].type is not valid")))?;
        if source.hostname.is_empty() {
            return Err(invalid(format!("source[{name}].hostname: cannot be empty")));
        }
        if !(0..=65535).contains(&source.port) {
            return Err(invalid(format!(
                "source[{name}].port: must be between 0 and 65535. Is {}",
                source.port
            )));
        }
        if !source.http_scheme.is_empty()
            && source.http_scheme != "http"
            && source.http_scheme != "https"
        {
            return Err(invalid(format!(
                "source[{name}].httpScheme: must be either http or https. Is {}",
                source.http_scheme
            )));
        }
        if kind == SourceKind::Fortigate {
            if source.api_token.is_empty() {
                return Err(invalid(format!(
                    "source[{name}].apiToken is required for fortigate"
                )));
            }
        } else {
            if source.username.is_empty() {
                return Err(invalid(format!("source[{name}].username: cannot be empty")));
            }
            if source.password.is_empty() {
                return Err(invalid(format!("source[{name}].password: cannot be empty")));
            }
        }
        if !source.ca_file.is_empty() && !Path::new(&source.ca_file).exists() {
            return Err(invalid(format!(
                "source[{name}].caFile: open {}: no such file or directory",
                source.ca_file
            )));
        }
        if !source.tag_color.is_empty() {
            validate_tag_color(&format!("source[{name}].tagColor"), &source.tag_color)?;
        }
        for (field, subnets) in [
            ("permittedSubnets", &source.permitted_subnets),
            ("ignoredSubnets", &source.ignored_subnets),
        ] {
            for subnet in subnets {
                if !verify_subnet(subnet) {
                    return Err(invalid(format!(
                        "source[{name}].{field}: wrong format: {subnet}"
                    )));
                }
            }
        }
        if !source.interface_filter.is_empty() {
            if let Err(e) = Regex::new(&source.interface_filter) {
                return Err(invalid(format!(
                    "source[{name}].interfaceFilter: wrong format: {e}"
                )));
            }
        }
        for (field, relations) in [
            ("hostSiteRelations", &source.host_site_relations),
            ("clusterSiteRelations", &source.cluster_site_relations),
            ("clusterTenantRelations", &source.cluster_tenant_relations),
            ("hostTenantRelations", &source.host_tenant_relations),
            ("vmTenantRelations", &source.vm_tenant_relations),
            ("hostRoleRelations", &source.host_role_relations),
            ("vmRoleRelations", &source.vm_role_relations),
            ("vlanGroupRelations", &source.vlan_group_relations),
            ("vlanTenantRelations", &source.vlan_tenant_relations),
            ("vlanSiteRelations", &source.vlan_site_relations),
            ("vlanGroupSiteRelations", &source.vlan_group_site_relations),
            ("wlanTenantRelations", &source.wlan_tenant_relations),
            (
                "datacenterClusterGroupRelations",
                &source.datacenter_cluster_group_relations,
            ),
        ] {
            if let Err(e) = RelationMap::compile(relations) {
                return Err(invalid(format!("source[{name}].{field}: {e}")));
            }
        }
        if let Err(e) = string_pairs(&source.custom_field_mappings) {
            return Err(invalid(format!("source[{name}].customFieldMappings: {e}")));
        }
    }
    Ok(())
}

fn apply_defaults(config: &mut Config) {
    let netbox = &mut config.netbox;
    if netbox.http_scheme.is_empty() {
        netbox.http_scheme = "https".to_string();
    }
    if netbox.port == 0 {
        netbox.port = 443;
    }
    if netbox.tag.is_empty() {
        netbox.tag = DEFAULT_SSOT_TAG_NAME.to_string();
    }
    if netbox.tag_color.is_empty() {
        netbox.tag_color = DEFAULT_SSOT_TAG_COLOR.to_string();
    }
    for source in &mut config.sources {
        source.apply_defaults();
    }
}
