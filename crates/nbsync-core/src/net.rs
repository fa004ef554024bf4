//! IP address and subnet helpers shared by the inventory and the sources.

use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use ipnet::IpNet;
use thiserror::Error;

/// Timeout for DNS helper lookups, independent of the run's root deadline.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum NetError {
    #[error("invalid mask: {0}")]
    InvalidMask(String),
    #[error("invalid ip address: {0}")]
    InvalidAddress(String),
    #[error("invalid subnet: {0}")]
    InvalidSubnet(String),
}

/// Convert a dotted-quad IPv4 netmask to its prefix length,
/// e.g. `255.255.255.128` -> 25.
pub fn mask_to_bits(mask: &str) -> Result<u8, NetError> {
    let addr: std::net::Ipv4Addr = mask
        .parse()
        .map_err(|_| NetError::InvalidMask(mask.to_string()))?;
    let bits = u32::from(addr);
    // A valid mask is a run of ones followed by a run of zeros.
    if bits != 0 && (!bits).wrapping_add(1) & !bits != 0 {
        return Err(NetError::InvalidMask(mask.to_string()));
    }
    Ok(bits.count_ones() as u8)
}

/// IP protocol version of an address string (4 or 6).
pub fn ip_version(address: &str) -> Result<u8, NetError> {
    let bare = address.split('/').next().unwrap_or(address);
    match bare.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => Ok(4),
        Ok(IpAddr::V6(_)) => Ok(6),
        Err(_) => Err(NetError::InvalidAddress(address.to_string())),
    }
}

/// Strip an IPv6 zone index while keeping any prefix length:
/// `2001:db8::1%2/64` -> `2001:db8::1/64`.
pub fn remove_zone_index(address: &str) -> String {
    match address.split_once('%') {
        None => address.to_string(),
        Some((base, rest)) => match rest.split_once('/') {
            Some((_, mask)) => format!("{base}/{mask}"),
            None => base.to_string(),
        },
    }
}

/// Whether `subnet` (CIDR notation) contains `address`. The address may
/// carry a zone index or prefix length of its own; both are ignored.
/// Returns false on any parse failure.
pub fn subnet_contains_ip(address: &str, subnet: &str) -> bool {
    let cleaned = remove_zone_index(address);
    let bare = cleaned.split('/').next().unwrap_or(&cleaned);
    let Ok(ip) = bare.parse::<IpAddr>() else {
        return false;
    };
    let Ok(net) = subnet.parse::<IpNet>() else {
        return false;
    };
    net.contains(&ip)
}

/// Whether `subnet` parses as CIDR notation.
pub fn verify_subnet(subnet: &str) -> bool {
    subnet.parse::<IpNet>().is_ok()
}

/// Extract the network prefix and mask length from an interface address:
/// `192.168.1.1/24` -> (`192.168.1.0/24`, 24).
pub fn prefix_and_mask(address: &str) -> Result<(String, u8), NetError> {
    let cleaned = remove_zone_index(address);
    let net: IpNet = cleaned
        .parse()
        .map_err(|_| NetError::InvalidSubnet(address.to_string()))?;
    let prefix = net.trunc();
    Ok((prefix.to_string(), prefix.prefix_len()))
}

fn subnets_contain_ip(address: &str, subnets: &[String]) -> bool {
    subnets.iter().any(|s| subnet_contains_ip(address, s))
}

/// Source-level address filter: ignored subnets always win, an empty
/// permitted list allows everything else.
pub fn is_permitted_ip(address: &str, permitted: &[String], ignored: &[String]) -> bool {
    if subnets_contain_ip(address, ignored) {
        return false;
    }
    if permitted.is_empty() {
        return true;
    }
    subnets_contain_ip(address, permitted)
}

/// Reverse-resolve an IP address to its first PTR name, without the
/// trailing dot. Returns an empty string on any failure or timeout.
pub async fn reverse_lookup(address: &str) -> String {
    let bare = remove_zone_index(address);
    let bare = bare.split('/').next().unwrap_or(&bare);
    let Ok(ip) = bare.parse::<IpAddr>() else {
        return String::new();
    };
    let resolver =
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
    match tokio::time::timeout(LOOKUP_TIMEOUT, resolver.reverse_lookup(ip)).await {
        Ok(Ok(names)) => names
            .iter()
            .next()
            .map(|n| n.to_string().trim_end_matches('.').to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Forward-resolve a hostname to its first address. Empty string on failure.
pub async fn forward_lookup(hostname: &str) -> String {
    let resolver =
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
    match tokio::time::timeout(LOOKUP_TIMEOUT, resolver.lookup_ip(hostname)).await {
        Ok(Ok(ips)) => ips.iter().next().map(|ip| ip.to_string()).unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_to_bits_valid() {
        assert_eq!(mask_to_bits("255.255.255.128").unwrap(), 25);
        assert_eq!(mask_to_bits("255.255.255.0").unwrap(), 24);
        assert_eq!(mask_to_bits("255.255.0.0").unwrap(), 16);
        assert_eq!(mask_to_bits("0.0.0.0").unwrap(), 0);
    }

    #[test]
    fn mask_to_bits_invalid() {
        assert!(mask_to_bits("bogus").is_err());
        assert!(mask_to_bits("255.0.255.0").is_err());
    }

    #[test]
    fn subnet_contains() {
        assert!(subnet_contains_ip("172.31.4.129", "172.31.4.128/25"));
        assert!(!subnet_contains_ip("172.31.4.1", "10.0.0.0/8"));
        assert!(subnet_contains_ip("fd00::5", "fd00::/8"));
        assert!(!subnet_contains_ip("not-an-ip", "10.0.0.0/8"));
        assert!(!subnet_contains_ip("10.0.0.1", "garbage"));
    }

    #[test]
    fn zone_index_removal() {
        assert_eq!(remove_zone_index("2001:db8::1%2/64"), "2001:db8::1/64");
        assert_eq!(remove_zone_index("2001:db8::1%eth0"), "2001:db8::1");
        assert_eq!(remove_zone_index("192.168.1.1/24"), "192.168.1.1/24");
    }

    #[test]
    fn prefix_extraction() {
        let (prefix, mask) = prefix_and_mask("192.168.1.1/24").unwrap();
        assert_eq!(prefix, "192.168.1.0/24");
        assert_eq!(mask, 24);
        assert!(prefix_and_mask("192.168.1.1").is_err());
    }

    #[test]
    fn ip_versions() {
        assert_eq!(ip_version("10.0.0.1").unwrap(), 4);
        assert_eq!(ip_version("2001:db8::1/64").unwrap(), 6);
        assert!(ip_version("nope").is_err());
    }

    #[test]
    fn permitted_filter() {
        let permitted = vec!["10.0.0.0/8".to_string()];
        let ignored = vec!["10.5.0.0/16".to_string()];
        assert!(is_permitted_ip("10.1.2.3", &permitted, &ignored));
        assert!(!is_permitted_ip("10.5.1.1", &permitted, &ignored));
        assert!(!is_permitted_ip("192.168.1.1", &permitted, &ignored));
        assert!(is_permitted_ip("192.168.1.1", &[], &ignored));
    }
}
