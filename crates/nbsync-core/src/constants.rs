//! Shared constants: reserved custom fields, default object names, colors.

/// Name of the tag applied to every object nbsync manages.
pub const DEFAULT_SSOT_TAG_NAME: &str = "netbox-ssot";
/// Color of the managed-by tag, six lowercase hex characters.
pub const DEFAULT_SSOT_TAG_COLOR: &str = "07426b";

/// Tag applied to managed objects that disappeared from every source.
pub const ORPHAN_TAG_NAME: &str = "netbox-ssot-orphan";
pub const ORPHAN_TAG_COLOR: &str = "ff5722";

/// Site used when no host/cluster site relation matches.
pub const DEFAULT_SITE_NAME: &str = "Default";
/// VLAN group used when no vlan group relation matches.
pub const DEFAULT_VLAN_GROUP_NAME: &str = "Default";
/// Contact role used for owner/admin contacts harvested from sources.
pub const ADMIN_CONTACT_ROLE_NAME: &str = "Admin";

/// Smallest and largest 802.1Q VID, bounds of the default VLAN group range.
pub const DEFAULT_VID: u16 = 1;
pub const MAX_VID: u16 = 4094;

/// Reserved custom field names maintained on every managed object.
pub const CF_SOURCE_NAME: &str = "source_name";
pub const CF_SOURCE_ID: &str = "source_id";
pub const CF_LAST_SEEN: &str = "last_seen";
pub const CF_ORPHANED_SINCE: &str = "orphaned_since";

/// Hard limit NetBox places on description fields; longer text moves to
/// comments with this sentinel left behind.
pub const MAX_DESCRIPTION_LEN: usize = 200;
pub const SEE_COMMENTS: &str = "See comments";

/// Default API timeout in seconds when the config does not set one.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default number of days an orphan keeps its tag before hard deletion.
pub const DEFAULT_REMOVE_ORPHANS_AFTER_DAYS: u32 = 30;

/// Default cap on concurrent per-entity workers inside one source.
pub const DEFAULT_SOURCE_CONCURRENCY: usize = 50;
