//! The unified inventory schema.
//!
//! Every entity family embeds [`NetboxObject`] (the common envelope) and
//! implements [`NetboxEntity`]. The wire projection is hand-written per
//! family in `to_wire()`: a JSON map keyed by the API's field names, with
//! foreign keys reduced to `{"id": n}` (or `null`) and many-to-many lists
//! reduced to id-sorted `[{"id": n}]`. The same map drives both the diff
//! engine and, after [`lower_for_create`](crate::diff::lower_for_create),
//! POST bodies.

pub mod dcim;
pub mod extras;
pub mod ipam;
pub mod tenancy;
pub mod virtualization;
pub mod wireless;

pub use dcim::{
    Device, DeviceAirflow, DeviceRole, DeviceStatus, DeviceType, Interface, InterfaceDuplex,
    InterfaceMode, InterfaceType, Manufacturer, Platform, Site, SiteStatus, VdcStatus,
    VirtualDeviceContext,
};
pub use extras::{CustomField, CustomFieldType, FilterLogic, Tag, UiVisibility};
pub use ipam::{
    IPAddress, IPAddressRole, IPAddressStatus, Prefix, PrefixStatus, Vlan, VlanGroup, VlanStatus,
};
pub use tenancy::{
    AssignmentPriority, Contact, ContactAssignment, ContactGroup, ContactRole, Tenant, TenantGroup,
};
pub use virtualization::{Cluster, ClusterGroup, ClusterStatus, ClusterType, Vm, VmInterface, VmStatus};
pub use wireless::{WirelessLan, WirelessLanGroup, WirelessLanStatus};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

/// NetBox object id. Zero means "not yet persisted".
pub type Id = i64;

/// JSON object used for wire maps and patches.
pub type JsonMap = Map<String, Value>;

/// Content type discriminators for polymorphic references.
pub mod content_types {
    pub const DCIM_SITE: &str = "dcim.site";
    pub const DCIM_DEVICE: &str = "dcim.device";
    pub const DCIM_DEVICE_ROLE: &str = "dcim.devicerole";
    pub const DCIM_INTERFACE: &str = "dcim.interface";
    pub const VIRT_CLUSTER: &str = "virtualization.cluster";
    pub const VIRT_VM: &str = "virtualization.virtualmachine";
    pub const VIRT_VM_INTERFACE: &str = "virtualization.vminterface";
}

/// The common envelope embedded in every entity family.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetboxObject {
    #[serde(default)]
    pub id: Id,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<Arc<Tag>>,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub custom_fields: JsonMap,
}

impl NetboxObject {
    /// Whether a tag with this id is present.
    pub fn has_tag(&self, tag_id: Id) -> bool {
        self.tags.iter().any(|t| t.base.id == tag_id)
    }

    /// Add a tag if an equal id is not already present.
    pub fn add_tag(&mut self, tag: Arc<Tag>) {
        if !self.has_tag(tag.base.id) {
            self.tags.push(tag);
        }
    }

    /// Drop every tag with the given id.
    pub fn remove_tag(&mut self, tag_id: Id) {
        self.tags.retain(|t| t.base.id != tag_id);
    }

    /// String custom field value, if present and non-null.
    pub fn custom_str(&self, name: &str) -> Option<&str> {
        self.custom_fields.get(name).and_then(Value::as_str)
    }

    pub fn set_custom(&mut self, name: &str, value: Value) {
        self.custom_fields.insert(name.to_string(), value);
    }

    /// Project the envelope into a wire map. Tags are always emitted
    /// (id-sorted reference form); description and custom fields only when
    /// non-empty, so an absent value never clobbers a stored one.
    pub fn wire_into(&self, map: &mut JsonMap) {
        map.insert("tags".into(), tags_wire(&self.tags));
        if !self.description.is_empty() {
            map.insert("description".into(), json!(self.description));
        }
        if !self.custom_fields.is_empty() {
            map.insert("custom_fields".into(), Value::Object(self.custom_fields.clone()));
        }
    }
}

/// Reduce a tag list to ascending `[{"id": n}]`.
pub fn tags_wire(tags: &[Arc<Tag>]) -> Value {
    let mut ids: Vec<Id> = tags.iter().map(|t| t.base.id).collect();
    ids.sort_unstable();
    ids.dedup();
    Value::Array(ids.into_iter().map(|id| json!({ "id": id })).collect())
}

/// Wire form of a foreign-key slot: `{"id": n}` or `null`. An explicit
/// `null` in the desired map clears the stored reference.
pub fn fk_wire<E: NetboxEntity>(slot: &Option<Arc<E>>) -> Value {
    match slot {
        Some(entity) => json!({ "id": entity.id() }),
        None => Value::Null,
    }
}

/// Wire form of a many-to-many slot: ascending `[{"id": n}]`.
pub fn fk_list_wire<E: NetboxEntity>(slots: &[Arc<E>]) -> Value {
    let mut ids: Vec<Id> = slots.iter().map(|e| e.id()).collect();
    ids.sort_unstable();
    ids.dedup();
    Value::Array(ids.into_iter().map(|id| json!({ "id": id })).collect())
}

/// Contract every entity family implements.
pub trait NetboxEntity:
    Clone + std::fmt::Debug + DeserializeOwned + Send + Sync + 'static
{
    /// URL prefix of the family's list endpoint, e.g. `/api/dcim/devices/`.
    const API_PATH: &'static str;
    /// Content-type discriminator, e.g. `dcim.device`.
    const OBJECT_TYPE: &'static str;

    fn base(&self) -> &NetboxObject;
    fn base_mut(&mut self) -> &mut NetboxObject;

    /// Wire projection used by the diff engine and (lowered) create bodies.
    fn to_wire(&self) -> JsonMap;

    fn id(&self) -> Id {
        self.base().id
    }
}

/// Deserialize `null` as the type's default. NetBox omits or nulls most
/// optional fields depending on the endpoint and brief/full form.
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v).map_err(serde::de::Error::custom),
    }
}

/// Deserialize a decimal field that the API may serialize as either a
/// number or a string (DRF decimal fields do the latter). The value is
/// only taken when it parses.
pub fn float_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal {s:?}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid decimal value {other}"
        ))),
    }
}

/// Deserialize a choice field from either its bare value string or the
/// `{"value", "label"}` object form the read API uses.
pub fn choice_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let inner = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(map)) => map
            .get("value")
            .cloned()
            .ok_or_else(|| serde::de::Error::custom("choice object without a value field"))?,
        Some(other) => other,
    };
    if inner.is_null() {
        return Ok(None);
    }
    serde_json::from_value(inner)
        .map(Some)
        .map_err(serde::de::Error::custom)
}
