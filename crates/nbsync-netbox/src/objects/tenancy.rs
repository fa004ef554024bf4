//! Tenancy: tenants, contacts and their groupings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{choice_opt, fk_wire, null_default, Id, JsonMap, NetboxEntity, NetboxObject};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantGroup {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl NetboxEntity for TenantGroup {
    const API_PATH: &'static str = "/api/tenancy/tenant-groups/";
    const OBJECT_TYPE: &'static str = "tenancy.tenantgroup";

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
        map
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tenant {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub group: Option<Arc<TenantGroup>>,
}

impl NetboxEntity for Tenant {
    const API_PATH: &'static str = "/api/tenancy/tenants/";
    const OBJECT_TYPE: &'static str = "tenancy.tenant";

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
        map.insert("group".into(), fk_wire(&self.group));
        map
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactGroup {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: Option<Arc<ContactGroup>>,
}

impl NetboxEntity for ContactGroup {
    const API_PATH: &'static str = "/api/tenancy/contact-groups/";
    const OBJECT_TYPE: &'static str = "tenancy.contactgroup";

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

/// Functional role for a contact assignment (admin, operations, ...).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRole {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl NetboxEntity for ContactRole {
    const API_PATH: &'static str = "/api/tenancy/contact-roles/";
    const OBJECT_TYPE: &'static str = "tenancy.contactrole";

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
        map
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contact {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_default")]
    pub comments: String,
}

impl NetboxEntity for Contact {
    const API_PATH: &'static str = "/api/tenancy/contacts/";
    const OBJECT_TYPE: &'static str = "tenancy.contact";

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
        for (key, value) in [
            ("title", &self.title),
            ("phone", &self.phone),
            ("email", &self.email),
            ("address", &self.address),
            ("link", &self.link),
            ("comments", &self.comments),
        ] {
            if !value.is_empty() {
                map.insert(key.into(), json!(value));
            }
        }
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPriority {
    Primary,
    Secondary,
    Tertiary,
    Inactive,
}

impl AssignmentPriority {
    pub fn as_value(&self) -> &'static str {
        match self {
            AssignmentPriority::Primary => "primary",
            AssignmentPriority::Secondary => "secondary",
            AssignmentPriority::Tertiary => "tertiary",
            AssignmentPriority::Inactive => "inactive",
        }
    }
}

/// Binds a contact, in a role, to an arbitrary object (device, VM, ...).
/// The target is polymorphic: a content type plus an object id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactAssignment {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub object_id: Id,
    #[serde(default)]
    pub contact: Option<Arc<Contact>>,
    #[serde(default)]
    pub role: Option<Arc<ContactRole>>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub priority: Option<AssignmentPriority>,
}

impl NetboxEntity for ContactAssignment {
    const API_PATH: &'static str = "/api/tenancy/contact-assignments/";
    const OBJECT_TYPE: &'static str = "tenancy.contactassignment";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        self.base.wire_into(&mut map);
        map.insert("object_type".into(), json!(self.object_type));
        map.insert("object_id".into(), json!(self.object_id));
        map.insert("contact".into(), fk_wire(&self.contact));
        map.insert("role".into(), fk_wire(&self.role));
        if let Some(priority) = self.priority {
            map.insert("priority".into(), json!(priority.as_value()));
        }
        map
    }
}
