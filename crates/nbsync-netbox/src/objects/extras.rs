//! Extras: tags and custom field definitions.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{choice_opt, null_default, JsonMap, NetboxEntity, NetboxObject};

/// A NetBox tag. nbsync uses one tag to mark every object it manages, one
/// per source for provenance, and one to mark orphans.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Six lowercase hex characters.
    #[serde(default, deserialize_with = "null_default")]
    pub color: String,
}

impl NetboxEntity for Tag {
    const API_PATH: &'static str = "/api/extras/tags/";
    const OBJECT_TYPE: &'static str = "extras.tag";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        map.insert("name".into(), json!(self.name));
        map.insert("slug".into(), json!(self.slug));
        if !self.color.is_empty() {
            map.insert("color".into(), json!(self.color));
        }
        if !self.base.description.is_empty() {
            map.insert("description".into(), json!(self.base.description));
        }
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    Text,
    Longtext,
    Integer,
    Boolean,
    Date,
    Url,
    Json,
    Select,
    Multiselect,
}

impl CustomFieldType {
    pub fn as_value(&self) -> &'static str {
        match self {
            CustomFieldType::Text => "text",
            CustomFieldType::Longtext => "longtext",
            CustomFieldType::Integer => "integer",
            CustomFieldType::Boolean => "boolean",
            CustomFieldType::Date => "date",
            CustomFieldType::Url => "url",
            CustomFieldType::Json => "json",
            CustomFieldType::Select => "select",
            CustomFieldType::Multiselect => "multiselect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLogic {
    Disabled,
    Loose,
    Exact,
}

impl FilterLogic {
    pub fn as_value(&self) -> &'static str {
        match self {
            FilterLogic::Disabled => "disabled",
            FilterLogic::Loose => "loose",
            FilterLogic::Exact => "exact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiVisibility {
    #[serde(rename = "read-write")]
    ReadWrite,
    #[serde(rename = "read-only")]
    ReadOnly,
    #[serde(rename = "hidden")]
    Hidden,
}

impl UiVisibility {
    pub fn as_value(&self) -> &'static str {
        match self {
            UiVisibility::ReadWrite => "read-write",
            UiVisibility::ReadOnly => "read-only",
            UiVisibility::Hidden => "hidden",
        }
    }
}

/// A custom field definition. nbsync maintains its own reserved fields
/// (`source_name`, `source_id`, `last_seen`, `orphaned_since`) through this
/// family. Custom field definitions carry neither tags nor custom fields of
/// their own, so the wire map does not use the envelope projection.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomField {
    #[serde(flatten)]
    pub base: NetboxObject,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub label: String,
    #[serde(default, deserialize_with = "choice_opt")]
    pub r#type: Option<CustomFieldType>,
    /// Models this field may be attached to, e.g. `dcim.device`.
    #[serde(default, deserialize_with = "null_default")]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub search_weight: u32,
    #[serde(default, deserialize_with = "choice_opt")]
    pub filter_logic: Option<FilterLogic>,
    #[serde(default, deserialize_with = "choice_opt")]
    pub ui_visibility: Option<UiVisibility>,
    /// Display weight; wire name is plain `weight`.
    #[serde(default, rename = "weight")]
    pub display_weight: u32,
}

impl Default for CustomField {
    fn default() -> Self {
        Self {
            base: NetboxObject::default(),
            name: String::new(),
            label: String::new(),
            r#type: Some(CustomFieldType::Text),
            content_types: Vec::new(),
            search_weight: 1000,
            filter_logic: Some(FilterLogic::Loose),
            ui_visibility: Some(UiVisibility::ReadWrite),
            display_weight: 100,
        }
    }
}

impl NetboxEntity for CustomField {
    const API_PATH: &'static str = "/api/extras/custom-fields/";
    const OBJECT_TYPE: &'static str = "extras.customfield";

    fn base(&self) -> &NetboxObject {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NetboxObject {
        &mut self.base
    }

    fn to_wire(&self) -> JsonMap {
        let mut map = JsonMap::new();
        map.insert("name".into(), json!(self.name));
        if !self.label.is_empty() {
            map.insert("label".into(), json!(self.label));
        }
        if let Some(t) = self.r#type {
            map.insert("type".into(), json!(t.as_value()));
        }
        let mut content_types = self.content_types.clone();
        content_types.sort_unstable();
        map.insert("content_types".into(), json!(content_types));
        // Description is always present on custom field definitions, so an
        // empty value clears a stored one.
        map.insert("description".into(), json!(self.base.description));
        map.insert("search_weight".into(), json!(self.search_weight));
        if let Some(fl) = self.filter_logic {
            map.insert("filter_logic".into(), json!(fl.as_value()));
        }
        if let Some(ui) = self.ui_visibility {
            map.insert("ui_visibility".into(), json!(ui.as_value()));
        }
        map.insert("weight".into(), json!(self.display_weight));
        map
    }
}

impl CustomField {
    /// Definition of one of the reserved nbsync bookkeeping fields.
    pub fn reserved(
        name: &str,
        label: &str,
        r#type: CustomFieldType,
        content_types: Vec<String>,
        description: &str,
    ) -> Self {
        Self {
            base: NetboxObject {
                description: description.to_string(),
                ..Default::default()
            },
            name: name.to_string(),
            label: label.to_string(),
            r#type: Some(r#type),
            content_types,
            search_weight: 1000,
            filter_logic: Some(FilterLogic::Loose),
            ui_visibility: Some(UiVisibility::ReadWrite),
            display_weight: 100,
        }
    }
}
