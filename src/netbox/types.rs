use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// --- NetBox API types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// NetBox 2.x returns tags as plain names, later releases as objects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NbTag {
    Name(String),
    Object { name: String },
}

impl NbTag {
    pub fn name(&self) -> &str {
        match self {
            NbTag::Name(name) => name,
            NbTag::Object { name } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbDevice {
    pub id: i64,
    pub name: Option<String>,
    #[serde(default)]
    pub site: Option<NestedRef>,
    #[serde(default)]
    pub platform: Option<NestedRef>,
    #[serde(default)]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbVlan {
    pub id: i64,
    pub vid: u16,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbInterface {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<NbTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbPrefix {
    pub id: i64,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbIPAddress {
    pub id: i64,
    pub address: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbVrf {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub rd: Option<String>,
    #[serde(default)]
    pub tags: Vec<NbTag>,
    #[serde(default)]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NbPlatform {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

// --- Create / patch request types ---

/// Body of a NetBox write: the full object on create, a partial one on patch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WriteBody<C, U> {
    Create(C),
    Patch(U),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameRef {
    pub name: String,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Tags are written as `{"name": ...}` so the same payload works whatever
/// the tag's slug is.
pub fn tag_refs<S: AsRef<str>>(names: &[S]) -> Vec<NameRef> {
    names.iter().map(|n| NameRef::new(n.as_ref())).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlanCreate {
    pub site: NameRef,
    pub vid: u16,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlanPatch {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceCreate {
    pub device: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub iface_type: String,
    pub description: String,
    pub tags: Vec<NameRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterfacePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<NameRef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpAddressCreate {
    pub address: String,
    pub description: String,
    pub vrf: NameRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpAddressPatch {
    pub address: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VrfCreate {
    pub name: String,
    pub rd: Option<String>,
    pub tags: Vec<NameRef>,
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// `rd` is doubly optional: absent leaves it untouched, `Some(None)` clears it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VrfPatch {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rd: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<NameRef>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformCreate {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DevicePlatformPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<NameRef>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_accept_both_shapes() {
        let iface: NbInterface = serde_json::from_value(serde_json::json!({
            "id": 3207,
            "name": "ge-0/0/0",
            "description": "POC: LS5.SV5 0/1/1",
            "tags": ["SMF", {"id": 4, "name": "1Gbps", "slug": "1gbps"}]
        }))
        .unwrap();
        let names: Vec<&str> = iface.tags.iter().map(NbTag::name).collect();
        assert_eq!(names, vec!["SMF", "1Gbps"]);
    }

    #[test]
    fn test_vrf_patch_clears_rd() {
        let patch = VrfPatch {
            name: "RI-BBVA".to_string(),
            rd: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"name": "RI-BBVA", "rd": null})
        );
    }

    #[test]
    fn test_interface_patch_only_sends_set_fields() {
        let patch = InterfacePatch {
            description: Some("uplink".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"description": "uplink"})
        );
    }
}
