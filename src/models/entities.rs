use serde::{Deserialize, Serialize};
use std::fmt;

use super::speed_tag;

/// NetBox object types the sync writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Vlan,
    Interface,
    IpAddress,
    Vrf,
    Platform,
    Device,
}

impl EntityKind {
    /// REST endpoint relative to `/api`
    pub fn endpoint(self) -> &'static str {
        match self {
            EntityKind::Vlan => "/ipam/vlans/",
            EntityKind::Interface => "/dcim/interfaces/",
            EntityKind::IpAddress => "/ipam/ip-addresses/",
            EntityKind::Vrf => "/ipam/vrfs/",
            EntityKind::Platform => "/dcim/platforms/",
            EntityKind::Device => "/dcim/devices/",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Vlan => "vlan",
            EntityKind::Interface => "interface",
            EntityKind::IpAddress => "ip-address",
            EntityKind::Vrf => "vrf",
            EntityKind::Platform => "platform",
            EntityKind::Device => "device",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse media classification stored as a NetBox interface tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "SMF")]
    Smf,
    #[serde(rename = "MMF")]
    Mmf,
    #[serde(rename = "copper")]
    Copper,
    #[serde(rename = "lag")]
    Lag,
    #[serde(rename = "No SFP")]
    NoSfp,
}

impl MediaType {
    pub fn tag(self) -> &'static str {
        match self {
            MediaType::Smf => "SMF",
            MediaType::Mmf => "MMF",
            MediaType::Copper => "copper",
            MediaType::Lag => "lag",
            MediaType::NoSfp => "No SFP",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SMF" => Some(MediaType::Smf),
            "MMF" => Some(MediaType::Mmf),
            "copper" => Some(MediaType::Copper),
            "lag" => Some(MediaType::Lag),
            "No SFP" => Some(MediaType::NoSfp),
            _ => None,
        }
    }
}

/// Interface attributes compared between the device and NetBox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAttrs {
    pub description: String,
    pub speed: Option<String>,
    pub media: Option<MediaType>,
}

impl InterfaceAttrs {
    /// Speed and media as NetBox tag names. A missing speed is written as
    /// the `None` tag so it reads back the same way.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![self
            .speed
            .clone()
            .unwrap_or_else(|| speed_tag::NONE.to_string())];
        if let Some(media) = self.media {
            tags.push(media.tag().to_string());
        }
        tags
    }

    /// Rebuild speed/media from a NetBox tag list, ignoring unrelated tags
    pub fn apply_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) {
        for tag in tags {
            if let Some(media) = MediaType::from_tag(tag) {
                self.media = Some(media);
            } else if tag == speed_tag::NONE {
                self.speed = None;
            } else if speed_tag::is_speed(tag) {
                self.speed = Some(tag.to_string());
            }
        }
    }
}

/// Physical port as reported by `get-interface-information`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPort {
    pub name: String,
    pub description: Option<String>,
    pub speed: Option<String>,
}

/// Pluggable optic from `get-chassis-inventory`, with the names of its
/// parent FPC and PIC ("FPC 0", "PIC 1", "Xcvr 3").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transceiver {
    pub fpc: String,
    pub pic: String,
    pub xcvr: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortInventory {
    pub ports: Vec<RawPort>,
    pub transceivers: Vec<Transceiver>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanRecord {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpRecord {
    pub description: String,
}

/// Routing instance as read from the device, before site normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingInstance {
    pub name: String,
    pub instance_type: Option<String>,
    pub rd: Option<String>,
    pub interfaces: Vec<String>,
}

/// Routing instance normalized for one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrfDesired {
    pub instance_type: Option<String>,
    pub rd: Option<String>,
    pub interfaces: Vec<String>,
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VrfRecord {
    pub instance_type: Option<String>,
    pub rd: Option<String>,
    pub interfaces: Vec<String>,
    pub site: Option<String>,
}

/// Platform assignment of one NetBox device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevicePlatform {
    pub platform: Option<String>,
    /// `upgrade` custom field; any non-null value marks a pending upgrade
    pub upgrade: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_tags_roundtrip_through_netbox_names() {
        let attrs = InterfaceAttrs {
            description: String::new(),
            speed: None,
            media: Some(MediaType::NoSfp),
        };
        assert_eq!(attrs.tags(), vec!["None", "No SFP"]);

        let mut read_back = InterfaceAttrs::default();
        read_back.apply_tags(attrs.tags().iter().map(String::as_str));
        assert_eq!(read_back, attrs);
    }

    #[test]
    fn test_apply_tags_ignores_unknown() {
        let mut attrs = InterfaceAttrs::default();
        attrs.apply_tags(["customer-facing", "10Gbps", "SMF"]);
        assert_eq!(attrs.speed.as_deref(), Some("10Gbps"));
        assert_eq!(attrs.media, Some(MediaType::Smf));
    }

    #[test]
    fn test_apply_tags_keeps_passthrough_speeds() {
        for speed in ["Auto", "80Gbps", "100Gbps", "25Gbps", "100 Mbps", "2.5Gbps", "Unspecified"] {
            let mut attrs = InterfaceAttrs::default();
            attrs.apply_tags([speed, "lag"]);
            assert_eq!(attrs.speed.as_deref(), Some(speed), "speed tag {}", speed);
            assert_eq!(attrs.media, Some(MediaType::Lag));
        }

        let mut attrs = InterfaceAttrs::default();
        attrs.apply_tags(["Gbps", "10 Gbps uplink"]);
        assert_eq!(attrs.speed, None);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(EntityKind::IpAddress.endpoint(), "/ipam/ip-addresses/");
        assert_eq!(EntityKind::Device.to_string(), "device");
    }
}
