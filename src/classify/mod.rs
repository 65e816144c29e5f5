//! Maps raw Junos speed strings and optic part numbers to the speed and
//! media tags stored in NetBox. One rule table, parameterized per family.

use std::collections::BTreeMap;

use crate::error::SyncError;
use crate::models::{interface_type, speed_tag, Family, InterfaceAttrs, MediaType, PortInventory, Transceiver};

const SMF_OPTICS: &[&str] = &["SFP+-10G-LR", "SFP-LX10", "QSFP+-40G-LR4", "XFP-10G-LR"];
const MMF_OPTICS: &[&str] = &["SFP+-10G-SR", "SFP-SX"];

/// Classification rules for one device family
#[derive(Debug)]
pub struct FamilyRules {
    pub family: Family,
    /// Speed class reported for ports negotiating "Auto"
    auto_speed: Option<&'static str>,
    /// Normalized speeds that imply a copper port until an optic says otherwise
    copper_speeds: &'static [&'static str],
    /// Media assigned from the port name before optics are considered
    name_media: &'static [(&'static str, MediaType)],
    /// Media for ports matching none of `name_media`
    fallback_media: Option<MediaType>,
    /// Only optics in ports below this number are classified
    port_bound: Option<u32>,
    /// NetBox interface type by name fragment, first match wins. Ports
    /// matching none are not synchronized.
    netbox_types: &'static [(&'static str, &'static str)],
}

static RULES: [FamilyRules; 3] = [
    FamilyRules {
        family: Family::Mx,
        auto_speed: None,
        copper_speeds: &[],
        name_media: &[("ge", MediaType::Copper)],
        fallback_media: Some(MediaType::NoSfp),
        port_bound: None,
        netbox_types: &[
            ("xe", interface_type::SFP_PLUS),
            ("ge", interface_type::SFP),
            ("ae", interface_type::LAG),
        ],
    },
    FamilyRules {
        family: Family::Qfx,
        auto_speed: Some(speed_tag::GBPS_1),
        copper_speeds: &[],
        name_media: &[],
        fallback_media: None,
        port_bound: Some(48),
        netbox_types: &[
            ("em", interface_type::SFP),
            ("xe", interface_type::SFP_PLUS),
            ("ge", interface_type::SFP),
            ("ae", interface_type::LAG),
        ],
    },
    FamilyRules {
        family: Family::Ex,
        auto_speed: Some(speed_tag::GBPS_1),
        copper_speeds: &[speed_tag::GBPS_1, "100mbps"],
        name_media: &[],
        fallback_media: None,
        port_bound: Some(48),
        netbox_types: &[
            ("xe", interface_type::SFP_PLUS),
            ("ge", interface_type::SFP),
            ("ae", interface_type::LAG),
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub speed: Option<String>,
    pub media: Option<MediaType>,
}

/// Media type for an optic part number
pub fn media_for_optic(description: &str) -> MediaType {
    if SMF_OPTICS.contains(&description) {
        MediaType::Smf
    } else if MMF_OPTICS.contains(&description) {
        MediaType::Mmf
    } else {
        MediaType::Copper
    }
}

/// Overrides that win over everything else: LAGs first, then management ports
fn name_override(name: &str) -> Option<MediaType> {
    if name.contains("ae") {
        Some(MediaType::Lag)
    } else if name.contains("em") {
        Some(MediaType::Copper)
    } else {
        None
    }
}

impl FamilyRules {
    pub fn for_family(family: Family) -> &'static FamilyRules {
        match family {
            Family::Mx => &RULES[0],
            Family::Qfx => &RULES[1],
            Family::Ex => &RULES[2],
        }
    }

    pub fn speed_class(&self, raw_speed: Option<&str>) -> Option<String> {
        match raw_speed {
            None => None,
            Some("1000mbps") | Some("1000 Mbps") => Some(speed_tag::GBPS_1.to_string()),
            Some("Auto") if self.auto_speed.is_some() => self.auto_speed.map(str::to_string),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Classify one port. `optic` is the part number of the transceiver
    /// plugged into it, when one was matched.
    pub fn classify_interface(&self, raw_speed: Option<&str>, optic: Option<&str>, name: &str) -> Classification {
        let speed = self.speed_class(raw_speed);

        let mut media = match speed.as_deref() {
            Some(s) if self.copper_speeds.contains(&s) => Some(MediaType::Copper),
            _ => None,
        };
        if let Some((_, m)) = self.name_media.iter().find(|(frag, _)| name.contains(frag)) {
            media = Some(*m);
        } else if self.fallback_media.is_some() {
            media = self.fallback_media;
        }
        if let Some(description) = optic {
            media = Some(media_for_optic(description));
        }
        if let Some(m) = name_override(name) {
            media = Some(m);
        }

        Classification { speed, media }
    }

    pub fn netbox_type(&self, name: &str) -> Option<&'static str> {
        self.netbox_types
            .iter()
            .find(|(frag, _)| name.contains(frag))
            .map(|(_, t)| *t)
    }

    /// Port name an optic sits in, rebuilt from its FPC/PIC/Xcvr slots.
    /// Returns `Ok(None)` for optics outside the classified port range.
    pub fn optic_port(&self, optic: &Transceiver) -> Result<Option<String>, SyncError> {
        let record = format!("{}/{}/{}", optic.fpc, optic.pic, optic.xcvr);
        let description = optic
            .description
            .as_deref()
            .ok_or_else(|| SyncError::skipped(&record, "optic has no description"))?;
        let port: u32 = optic
            .xcvr
            .trim_start_matches("Xcvr ")
            .trim()
            .parse()
            .map_err(|_| SyncError::skipped(&record, "port number is not numeric"))?;
        if self.port_bound.is_some_and(|bound| port >= bound) {
            return Ok(None);
        }

        let prefix = if description.contains("10G") { "xe-" } else { "ge-" };
        let fpc = optic.fpc.trim_start_matches("FPC ").trim();
        let pic = optic.pic.trim_start_matches("PIC ").trim();
        Ok(Some(format!("{}{}/{}/{}", prefix, fpc, pic, port)))
    }

    /// Build the desired interface map from a device inventory. Optics that
    /// cannot be placed are returned as skipped records; optics whose rebuilt
    /// port name matches no port are dropped silently.
    pub fn classify_ports(&self, inventory: &PortInventory) -> (BTreeMap<String, InterfaceAttrs>, Vec<SyncError>) {
        let mut skipped = Vec::new();
        let mut optics: BTreeMap<String, &str> = BTreeMap::new();
        for optic in &inventory.transceivers {
            match self.optic_port(optic) {
                Ok(Some(port)) => {
                    if let Some(description) = optic.description.as_deref() {
                        optics.insert(port, description);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("{}", e);
                    skipped.push(e);
                }
            }
        }

        let mut desired = BTreeMap::new();
        for port in &inventory.ports {
            if self.netbox_type(&port.name).is_none() {
                continue;
            }
            let class = self.classify_interface(
                port.speed.as_deref(),
                optics.get(&port.name).copied(),
                &port.name,
            );
            desired.insert(
                port.name.clone(),
                InterfaceAttrs {
                    description: port.description.clone().unwrap_or_default(),
                    speed: class.speed,
                    media: class.media,
                },
            );
        }

        (desired, skipped)
    }
}
