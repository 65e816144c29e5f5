//! RPC bodies and decoders for Junos JSON replies.
//!
//! Junos renders every element as an array of objects and every leaf as
//! `[{"data": "..."}]`, so a path like
//! `interface-information[0].physical-interface[*].name[0].data`.

use ipnet::Ipv4Net;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::{RawPort, RoutingInstance, Transceiver, VersionFormat};

pub const GET_VLANS: &str = r#"<get-vlan-information format="json"/>"#;
pub const GET_INTERFACES: &str = r#"<get-interface-information format="json"/>"#;
pub const GET_CHASSIS_INVENTORY: &str = r#"<get-chassis-inventory format="json"/>"#;
pub const GET_INSTANCES: &str = r#"<get-instance-information format="json"><detail/></get-instance-information>"#;
pub const GET_SOFTWARE: &str = r#"<get-software-information format="json"/>"#;

/// Routes at or below `destination` in `table`
pub fn get_routes(table: &str, destination: &Ipv4Net) -> String {
    format!(
        r#"<get-route-information format="json"><table>{}</table><destination>{}</destination><orlonger/></get-route-information>"#,
        table, destination
    )
}

/// Child elements named `key`
pub fn nodes<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .into_iter()
        .flatten()
}

pub fn first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    nodes(value, key).next()
}

/// Text of the leaf `key`, trimmed; empty text counts as absent
pub fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    first(value, key)
        .and_then(|leaf| leaf.get("data"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// VLAN tag -> name from `get-vlan-information`, ELS or legacy layout
pub fn parse_vlans(reply: &Value) -> BTreeMap<u16, String> {
    let mut vlans = BTreeMap::new();
    let Some(info) = first(reply, "vlan-information") else {
        return vlans;
    };

    let els = nodes(info, "l2ng-l2ald-vlan-instance-group")
        .map(|v| (text(v, "l2ng-l2rtb-vlan-tag"), text(v, "l2ng-l2rtb-vlan-name")));
    let legacy = nodes(info, "vlan").map(|v| (text(v, "vlan-tag"), text(v, "vlan-name")));

    for (tag, name) in els.chain(legacy) {
        let (Some(tag), Some(name)) = (tag, name) else {
            continue;
        };
        // the default VLAN reports tag "NA" and is not tracked
        if let Ok(tag) = tag.parse::<u16>() {
            vlans.insert(tag, name.to_string());
        }
    }
    vlans
}

/// Physical ports from `get-interface-information`
pub fn parse_physical_ports(reply: &Value) -> Vec<RawPort> {
    first(reply, "interface-information")
        .map(|info| {
            nodes(info, "physical-interface")
                .filter_map(|phy| {
                    Some(RawPort {
                        name: text(phy, "name")?.to_string(),
                        description: text(phy, "description").map(str::to_string),
                        speed: text(phy, "speed").map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Logical unit name -> description from `get-interface-information`
pub fn parse_logical_interfaces(reply: &Value) -> BTreeMap<String, Option<String>> {
    let mut units = BTreeMap::new();
    let Some(info) = first(reply, "interface-information") else {
        return units;
    };
    for phy in nodes(info, "physical-interface") {
        for unit in nodes(phy, "logical-interface") {
            if let Some(name) = text(unit, "name") {
                units.insert(name.to_string(), text(unit, "description").map(str::to_string));
            }
        }
    }
    units
}

/// VLANs an MX carries as logical units: unit number = VLAN tag, unit
/// description = VLAN name.
pub fn subinterface_vlans(units: &BTreeMap<String, Option<String>>) -> BTreeMap<u16, String> {
    let mut vlans = BTreeMap::new();
    for (name, description) in units {
        let Some((physical, unit)) = name.split_once('.') else {
            continue;
        };
        if !["xe", "ge", "ae", "ms"].iter().any(|p| physical.contains(p)) {
            continue;
        }
        let Ok(unit) = unit.parse::<u16>() else {
            continue;
        };
        if 1 < unit && unit < 4095 {
            vlans.insert(unit, description.clone().unwrap_or_else(|| "None".to_string()));
        }
    }
    vlans
}

/// Optics from `get-chassis-inventory`: FPC -> PIC -> Xcvr
pub fn parse_transceivers(reply: &Value) -> Vec<Transceiver> {
    let mut optics = Vec::new();
    let chassis = first(reply, "chassis-inventory").and_then(|inv| first(inv, "chassis"));
    let Some(chassis) = chassis else {
        return optics;
    };

    for fpc in nodes(chassis, "chassis-module") {
        let Some(fpc_name) = text(fpc, "name").filter(|n| n.starts_with("FPC")) else {
            continue;
        };
        for pic in nodes(fpc, "chassis-sub-module") {
            let Some(pic_name) = text(pic, "name").filter(|n| n.starts_with("PIC")) else {
                continue;
            };
            for xcvr in nodes(pic, "chassis-sub-sub-module") {
                let Some(xcvr_name) = text(xcvr, "name").filter(|n| n.starts_with("Xcvr")) else {
                    continue;
                };
                optics.push(Transceiver {
                    fpc: fpc_name.to_string(),
                    pic: pic_name.to_string(),
                    xcvr: xcvr_name.to_string(),
                    description: text(xcvr, "description").map(str::to_string),
                });
            }
        }
    }
    optics
}

/// Routing instances from `get-instance-information detail`
pub fn parse_instances(reply: &Value) -> Vec<RoutingInstance> {
    first(reply, "instance-information")
        .map(|info| {
            nodes(info, "instance-core")
                .filter_map(|core| {
                    Some(RoutingInstance {
                        name: text(core, "instance-name")?.to_string(),
                        instance_type: text(core, "instance-type").map(str::to_string),
                        rd: text(core, "instance-rd").map(str::to_string),
                        interfaces: nodes(core, "instance-interface")
                            .filter_map(|i| text(i, "interface-name"))
                            .map(str::to_string)
                            .collect(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Public routes: prefixes inside `public_space` whose active next hop is a
/// bare outgoing interface (no gateway, no local interface) known among the
/// logical `units`. The value is that unit's description.
pub fn parse_public_routes(
    reply: &Value,
    public_space: &Ipv4Net,
    units: &BTreeMap<String, Option<String>>,
) -> BTreeMap<String, Option<String>> {
    let mut routes = BTreeMap::new();
    let Some(info) = first(reply, "route-information") else {
        return routes;
    };

    for table in nodes(info, "route-table") {
        for rt in nodes(table, "rt") {
            let Some(destination) = text(rt, "rt-destination") else {
                continue;
            };
            let in_space = destination
                .parse::<Ipv4Net>()
                .is_ok_and(|net| public_space.contains(&net));
            if !in_space {
                continue;
            }

            let entry = nodes(rt, "rt-entry")
                .find(|e| text(e, "active-tag") == Some("*"))
                .or_else(|| first(rt, "rt-entry"));
            let Some(entry) = entry else {
                continue;
            };
            let via = nodes(entry, "nh")
                .filter(|nh| text(nh, "to").is_none() && text(nh, "nh-local-interface").is_none())
                .find_map(|nh| text(nh, "via"));
            if let Some(description) = via.and_then(|unit| units.get(unit)) {
                routes.insert(destination.to_string(), description.clone());
            }
        }
    }
    routes
}

/// Software version from `get-software-information`
pub fn parse_version(reply: &Value, format: VersionFormat) -> Option<String> {
    let info = first(reply, "software-information")
        .or_else(|| {
            first(reply, "multi-routing-engine-results")
                .and_then(|r| first(r, "multi-routing-engine-item"))
                .and_then(|item| first(item, "software-information"))
        })?;

    match format {
        VersionFormat::JunosVersion => text(info, "junos-version").map(str::to_string),
        VersionFormat::PackageComment => nodes(info, "package-information")
            .filter_map(|pkg| text(pkg, "comment"))
            .find_map(bracketed)
            .map(str::to_string),
    }
}

/// Text between the first '[' and the following ']'
pub fn bracketed(s: &str) -> Option<&str> {
    let start = s.find('[')? + 1;
    let end = s[start..].find(']')? + start;
    Some(s[start..end].trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(s: &str) -> Value {
        json!([{ "data": s }])
    }

    #[test]
    fn test_parse_vlans_els() {
        let reply = json!({
            "vlan-information": [{
                "l2ng-l2ald-vlan-instance-group": [
                    {"l2ng-l2rtb-vlan-name": leaf("BLAKE_DEMO_3047"), "l2ng-l2rtb-vlan-tag": leaf("3047")},
                    {"l2ng-l2rtb-vlan-name": leaf("default"), "l2ng-l2rtb-vlan-tag": leaf("NA")}
                ]
            }]
        });
        assert_eq!(parse_vlans(&reply), BTreeMap::from([(3047, "BLAKE_DEMO_3047".to_string())]));
    }

    #[test]
    fn test_parse_vlans_legacy() {
        let reply = json!({
            "vlan-information": [{
                "vlan": [{"vlan-name": leaf("mgmt"), "vlan-tag": leaf("10")}]
            }]
        });
        assert_eq!(parse_vlans(&reply), BTreeMap::from([(10, "mgmt".to_string())]));
    }

    fn interfaces_reply() -> Value {
        json!({
            "interface-information": [{
                "physical-interface": [
                    {
                        "name": leaf("xe-2/0/1"),
                        "description": leaf("CORE UPLINK"),
                        "speed": leaf("10Gbps"),
                        "logical-interface": [
                            {"name": leaf("xe-2/0/1.2001"), "description": leaf("SVC: THOUSANDEYES AWS IPV4")},
                            {"name": leaf("xe-2/0/1.0")},
                            {"name": leaf("xe-2/0/1.3030")}
                        ]
                    },
                    {
                        "name": leaf("ge-1/0/0"),
                        "speed": leaf("1000mbps"),
                        "logical-interface": [{"name": leaf("ge-1/0/0.4095")}]
                    },
                    {
                        "name": leaf("lo0"),
                        "logical-interface": [{"name": leaf("lo0.100"), "description": leaf("loop")}]
                    }
                ]
            }]
        })
    }

    #[test]
    fn test_parse_physical_ports() {
        let ports = parse_physical_ports(&interfaces_reply());
        assert_eq!(ports.len(), 3);
        assert_eq!(
            ports[0],
            RawPort {
                name: "xe-2/0/1".to_string(),
                description: Some("CORE UPLINK".to_string()),
                speed: Some("10Gbps".to_string()),
            }
        );
        assert_eq!(ports[2].speed, None);
    }

    #[test]
    fn test_subinterface_vlans() {
        let units = parse_logical_interfaces(&interfaces_reply());
        assert_eq!(units.len(), 5);
        assert_eq!(
            subinterface_vlans(&units),
            BTreeMap::from([
                (2001, "SVC: THOUSANDEYES AWS IPV4".to_string()),
                (3030, "None".to_string()),
            ])
        );
    }

    #[test]
    fn test_parse_transceivers() {
        let reply = json!({
            "chassis-inventory": [{
                "chassis": [{
                    "name": leaf("Chassis"),
                    "chassis-module": [
                        {"name": leaf("Routing Engine 0")},
                        {
                            "name": leaf("FPC 0"),
                            "chassis-sub-module": [{
                                "name": leaf("PIC 1"),
                                "chassis-sub-sub-module": [
                                    {"name": leaf("Xcvr 0"), "description": leaf("SFP-SX")},
                                    {"name": leaf("Xcvr 1")}
                                ]
                            }]
                        }
                    ]
                }]
            }]
        });
        assert_eq!(
            parse_transceivers(&reply),
            vec![
                Transceiver {
                    fpc: "FPC 0".to_string(),
                    pic: "PIC 1".to_string(),
                    xcvr: "Xcvr 0".to_string(),
                    description: Some("SFP-SX".to_string()),
                },
                Transceiver {
                    fpc: "FPC 0".to_string(),
                    pic: "PIC 1".to_string(),
                    xcvr: "Xcvr 1".to_string(),
                    description: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_instances() {
        let reply = json!({
            "instance-information": [{
                "instance-core": [{
                    "instance-name": leaf("RI-BBVA"),
                    "instance-type": leaf("vpls"),
                    "instance-rd": leaf("0:0"),
                    "instance-interface": [
                        {"interface-name": leaf("xe-2/0/1.3031")},
                        {"interface-name": leaf("ae0.3031")}
                    ]
                }, {
                    "instance-name": leaf("master"),
                    "instance-type": leaf("forwarding")
                }]
            }]
        });
        let instances = parse_instances(&reply);
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].rd.as_deref(), Some("0:0"));
        assert_eq!(instances[0].interfaces, vec!["xe-2/0/1.3031", "ae0.3031"]);
        assert!(instances[1].interfaces.is_empty());
    }

    #[test]
    fn test_parse_public_routes() {
        let space: Ipv4Net = "64.191.201.0/24".parse().unwrap();
        let units = BTreeMap::from([
            ("xe-2/0/1.2001".to_string(), Some("SVC: THOUSANDEYES AWS IPV4".to_string())),
            ("xe-2/0/1.2002".to_string(), None),
        ]);
        let reply = json!({
            "route-information": [{
                "route-table": [{
                    "table-name": leaf("RI-VRF-Internet-2.inet.0"),
                    "rt": [
                        {"rt-destination": leaf("64.191.201.2/31"),
                         "rt-entry": [{"active-tag": leaf("*"), "nh": [{"via": leaf("xe-2/0/1.2001")}]}]},
                        {"rt-destination": leaf("64.191.201.4/30"),
                         "rt-entry": [{"active-tag": leaf("*"), "nh": [{"via": leaf("xe-2/0/1.2002")}]}]},
                        {"rt-destination": leaf("64.191.201.8/29"),
                         "rt-entry": [{"active-tag": leaf("*"), "nh": [{"to": leaf("64.191.201.3"), "via": leaf("xe-2/0/1.2001")}]}]},
                        {"rt-destination": leaf("64.191.201.2/32"),
                         "rt-entry": [{"active-tag": leaf("*"), "nh": [{"nh-local-interface": leaf("xe-2/0/1.2001")}]}]},
                        {"rt-destination": leaf("10.0.0.0/24"),
                         "rt-entry": [{"active-tag": leaf("*"), "nh": [{"via": leaf("xe-2/0/1.2001")}]}]}
                    ]
                }]
            }]
        });

        assert_eq!(
            parse_public_routes(&reply, &space, &units),
            BTreeMap::from([
                ("64.191.201.2/31".to_string(), Some("SVC: THOUSANDEYES AWS IPV4".to_string())),
                ("64.191.201.4/30".to_string(), None),
            ])
        );
    }

    #[test]
    fn test_parse_version() {
        let modern = json!({"software-information": [{"junos-version": leaf("17.3R3.10")}]});
        assert_eq!(parse_version(&modern, VersionFormat::JunosVersion).as_deref(), Some("17.3R3.10"));

        let ex2200 = json!({
            "software-information": [{
                "package-information": [
                    {"name": leaf("junos"), "comment": leaf("JUNOS EX  Software Suite [12.3R12.4]")}
                ]
            }]
        });
        assert_eq!(parse_version(&ex2200, VersionFormat::PackageComment).as_deref(), Some("12.3R12.4"));
        assert_eq!(parse_version(&ex2200, VersionFormat::JunosVersion), None);

        let virtual_chassis = json!({
            "multi-routing-engine-results": [{
                "multi-routing-engine-item": [{
                    "software-information": [{"junos-version": leaf("18.4R2.7")}]
                }]
            }]
        });
        assert_eq!(parse_version(&virtual_chassis, VersionFormat::JunosVersion).as_deref(), Some("18.4R2.7"));
    }

    #[test]
    fn test_bracketed() {
        assert_eq!(bracketed("JUNOS Base OS boot [12.3R12.4]"), Some("12.3R12.4"));
        assert_eq!(bracketed("no brackets"), None);
        assert_eq!(bracketed("empty []"), None);
    }
}
