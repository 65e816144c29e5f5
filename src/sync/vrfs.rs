use std::collections::{BTreeMap, BTreeSet};

use super::{apply, TaskContext, TaskPlan};
use crate::error::SyncError;
use crate::models::{EntityKind, RoutingInstance, VrfDesired, VrfRecord};
use crate::netbox::types::{tag_refs, VrfCreate, VrfPatch, WriteBody};
use crate::reconcile::{reconcile, EntityPolicy, UpdateMode};

type VrfBody = WriteBody<VrfCreate, VrfPatch>;

/// Instances that are part of the platform rather than configured services
const INTERNAL_INSTANCE_MARKERS: &[&str] = &["__", "master", "junos"];

/// Route distinguisher the MX reports for instances without one
const NULL_RD: &str = "0:0";

/// Turn the device's routing instances into the VRFs NetBox should hold for
/// `site`. The internet instance exists at every site, so it is prefixed with
/// the site name; route distinguishers are prefixed with the site for the
/// same reason.
pub(crate) fn normalize_instances(
    site: &str,
    internet_instance: &str,
    instances: Vec<RoutingInstance>,
) -> BTreeMap<String, VrfDesired> {
    let mut vrfs = BTreeMap::new();

    for instance in instances {
        if INTERNAL_INSTANCE_MARKERS.iter().any(|m| instance.name.contains(m)) {
            continue;
        }

        let (name, rd) = if instance.rd.as_deref() == Some(NULL_RD) {
            (instance.name, None)
        } else {
            let rd = instance.rd.map(|rd| format!("{} {}", site, rd));
            if instance.name == internet_instance {
                (format!("{} {}", site.to_ascii_uppercase(), instance.name), rd)
            } else {
                (instance.name, rd)
            }
        };

        vrfs.insert(
            name,
            VrfDesired {
                instance_type: instance.instance_type,
                rd,
                interfaces: instance.interfaces,
                site: site.to_string(),
            },
        );
    }

    vrfs
}

fn same_interfaces(want: &[String], have: &[String]) -> bool {
    want.iter().collect::<BTreeSet<_>>() == have.iter().collect::<BTreeSet<_>>()
}

fn custom_fields(vrf: &VrfDesired, fields: &[&'static str]) -> BTreeMap<String, serde_json::Value> {
    let mut custom = BTreeMap::new();
    if fields.contains(&"type") {
        custom.insert("type".to_string(), serde_json::json!(vrf.instance_type));
    }
    if fields.contains(&"site") {
        custom.insert("Site".to_string(), serde_json::json!(vrf.site));
    }
    custom
}

pub(crate) fn policy(mode: UpdateMode) -> EntityPolicy<String, VrfDesired, VrfRecord, VrfBody> {
    EntityPolicy::new(
        EntityKind::Vrf,
        |name: &String, vrf: &VrfDesired| {
            WriteBody::Create(VrfCreate {
                name: name.clone(),
                rd: vrf.rd.clone(),
                tags: tag_refs(&vrf.interfaces),
                custom_fields: custom_fields(vrf, &["type", "site"]),
            })
        },
        |name: &String, vrf: &VrfDesired, fields: &[&'static str]| {
            WriteBody::Patch(VrfPatch {
                name: name.clone(),
                rd: fields.contains(&"rd").then(|| vrf.rd.clone()),
                tags: fields.contains(&"interfaces").then(|| tag_refs(&vrf.interfaces)),
                custom_fields: custom_fields(vrf, fields),
            })
        },
    )
    .track("rd", |want: &VrfDesired, have: &VrfRecord| want.rd != have.rd)
    .track("type", |want: &VrfDesired, have: &VrfRecord| want.instance_type != have.instance_type)
    .track("interfaces", |want: &VrfDesired, have: &VrfRecord| {
        !same_interfaces(&want.interfaces, &have.interfaces)
    })
    .track("site", |want: &VrfDesired, have: &VrfRecord| {
        have.site.as_deref() != Some(want.site.as_str())
    })
    .update_mode(mode)
}

pub(crate) async fn plan(ctx: &TaskContext<'_>) -> Result<TaskPlan, SyncError> {
    let instances = ctx.device.routing_instances(ctx.target).await?;
    let actual = ctx.netbox.vrfs(ctx.site()).await?;

    let desired = normalize_instances(ctx.site(), &ctx.options.internet_instance, instances);
    let deltas = reconcile(&desired, &actual, &policy(ctx.options.update_mode(UpdateMode::PerField)));
    Ok(TaskPlan::ready(apply::plan(EntityKind::Vrf, deltas)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Delta, Existing};

    fn instance(name: &str, instance_type: &str, rd: Option<&str>, interfaces: &[&str]) -> RoutingInstance {
        RoutingInstance {
            name: name.to_string(),
            instance_type: Some(instance_type.to_string()),
            rd: rd.map(str::to_string),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_normalize_instances() {
        let vrfs = normalize_instances(
            "am3",
            "RI-VRF-Internet-2",
            vec![
                instance("master", "forwarding", None, &[]),
                instance("__juniper_private1__", "forwarding", None, &[]),
                instance("junos-host", "forwarding", None, &[]),
                instance("RI-BBVA", "vpls", Some("0:0"), &["xe-2/0/1.3031"]),
                instance("RI-VRF-Internet-2", "vrf", Some("65000:2"), &["ae0.100"]),
                instance("RI-AZURE", "vrf", Some("65000:7"), &[]),
                instance("RI-L2", "virtual-switch", None, &[]),
            ],
        );

        assert_eq!(
            vrfs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["AM3 RI-VRF-Internet-2", "RI-AZURE", "RI-BBVA", "RI-L2"]
        );
        assert_eq!(vrfs["RI-BBVA"].rd, None);
        assert_eq!(vrfs["AM3 RI-VRF-Internet-2"].rd.as_deref(), Some("am3 65000:2"));
        assert_eq!(vrfs["RI-AZURE"].rd.as_deref(), Some("am3 65000:7"));
        assert_eq!(vrfs["RI-L2"].rd, None);
        assert_eq!(vrfs["RI-BBVA"].site, "am3");
    }

    #[test]
    fn test_internet_instance_without_rd_keeps_none() {
        let vrfs = normalize_instances("ch3", "RI-VRF-Internet-2", vec![instance("RI-VRF-Internet-2", "vrf", None, &[])]);
        assert_eq!(vrfs["CH3 RI-VRF-Internet-2"].rd, None);
    }

    fn desired() -> VrfDesired {
        VrfDesired {
            instance_type: Some("vrf".to_string()),
            rd: Some("am3 65000:7".to_string()),
            interfaces: vec!["ae0.3031".to_string(), "xe-2/0/1.3031".to_string()],
            site: "am3".to_string(),
        }
    }

    #[test]
    fn test_interface_order_is_not_a_change() {
        let want = BTreeMap::from([("RI-AZURE".to_string(), desired())]);
        let have = BTreeMap::from([(
            "RI-AZURE".to_string(),
            Existing::new(
                4,
                VrfRecord {
                    instance_type: Some("vrf".to_string()),
                    rd: Some("am3 65000:7".to_string()),
                    interfaces: vec!["xe-2/0/1.3031".to_string(), "ae0.3031".to_string()],
                    site: Some("am3".to_string()),
                },
            ),
        )]);
        assert!(reconcile(&want, &have, &policy(UpdateMode::Combined)).is_empty());
    }

    #[test]
    fn test_per_field_updates() {
        let want = BTreeMap::from([("RI-AZURE".to_string(), desired())]);
        let have = BTreeMap::from([(
            "RI-AZURE".to_string(),
            Existing::new(
                4,
                VrfRecord {
                    instance_type: Some("vrf".to_string()),
                    rd: None,
                    interfaces: vec!["ae0.3031".to_string(), "xe-2/0/1.3031".to_string()],
                    site: None,
                },
            ),
        )]);

        let deltas = reconcile(&want, &have, &policy(UpdateMode::PerField));
        let changes = apply::plan(EntityKind::Vrf, deltas).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].payload, serde_json::json!({"name": "RI-AZURE", "rd": "am3 65000:7"}));
        assert_eq!(
            changes[1].payload,
            serde_json::json!({"name": "RI-AZURE", "custom_fields": {"Site": "am3"}})
        );

        let combined = reconcile(&want, &have, &policy(UpdateMode::Combined));
        assert!(matches!(&combined[..], [Delta::Update { fields, .. }] if fields == &vec!["rd", "site"]));
    }

    #[test]
    fn test_create_payload() {
        let want = BTreeMap::from([("RI-AZURE".to_string(), desired())]);
        let changes = apply::plan(
            EntityKind::Vrf,
            reconcile(&want, &BTreeMap::new(), &policy(UpdateMode::Combined)),
        )
        .unwrap();
        assert_eq!(
            changes[0].payload,
            serde_json::json!({
                "name": "RI-AZURE",
                "rd": "am3 65000:7",
                "tags": [{"name": "ae0.3031"}, {"name": "xe-2/0/1.3031"}],
                "custom_fields": {"type": "vrf", "Site": "am3"}
            })
        );
    }
}
