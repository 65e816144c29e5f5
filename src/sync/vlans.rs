use std::collections::BTreeMap;

use super::{apply, TaskContext, TaskPlan};
use crate::error::SyncError;
use crate::models::{EntityKind, VlanRecord};
use crate::netbox::types::{NameRef, VlanCreate, VlanPatch, WriteBody};
use crate::reconcile::{reconcile, EntityPolicy};

type VlanBody = WriteBody<VlanCreate, VlanPatch>;

/// VLANs of one device family at a site. NetBox keeps them apart by storing
/// the family (`qfx` / `mx`) as the VLAN description.
pub(crate) fn policy(site: &str, scope: &str) -> EntityPolicy<u16, String, VlanRecord, VlanBody> {
    let site = site.to_ascii_uppercase();
    let scope = scope.to_string();
    EntityPolicy::new(
        EntityKind::Vlan,
        move |vid: &u16, name: &String| {
            WriteBody::Create(VlanCreate {
                site: NameRef::new(site.clone()),
                vid: *vid,
                name: name.clone(),
                description: scope.clone(),
            })
        },
        |_: &u16, name: &String, _: &[&'static str]| WriteBody::Patch(VlanPatch { name: name.clone() }),
    )
    .track("name", |name: &String, record: &VlanRecord| *name != record.name)
}

pub(crate) async fn plan(ctx: &TaskContext<'_>) -> Result<TaskPlan, SyncError> {
    let scope = ctx.target.family().as_str();
    let desired: BTreeMap<u16, String> = ctx.device.vlans(ctx.target).await?;
    let actual = ctx.netbox.vlans(ctx.site(), scope).await?;

    let deltas = reconcile(&desired, &actual, &policy(ctx.site(), scope));
    Ok(TaskPlan::ready(apply::plan(EntityKind::Vlan, deltas)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Delta, Existing};

    #[test]
    fn test_create_payload() {
        let desired = BTreeMap::from([(100u16, "VLAN-A".to_string())]);
        let deltas = reconcile(&desired, &BTreeMap::new(), &policy("ch3", "qfx"));
        let changes = apply::plan(EntityKind::Vlan, deltas).unwrap();
        assert_eq!(
            changes[0].payload,
            serde_json::json!({"site": {"name": "CH3"}, "vid": 100, "name": "VLAN-A", "description": "qfx"})
        );
    }

    #[test]
    fn test_rename_patches_name_only() {
        let desired = BTreeMap::from([(100u16, "VLAN-B".to_string())]);
        let actual = BTreeMap::from([(
            100u16,
            Existing::new(5, VlanRecord { name: "VLAN-A".to_string() }),
        )]);
        let deltas = reconcile(&desired, &actual, &policy("ch3", "mx"));
        assert_eq!(
            deltas,
            vec![Delta::Update {
                key: 100,
                id: 5,
                fields: vec!["name"],
                payload: WriteBody::Patch(VlanPatch { name: "VLAN-B".to_string() }),
            }]
        );
    }
}
