use std::collections::BTreeMap;

use super::{apply, TaskContext, TaskPlan};
use crate::classify::FamilyRules;
use crate::error::SyncError;
use crate::models::{interface_type, EntityKind, Family, InterfaceAttrs};
use crate::netbox::types::{tag_refs, InterfaceCreate, InterfacePatch, WriteBody};
use crate::reconcile::{reconcile, EntityPolicy, Existing, UpdateMode};

type InterfaceBody = WriteBody<InterfaceCreate, InterfacePatch>;

/// NetBox interface kept on MX routers whatever the device reports
const MX_MANAGEMENT_INTERFACE: &str = "MGMT";

pub(crate) fn policy(
    rules: &'static FamilyRules,
    device_id: i64,
    mode: UpdateMode,
) -> EntityPolicy<String, InterfaceAttrs, InterfaceAttrs, InterfaceBody> {
    let policy = EntityPolicy::new(
        EntityKind::Interface,
        move |name: &String, attrs: &InterfaceAttrs| {
            WriteBody::Create(InterfaceCreate {
                device: device_id,
                name: name.clone(),
                iface_type: rules.netbox_type(name).unwrap_or(interface_type::SFP).to_string(),
                description: attrs.description.clone(),
                tags: tag_refs(&attrs.tags()),
            })
        },
        |_: &String, attrs: &InterfaceAttrs, fields: &[&'static str]| {
            let mut patch = InterfacePatch::default();
            if fields.contains(&"tags") {
                patch.tags = Some(tag_refs(&attrs.tags()));
            }
            if fields.contains(&"description") {
                patch.description = Some(attrs.description.clone());
            }
            WriteBody::Patch(patch)
        },
    )
    // speed and media tags are written together
    .track("tags", |want: &InterfaceAttrs, have: &InterfaceAttrs| {
        want.speed != have.speed || want.media != have.media
    })
    .track("description", |want: &InterfaceAttrs, have: &InterfaceAttrs| {
        want.description != have.description
    })
    .update_mode(mode);

    if rules.family == Family::Mx {
        policy.exempt(MX_MANAGEMENT_INTERFACE.to_string())
    } else {
        policy
    }
}

/// Drop NetBox interfaces the device has but the sync does not manage, so
/// they are neither patched nor deleted.
pub(crate) fn managed_only(
    actual: BTreeMap<String, Existing<InterfaceAttrs>>,
    device_ports: &[String],
    rules: &FamilyRules,
) -> BTreeMap<String, Existing<InterfaceAttrs>> {
    actual
        .into_iter()
        .filter(|(name, _)| !device_ports.contains(name) || rules.netbox_type(name).is_some())
        .collect()
}

pub(crate) async fn plan(ctx: &TaskContext<'_>) -> Result<TaskPlan, SyncError> {
    let rules = FamilyRules::for_family(ctx.target.family());
    let inventory = ctx.device.interfaces(ctx.target).await?;
    let actual = ctx.netbox.interfaces(ctx.target.id).await?;

    let (desired, skipped) = rules.classify_ports(&inventory);
    let ports: Vec<String> = inventory.ports.iter().map(|p| p.name.clone()).collect();
    let actual = managed_only(actual, &ports, rules);

    let policy = policy(rules, ctx.target.id, ctx.options.update_mode(UpdateMode::FirstDivergence));
    let deltas = reconcile(&desired, &actual, &policy);

    Ok(TaskPlan::Ready {
        changes: apply::plan(EntityKind::Interface, deltas)?,
        skipped: skipped.iter().map(ToString::to_string).collect(),
    })
}
