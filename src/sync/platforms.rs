use std::collections::BTreeMap;

use super::{apply, TaskContext, TaskPlan};
use crate::error::SyncError;
use crate::models::{DevicePlatform, EntityKind};
use crate::netbox::types::{DevicePlatformPatch, NameRef, PlatformCreate};
use crate::reconcile::{reconcile, EntityPolicy, Existing};
use crate::utils::platform_slug;

/// Platform catalog: one NetBox platform per software version. Versions are
/// only ever added.
pub(crate) fn catalog_policy() -> EntityPolicy<String, (), (), PlatformCreate> {
    let body = |version: &String| PlatformCreate {
        name: version.clone(),
        slug: platform_slug(version),
    };
    EntityPolicy::new(
        EntityKind::Platform,
        move |version: &String, _: &()| body(version),
        move |version: &String, _: &(), _: &[&'static str]| body(version),
    )
    .keep_extras()
}

/// Platform assignment of a device. A pending `upgrade` holds the recorded
/// platform back; once the device runs the recorded version the upgrade
/// marker is cleared.
pub(crate) fn assignment_policy() -> EntityPolicy<String, DevicePlatform, DevicePlatform, DevicePlatformPatch> {
    EntityPolicy::new(
        EntityKind::Device,
        |_: &String, want: &DevicePlatform| DevicePlatformPatch {
            platform: want.platform.clone().map(NameRef::new),
            ..Default::default()
        },
        |_: &String, want: &DevicePlatform, fields: &[&'static str]| {
            let mut patch = DevicePlatformPatch::default();
            if fields.contains(&"platform") {
                patch.platform = want.platform.clone().map(NameRef::new);
            }
            if fields.contains(&"upgrade") {
                patch
                    .custom_fields
                    .insert("upgrade".to_string(), serde_json::Value::Null);
            }
            patch
        },
    )
    .track("platform", |want: &DevicePlatform, have: &DevicePlatform| {
        want.platform != have.platform && have.upgrade.is_none()
    })
    .track("upgrade", |want: &DevicePlatform, have: &DevicePlatform| {
        want.platform == have.platform && have.upgrade.is_some()
    })
    .keep_extras()
}

pub(crate) async fn plan(ctx: &TaskContext<'_>) -> Result<TaskPlan, SyncError> {
    let version = ctx.device.version(ctx.target).await?;
    let catalog = ctx.netbox.platforms().await?;
    let current = ctx.netbox.device_platform(ctx.target.id).await?;

    let mut changes = apply::plan(
        EntityKind::Platform,
        reconcile(&BTreeMap::from([(version.clone(), ())]), &catalog, &catalog_policy()),
    )?;

    let name = ctx.target.name.clone();
    let desired = BTreeMap::from([(
        name.clone(),
        DevicePlatform {
            platform: Some(version),
            upgrade: None,
        },
    )]);
    let actual = BTreeMap::from([(name, Existing::new(ctx.target.id, current))]);
    changes.extend(apply::plan(
        EntityKind::Device,
        reconcile(&desired, &actual, &assignment_policy()),
    )?);

    Ok(TaskPlan::ready(changes))
}
