use super::{apply, TaskContext, TaskPlan};
use crate::error::SyncError;
use crate::models::{EntityKind, IpRecord};
use crate::netbox::types::{IpAddressCreate, IpAddressPatch, NameRef, WriteBody};
use crate::reconcile::{reconcile, EntityPolicy};
use crate::utils::expand_public_prefixes;

type IpBody = WriteBody<IpAddressCreate, IpAddressPatch>;

/// Public addresses of a site, all created in the site's internet VRF
pub(crate) fn policy(site: &str, internet_instance: &str) -> EntityPolicy<String, Option<String>, IpRecord, IpBody> {
    let vrf = format!("{} {}", site.to_ascii_uppercase(), internet_instance);
    EntityPolicy::new(
        EntityKind::IpAddress,
        move |address: &String, description: &Option<String>| {
            WriteBody::Create(IpAddressCreate {
                address: address.clone(),
                description: description.clone().unwrap_or_default(),
                vrf: NameRef::new(vrf.clone()),
            })
        },
        |address: &String, description: &Option<String>, _: &[&'static str]| {
            WriteBody::Patch(IpAddressPatch {
                address: address.clone(),
                description: description.clone().unwrap_or_default(),
            })
        },
    )
    // An undescribed route never clears a description kept in NetBox
    .track("description", |want: &Option<String>, have: &IpRecord| {
        want.as_ref().is_some_and(|d| *d != have.description)
    })
}

pub(crate) async fn plan(ctx: &TaskContext<'_>) -> Result<TaskPlan, SyncError> {
    let Some(space) = ctx.netbox.public_space(ctx.site()).await? else {
        return Ok(TaskPlan::Skip(format!("no public IPv4 space assigned to {}", ctx.site())));
    };
    let routes = ctx.device.public_routes(ctx.target, &space).await?;
    let actual = ctx.netbox.ip_addresses(&space).await?;

    let desired = expand_public_prefixes(&routes);
    let deltas = reconcile(&desired, &actual, &policy(ctx.site(), &ctx.options.internet_instance));
    Ok(TaskPlan::ready(apply::plan(EntityKind::IpAddress, deltas)?))
}
