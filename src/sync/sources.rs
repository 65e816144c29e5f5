use async_trait::async_trait;
use ipnet::Ipv4Net;
use std::collections::BTreeMap;

use crate::error::SyncError;
use crate::models::{
    DevicePlatform, DeviceTarget, EntityKind, Family, InterfaceAttrs, IpRecord, PortInventory, RoutingInstance,
    VlanRecord, VrfRecord,
};
use crate::netbox::types::NbDevice;
use crate::reconcile::Existing;

/// Live device state, one query per call
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// VLAN tag -> name
    async fn vlans(&self, device: &DeviceTarget) -> Result<BTreeMap<u16, String>, SyncError>;

    async fn interfaces(&self, device: &DeviceTarget) -> Result<PortInventory, SyncError>;

    /// Prefixes inside `public_space` routed to a local interface, with that
    /// interface's description
    async fn public_routes(
        &self,
        device: &DeviceTarget,
        public_space: &Ipv4Net,
    ) -> Result<BTreeMap<String, Option<String>>, SyncError>;

    async fn routing_instances(&self, device: &DeviceTarget) -> Result<Vec<RoutingInstance>, SyncError>;

    async fn version(&self, device: &DeviceTarget) -> Result<String, SyncError>;
}

/// The inventory system reconciled against the devices
#[async_trait]
pub trait SystemOfRecord: Send + Sync {
    async fn ping(&self) -> bool;

    /// Device of a family at a site
    async fn device(&self, site: &str, family: Family) -> Result<NbDevice, SyncError>;

    /// VLANs at a site whose description is `scope`
    async fn vlans(&self, site: &str, scope: &str) -> Result<BTreeMap<u16, Existing<VlanRecord>>, SyncError>;

    async fn interfaces(&self, device_id: i64) -> Result<BTreeMap<String, Existing<InterfaceAttrs>>, SyncError>;

    /// Public IPv4 space assigned to a site, if any
    async fn public_space(&self, site: &str) -> Result<Option<Ipv4Net>, SyncError>;

    async fn ip_addresses(&self, parent: &Ipv4Net) -> Result<BTreeMap<String, Existing<IpRecord>>, SyncError>;

    async fn vrfs(&self, site: &str) -> Result<BTreeMap<String, Existing<VrfRecord>>, SyncError>;

    /// Platform names
    async fn platforms(&self) -> Result<BTreeMap<String, Existing<()>>, SyncError>;

    async fn device_platform(&self, device_id: i64) -> Result<DevicePlatform, SyncError>;

    async fn create(&self, kind: EntityKind, payload: &serde_json::Value) -> Result<(), SyncError>;

    async fn update(&self, kind: EntityKind, id: i64, payload: &serde_json::Value) -> Result<(), SyncError>;

    async fn delete(&self, kind: EntityKind, id: i64) -> Result<(), SyncError>;
}
