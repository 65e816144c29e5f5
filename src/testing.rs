//! In-memory collaborators for tests.

use async_trait::async_trait;
use ipnet::Ipv4Net;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Config;
use crate::error::SyncError;
use crate::models::{
    DevicePlatform, DeviceTarget, EntityKind, Family, InterfaceAttrs, IpRecord, MediaType, PortInventory, RawPort,
    RoutingInstance, Transceiver, VlanRecord, VrfRecord,
};
use crate::netbox::types::NbDevice;
use crate::reconcile::Existing;
use crate::sync::{DeviceSource, SystemOfRecord};

pub fn config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        netbox_url: "http://netbox.local".to_string(),
        netbox_token: "0123456789abcdef".to_string(),
        netbox_timeout_secs: 30,
        device_user: "svc".to_string(),
        device_pass: "secret".to_string(),
        netconf_port: 22,
        netconf_timeout_secs: 300,
        sites: vec!["ch3".to_string(), "am3".to_string()],
        sync_schedule: None,
        sync_on_start: false,
        api_token: String::new(),
        legacy_updates: false,
        internet_instance: "RI-VRF-Internet-2".to_string(),
        ex_models: String::new(),
        history_limit: 50,
    }
}

/// Device state served for every site
#[derive(Default)]
pub struct FakeDevice {
    pub vlans: HashMap<Family, BTreeMap<u16, String>>,
    pub inventory: PortInventory,
    pub routes: BTreeMap<String, Option<String>>,
    pub instances: Vec<RoutingInstance>,
    pub version: String,
    /// Time `version` takes to answer
    pub delay: Option<Duration>,
    failing: Mutex<HashSet<&'static str>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeDevice {
    pub fn sample() -> Self {
        Self {
            vlans: HashMap::from([
                (
                    Family::Qfx,
                    BTreeMap::from([(10, "mgmt".to_string()), (3047, "BLAKE_DEMO_3047".to_string())]),
                ),
                (
                    Family::Mx,
                    BTreeMap::from([(2001, "SVC: THOUSANDEYES AWS IPV4".to_string())]),
                ),
            ]),
            inventory: PortInventory {
                ports: vec![
                    RawPort {
                        name: "xe-0/0/1".to_string(),
                        description: Some("uplink".to_string()),
                        speed: Some("10Gbps".to_string()),
                    },
                    RawPort {
                        name: "ge-0/0/2".to_string(),
                        description: None,
                        speed: Some("1000mbps".to_string()),
                    },
                    RawPort {
                        name: "lo0".to_string(),
                        description: None,
                        speed: None,
                    },
                ],
                transceivers: vec![Transceiver {
                    fpc: "FPC 0".to_string(),
                    pic: "PIC 0".to_string(),
                    xcvr: "Xcvr 1".to_string(),
                    description: Some("SFP+-10G-LR".to_string()),
                }],
            },
            routes: BTreeMap::from([(
                "64.191.201.2/31".to_string(),
                Some("SVC: THOUSANDEYES AWS IPV4".to_string()),
            )]),
            instances: vec![RoutingInstance {
                name: "RI-VRF-Internet-2".to_string(),
                instance_type: Some("vrf".to_string()),
                rd: Some("65000:2".to_string()),
                interfaces: vec!["xe-0/0/1.2001".to_string()],
            }],
            version: "17.3R3.10".to_string(),
            ..Default::default()
        }
    }

    /// Make every call of `operation` fail from now on
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reset_in_flight(&self) {
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str) -> Result<(), SyncError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(SyncError::device(format!("{} failed", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceSource for FakeDevice {
    async fn vlans(&self, device: &DeviceTarget) -> Result<BTreeMap<u16, String>, SyncError> {
        self.check("vlans")?;
        Ok(self.vlans.get(&device.family()).cloned().unwrap_or_default())
    }

    async fn interfaces(&self, _device: &DeviceTarget) -> Result<PortInventory, SyncError> {
        self.check("interfaces")?;
        Ok(self.inventory.clone())
    }

    async fn public_routes(
        &self,
        _device: &DeviceTarget,
        _public_space: &Ipv4Net,
    ) -> Result<BTreeMap<String, Option<String>>, SyncError> {
        self.check("public_routes")?;
        Ok(self.routes.clone())
    }

    async fn routing_instances(&self, _device: &DeviceTarget) -> Result<Vec<RoutingInstance>, SyncError> {
        self.check("routing_instances")?;
        Ok(self.instances.clone())
    }

    async fn version(&self, _device: &DeviceTarget) -> Result<String, SyncError> {
        self.check("version")?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.version.clone())
    }
}

/// One write sent to the fake NetBox
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub kind: EntityKind,
    pub action: &'static str,
    pub id: Option<i64>,
    pub payload: serde_json::Value,
}

/// NetBox state served for every site
#[derive(Default)]
pub struct FakeNetBox {
    pub devices: HashMap<Family, NbDevice>,
    /// Keyed by scope (`qfx` / `mx`)
    pub vlans: HashMap<String, BTreeMap<u16, Existing<VlanRecord>>>,
    pub interfaces: BTreeMap<String, Existing<InterfaceAttrs>>,
    pub public_space: Option<Ipv4Net>,
    pub addresses: BTreeMap<String, Existing<IpRecord>>,
    pub vrfs: BTreeMap<String, Existing<VrfRecord>>,
    pub platforms: BTreeMap<String, Existing<()>>,
    pub device_platform: Option<DevicePlatform>,
    pub reachable: bool,
    rejects: Mutex<HashSet<(EntityKind, &'static str)>>,
    writes: Mutex<Vec<Write>>,
}

fn device(id: i64, name: &str) -> NbDevice {
    NbDevice {
        id,
        name: Some(name.to_string()),
        site: None,
        platform: None,
        custom_fields: HashMap::new(),
    }
}

impl FakeNetBox {
    pub fn sample() -> Self {
        Self {
            devices: HashMap::from([
                (Family::Mx, device(19, "br1-svc.ch3.corp.example.com")),
                (Family::Qfx, device(20, "csw1-svc.ch3.corp.example.com")),
                (Family::Ex, device(21, "ls1-svc.ch3.corp.example.com")),
            ]),
            vlans: HashMap::from([(
                "qfx".to_string(),
                BTreeMap::from([(10, Existing::new(1, VlanRecord { name: "mgmt".to_string() }))]),
            )]),
            interfaces: BTreeMap::from([(
                "xe-0/0/1".to_string(),
                Existing::new(
                    30,
                    InterfaceAttrs {
                        description: "uplink".to_string(),
                        speed: Some("10Gbps".to_string()),
                        media: Some(MediaType::Smf),
                    },
                ),
            )]),
            public_space: "64.191.201.0/24".parse().ok(),
            platforms: BTreeMap::from([("15.1R7.9".to_string(), Existing::new(2, ()))]),
            device_platform: Some(DevicePlatform {
                platform: Some("15.1R7.9".to_string()),
                upgrade: None,
            }),
            reachable: true,
            ..Default::default()
        }
    }

    /// Reject every `action` ("create", "update", "delete") on `kind`
    pub fn reject(&self, kind: EntityKind, action: &'static str) {
        self.rejects.lock().unwrap().insert((kind, action));
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    fn write(
        &self,
        kind: EntityKind,
        action: &'static str,
        id: Option<i64>,
        payload: &serde_json::Value,
    ) -> Result<(), SyncError> {
        if self.rejects.lock().unwrap().contains(&(kind, action)) {
            return Err(SyncError::Rejected {
                kind,
                action,
                message: "400 Bad Request".to_string(),
            });
        }
        self.writes.lock().unwrap().push(Write {
            kind,
            action,
            id,
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl SystemOfRecord for FakeNetBox {
    async fn ping(&self) -> bool {
        self.reachable
    }

    async fn device(&self, site: &str, family: Family) -> Result<NbDevice, SyncError> {
        self.devices.get(&family).cloned().ok_or_else(|| SyncError::DeviceNotFound {
            site: site.to_string(),
            role: family.role_hint().to_string(),
        })
    }

    async fn vlans(&self, _site: &str, scope: &str) -> Result<BTreeMap<u16, Existing<VlanRecord>>, SyncError> {
        Ok(self.vlans.get(scope).cloned().unwrap_or_default())
    }

    async fn interfaces(&self, _device_id: i64) -> Result<BTreeMap<String, Existing<InterfaceAttrs>>, SyncError> {
        Ok(self.interfaces.clone())
    }

    async fn public_space(&self, _site: &str) -> Result<Option<Ipv4Net>, SyncError> {
        Ok(self.public_space)
    }

    async fn ip_addresses(&self, _parent: &Ipv4Net) -> Result<BTreeMap<String, Existing<IpRecord>>, SyncError> {
        Ok(self.addresses.clone())
    }

    async fn vrfs(&self, _site: &str) -> Result<BTreeMap<String, Existing<VrfRecord>>, SyncError> {
        Ok(self.vrfs.clone())
    }

    async fn platforms(&self) -> Result<BTreeMap<String, Existing<()>>, SyncError> {
        Ok(self.platforms.clone())
    }

    async fn device_platform(&self, device_id: i64) -> Result<DevicePlatform, SyncError> {
        self.device_platform
            .clone()
            .ok_or_else(|| SyncError::netbox(format!("device {} not found", device_id)))
    }

    async fn create(&self, kind: EntityKind, payload: &serde_json::Value) -> Result<(), SyncError> {
        self.write(kind, "create", None, payload)
    }

    async fn update(&self, kind: EntityKind, id: i64, payload: &serde_json::Value) -> Result<(), SyncError> {
        self.write(kind, "update", Some(id), payload)
    }

    async fn delete(&self, kind: EntityKind, id: i64) -> Result<(), SyncError> {
        self.write(kind, "delete", Some(id), &serde_json::Value::Null)
    }
}
