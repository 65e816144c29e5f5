use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ipnet::Ipv4Net;
use std::collections::BTreeMap;

use super::netconf::{NetconfParams, NetconfSession};
use super::rpc;
use crate::error::SyncError;
use crate::models::{DeviceTarget, Family, PortInventory, RoutingInstance};
use crate::sync::DeviceSource;
use crate::utils::is_valid_hostname;

/// Queries Juniper devices over NETCONF, one session per call
pub struct JunosSource {
    user: String,
    pass: String,
    port: u16,
    timeout_secs: u64,
    internet_instance: String,
}

impl JunosSource {
    pub fn new(user: String, pass: String, port: u16, timeout_secs: u64, internet_instance: String) -> Self {
        Self {
            user,
            pass,
            port,
            timeout_secs,
            internet_instance,
        }
    }

    /// Open a session to `device`, run `work` on a blocking thread and close
    /// the session again whatever the outcome.
    async fn with_session<T, F>(&self, device: &DeviceTarget, work: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&mut NetconfSession) -> Result<T> + Send + 'static,
    {
        if !is_valid_hostname(&device.name) {
            return Err(SyncError::device(format!("invalid device hostname '{}'", device.name)));
        }
        let params = NetconfParams {
            host: device.name.clone(),
            port: self.port,
            user: self.user.clone(),
            pass: self.pass.clone(),
            timeout_secs: self.timeout_secs,
        };
        let name = device.name.clone();

        let result = tokio::task::spawn_blocking(move || {
            let mut session = NetconfSession::connect(&params)?;
            let out = work(&mut session);
            session.close();
            out
        })
        .await
        .map_err(|e| SyncError::device(format!("{}: task failed: {}", name, e)))?;

        result.map_err(|e| SyncError::device(format!("{}: {:#}", name, e)))
    }
}

#[async_trait]
impl DeviceSource for JunosSource {
    async fn vlans(&self, device: &DeviceTarget) -> Result<BTreeMap<u16, String>, SyncError> {
        match device.family() {
            // MX carries VLANs as tagged logical units
            Family::Mx => {
                self.with_session(device, |s| {
                    let reply = s.rpc_json(rpc::GET_INTERFACES)?;
                    Ok(rpc::subinterface_vlans(&rpc::parse_logical_interfaces(&reply)))
                })
                .await
            }
            Family::Qfx | Family::Ex => {
                self.with_session(device, |s| Ok(rpc::parse_vlans(&s.rpc_json(rpc::GET_VLANS)?)))
                    .await
            }
        }
    }

    async fn interfaces(&self, device: &DeviceTarget) -> Result<PortInventory, SyncError> {
        self.with_session(device, |s| {
            let interfaces = s.rpc_json(rpc::GET_INTERFACES)?;
            let inventory = s.rpc_json(rpc::GET_CHASSIS_INVENTORY)?;
            Ok(PortInventory {
                ports: rpc::parse_physical_ports(&interfaces),
                transceivers: rpc::parse_transceivers(&inventory),
            })
        })
        .await
    }

    async fn public_routes(
        &self,
        device: &DeviceTarget,
        public_space: &Ipv4Net,
    ) -> Result<BTreeMap<String, Option<String>>, SyncError> {
        let table = format!("{}.inet.0", self.internet_instance);
        let space = *public_space;
        self.with_session(device, move |s| {
            let units = rpc::parse_logical_interfaces(&s.rpc_json(rpc::GET_INTERFACES)?);
            let routes = s.rpc_json(&rpc::get_routes(&table, &space))?;
            Ok(rpc::parse_public_routes(&routes, &space, &units))
        })
        .await
    }

    async fn routing_instances(&self, device: &DeviceTarget) -> Result<Vec<RoutingInstance>, SyncError> {
        self.with_session(device, |s| Ok(rpc::parse_instances(&s.rpc_json(rpc::GET_INSTANCES)?)))
            .await
    }

    async fn version(&self, device: &DeviceTarget) -> Result<String, SyncError> {
        let format = device.model.version_format();
        self.with_session(device, move |s| {
            let reply = s.rpc_json(rpc::GET_SOFTWARE)?;
            rpc::parse_version(&reply, format).ok_or_else(|| anyhow!("software version not reported"))
        })
        .await
    }
}
