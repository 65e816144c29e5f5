use anyhow::Result;
use async_trait::async_trait;
use ipnet::Ipv4Net;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

use super::types::*;
use crate::error::SyncError;
use crate::models::{DevicePlatform, EntityKind, Family, InterfaceAttrs, IpRecord, VlanRecord, VrfRecord};
use crate::reconcile::Existing;
use crate::sync::SystemOfRecord;

const PAGE_SIZE: u32 = 1000;

/// Interface names NetBox keeps for virtual-chassis plumbing, never synced
const IGNORED_INTERFACE_FRAGMENTS: &[&str] = &["vcp", "member", "vlan"];

/// NetBox API client
pub struct NetBoxClient {
    base_url: String,
    token: String,
    client: Client,
}

impl NetBoxClient {
    pub fn new(url: String, token: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Helper to perform a GET list request, following `next` links
    async fn list_paginated<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut request = self
            .client
            .get(self.api_url(endpoint))
            .query(query)
            .query(&[("limit", PAGE_SIZE)]);

        loop {
            let resp = request
                .header("Authorization", self.auth_header())
                .header("Accept", "application/json")
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(anyhow::anyhow!("NetBox API error {}: {}", status, body));
            }

            let page: PaginatedResponse<T> = resp.json().await?;
            results.extend(page.results);
            match page.next {
                Some(next) => request = self.client.get(next),
                None => break,
            }
        }

        Ok(results)
    }

    /// Helper to GET a single object
    async fn get_object<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(self.api_url(path))
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("NetBox API error {}: {}", status, body));
        }

        Ok(resp.json().await?)
    }

    /// Helper to send a write request and surface NetBox's error body
    async fn write(&self, request: reqwest::RequestBuilder) -> Result<()> {
        let resp = request
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("{}: {}", status, body));
        }
        Ok(())
    }

    /// Test connectivity to NetBox
    pub async fn test_connection(&self) -> bool {
        match self
            .client
            .get(self.api_url("/dcim/sites/"))
            .query(&[("limit", 1)])
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Interface record as compared against the device
pub(crate) fn interface_attrs(iface: &NbInterface) -> InterfaceAttrs {
    let mut attrs = InterfaceAttrs {
        description: iface.description.clone(),
        ..Default::default()
    };
    attrs.apply_tags(iface.tags.iter().map(NbTag::name));
    attrs
}

fn custom_field_text(fields: &std::collections::HashMap<String, serde_json::Value>, name: &str) -> Option<String> {
    match fields.get(name) {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

pub(crate) fn vrf_record(vrf: &NbVrf) -> VrfRecord {
    VrfRecord {
        instance_type: custom_field_text(&vrf.custom_fields, "type"),
        rd: vrf.rd.clone().filter(|rd| !rd.is_empty()),
        interfaces: vrf.tags.iter().map(|t| t.name().to_string()).collect(),
        site: custom_field_text(&vrf.custom_fields, "Site"),
    }
}

pub(crate) fn device_platform(device: &NbDevice) -> DevicePlatform {
    DevicePlatform {
        platform: device.platform.as_ref().map(|p| p.name.clone()),
        upgrade: custom_field_text(&device.custom_fields, "upgrade"),
    }
}

#[async_trait]
impl SystemOfRecord for NetBoxClient {
    async fn ping(&self) -> bool {
        self.test_connection().await
    }

    async fn device(&self, site: &str, family: Family) -> Result<NbDevice, SyncError> {
        let devices: Vec<NbDevice> = self
            .list_paginated(
                "/dcim/devices/",
                &[("site", site.to_string()), ("q", family.role_hint().to_string())],
            )
            .await
            .map_err(SyncError::netbox)?;

        devices
            .into_iter()
            .find(|d| d.name.as_deref().is_some_and(|n| !n.is_empty()))
            .ok_or_else(|| SyncError::DeviceNotFound {
                site: site.to_string(),
                role: family.role_hint().to_string(),
            })
    }

    async fn vlans(&self, site: &str, scope: &str) -> Result<BTreeMap<u16, Existing<VlanRecord>>, SyncError> {
        let vlans: Vec<NbVlan> = self
            .list_paginated("/ipam/vlans/", &[("site", site.to_string()), ("q", scope.to_string())])
            .await
            .map_err(SyncError::netbox)?;

        Ok(vlans
            .into_iter()
            .filter(|v| v.description == scope)
            .map(|v| (v.vid, Existing::new(v.id, VlanRecord { name: v.name })))
            .collect())
    }

    async fn interfaces(&self, device_id: i64) -> Result<BTreeMap<String, Existing<InterfaceAttrs>>, SyncError> {
        let interfaces: Vec<NbInterface> = self
            .list_paginated("/dcim/interfaces/", &[("device_id", device_id.to_string())])
            .await
            .map_err(SyncError::netbox)?;

        Ok(interfaces
            .iter()
            .filter(|i| !IGNORED_INTERFACE_FRAGMENTS.iter().any(|frag| i.name.contains(frag)))
            .map(|i| (i.name.clone(), Existing::new(i.id, interface_attrs(i))))
            .collect())
    }

    async fn public_space(&self, site: &str) -> Result<Option<Ipv4Net>, SyncError> {
        let prefixes: Vec<NbPrefix> = self
            .list_paginated("/ipam/prefixes/", &[("role", format!("{}-ipv4-public-ip-space", site))])
            .await
            .map_err(SyncError::netbox)?;

        match prefixes.last() {
            None => Ok(None),
            Some(p) => p
                .prefix
                .parse::<Ipv4Net>()
                .map(Some)
                .map_err(|e| SyncError::netbox(format!("invalid public prefix '{}': {}", p.prefix, e))),
        }
    }

    async fn ip_addresses(&self, parent: &Ipv4Net) -> Result<BTreeMap<String, Existing<IpRecord>>, SyncError> {
        let addresses: Vec<NbIPAddress> = self
            .list_paginated("/ipam/ip-addresses/", &[("parent", parent.to_string())])
            .await
            .map_err(SyncError::netbox)?;

        Ok(addresses
            .into_iter()
            .map(|a| {
                (
                    a.address,
                    Existing::new(a.id, IpRecord { description: a.description }),
                )
            })
            .collect())
    }

    async fn vrfs(&self, site: &str) -> Result<BTreeMap<String, Existing<VrfRecord>>, SyncError> {
        let vrfs: Vec<NbVrf> = self
            .list_paginated("/ipam/vrfs/", &[("cf_Site", site.to_string())])
            .await
            .map_err(SyncError::netbox)?;

        Ok(vrfs
            .iter()
            .map(|v| (v.name.clone(), Existing::new(v.id, vrf_record(v))))
            .collect())
    }

    async fn platforms(&self) -> Result<BTreeMap<String, Existing<()>>, SyncError> {
        let platforms: Vec<NbPlatform> = self
            .list_paginated("/dcim/platforms/", &[])
            .await
            .map_err(SyncError::netbox)?;

        Ok(platforms
            .into_iter()
            .map(|p| (p.name, Existing::new(p.id, ())))
            .collect())
    }

    async fn device_platform(&self, device_id: i64) -> Result<DevicePlatform, SyncError> {
        let device: NbDevice = self
            .get_object(&format!("/dcim/devices/{}/", device_id))
            .await
            .map_err(SyncError::netbox)?;
        Ok(device_platform(&device))
    }

    async fn create(&self, kind: EntityKind, payload: &serde_json::Value) -> Result<(), SyncError> {
        self.write(self.client.post(self.api_url(kind.endpoint())).json(payload))
            .await
            .map_err(|e| SyncError::Rejected {
                kind,
                action: "create",
                message: e.to_string(),
            })
    }

    async fn update(&self, kind: EntityKind, id: i64, payload: &serde_json::Value) -> Result<(), SyncError> {
        let url = self.api_url(&format!("{}{}/", kind.endpoint(), id));
        self.write(self.client.patch(url).json(payload))
            .await
            .map_err(|e| SyncError::Rejected {
                kind,
                action: "update",
                message: e.to_string(),
            })
    }

    async fn delete(&self, kind: EntityKind, id: i64) -> Result<(), SyncError> {
        let url = self.api_url(&format!("{}{}/", kind.endpoint(), id));
        self.write(self.client.delete(url)).await.map_err(|e| SyncError::Rejected {
            kind,
            action: "delete",
            message: e.to_string(),
        })
    }
}
