//! Shared test fixtures: an in-memory inventory client

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use vsphere_exporter::catalog::EntityType;
use vsphere_exporter::config::Credentials;
use vsphere_exporter::error::{ConnectError, ListError, RequestError};
use vsphere_exporter::inventory::{
    ConnectionState, HostEntity, InventoryClient, InventorySession, PowerState, VmEntity,
};

/// Inventory served for one endpoint
#[derive(Debug, Clone, Default)]
pub struct FakeInventory {
    pub hosts: Vec<HostEntity>,
    pub vms: Vec<VmEntity>,
    pub fail_hosts: bool,
    pub fail_vms: bool,
    pub host_delay: Duration,
    pub vm_delay: Duration,
}

/// Counters shared by a client and every session it opens
#[derive(Debug, Default)]
pub struct CallCounts {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
}

impl CallCounts {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Client keyed by endpoint; unknown endpoints fail to connect
#[derive(Debug, Default)]
pub struct FakeClient {
    inventories: HashMap<String, FakeInventory>,
    pub calls: Arc<CallCounts>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, endpoint: &str, inventory: FakeInventory) -> Self {
        self.inventories.insert(endpoint.to_string(), inventory);
        self
    }
}

pub struct FakeSession {
    inventory: FakeInventory,
    calls: Arc<CallCounts>,
}

fn fault(message: &str) -> RequestError {
    RequestError::Fault {
        status: 500,
        fault: "SystemError".to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl InventoryClient for FakeClient {
    type Session = FakeSession;

    async fn connect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<FakeSession, ConnectError> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);

        let inventory = self.inventories.get(endpoint).cloned().ok_or_else(|| {
            ConnectError::AuthenticationFailed {
                username: credentials.username.clone(),
                message: "Cannot complete login due to an incorrect user name or password."
                    .to_string(),
            }
        })?;

        Ok(FakeSession {
            inventory,
            calls: Arc::clone(&self.calls),
        })
    }
}

#[async_trait]
impl InventorySession for FakeSession {
    async fn list_hosts(&self) -> Result<Vec<HostEntity>, ListError> {
        tokio::time::sleep(self.inventory.host_delay).await;
        if self.inventory.fail_hosts {
            return Err(ListError::new(EntityType::Host, fault("host listing failed")));
        }
        Ok(self.inventory.hosts.clone())
    }

    async fn list_virtual_machines(&self) -> Result<Vec<VmEntity>, ListError> {
        tokio::time::sleep(self.inventory.vm_delay).await;
        if self.inventory.fail_vms {
            return Err(ListError::new(
                EntityType::VirtualMachine,
                fault("vm listing failed"),
            ));
        }
        Ok(self.inventory.vms.clone())
    }

    async fn close(&self) -> Result<(), RequestError> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("monitor@vsphere.local", "secret")
}

pub fn host(id: &str, name: &str, connection: &str, power: &str) -> HostEntity {
    HostEntity {
        id: id.to_string(),
        name: name.to_string(),
        product_name: "VMware ESXi 8.0.1 build-21495797".to_string(),
        connection_state: ConnectionState::from(connection),
        power_state: PowerState::from(power),
        uptime: 86_400,
        ..Default::default()
    }
}

pub fn vm(id: &str, name: &str, host_id: Option<&str>, uptime: i64) -> VmEntity {
    VmEntity {
        id: id.to_string(),
        name: name.to_string(),
        guest_full_name: "Ubuntu Linux (64-bit)".to_string(),
        uptime_seconds: uptime,
        host_id: host_id.map(str::to_string),
    }
}

/// Two hosts (one healthy, one down) and one VM on the healthy host
pub fn two_host_inventory() -> FakeInventory {
    FakeInventory {
        hosts: vec![
            host("host-1", "h1", "active", "poweredOn"),
            host("host-2", "h2", "down", "poweredOff"),
        ],
        vms: vec![vm("vm-1", "v1", Some("host-1"), 3600)],
        ..Default::default()
    }
}
