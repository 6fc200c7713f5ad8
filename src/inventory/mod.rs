//! vSphere 인벤토리 수집 모듈
//!
//! 컨트롤 플레인(vCenter / ESXi)에 세션을 열고 HostSystem, VirtualMachine 목록을 가져옵니다.
//!
//! # Example
//!
//! ```ignore
//! use vsphere_exporter::inventory::{ClientSettings, InventoryClient, InventorySession, VsphereClient};
//!
//! let client = VsphereClient::new(ClientSettings::default())?;
//! let session = client.connect("vc01.example.com", &credentials).await?;
//! let hosts = session.list_hosts().await?;
//! session.close().await?;
//! ```

mod client;
pub mod model;
mod parser;

use async_trait::async_trait;

pub use client::{ClientSettings, VsphereClient, VsphereSession, HOST_PROPERTIES, VM_PROPERTIES};
pub use model::{
    ConnectionState, HardwareStatus, HostEntity, NetStackInstance, NumericSensor, OverallStatus,
    PnicBandwidth, PowerState, StandbyMode, VmEntity,
};
pub use parser::{
    host_from_object, parse_retrieve_result, vm_from_object, ManagedObjectReference,
    ObjectContent, RetrievePage,
};

use crate::config::Credentials;
use crate::error::{ConnectError, ListError, RequestError};

/// 세션을 여는 쪽
#[async_trait]
pub trait InventoryClient: Send + Sync + 'static {
    /// 이 클라이언트가 만드는 세션 타입
    type Session: InventorySession;

    /// 엔드포인트에 로그인하여 세션 생성
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Self::Session, ConnectError>;
}

/// 인증된 세션 하나. 스크레이프 한 번 동안만 사용합니다.
#[async_trait]
pub trait InventorySession: Send + Sync + 'static {
    /// 전체 인벤토리 트리의 HostSystem 목록
    async fn list_hosts(&self) -> Result<Vec<HostEntity>, ListError>;

    /// 전체 인벤토리 트리의 VirtualMachine 목록
    async fn list_virtual_machines(&self) -> Result<Vec<VmEntity>, ListError>;

    /// 로그아웃 (best-effort)
    async fn close(&self) -> Result<(), RequestError>;
}
