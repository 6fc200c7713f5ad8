//! vSphere VI/JSON HTTP 클라이언트
//!
//! vCenter / ESXi 의 VI/JSON API (`/sdk/vim25/{release}`) 를 사용합니다.
//! 세션 토큰은 `vmware-api-session-id` 헤더로 주고받으며, 세션 하나는 스크레이프
//! 한 번에서만 사용됩니다.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::model::{HostEntity, VmEntity};
use super::parser::{
    host_from_object, parse_fault, parse_moref, parse_retrieve_result, parse_service_content,
    vm_from_object, ManagedObjectReference, ObjectContent, ParseResult, ServiceContent,
};
use super::{InventoryClient, InventorySession};
use crate::catalog::EntityType;
use crate::config::{Credentials, VsphereConfig};
use crate::error::{ConnectError, ListError, RequestError};

/// 세션 토큰 헤더
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// HostSystem 조회 속성 (identity, summary, hardware, config, runtime, capability)
pub const HOST_PROPERTIES: &[&str] = &[
    "name",
    "summary.config",
    "summary.hardware",
    "summary.quickStats",
    "summary.overallStatus",
    "runtime",
    "capability.ftSupported",
];

/// VirtualMachine 조회 속성 (summary, config, guest, runtime)
pub const VM_PROPERTIES: &[&str] = &[
    "name",
    "summary.quickStats.uptimeSeconds",
    "config.name",
    "config.guestFullName",
    "guest.guestFullName",
    "runtime.host",
];

/// 연결 설정
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// 요청 타임아웃 (밀리초)
    pub timeout_ms: u64,
    /// VI/JSON API release (예: "8.0.1.0")
    pub api_release: String,
    /// 자체 서명 인증서 허용
    pub insecure: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            api_release: "8.0.1.0".to_string(),
            insecure: true,
        }
    }
}

impl From<&VsphereConfig> for ClientSettings {
    fn from(config: &VsphereConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            api_release: config.api_release.clone(),
            insecure: config.insecure,
        }
    }
}

/// vSphere VI/JSON 클라이언트
///
/// HTTP 커넥션 풀만 공유하며 세션 상태는 [`VsphereSession`] 에만 존재합니다.
#[derive(Clone)]
pub struct VsphereClient {
    http: Client,
    settings: ClientSettings,
}

impl VsphereClient {
    /// 새 클라이언트 생성
    ///
    /// # Example
    /// ```ignore
    /// let client = VsphereClient::new(ClientSettings::default())?;
    /// let session = client.connect("vc01.example.com", &credentials).await?;
    /// ```
    pub fn new(settings: ClientSettings) -> Result<Self, ConnectError> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .danger_accept_invalid_certs(settings.insecure)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(ConnectError::HttpClientInit)?;

        Ok(Self { http, settings })
    }

    /// 엔드포인트 → API base URL
    ///
    /// `vc01`, `vc01:8443`, `https://vc01` 모두 허용합니다. scheme 이 없으면 https.
    pub fn base_url(&self, endpoint: &str) -> Result<String, ConnectError> {
        let invalid = |reason: String| ConnectError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let trimmed = endpoint.trim();
        if trimmed.is_empty() {
            return Err(invalid("endpoint is empty".to_string()));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(format!(
            "{}://{}/sdk/vim25/{}",
            url.scheme(),
            authority,
            self.settings.api_release
        ))
    }
}

#[async_trait]
impl InventoryClient for VsphereClient {
    type Session = VsphereSession;

    #[instrument(skip(self, credentials), fields(user = %credentials.username))]
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<VsphereSession, ConnectError> {
        let base = self.base_url(endpoint)?;

        debug!(base = %base, "Fetching service content");
        let response = self
            .http
            .get(format!("{}/ServiceInstance/ServiceInstance/content", base))
            .send()
            .await
            .map_err(RequestError::from)?;
        let body = read_body(response).await?;
        let content = parse_service_content(&body)?;

        let login_url = format!(
            "{}/SessionManager/{}/Login",
            base, content.session_manager.value
        );
        let response = self
            .http
            .post(&login_url)
            .json(&json!({
                "userName": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .await
            .map_err(RequestError::from)?;

        let status = response.status();
        let token = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let token = match token {
            Some(token) if status.is_success() => token,
            _ => {
                return Err(match read_body(response).await {
                    Err(RequestError::Fault { fault, message, .. })
                        if fault == "InvalidLogin" || fault == "NotAuthenticated" =>
                    {
                        ConnectError::AuthenticationFailed {
                            username: credentials.username.clone(),
                            message,
                        }
                    }
                    Err(e) => ConnectError::Request(e),
                    Ok(_) => ConnectError::Request(RequestError::MissingSessionToken),
                });
            }
        };

        debug!("Session established");

        Ok(VsphereSession {
            http: self.http.clone(),
            base,
            token,
            content,
        })
    }
}

/// 인증된 VI/JSON 세션
pub struct VsphereSession {
    http: Client,
    base: String,
    token: String,
    content: ServiceContent,
}

impl VsphereSession {
    /// 관리 객체 메서드 호출 (`POST /{type}/{id}/{method}`)
    async fn invoke(
        &self,
        moref: &ManagedObjectReference,
        method: &str,
        body: Option<Value>,
    ) -> Result<String, RequestError> {
        let url = format!("{}/{}/{}/{}", self.base, moref.kind, moref.value, method);

        let mut request = self.http.post(&url).header(SESSION_HEADER, &self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        read_body(response).await
    }

    /// 컨테이너 뷰를 만들고, 속성을 모두 조회한 뒤, 뷰를 정리
    async fn retrieve_all(
        &self,
        entity: EntityType,
        properties: &[&str],
    ) -> Result<Vec<ObjectContent>, RequestError> {
        let kind = entity.managed_object_type();

        let view_body = self
            .invoke(
                &self.content.view_manager,
                "CreateContainerView",
                Some(json!({
                    "container": self.content.root_folder.to_json(),
                    "type": [kind],
                    "recursive": true,
                })),
            )
            .await?;
        let view = parse_moref(&view_body)?;

        let result = self.retrieve_from_view(&view, kind, properties).await;

        if let Err(e) = self.invoke(&view, "DestroyView", None).await {
            warn!(view = %view.value, error = %e, "Failed to destroy container view");
        }

        result
    }

    async fn retrieve_from_view(
        &self,
        view: &ManagedObjectReference,
        kind: &str,
        properties: &[&str],
    ) -> Result<Vec<ObjectContent>, RequestError> {
        let spec = json!({
            "specSet": [{
                "_typeName": "PropertyFilterSpec",
                "propSet": [{
                    "_typeName": "PropertySpec",
                    "type": kind,
                    "pathSet": properties,
                }],
                "objectSet": [{
                    "_typeName": "ObjectSpec",
                    "obj": view.to_json(),
                    "skip": true,
                    "selectSet": [{
                        "_typeName": "TraversalSpec",
                        "name": "traverseEntities",
                        "type": "ContainerView",
                        "path": "view",
                        "skip": false,
                    }],
                }],
            }],
            "options": {"_typeName": "RetrieveOptions"},
        });

        let collector = &self.content.property_collector;
        let body = self
            .invoke(collector, "RetrievePropertiesEx", Some(spec))
            .await?;
        let mut page = parse_retrieve_result(&body)?;
        let mut objects = std::mem::take(&mut page.objects);

        while let Some(token) = page.token.take() {
            debug!(kind, fetched = objects.len(), "Continuing property retrieval");
            let body = self
                .invoke(
                    collector,
                    "ContinueRetrievePropertiesEx",
                    Some(json!({ "token": token })),
                )
                .await?;
            page = parse_retrieve_result(&body)?;
            objects.append(&mut page.objects);
        }

        Ok(objects)
    }

    async fn list<T>(
        &self,
        entity: EntityType,
        properties: &[&str],
        convert: fn(&ObjectContent) -> ParseResult<T>,
    ) -> Result<Vec<T>, ListError> {
        let objects = self
            .retrieve_all(entity, properties)
            .await
            .map_err(|e| ListError::new(entity, e))?;

        let entities = objects
            .iter()
            .map(convert)
            .collect::<ParseResult<Vec<T>>>()
            .map_err(|e| ListError::new(entity, e))?;

        debug!(entity = %entity, count = entities.len(), "Inventory listed");
        Ok(entities)
    }
}

#[async_trait]
impl InventorySession for VsphereSession {
    #[instrument(skip(self))]
    async fn list_hosts(&self) -> Result<Vec<HostEntity>, ListError> {
        self.list(EntityType::Host, HOST_PROPERTIES, host_from_object)
            .await
    }

    #[instrument(skip(self))]
    async fn list_virtual_machines(&self) -> Result<Vec<VmEntity>, ListError> {
        self.list(EntityType::VirtualMachine, VM_PROPERTIES, vm_from_object)
            .await
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<(), RequestError> {
        self.invoke(&self.content.session_manager, "Logout", None)
            .await
            .map(|_| ())
    }
}

/// 응답 본문 읽기. 2xx 가 아니면 fault 로 변환
async fn read_body(response: Response) -> Result<String, RequestError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let (fault, message) = parse_fault(&body);
        return Err(RequestError::Fault {
            status: status.as_u16(),
            fault,
            message,
        });
    }

    Ok(body)
}
