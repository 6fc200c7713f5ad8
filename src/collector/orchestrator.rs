//! 스크레이프 패스 오케스트레이션
//!
//! 한 번의 패스는 세션 연결 → 엔티티 타입별 브랜치 병렬 수집 → 세션 해제 순서로
//! 진행됩니다. 브랜치 하나가 실패해도 다른 브랜치는 계속 진행되며, 세션은
//! 어떤 경로로 끝나든 정확히 한 번 해제됩니다.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{meta, EntityType, MetricCatalog, MetricDesc};
use crate::config::Credentials;
use crate::error::{ListError, RequestError};
use crate::inventory::{InventoryClient, InventorySession};

use super::encoding;
use super::sample::{MetricSample, SampleSink};
use super::{host, vm};

/// 호스트 managed object id → 호스트 이름
type HostNames = HashMap<String, String>;

/// Default pass deadline
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(30);

/// 패스 결과 요약
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    /// 세션 연결 성공 여부
    pub up: bool,
    /// 엔티티 타입별 수집 성공 여부
    pub entity_success: BTreeMap<EntityType, bool>,
    pub duration: Duration,
}

impl ScrapeOutcome {
    pub fn entity_succeeded(&self, entity: EntityType) -> bool {
        self.entity_success.get(&entity).copied().unwrap_or(false)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// 연결과 모든 엔티티 수집이 성공했는지
    pub fn is_complete(&self) -> bool {
        self.up && self.entity_success.values().all(|ok| *ok)
    }
}

/// 한 번의 패스에서 수집된 샘플과 결과
#[derive(Debug, Clone)]
pub struct Scrape {
    pub samples: Vec<MetricSample>,
    pub outcome: ScrapeOutcome,
}

impl Scrape {
    /// 연결 전에 끝난 패스 (연결 실패, 자격 증명 없음)
    pub fn unavailable(duration: Duration) -> Self {
        Self {
            samples: Vec::new(),
            outcome: ScrapeOutcome {
                up: false,
                entity_success: EntityType::ALL.iter().map(|e| (*e, false)).collect(),
                duration,
            },
        }
    }

    /// `up`, 소요 시간, 엔티티별 scrape status 샘플
    pub fn meta_samples(&self) -> Vec<MetricSample> {
        let no_labels = std::iter::empty::<&str>;
        let mut samples = vec![
            MetricSample::new(&meta::UP, no_labels(), encoding::flag(self.outcome.up)),
            MetricSample::new(
                &meta::COLLECTOR_DURATION,
                no_labels(),
                self.outcome.duration_seconds(),
            ),
        ];
        samples.extend(EntityType::ALL.iter().map(|entity| {
            MetricSample::new(
                &meta::COLLECTOR_SCRAPE_STATUS,
                [entity.as_str()],
                encoding::flag(self.outcome.entity_succeeded(*entity)),
            )
        }));
        samples
    }

    /// 엔티티 샘플 뒤에 메타 샘플을 붙인 전체 응답
    pub fn into_samples(self) -> Vec<MetricSample> {
        let meta = self.meta_samples();
        let mut samples = self.samples;
        samples.extend(meta);
        samples
    }
}

/// 스크레이프 패스 실행기
///
/// 패스끼리 공유하는 것은 클라이언트(HTTP 커넥션 풀)와 정적 카탈로그뿐입니다.
pub struct CollectionOrchestrator<C: InventoryClient> {
    client: Arc<C>,
    pass_timeout: Duration,
}

impl<C: InventoryClient> CollectionOrchestrator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            pass_timeout: DEFAULT_PASS_TIMEOUT,
        }
    }

    /// 패스 전체 제한 시간 설정 (연결 포함)
    pub fn with_pass_timeout(mut self, timeout: Duration) -> Self {
        self.pass_timeout = timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 카탈로그 전체 + 메타 디스크립터. 네트워크를 사용하지 않습니다.
    pub fn describe(&self) -> Vec<&'static MetricDesc> {
        MetricCatalog::global().describe()
    }

    /// 대상 엔드포인트에 대해 한 번의 패스 실행
    #[instrument(skip_all, fields(endpoint = %target))]
    pub async fn collect(&self, target: &str, credentials: &Credentials) -> Scrape {
        let started = std::time::Instant::now();
        let deadline = PassDeadline::after(self.pass_timeout);

        let connecting = self.client.connect(target, credentials);
        let session = match tokio::time::timeout_at(deadline.at, connecting).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!(endpoint = %target, error = %e, "Failed to connect, reporting target down");
                return Scrape::unavailable(started.elapsed());
            }
            Err(_) => {
                warn!(
                    endpoint = %target,
                    timeout_ms = deadline.timeout_ms(),
                    "Connect did not finish before the pass deadline, reporting target down"
                );
                return Scrape::unavailable(started.elapsed());
            }
        };

        let guard = SessionGuard::new(session, target);
        let sink = Arc::new(SampleSink::new());
        let entity_success = run_branches(guard.session(), &sink, target, deadline).await;
        guard.release().await;

        let outcome = ScrapeOutcome {
            up: true,
            entity_success,
            duration: started.elapsed(),
        };
        let samples = sink.drain();

        info!(
            endpoint = %target,
            samples = samples.len(),
            duration_ms = outcome.duration.as_millis() as u64,
            complete = outcome.is_complete(),
            "Scrape pass finished"
        );

        Scrape { samples, outcome }
    }
}

/// Slack after the pass deadline for branches to hand in what they have
const BRANCH_GRACE: Duration = Duration::from_millis(500);

/// 패스 마감 시각
///
/// 각 브랜치는 자기 목록 조회와 호스트 이름 대기를 이 시각으로 제한하므로,
/// 느린 브랜치 하나가 다른 브랜치의 결과를 버리게 하지 않습니다.
#[derive(Debug, Clone, Copy)]
struct PassDeadline {
    at: Instant,
    budget: Duration,
}

impl PassDeadline {
    fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.budget.as_millis() as u64
    }

    /// 마감까지 목록 조회. 넘기면 해당 엔티티 타입의 타임아웃 에러
    async fn list<T, F>(self, entity: EntityType, listing: F) -> Result<T, ListError>
    where
        F: Future<Output = Result<T, ListError>>,
    {
        match tokio::time::timeout_at(self.at, listing).await {
            Ok(result) => result,
            Err(_) => Err(ListError::new(
                entity,
                RequestError::Timeout(Some(self.timeout_ms())),
            )),
        }
    }
}

/// 엔티티 타입별 브랜치를 띄우고 모두 끝날 때까지 대기
async fn run_branches<S: InventorySession>(
    session: Arc<S>,
    sink: &Arc<SampleSink>,
    target: &str,
    deadline: PassDeadline,
) -> BTreeMap<EntityType, bool> {
    let mut entity_success: BTreeMap<EntityType, bool> =
        EntityType::ALL.iter().map(|e| (*e, false)).collect();

    let (names_tx, names_rx) = watch::channel::<Option<Arc<HostNames>>>(None);
    let mut branches: JoinSet<(EntityType, Result<(), ListError>)> = JoinSet::new();

    branches.spawn(host_branch(
        Arc::clone(&session),
        Arc::clone(sink),
        names_tx,
        deadline,
    ));
    branches.spawn(vm_branch(session, Arc::clone(sink), names_rx, deadline));

    // Branches bound themselves; this only catches one that stopped yielding
    let backstop = deadline.at + BRANCH_GRACE;
    loop {
        match tokio::time::timeout_at(backstop, branches.join_next()).await {
            Ok(Some(Ok((entity, result)))) => {
                record(&mut entity_success, target, entity, result);
            }
            Ok(Some(Err(e))) => {
                warn!(endpoint = %target, error = %e, "Collection branch did not complete");
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    endpoint = %target,
                    timeout_ms = deadline.timeout_ms(),
                    "Branches still running past the pass deadline, aborting them"
                );
                branches.abort_all();
                while let Some(joined) = branches.join_next().await {
                    if let Ok((entity, result)) = joined {
                        record(&mut entity_success, target, entity, result);
                    }
                }
                break;
            }
        }
    }

    entity_success
}

fn record(
    entity_success: &mut BTreeMap<EntityType, bool>,
    target: &str,
    entity: EntityType,
    result: Result<(), ListError>,
) {
    match result {
        Ok(()) => {
            entity_success.insert(entity, true);
        }
        Err(e) => {
            warn!(
                endpoint = %target,
                entity = %entity,
                fault = e.source.fault_name().unwrap_or_default(),
                http_status = e.source.http_status().unwrap_or_default(),
                error = %e,
                "Entity collection failed"
            );
        }
    }
}

/// 호스트 목록 수집. 성공이든 실패든 이름 매핑을 먼저 공개합니다.
async fn host_branch<S: InventorySession>(
    session: Arc<S>,
    sink: Arc<SampleSink>,
    names_tx: watch::Sender<Option<Arc<HostNames>>>,
    deadline: PassDeadline,
) -> (EntityType, Result<(), ListError>) {
    let result = match deadline.list(EntityType::Host, session.list_hosts()).await {
        Ok(hosts) => {
            let names: HostNames = hosts
                .iter()
                .map(|h| (h.id.clone(), h.name.clone()))
                .collect();
            // No receiver left means the VM branch already finished
            let _ = names_tx.send(Some(Arc::new(names)));

            let samples: Vec<MetricSample> = hosts.iter().flat_map(host::collect).collect();
            let added = sink.extend(samples);
            debug!(hosts = hosts.len(), samples = added, "Host branch finished");
            Ok(())
        }
        Err(e) => {
            let _ = names_tx.send(Some(Arc::default()));
            Err(e)
        }
    };
    (EntityType::Host, result)
}

/// VM 목록을 호스트 목록과 동시에 가져온 뒤 이름 매핑을 기다립니다.
async fn vm_branch<S: InventorySession>(
    session: Arc<S>,
    sink: Arc<SampleSink>,
    names_rx: watch::Receiver<Option<Arc<HostNames>>>,
    deadline: PassDeadline,
) -> (EntityType, Result<(), ListError>) {
    let listing = session.list_virtual_machines();
    let result = match deadline.list(EntityType::VirtualMachine, listing).await {
        Ok(vms) => {
            let names = wait_for_host_names(names_rx, deadline.at).await;
            let samples: Vec<MetricSample> = vms
                .iter()
                .flat_map(|v| vm::collect(v, &names))
                .collect();
            let added = sink.extend(samples);
            debug!(vms = vms.len(), samples = added, "VM branch finished");
            Ok(())
        }
        Err(e) => Err(e),
    };
    (EntityType::VirtualMachine, result)
}

/// 호스트 이름 매핑 대기
///
/// 호스트 브랜치가 매핑 없이 사라지거나 마감까지 공개하지 않으면 빈 매핑으로 진행
async fn wait_for_host_names(
    mut names_rx: watch::Receiver<Option<Arc<HostNames>>>,
    deadline: Instant,
) -> Arc<HostNames> {
    let waiting = names_rx.wait_for(Option::is_some);
    let published = match tokio::time::timeout_at(deadline, waiting).await {
        Ok(Ok(names)) => (*names).clone(),
        Ok(Err(_)) => None,
        Err(_) => {
            debug!("Host names not published before the pass deadline");
            None
        }
    };
    published.unwrap_or_default()
}

/// 패스 동안 세션을 소유하는 가드
///
/// `release` 로 명시적으로 해제하지 못하고 drop 되면(패스 future 취소)
/// 런타임에 로그아웃 태스크를 띄웁니다.
struct SessionGuard<S: InventorySession> {
    session: Arc<S>,
    target: String,
    released: bool,
}

impl<S: InventorySession> SessionGuard<S> {
    fn new(session: S, target: &str) -> Self {
        Self {
            session: Arc::new(session),
            target: target.to_string(),
            released: false,
        }
    }

    fn session(&self) -> Arc<S> {
        Arc::clone(&self.session)
    }

    async fn release(mut self) {
        self.released = true;
        match self.session.close().await {
            Ok(()) => debug!(endpoint = %self.target, "Session closed"),
            Err(e) => warn!(endpoint = %self.target, error = %e, "Failed to close session"),
        }
    }
}

impl<S: InventorySession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let session = Arc::clone(&self.session);
        let target = std::mem::take(&mut self.target);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!(endpoint = %target, error = %e, "Failed to close abandoned session");
                    }
                });
            }
            Err(_) => {
                warn!(endpoint = %target, "No runtime available, abandoned session left open");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_scrape_meta_samples() {
        let scrape = Scrape::unavailable(Duration::from_millis(250));
        let samples = scrape.into_samples();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].desc.name, "vsphere_up");
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[1].desc.name, "vsphere_exporter_collector_duration_seconds");
        assert!((samples[1].value - 0.25).abs() < 1e-9);

        let statuses: Vec<(Option<&str>, f64)> = samples[2..]
            .iter()
            .map(|s| (s.label("collector"), s.value))
            .collect();
        assert_eq!(
            statuses,
            vec![(Some("host"), 0.0), (Some("virtualmachine"), 0.0)]
        );
    }

    #[test]
    fn test_outcome_completeness() {
        let mut outcome = ScrapeOutcome {
            up: true,
            entity_success: EntityType::ALL.iter().map(|e| (*e, true)).collect(),
            duration: Duration::ZERO,
        };
        assert!(outcome.is_complete());

        outcome.entity_success.insert(EntityType::VirtualMachine, false);
        assert!(!outcome.is_complete());
        assert!(outcome.entity_succeeded(EntityType::Host));
        assert!(!outcome.entity_succeeded(EntityType::VirtualMachine));
    }

    #[tokio::test]
    async fn test_missing_host_publication_resolves_empty() {
        let (tx, rx) = watch::channel::<Option<Arc<HostNames>>>(None);
        drop(tx);
        let deadline = Instant::now() + Duration::from_secs(5);
        assert!(wait_for_host_names(rx, deadline).await.is_empty());
    }

    #[tokio::test]
    async fn test_host_publication_is_observed() {
        let (tx, rx) = watch::channel::<Option<Arc<HostNames>>>(None);
        let deadline = Instant::now() + Duration::from_secs(5);
        let waiter = tokio::spawn(wait_for_host_names(rx, deadline));
        tx.send(Some(Arc::new(HashMap::from([(
            "host-1".to_string(),
            "esx01".to_string(),
        )]))))
        .unwrap();
        let names = waiter.await.unwrap();
        assert_eq!(names.get("host-1").map(String::as_str), Some("esx01"));
    }

    #[tokio::test]
    async fn test_unpublished_host_names_resolve_empty_at_deadline() {
        let (tx, rx) = watch::channel::<Option<Arc<HostNames>>>(None);
        let deadline = Instant::now() + Duration::from_millis(50);

        let names = wait_for_host_names(rx, deadline).await;
        assert!(names.is_empty());
        assert!(Instant::now() >= deadline);
        drop(tx);
    }

    #[tokio::test]
    async fn test_listing_past_deadline_is_timeout() {
        let deadline = PassDeadline::after(Duration::from_millis(20));
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<Vec<String>, ListError>(Vec::new())
        };

        let err = deadline.list(EntityType::Host, slow).await.unwrap_err();
        assert_eq!(err.entity, EntityType::Host);
        assert!(matches!(err.source, RequestError::Timeout(Some(20))));
    }
}
