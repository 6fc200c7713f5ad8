//! vSphere 인벤토리 → Prometheus 샘플 수집 모듈
//!
//! 엔티티 타입별 수집기(`host`, `vm`)와 한 번의 스크레이프 패스를 조율하는
//! [`CollectionOrchestrator`] 로 구성됩니다.
//!
//! # Example
//!
//! ```ignore
//! use vsphere_exporter::collector::CollectionOrchestrator;
//! use vsphere_exporter::inventory::{ClientSettings, VsphereClient};
//!
//! let orchestrator = CollectionOrchestrator::new(VsphereClient::new(ClientSettings::default())?);
//! let scrape = orchestrator.collect("vc01.example.com", &credentials).await;
//! let samples = scrape.into_samples();
//! ```

pub mod encoding;
pub mod host;
mod orchestrator;
mod sample;
pub mod vm;

pub use orchestrator::{CollectionOrchestrator, Scrape, ScrapeOutcome, DEFAULT_PASS_TIMEOUT};
pub use sample::{MetricSample, SampleSink};
