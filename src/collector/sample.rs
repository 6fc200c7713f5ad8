//! 메트릭 샘플과 패스 단위 샘플 싱크

use std::collections::HashSet;
use std::sync::Mutex;

use crate::catalog::MetricDesc;

/// 하나의 관측값: 디스크립터 + 순서 있는 레이블 + 값
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub desc: &'static MetricDesc,
    /// Appended to the descriptor name (`_bucket`, `_sum`, `_count` for histograms)
    pub suffix: &'static str,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl MetricSample {
    /// 디스크립터의 레이블 이름 순서대로 값을 붙여 샘플 생성
    ///
    /// `label_values` must have one entry per descriptor label.
    pub fn new<I, S>(desc: &'static MetricDesc, label_values: I, value: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<(&'static str, String)> = desc
            .labels
            .iter()
            .copied()
            .zip(label_values.into_iter().map(Into::into))
            .collect();
        debug_assert_eq!(
            labels.len(),
            desc.labels.len(),
            "label arity mismatch for {}",
            desc.name
        );

        Self {
            desc,
            suffix: "",
            labels,
            value,
        }
    }

    /// 추가 레이블 (histogram `le` 등)
    pub fn with_label(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((name, value.into()));
        self
    }

    pub fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = suffix;
        self
    }

    /// 출력될 전체 메트릭 이름
    pub fn full_name(&self) -> String {
        format!("{}{}", self.desc.name, self.suffix)
    }

    /// 레이블 값 조회
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    fn identity(&self) -> (String, Vec<String>) {
        (
            self.full_name(),
            self.labels.iter().map(|(_, v)| v.clone()).collect(),
        )
    }
}

#[derive(Debug, Default)]
struct SinkState {
    samples: Vec<MetricSample>,
    seen: HashSet<(String, Vec<String>)>,
}

/// 여러 브랜치가 동시에 샘플을 넣는 패스 단위 싱크
///
/// (이름, 레이블 값) 조합이 이미 있으면 해당 샘플은 버리고 경고를 남깁니다.
#[derive(Debug, Default)]
pub struct SampleSink {
    state: Mutex<SinkState>,
}

impl SampleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 샘플 묶음을 한 번에 추가. 추가된 개수를 반환합니다.
    pub fn extend<I>(&self, samples: I) -> usize
    where
        I: IntoIterator<Item = MetricSample>,
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut added = 0;

        for sample in samples {
            let identity = sample.identity();
            if state.seen.contains(&identity) {
                tracing::warn!(
                    metric = %identity.0,
                    labels = ?identity.1,
                    "Dropping duplicate sample"
                );
                continue;
            }
            state.seen.insert(identity);
            state.samples.push(sample);
            added += 1;
        }

        added
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .samples
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 싱크를 비우고 수집된 샘플을 삽입 순서대로 반환
    pub fn drain(&self) -> Vec<MetricSample> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.seen.clear();
        std::mem::take(&mut state.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{host, meta};

    #[test]
    fn test_labels_follow_descriptor_order() {
        let sample = MetricSample::new(&host::UPTIME, ["esx01", "VMware ESXi 8.0.1"], 3600.0);
        assert_eq!(
            sample.labels,
            vec![
                ("hostname", "esx01".to_string()),
                ("os", "VMware ESXi 8.0.1".to_string())
            ]
        );
        assert_eq!(sample.label("os"), Some("VMware ESXi 8.0.1"));
        assert_eq!(sample.full_name(), "vsphere_host_uptime");
    }

    #[test]
    fn test_sink_drops_duplicates() {
        let sink = SampleSink::new();
        let first = MetricSample::new(&host::UPTIME, ["esx01", "ESXi"], 1.0);
        let duplicate = MetricSample::new(&host::UPTIME, ["esx01", "ESXi"], 2.0);
        let other = MetricSample::new(&host::UPTIME, ["esx02", "ESXi"], 3.0);

        assert_eq!(sink.extend(vec![first, duplicate, other]), 2);

        let samples = sink.drain();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 1.0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_sink_distinguishes_suffixes() {
        let sink = SampleSink::new();
        let plain = MetricSample::new(&meta::UP, Vec::<String>::new(), 1.0);
        let suffixed = plain.clone().with_suffix("_count");
        assert_eq!(sink.extend(vec![plain, suffixed]), 2);
    }

    #[test]
    fn test_sink_concurrent_producers() {
        let sink = std::sync::Arc::new(SampleSink::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = std::sync::Arc::clone(&sink);
                std::thread::spawn(move || {
                    let samples = (0..25).map(|j| {
                        MetricSample::new(&host::UPTIME, [format!("esx{}-{}", i, j), "ESXi".into()], 1.0)
                    });
                    sink.extend(samples)
                })
            })
            .collect();

        let added: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(added, 100);
        assert_eq!(sink.len(), 100);
    }
}
