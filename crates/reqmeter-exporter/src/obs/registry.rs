//! In-process meter registry with Prometheus text rendering.
//!
//! Meters are keyed by [`MeterId`] in a `DashMap` and hold only atomics, so
//! recording never takes a lock once the recorder has cached the handle.
//! Histogram buckets are fixed in microseconds to avoid floating point math.
//! Names and tag keys are sanitized at render time (`.` becomes `_`).

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use reqmeter_core::error::{ReqMeterError, Result};
use reqmeter_core::meter::{Counter, DistributionSummary, MeterId, MeterRegistry, Timer};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Prometheus metric and label names allow `[a-zA-Z0-9_]` only.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn label_str(tags: &[(String, String)]) -> String {
    tags.iter()
        .map(|(k, v)| format!("{}=\"{}\"", sanitize(k), escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn fetch_max(cell: &AtomicU64, v: u64) {
    cell.fetch_max(v, Ordering::Relaxed);
}

/// Add that sticks at `u64::MAX` instead of wrapping.
fn saturating_add(cell: &AtomicU64, v: u64) {
    let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
        Some(n.saturating_add(v))
    });
}

// Fixed Buckets in Microseconds (µs)
// 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s
const BUCKETS_MICROS: [u64; 9] = [
    100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000,
];

/// Timer backed by a cumulative microsecond histogram.
#[derive(Default)]
pub struct AtomicTimer {
    count: AtomicU64,
    sum: AtomicU64,
    max: AtomicU64,
    buckets: [AtomicU64; 9],
}

impl Timer for AtomicTimer {
    fn record(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        self.count.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.sum, micros);
        fetch_max(&self.max, micros);

        // Cumulative buckets: every bucket at or above the value
        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl AtomicTimer {
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Duration {
        Duration::from_micros(self.sum.load(Ordering::Relaxed))
    }

    pub fn max(&self) -> Duration {
        Duration::from_micros(self.max.load(Ordering::Relaxed))
    }

    pub fn mean(&self) -> Duration {
        match self.count() {
            0 => Duration::ZERO,
            n => Duration::from_micros(self.sum.load(Ordering::Relaxed) / n),
        }
    }

    fn render(&self, name: &str, labels: &str, out: &mut String) {
        let prefix = if labels.is_empty() { String::new() } else { format!("{labels},") };
        for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
            let count = self.buckets[i].load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {count}");
        }
        let count = self.count();
        let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
        let _ = writeln!(out, "{name}_sum{{{labels}}} {}", self.sum.load(Ordering::Relaxed));
        let _ = writeln!(out, "{name}_count{{{labels}}} {count}");
    }
}

/// Amount summary: count, total and max.
#[derive(Default)]
pub struct AtomicSummary {
    count: AtomicU64,
    total: AtomicU64,
    max: AtomicU64,
}

impl DistributionSummary for AtomicSummary {
    fn record(&self, amount: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total, amount);
        fetch_max(&self.max, amount);
    }
}

impl AtomicSummary {
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl Counter for AtomicCounter {
    fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }
}

impl AtomicCounter {
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeterType {
    Timer,
    Summary,
    Counter,
}

#[derive(Clone)]
enum Meter {
    Timer(Arc<AtomicTimer>),
    Summary(Arc<AtomicSummary>),
    Counter(Arc<AtomicCounter>),
}

/// Registry shared by the recorder (writes) and the `/metrics` handler (reads).
#[derive(Default)]
pub struct PrometheusRegistry {
    meters: DashMap<MeterId, Meter>,
    types: DashMap<String, MeterType>,
}

impl PrometheusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    /// Concrete timer lookup (tests and diagnostics).
    pub fn find_timer(&self, id: &MeterId) -> Option<Arc<AtomicTimer>> {
        match self.meters.get(id)?.value() {
            Meter::Timer(t) => Some(Arc::clone(t)),
            _ => None,
        }
    }

    pub fn find_summary(&self, id: &MeterId) -> Option<Arc<AtomicSummary>> {
        match self.meters.get(id)?.value() {
            Meter::Summary(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    pub fn find_counter(&self, id: &MeterId) -> Option<Arc<AtomicCounter>> {
        match self.meters.get(id)?.value() {
            Meter::Counter(c) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// One name maps to one meter type for the registry's lifetime.
    fn claim(&self, name: &str, ty: MeterType) -> Result<()> {
        let existing = *self.types.entry(name.to_string()).or_insert(ty);
        if existing != ty {
            tracing::warn!(meter = %name, ?existing, requested = ?ty, "meter type conflict");
            return Err(ReqMeterError::Registry(format!(
                "meter {name} is registered as {existing:?}, not {ty:?}"
            )));
        }
        Ok(())
    }

    fn get_or_insert(&self, id: &MeterId, make: impl FnOnce() -> Meter) -> Meter {
        if let Some(m) = self.meters.get(id) {
            return m.value().clone();
        }
        self.meters.entry(id.clone()).or_insert_with(make).value().clone()
    }

    /// Render all meters in Prometheus text exposition format, grouped by name.
    pub fn render(&self) -> String {
        let mut entries: Vec<(MeterId, Meter)> = self
            .meters
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        entries.sort_by(|a, b| (&a.0.name, &a.0.tags).cmp(&(&b.0.name, &b.0.tags)));

        let mut out = String::new();
        let mut current: Option<String> = None;
        for (id, meter) in &entries {
            let base = sanitize(&id.name);
            let name = match meter {
                Meter::Timer(_) => format!("{base}_micros"),
                Meter::Summary(_) => match id.base_unit {
                    Some(unit) => format!("{base}_{unit}"),
                    None => base,
                },
                Meter::Counter(_) => format!("{base}_total"),
            };
            if current.as_deref() != Some(name.as_str()) {
                if !id.description.is_empty() {
                    let _ = writeln!(out, "# HELP {name} {}", id.description);
                }
                let ty = match meter {
                    Meter::Timer(_) => "histogram",
                    Meter::Summary(_) => "summary",
                    Meter::Counter(_) => "counter",
                };
                let _ = writeln!(out, "# TYPE {name} {ty}");
                current = Some(name.clone());
            }

            let labels = label_str(&id.tags);
            match meter {
                Meter::Timer(t) => t.render(&name, &labels, &mut out),
                Meter::Summary(s) => {
                    let _ = writeln!(out, "{name}_sum{{{labels}}} {}", s.total());
                    let _ = writeln!(out, "{name}_count{{{labels}}} {}", s.count());
                }
                Meter::Counter(c) => {
                    let _ = writeln!(out, "{name}{{{labels}}} {}", c.get());
                }
            }
        }
        out
    }
}

impl MeterRegistry for PrometheusRegistry {
    fn timer(&self, id: &MeterId) -> Result<Arc<dyn Timer>> {
        self.claim(&id.name, MeterType::Timer)?;
        match self.get_or_insert(id, || Meter::Timer(Arc::default())) {
            Meter::Timer(t) => Ok(t),
            _ => Err(ReqMeterError::Internal(format!("meter {} is not a timer", id.name))),
        }
    }

    fn summary(&self, id: &MeterId) -> Result<Arc<dyn DistributionSummary>> {
        self.claim(&id.name, MeterType::Summary)?;
        match self.get_or_insert(id, || Meter::Summary(Arc::default())) {
            Meter::Summary(s) => Ok(s),
            _ => Err(ReqMeterError::Internal(format!("meter {} is not a summary", id.name))),
        }
    }

    fn counter(&self, id: &MeterId) -> Result<Arc<dyn Counter>> {
        self.claim(&id.name, MeterType::Counter)?;
        match self.get_or_insert(id, || Meter::Counter(Arc::default())) {
            Meter::Counter(c) => Ok(c),
            _ => Err(ReqMeterError::Internal(format!("meter {} is not a counter", id.name))),
        }
    }
}
