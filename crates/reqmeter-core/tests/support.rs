//! In-memory meter registry shared by recorder tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;

use reqmeter_core::meter::{Counter, DistributionSummary, MeterId, MeterRegistry, Timer};
use reqmeter_core::{ReqMeterError, Result};

#[derive(Default)]
pub struct SampleTimer {
    pub samples: Mutex<Vec<Duration>>,
}

impl Timer for SampleTimer {
    fn record(&self, duration: Duration) {
        self.samples.lock().unwrap().push(duration);
    }
}

impl SampleTimer {
    pub fn count(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    pub fn mean(&self) -> Duration {
        let samples = self.samples.lock().unwrap();
        samples.iter().sum::<Duration>() / samples.len() as u32
    }
}

#[derive(Default)]
pub struct SampleSummary {
    pub total: AtomicU64,
    pub count: AtomicU64,
}

impl DistributionSummary for SampleSummary {
    fn record(&self, amount: u64) {
        self.total.fetch_add(amount, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Default)]
pub struct SampleCounter {
    pub value: AtomicU64,
}

impl Counter for SampleCounter {
    fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }
}

/// Always creates a fresh instrument, so a second registration for the same
/// id would show up as a second entry in `timers`.
#[derive(Default)]
pub struct RecordingRegistry {
    pub timers: Mutex<Vec<(MeterId, Arc<SampleTimer>)>>,
    pub summaries: DashMap<MeterId, Arc<SampleSummary>>,
    pub counters: DashMap<MeterId, Arc<SampleCounter>>,
    pub registrations: AtomicUsize,
    pub reject: AtomicBool,
}

impl RecordingRegistry {
    pub fn timers_named(&self, name: &str) -> Vec<(MeterId, Arc<SampleTimer>)> {
        self.timers
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id.name == name)
            .cloned()
            .collect()
    }

    pub fn only_timer(&self, name: &str) -> (MeterId, Arc<SampleTimer>) {
        let mut found = self.timers_named(name);
        assert_eq!(found.len(), 1, "expected exactly one timer named {name}");
        found.remove(0)
    }

    fn check(&self) -> Result<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ReqMeterError::Registry("registry closed".into()));
        }
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MeterRegistry for RecordingRegistry {
    fn timer(&self, id: &MeterId) -> Result<Arc<dyn Timer>> {
        self.check()?;
        let timer = Arc::new(SampleTimer::default());
        self.timers.lock().unwrap().push((id.clone(), Arc::clone(&timer)));
        Ok(timer)
    }

    fn summary(&self, id: &MeterId) -> Result<Arc<dyn DistributionSummary>> {
        self.check()?;
        let summary = Arc::new(SampleSummary::default());
        self.summaries.insert(id.clone(), Arc::clone(&summary));
        Ok(summary)
    }

    fn counter(&self, id: &MeterId) -> Result<Arc<dyn Counter>> {
        self.check()?;
        let counter = Arc::new(SampleCounter::default());
        self.counters.insert(id.clone(), Arc::clone(&counter));
        Ok(counter)
    }
}
