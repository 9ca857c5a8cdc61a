//! Per-kind instrument caches with single-creation get-or-create.
//!
//! Each metric kind owns a sharded map (`DashMap`). A lookup for a known key
//! takes only a shard read lock. Creation goes through the entry API, which
//! holds the write lock of the key's shard while the factory runs: the factory
//! runs at most once per key and unrelated shards are never blocked.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Result;
use crate::key::DimensionKey;
use crate::meter::{Counter, DistributionSummary, MetricKind, Timer};

/// One map from dimension key to instrument.
pub struct MeterCache<M> {
    map: DashMap<DimensionKey, M>,
}

impl<M> Default for MeterCache<M> {
    fn default() -> Self {
        Self { map: DashMap::new() }
    }
}

impl<M: Clone> MeterCache<M> {
    /// Return the instrument cached for `key`, creating it with `factory` if absent.
    ///
    /// A factory error is returned as-is and nothing is cached for the key.
    pub fn get_or_create<F>(&self, key: DimensionKey, factory: F) -> Result<M>
    where
        F: FnOnce(&DimensionKey) -> Result<M>,
    {
        if let Some(m) = self.map.get(&key) {
            return Ok(m.value().clone());
        }
        match self.map.entry(key) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(slot) => {
                let meter = factory(slot.key())?;
                slot.insert(meter.clone());
                Ok(meter)
            }
        }
    }

    pub fn get(&self, key: &DimensionKey) -> Option<M> {
        self.map.get(key).map(|m| m.value().clone())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A cached instrument of any kind.
#[derive(Clone)]
pub enum Instrument {
    Timer(Arc<dyn Timer>),
    Summary(Arc<dyn DistributionSummary>),
    Counter(Arc<dyn Counter>),
}

/// The caches of one recorder, one per [`MetricKind`].
#[derive(Default)]
pub struct InstrumentCache {
    data_received_time: MeterCache<Arc<dyn Timer>>,
    data_sent_time: MeterCache<Arc<dyn Timer>>,
    response_time: MeterCache<Arc<dyn Timer>>,
    data_received: MeterCache<Arc<dyn DistributionSummary>>,
    data_sent: MeterCache<Arc<dyn DistributionSummary>>,
    errors: MeterCache<Arc<dyn Counter>>,
}

impl InstrumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create across kinds. The factory must produce the instrument
    /// variant matching `kind`; a mismatch is reported as an internal error.
    pub fn get_or_create<F>(
        &self,
        kind: MetricKind,
        key: DimensionKey,
        factory: F,
    ) -> Result<Instrument>
    where
        F: FnOnce(&DimensionKey) -> Result<Instrument>,
    {
        match kind {
            MetricKind::DataReceivedTime | MetricKind::DataSentTime | MetricKind::ResponseTime => {
                self.timer(kind, key, |k| match factory(k)? {
                    Instrument::Timer(t) => Ok(t),
                    _ => Err(mismatch(kind)),
                })
                .map(Instrument::Timer)
            }
            MetricKind::DataReceived | MetricKind::DataSent => {
                self.summary(kind, key, |k| match factory(k)? {
                    Instrument::Summary(s) => Ok(s),
                    _ => Err(mismatch(kind)),
                })
                .map(Instrument::Summary)
            }
            MetricKind::Errors => self
                .counter(key, |k| match factory(k)? {
                    Instrument::Counter(c) => Ok(c),
                    _ => Err(mismatch(kind)),
                })
                .map(Instrument::Counter),
        }
    }

    /// Typed get-or-create for the timer kinds.
    pub fn timer<F>(
        &self,
        kind: MetricKind,
        key: DimensionKey,
        factory: F,
    ) -> Result<Arc<dyn Timer>>
    where
        F: FnOnce(&DimensionKey) -> Result<Arc<dyn Timer>>,
    {
        match kind {
            MetricKind::DataReceivedTime => self.data_received_time.get_or_create(key, factory),
            MetricKind::DataSentTime => self.data_sent_time.get_or_create(key, factory),
            MetricKind::ResponseTime => self.response_time.get_or_create(key, factory),
            other => Err(mismatch(other)),
        }
    }

    /// Typed get-or-create for the byte summary kinds.
    pub fn summary<F>(
        &self,
        kind: MetricKind,
        key: DimensionKey,
        factory: F,
    ) -> Result<Arc<dyn DistributionSummary>>
    where
        F: FnOnce(&DimensionKey) -> Result<Arc<dyn DistributionSummary>>,
    {
        match kind {
            MetricKind::DataReceived => self.data_received.get_or_create(key, factory),
            MetricKind::DataSent => self.data_sent.get_or_create(key, factory),
            other => Err(mismatch(other)),
        }
    }

    pub fn counter<F>(&self, key: DimensionKey, factory: F) -> Result<Arc<dyn Counter>>
    where
        F: FnOnce(&DimensionKey) -> Result<Arc<dyn Counter>>,
    {
        self.errors.get_or_create(key, factory)
    }

    /// Number of instruments cached for `kind`.
    pub fn len(&self, kind: MetricKind) -> usize {
        match kind {
            MetricKind::DataReceivedTime => self.data_received_time.len(),
            MetricKind::DataSentTime => self.data_sent_time.len(),
            MetricKind::ResponseTime => self.response_time.len(),
            MetricKind::DataReceived => self.data_received.len(),
            MetricKind::DataSent => self.data_sent.len(),
            MetricKind::Errors => self.errors.len(),
        }
    }

    pub fn total_len(&self) -> usize {
        MetricKind::ALL.iter().map(|k| self.len(*k)).sum()
    }
}

fn mismatch(kind: MetricKind) -> crate::error::ReqMeterError {
    crate::error::ReqMeterError::Internal(format!(
        "instrument type does not match metric kind {kind:?}"
    ))
}
