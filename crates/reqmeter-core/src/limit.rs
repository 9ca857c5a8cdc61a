//! URI tag cardinality policies.
//!
//! A policy is consulted before the dimension key is built, so a uri that
//! exceeds the budget never reaches the instrument cache under its own name.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::meter::MetricKind;

pub const DEFAULT_MAX_URI_TAGS: usize = 100;
pub const DEFAULT_OVERFLOW_URI: &str = "OVERFLOW";

/// Maps a raw uri to the value used for the `uri` tag.
pub trait UriTagPolicy: Send + Sync {
    fn limit<'a>(&self, kind: MetricKind, uri: &'a str) -> Cow<'a, str>;
}

/// Passes every uri through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl UriTagPolicy for Unbounded {
    fn limit<'a>(&self, _kind: MetricKind, uri: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(uri)
    }
}

/// Whether the uri budget is tracked per metric kind or shared by all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UriTagScope {
    #[default]
    PerMetric,
    Global,
}

#[derive(Default)]
struct Budget {
    seen: DashMap<String, ()>,
    admitted: AtomicUsize,
    warned: AtomicBool,
}

/// Admits the first `max` distinct uris; later new uris collapse to `overflow`.
pub struct MaxUriTags {
    max: usize,
    scope: UriTagScope,
    overflow: String,
    budgets: DashMap<Option<MetricKind>, Budget>,
}

impl MaxUriTags {
    pub fn new(max: usize, scope: UriTagScope, overflow: impl Into<String>) -> Self {
        Self {
            max,
            scope,
            overflow: overflow.into(),
            budgets: DashMap::new(),
        }
    }

    /// Number of distinct uris admitted for `kind` (the shared count in global scope).
    pub fn admitted(&self, kind: MetricKind) -> usize {
        self.budgets
            .get(&self.budget_key(kind))
            .map(|b| b.admitted.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    fn budget_key(&self, kind: MetricKind) -> Option<MetricKind> {
        match self.scope {
            UriTagScope::PerMetric => Some(kind),
            UriTagScope::Global => None,
        }
    }
}

impl Default for MaxUriTags {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_URI_TAGS, UriTagScope::default(), DEFAULT_OVERFLOW_URI)
    }
}

impl UriTagPolicy for MaxUriTags {
    fn limit<'a>(&self, kind: MetricKind, uri: &'a str) -> Cow<'a, str> {
        let key = self.budget_key(kind);
        let budget = match self.budgets.get(&key) {
            Some(budget) => budget,
            None => self.budgets.entry(key).or_default().downgrade(),
        };
        if budget.seen.contains_key(uri) {
            return Cow::Borrowed(uri);
        }

        // The vacant entry holds its shard lock, so one uri is admitted once.
        let limited = match budget.seen.entry(uri.to_string()) {
            Entry::Occupied(_) => Cow::Borrowed(uri),
            Entry::Vacant(slot) => {
                let max = self.max;
                let admitted = budget
                    .admitted
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < max).then_some(n + 1)
                    })
                    .is_ok();
                if admitted {
                    slot.insert(());
                    return Cow::Borrowed(uri);
                }
                drop(slot);
                if !budget.warned.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        max_uri_tags = max,
                        kind = ?kind,
                        scope = ?self.scope,
                        overflow = %self.overflow,
                        "uri tag limit reached; new uris use the overflow label"
                    );
                }
                Cow::Owned(self.overflow.clone())
            }
        };
        drop(budget);
        limited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_after_budget() {
        let policy = MaxUriTags::new(2, UriTagScope::PerMetric, "OVERFLOW");
        let kind = MetricKind::ResponseTime;
        assert_eq!(policy.limit(kind, "/a"), "/a");
        assert_eq!(policy.limit(kind, "/b"), "/b");
        assert_eq!(policy.limit(kind, "/c"), "OVERFLOW");
        // admitted uris keep their label
        assert_eq!(policy.limit(kind, "/a"), "/a");
        assert_eq!(policy.admitted(kind), 2);
    }

    #[test]
    fn per_metric_budgets_are_independent() {
        let policy = MaxUriTags::new(1, UriTagScope::PerMetric, "X");
        assert_eq!(policy.limit(MetricKind::ResponseTime, "/a"), "/a");
        assert_eq!(policy.limit(MetricKind::DataSentTime, "/b"), "/b");
        assert_eq!(policy.limit(MetricKind::ResponseTime, "/b"), "X");
    }

    #[test]
    fn global_budget_is_shared() {
        let policy = MaxUriTags::new(1, UriTagScope::Global, "X");
        assert_eq!(policy.limit(MetricKind::ResponseTime, "/a"), "/a");
        assert_eq!(policy.limit(MetricKind::DataSentTime, "/a"), "/a");
        assert_eq!(policy.limit(MetricKind::DataSentTime, "/b"), "X");
        assert_eq!(policy.admitted(MetricKind::Errors), 1);
    }

    #[test]
    fn concurrent_new_uris_never_exceed_budget() {
        let policy = MaxUriTags::new(10, UriTagScope::PerMetric, "X");
        std::thread::scope(|s| {
            for t in 0..8 {
                let policy = &policy;
                s.spawn(move || {
                    for i in 0..50 {
                        let uri = format!("/t{t}/{i}");
                        let _ = policy.limit(MetricKind::ResponseTime, &uri);
                    }
                });
            }
        });
        assert_eq!(policy.admitted(MetricKind::ResponseTime), 10);
    }
}
