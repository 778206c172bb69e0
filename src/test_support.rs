//! In-process page source for exercising the engine without HTTP

use crate::error::{Error, Result};
use crate::fetch::FetchWindow;
use crate::source::{Page, PageSource};
use crate::types::RawRecord;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type FailRule = Box<dyn Fn(&FetchWindow, &[i64]) -> Option<Error> + Send + Sync>;
type DelayRule = Box<dyn Fn(&FetchWindow) -> Duration + Send + Sync>;

/// Serves `{"id": n, "name": "record-n"}` records for a sorted id list,
/// honouring the id filter, with scriptable failures and latency
pub(crate) struct MockSource {
    ids: Mutex<Vec<i64>>,
    calls: AtomicUsize,
    windows: Mutex<Vec<FetchWindow>>,
    fail: FailRule,
    delay: DelayRule,
}

impl MockSource {
    pub(crate) fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        Self {
            ids: Mutex::new(ids),
            calls: AtomicUsize::new(0),
            windows: Mutex::new(Vec::new()),
            fail: Box::new(|_, _| None),
            delay: Box::new(|_| Duration::ZERO),
        }
    }

    /// Fail windows for which `rule` returns an error; the rule also sees
    /// the ids the window would have returned
    pub(crate) fn failing_when(
        mut self,
        rule: impl Fn(&FetchWindow, &[i64]) -> Option<Error> + Send + Sync + 'static,
    ) -> Self {
        self.fail = Box::new(rule);
        self
    }

    pub(crate) fn delayed_by(
        mut self,
        rule: impl Fn(&FetchWindow) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Box::new(rule);
        self
    }

    /// Fail any window that would contain `poisoned`
    pub(crate) fn poisoned(self, poisoned: i64) -> Self {
        self.failing_when(move |_, ids| {
            ids.contains(&poisoned)
                .then(|| Error::http_status(500, "serialization failure"))
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn windows(&self) -> Vec<FetchWindow> {
        self.windows.lock().unwrap().clone()
    }

    /// Insert more upstream records
    pub(crate) fn extend(&self, more: impl IntoIterator<Item = i64>) {
        let mut ids = self.ids.lock().unwrap();
        ids.extend(more);
        ids.sort_unstable();
        ids.dedup();
    }

    fn select(&self, window: &FetchWindow) -> (Vec<i64>, bool) {
        let ids = self.ids.lock().unwrap();
        let filtered: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| window.id_cursor.map_or(true, |cursor| *id > cursor))
            .collect();
        let start = (window.skip as usize).min(filtered.len());
        let end = (start + window.take as usize).min(filtered.len());
        (filtered[start..end].to_vec(), end < filtered.len())
    }
}

pub(crate) fn record(id: i64) -> RawRecord {
    RawRecord::from_value(json!({"id": id, "name": format!("record-{id}")})).unwrap()
}

#[async_trait]
impl PageSource for MockSource {
    async fn query_page(&self, window: &FetchWindow) -> Result<Page> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().push(window.clone());

        let delay = (self.delay)(window);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (ids, more) = self.select(window);
        if let Some(err) = (self.fail)(window, &ids) {
            return Err(err);
        }

        Ok(Page::new(ids.into_iter().map(record).collect(), more))
    }
}
