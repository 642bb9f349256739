//! Busy signal shared by long-running operations

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Labels of the operations currently in flight
///
/// Clones share the same signal. Observers get every change through
/// [`BusySignal::subscribe`].
#[derive(Debug, Clone)]
pub struct BusySignal {
    labels: Arc<watch::Sender<Vec<String>>>,
}

impl Default for BusySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl BusySignal {
    pub fn new() -> Self {
        let (labels, _) = watch::channel(Vec::new());
        Self {
            labels: Arc::new(labels),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.labels.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        !self.labels.borrow().is_empty()
    }

    /// Mark `label` busy until the returned guard is dropped
    pub fn begin(&self, label: &str) -> BusyGuard {
        debug!("Busy: {}", label);
        self.labels.send_modify(|labels| labels.push(label.to_string()));
        BusyGuard {
            labels: self.labels.clone(),
            label: label.to_string(),
        }
    }

    /// Run `work` while reporting `label` as busy
    ///
    /// The label is cleared however `work` ends, including cancellation.
    pub async fn report_busy_while<F>(&self, label: &str, work: F) -> F::Output
    where
        F: Future,
    {
        let _guard = self.begin(label);
        work.await
    }
}

#[must_use = "the label is cleared as soon as the guard is dropped"]
#[derive(Debug)]
pub struct BusyGuard {
    labels: Arc<watch::Sender<Vec<String>>>,
    label: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.labels.send_modify(|labels| {
            if let Some(index) = labels.iter().position(|label| *label == self.label) {
                labels.remove(index);
            }
        });
        debug!("Idle: {}", self.label);
    }
}
