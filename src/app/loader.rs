use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use tracing::{debug, info};

use crate::hierarchy::{FetchError, HierarchyQuery, HierarchySource, RawNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(in crate::app) struct RequestId(u64);

#[cfg(test)]
impl RequestId {
    pub(in crate::app) fn first() -> Self {
        Self(1)
    }
}

pub(in crate::app) struct LoadResponse {
    pub(in crate::app) id: RequestId,
    pub(in crate::app) query: HierarchyQuery,
    pub(in crate::app) result: Result<RawNode, FetchError>,
}

/// Runs fetches in the background; only the most recently issued request
/// is ever handed back.
pub(in crate::app) struct Loader {
    source: Arc<dyn HierarchySource>,
    next_id: u64,
    latest: Option<RequestId>,
    pending: bool,
    discarded: u64,
    tx: Sender<LoadResponse>,
    rx: Receiver<LoadResponse>,
}

impl Loader {
    pub(in crate::app) fn new(source: Arc<dyn HierarchySource>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            next_id: 0,
            latest: None,
            pending: false,
            discarded: 0,
            tx,
            rx,
        }
    }

    pub(in crate::app) fn request(&mut self, query: HierarchyQuery) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.latest = Some(id);
        self.pending = true;
        info!(
            request = id.0,
            depth = query.depth,
            active_node = %query.active_node,
            "fetching hierarchy"
        );

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = source.fetch(&query);
            let _ = tx.send(LoadResponse { id, query, result });
        });

        id
    }

    /// Response to the latest request, once it has arrived. Stale
    /// responses are drained and dropped.
    pub(in crate::app) fn poll(&mut self) -> Option<LoadResponse> {
        loop {
            match self.rx.try_recv() {
                Ok(response) if Some(response.id) == self.latest => {
                    self.pending = false;
                    return Some(response);
                }
                Ok(response) => {
                    self.discarded += 1;
                    debug!(
                        request = response.id.0,
                        latest = self.latest.map(|id| id.0),
                        discarded = self.discarded,
                        "discarding stale hierarchy response"
                    );
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    pub(in crate::app) fn is_pending(&self) -> bool {
        self.pending
    }

    #[cfg(test)]
    pub(in crate::app) fn discarded(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use super::*;

    /// Answers each query only once its gate is opened.
    #[derive(Default)]
    struct GatedSource {
        gates: Mutex<HashMap<String, Receiver<()>>>,
    }

    impl GatedSource {
        fn gate(&self, active_node: &str) -> Sender<()> {
            let (open, gate) = mpsc::channel();
            self.gates
                .lock()
                .expect("gate lock")
                .insert(active_node.to_owned(), gate);
            open
        }
    }

    impl HierarchySource for GatedSource {
        fn fetch(&self, query: &HierarchyQuery) -> Result<RawNode, FetchError> {
            let gate = self
                .gates
                .lock()
                .expect("gate lock")
                .remove(&query.active_node);
            if let Some(gate) = gate {
                gate.recv().map_err(|_| FetchError::Backend("gate dropped".to_owned()))?;
            }
            Ok(RawNode::member(&query.active_node, "People"))
        }
    }

    fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> T {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(value) = poll() {
                return value;
            }
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn name(response: &LoadResponse) -> Option<&str> {
        response.result.as_ref().ok()?.name.as_deref()
    }

    #[test]
    fn later_request_wins_when_the_earlier_one_resolves_last() {
        let source = Arc::new(GatedSource::default());
        let open_a = source.gate("A");
        let open_b = source.gate("B");
        let mut loader = Loader::new(source);

        let first = loader.request(HierarchyQuery::new(2, "A"));
        let second = loader.request(HierarchyQuery::new(2, "B"));
        assert!(first < second);

        open_b.send(()).expect("B waiting");
        let response = wait_for(|| loader.poll());
        assert_eq!(response.id, second);
        assert_eq!(name(&response), Some("B"));
        assert!(!loader.is_pending());

        open_a.send(()).expect("A waiting");
        wait_for(|| {
            assert!(loader.poll().is_none(), "stale response must not surface");
            (loader.discarded() == 1).then_some(())
        });
    }

    #[test]
    fn earlier_response_arriving_first_is_discarded() {
        let source = Arc::new(GatedSource::default());
        let open_a = source.gate("A");
        let open_b = source.gate("B");
        let mut loader = Loader::new(source);

        loader.request(HierarchyQuery::new(1, "A"));
        let second = loader.request(HierarchyQuery::new(3, "B"));

        open_a.send(()).expect("A waiting");
        wait_for(|| {
            assert!(loader.poll().is_none());
            (loader.discarded() == 1).then_some(())
        });
        assert!(loader.is_pending());

        open_b.send(()).expect("B waiting");
        let response = wait_for(|| loader.poll());
        assert_eq!(response.id, second);
        assert_eq!(response.query.depth, 3);
    }

    #[test]
    fn fetch_errors_are_delivered_like_data() {
        struct Failing;
        impl HierarchySource for Failing {
            fn fetch(&self, _query: &HierarchyQuery) -> Result<RawNode, FetchError> {
                Err(FetchError::Backend("no such node".to_owned()))
            }
        }

        let mut loader = Loader::new(Arc::new(Failing));
        loader.request(HierarchyQuery::new(2, "Ghost"));
        let response = wait_for(|| loader.poll());
        assert!(matches!(response.result, Err(FetchError::Backend(_))));
    }
}
