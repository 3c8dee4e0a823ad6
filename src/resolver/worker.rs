//! Background resolution worker.
//!
//! Processes resolution requests on a dedicated thread and sends the results
//! back through the channel it was spawned with. The result type is generic
//! so results can be posted straight into a caller's own input queue.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::{AdResolver, ResolveError};
use crate::playlist::{AdDescriptor, EntryId};

/// Outcome of resolving one ad reference.
#[derive(Debug)]
pub struct Resolution {
    /// Reference entry the request was made for
    pub reference: EntryId,
    pub url: String,
    pub result: Result<Vec<AdDescriptor>, ResolveError>,
}

struct Request {
    reference: EntryId,
    url: String,
}

/// Owns the resolution thread. Dropping the worker closes the request channel
/// and joins the thread.
pub struct ResolverWorker {
    request_tx: Option<Sender<Request>>,
    handle: Option<JoinHandle<()>>,
}

impl ResolverWorker {
    pub fn spawn<T>(resolver: Arc<dyn AdResolver>, results: Sender<T>) -> Self
    where
        T: From<Resolution> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("adseq-resolver".to_string())
            .spawn(move || worker_loop(request_rx, results, resolver.as_ref()))
            .map_err(|e| warn!(error = %e, "Failed to start resolver thread"))
            .ok();
        Self {
            request_tx: handle.as_ref().map(|_| request_tx),
            handle,
        }
    }

    /// Queue `url` for resolution on behalf of `reference`.
    pub fn request(&self, reference: EntryId, url: impl Into<String>) -> Result<(), ResolveError> {
        let tx = self
            .request_tx
            .as_ref()
            .ok_or(ResolveError::WorkerUnavailable)?;
        tx.send(Request {
            reference,
            url: url.into(),
        })
        .map_err(|_| ResolveError::WorkerUnavailable)
    }
}

impl Drop for ResolverWorker {
    fn drop(&mut self) {
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Resolve requests until the request channel closes or nobody listens for
/// results any more.
fn worker_loop<T: From<Resolution>>(
    request_rx: Receiver<Request>,
    result_tx: Sender<T>,
    resolver: &dyn AdResolver,
) {
    while let Ok(Request { reference, url }) = request_rx.recv() {
        debug!(reference = %reference, url = %url, "Resolving ad reference");
        let result = resolver.resolve(&url);
        if result_tx
            .send(T::from(Resolution {
                reference,
                url,
                result,
            }))
            .is_err()
        {
            break;
        }
    }
}
