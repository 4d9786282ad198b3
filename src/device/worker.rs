//! Device backend worker thread
//!
//! The OS backend lives on one dedicated thread for its whole life (WMI/COM
//! objects are bound to the thread that created them). Callers hand it jobs
//! over a channel and wait for the answer with a deadline, so a hung device
//! stack degrades to `Timeout` instead of freezing the tray.
//!
//! Jobs run one at a time in submission order. A timed-out job still runs to
//! completion on the worker and its answer is dropped, so a state change that
//! timed out may take effect later. Until that job finishes, new calls fail
//! with `Timeout` at once rather than queueing behind it; commands issued
//! while the backend is stuck are never replayed.

use crate::device::toggle::HardwareIdMatch;
use crate::device::{DeviceBackend, DeviceRecord};
use crate::error::{HandsOffError, Result, StringError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

type Job = Box<dyn FnOnce(&dyn DeviceBackend) + Send>;

/// Runs a [`DeviceBackend`] on its own thread with a per-call timeout
pub struct DeviceWorker {
    jobs: Option<mpsc::Sender<Job>>,
    timeout: Duration,
    /// Jobs sent but not yet finished
    in_flight: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
}

impl DeviceWorker {
    /// Spawn the worker; `factory` builds the backend on the worker thread
    ///
    /// If the factory fails every call reports `QueryFailed`.
    pub fn spawn<F, B>(factory: F, timeout: Duration) -> Result<Self>
    where
        F: FnOnce() -> Result<B> + Send + 'static,
        B: DeviceBackend + 'static,
    {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name("device-backend".to_string())
            .spawn(move || {
                let backend = match factory() {
                    Ok(backend) => backend,
                    Err(e) => {
                        error!("Failed to initialize device backend: {}", e);
                        // Dropping queued jobs disconnects their reply channels
                        for job in jobs_rx {
                            drop(job);
                        }
                        return;
                    }
                };

                info!("Device backend worker started");
                for job in jobs_rx {
                    job(&backend);
                }
                debug!("Device backend worker exiting");
            })?;

        Ok(Self {
            jobs: Some(jobs_tx),
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
            handle: Some(handle),
        })
    }

    /// Per-call deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DeviceBackend) -> Result<T> + Send + 'static,
    {
        let sender = self.jobs.as_ref().ok_or_else(worker_unavailable)?;
        if self.in_flight.load(Ordering::Acquire) > 0 {
            warn!("Device backend still busy with a timed-out call, refusing new call");
            return Err(HandsOffError::Timeout(self.timeout));
        }

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let reply = Reply::new(&self.in_flight, reply_tx);
        let job: Job = Box::new(move |backend| reply.send(f(backend)));

        sender.send(job).map_err(|_| worker_unavailable())?;

        match reply_rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!("Device backend call timed out after {:?}", self.timeout);
                Err(HandsOffError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(worker_unavailable()),
        }
    }
}

/// Counts a job as in flight until it has run or been discarded
struct Pending(Arc<AtomicUsize>);

impl Drop for Pending {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Reply end of a job; the in-flight count drops before the caller is woken
struct Reply<T> {
    pending: Pending,
    tx: mpsc::SyncSender<Result<T>>,
}

impl<T> Reply<T> {
    fn new(counter: &Arc<AtomicUsize>, tx: mpsc::SyncSender<Result<T>>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self {
            pending: Pending(Arc::clone(counter)),
            tx,
        }
    }

    fn send(self, result: Result<T>) {
        let Self { pending, tx } = self;
        drop(pending);
        // The caller may have given up already
        let _ = tx.send(result);
    }
}

fn worker_unavailable() -> HandsOffError {
    HandsOffError::QueryFailed(StringError::new("device backend is unavailable"))
}

impl DeviceBackend for DeviceWorker {
    fn enumerate(&self, class_guid: &str) -> Result<Vec<DeviceRecord>> {
        let class_guid = class_guid.to_string();
        self.call(move |backend| backend.enumerate(&class_guid))
    }

    fn find_by_instance_id(&self, instance_id: &str) -> Result<Option<DeviceRecord>> {
        let instance_id = instance_id.to_string();
        self.call(move |backend| backend.find_by_instance_id(&instance_id))
    }

    fn set_enabled(&self, matcher: &HardwareIdMatch, enabled: bool) -> Result<()> {
        let matcher = matcher.clone();
        self.call(move |backend| backend.set_enabled(&matcher, enabled))
    }
}

impl Drop for DeviceWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                // Possibly stuck in the OS; don't block shutdown on it
                debug!("Detaching device backend worker");
            }
        }
    }
}
