//! Background cache for slow or unreliable sensors.
//!
//! The DHT11 climate sensor and the MH-Z19B CO2 module both fail or stall
//! often enough that reading them inline would stretch the control cycle.
//! A [`SensorCache`] owns the sensor on its own thread, polls it at a fixed
//! period, and publishes the last *successful* reading.  The control loop
//! calls [`SensorCache::get`], which never blocks on the sensor.
//!
//! ```text
//!  poll thread ──read()──▶ Ok(v) ──publish──▶ ┌──────────────┐
//!                          Err/panic ─ skip   │ Cell<Option> │ ◀── get() (control loop)
//!                                             └──────────────┘
//! ```
//!
//! The value lives in a critical-section cell, so a reader sees either the
//! old or the new record, never half of each.

use core::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use crate::app::ports::SensorSource;
use crate::error::{Error, Result, SensorError};

/// Default poll period.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(2);

/// Poll counters since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub successes: u32,
    pub failures: u32,
}

/// State shared between the poll thread (single writer) and readers.
struct Shared<T> {
    value: Mutex<CriticalSectionRawMutex, Cell<Option<T>>>,
    running: AtomicBool,
    successes: AtomicU32,
    failures: AtomicU32,
}

impl<T: Copy> Shared<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(Cell::new(None)),
            running: AtomicBool::new(false),
            successes: AtomicU32::new(0),
            failures: AtomicU32::new(0),
        }
    }

    fn publish(&self, value: T) {
        self.value.lock(|cell| cell.set(Some(value)));
        self.successes.fetch_add(1, Ordering::Release);
    }

    fn load(&self) -> Option<T> {
        self.value.lock(Cell::get)
    }
}

/// Last-good-value cache around one sensor.
pub struct SensorCache<T> {
    name: &'static str,
    period: Duration,
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Copy + Send + 'static> SensorCache<T> {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            shared: Arc::new(Shared::new()),
            worker: None,
        }
    }

    /// Move `source` onto a dedicated poll thread.  A cache is started once;
    /// further calls are ignored.
    pub fn start<S>(&mut self, source: S) -> Result<()>
    where
        S: SensorSource<Reading = T> + Send + 'static,
    {
        if self.worker.is_some() {
            warn!("{}: cache already started", self.name);
            return Ok(());
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let name = self.name;
        let period = self.period;

        let handle = thread::Builder::new()
            .name(format!("cache-{name}"))
            .spawn(move || poll_loop(name, &shared, source, period))
            .map_err(|_| {
                self.shared.running.store(false, Ordering::Release);
                Error::Init("sensor cache thread spawn failed")
            })?;

        info!("{}: polling every {:?}", self.name, self.period);
        self.worker = Some(handle);
        Ok(())
    }

    /// Ask the poll thread to exit.  Returns immediately; a read already in
    /// flight may still complete and publish.
    pub fn stop(&mut self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            debug!("{}: stop requested", self.name);
        }
        if let Some(worker) = &self.worker {
            worker.thread().unpark();
        }
    }

    /// Last successful reading, or `None` if no poll has succeeded yet.
    pub fn get(&self) -> Option<T> {
        self.shared.load()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            successes: self.shared.successes.load(Ordering::Acquire),
            failures: self.shared.failures.load(Ordering::Acquire),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Drop for SensorCache<T> {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(worker) = &self.worker {
            worker.thread().unpark();
        }
    }
}

// ── Poll thread ───────────────────────────────────────────────

fn poll_loop<S: SensorSource>(name: &str, shared: &Shared<S::Reading>, mut source: S, period: Duration) {
    while shared.running.load(Ordering::Acquire) {
        poll_once(name, shared, &mut source);
        sleep_unless_stopped(shared, period);
    }
    debug!("{name}: poll thread exited");
}

/// One read attempt.  Only a successful read touches the published value.
fn poll_once<S: SensorSource>(name: &str, shared: &Shared<S::Reading>, source: &mut S) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.read()))
        .unwrap_or(Err(SensorError::DriverPanic));

    match outcome {
        Ok(value) => shared.publish(value),
        Err(e) => {
            shared.failures.fetch_add(1, Ordering::Release);
            debug!("{name}: read failed ({e}), keeping last value");
        }
    }
}

/// Park for `period`, waking early only when stopped.
fn sleep_unless_stopped<T>(shared: &Shared<T>, period: Duration) {
    let deadline = Instant::now() + period;
    loop {
        if !shared.running.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}
