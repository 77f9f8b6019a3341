use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Process-wide count of successfully completed (status 200) requests.
///
/// Written by every connection on the dispatcher thread and read by the
/// reporter thread; sequentially consistent atomics are the only
/// synchronization the two sides need.
#[derive(Debug, Default)]
pub struct RequestCounter {
    count: AtomicU64,
}

impl RequestCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// Record one successful request. Monotonic; never decremented.
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn value(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

/// Requests per second over a sampling window.
pub(crate) fn throughput(previous: u64, current: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    (current - previous) as f64 / secs
}

/// Periodic throughput reporter.
///
/// Runs on its own OS thread, decoupled from the event loop: each tick it
/// samples the shared counter and the wall clock, prints
/// `requests-per-second = <rate>` for the window since the previous tick,
/// then rebaselines. The first window starts at [`Reporter::spawn`].
#[derive(Debug)]
pub struct Reporter {
    counter: Arc<RequestCounter>,
    interval: Duration,
}

impl Reporter {
    pub fn new(counter: Arc<RequestCounter>, interval: Duration) -> Self {
        Self { counter, interval }
    }

    /// Start the reporter thread. Dropping the handle leaves the thread
    /// running for the life of the process; call [`ReporterHandle::stop`]
    /// to terminate it cleanly instead.
    pub fn spawn(self) -> ReporterHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread = thread::spawn(move || {
            let mut previous_count = self.counter.value();
            let mut previous_instant = Instant::now();
            loop {
                thread::sleep(self.interval);
                if thread_stop.load(Ordering::SeqCst) {
                    break;
                }
                let current_count = self.counter.value();
                let current_instant = Instant::now();
                let rate = throughput(
                    previous_count,
                    current_count,
                    current_instant - previous_instant,
                );
                println!("requests-per-second = {:.1}", rate);
                previous_count = current_count;
                previous_instant = current_instant;
            }
        });
        ReporterHandle { stop, thread }
    }
}

/// Cancellation handle for a running [`Reporter`].
#[derive(Debug)]
pub struct ReporterHandle {
    stop: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

impl ReporterHandle {
    /// Request the reporter thread to exit and wait for it. The thread
    /// notices the flag at its next tick.
    pub fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.thread.join();
    }
}
