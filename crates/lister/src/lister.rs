use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use fscrawl_feed::{DocumentAcceptor, DocumentContext};
use fscrawl_filters::FilePatternMatcher;
use fscrawl_vfs::{Credentials, PathParser};
use tracing::{debug, info, warn};

use crate::schedule::{Clock, TraversalSchedule};
use crate::service::TraversalService;
use crate::traverser::{Traverser, TraverserConfig};

/// Stand-in for an unbounded wait; any control message cuts it short.
const INFINITE_SLEEP: Duration = Duration::from_secs(i32::MAX as u64);

/// Lister-level tuning, fixed at startup.
#[derive(Clone, Debug)]
pub struct ListerSettings {
    /// Roots to crawl; one traverser each.
    pub start_paths: Vec<String>,
    /// Traversers running concurrently per cycle.
    pub thread_pool_size: usize,
    /// Per-traverser tuning.
    pub traverser: TraverserConfig,
}

impl ListerSettings {
    /// Settings for the given roots with default tuning.
    #[must_use]
    pub fn new(start_paths: Vec<String>) -> Self {
        Self {
            start_paths,
            thread_pool_size: 10,
            traverser: TraverserConfig::default(),
        }
    }
}

enum Control {
    ScheduleChanged(Arc<dyn TraversalSchedule>),
    Shutdown,
}

enum Wake {
    Elapsed,
    ScheduleChanged,
    Shutdown,
}

enum SleepKind {
    /// Wait for the schedule window to open.
    Schedule,
    /// Wait the schedule's retry delay after a clean cycle.
    Retry,
    /// Wait the fixed error delay after a failed cycle.
    Error,
}

type SharedService = Arc<Mutex<Arc<TraversalService>>>;

/// Remote control for a running [`FileLister`].
///
/// Cheap to clone and safe to use from any thread. Messages wake the lister
/// from whatever sleep it is in.
#[derive(Clone)]
pub struct ListerHandle {
    tx: Sender<Control>,
    current: SharedService,
}

impl ListerHandle {
    /// Installs a new schedule; the lister tears down its worker pool and
    /// restarts the traversers under the new schedule.
    pub fn set_traversal_schedule(&self, schedule: Arc<dyn TraversalSchedule>) {
        let _ = self.tx.send(Control::ScheduleChanged(schedule));
    }

    /// Requests shutdown. Sticky: in-flight traversers exit cooperatively
    /// and the lister finalizes by cancelling the acceptor.
    pub fn shutdown(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown_now();
        let _ = self.tx.send(Control::Shutdown);
    }
}

/// Runs every configured root's traverser under a shared schedule.
///
/// Single-threaded itself; each cycle dispatches the traversers onto a
/// bounded worker pool and waits for all of them before sleeping.
pub struct FileLister {
    parser: PathParser,
    context: DocumentContext,
    credentials: Option<Credentials>,
    matcher: FilePatternMatcher,
    acceptor: Arc<dyn DocumentAcceptor>,
    schedule: Arc<dyn TraversalSchedule>,
    clock: Arc<dyn Clock>,
    settings: ListerSettings,
    control_rx: Receiver<Control>,
    current: SharedService,
    service: Arc<TraversalService>,
    traversers: Vec<Traverser>,
}

impl FileLister {
    /// Creates a lister and its control handle.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        parser: PathParser,
        context: DocumentContext,
        credentials: Option<Credentials>,
        matcher: FilePatternMatcher,
        acceptor: Arc<dyn DocumentAcceptor>,
        schedule: Arc<dyn TraversalSchedule>,
        clock: Arc<dyn Clock>,
        settings: ListerSettings,
    ) -> (Self, ListerHandle) {
        let (tx, control_rx) = mpsc::channel();
        let service = Arc::new(TraversalService::new());
        let current: SharedService = Arc::new(Mutex::new(Arc::clone(&service)));
        let handle = ListerHandle {
            tx,
            current: Arc::clone(&current),
        };
        let mut lister = Self {
            parser,
            context,
            credentials,
            matcher,
            acceptor,
            schedule,
            clock,
            settings,
            control_rx,
            current,
            service,
            traversers: Vec::new(),
        };
        lister.traversers = lister.new_traversers(&Arc::clone(&lister.service));
        (lister, handle)
    }

    /// Runs the crawl until shutdown. Blocks the calling thread.
    pub fn run(&mut self) {
        info!("starting file lister");

        loop {
            match self.sleep(SleepKind::Schedule) {
                Wake::Shutdown => break,
                Wake::ScheduleChanged => {
                    self.reinstall();
                    continue;
                }
                Wake::Elapsed => {}
            }
            if self.service.is_shutdown() {
                break;
            }

            let got_error = self.run_cycle_now();
            if self.service.is_shutdown() {
                break;
            }

            let kind = if got_error {
                SleepKind::Error
            } else {
                SleepKind::Retry
            };
            match self.sleep(kind) {
                Wake::Shutdown => break,
                Wake::ScheduleChanged => self.reinstall(),
                Wake::Elapsed => {}
            }
        }

        info!("halting file lister");
        self.service.shutdown_now();
        if let Err(e) = self.acceptor.cancel() {
            warn!(error = %e, "error cancelling document acceptor during shutdown");
        }
    }

    /// Runs exactly one traversal cycle, ignoring the schedule.
    ///
    /// Returns true if any traverser failed. Traverser state persists, so
    /// consecutive calls behave like consecutive scheduled cycles (first
    /// full, then incremental). The acceptor is flushed by the traversers
    /// but not cancelled; the caller owns the feed lifecycle.
    pub fn run_once(&mut self) -> bool {
        self.run_cycle_now()
    }

    fn run_cycle_now(&mut self) -> bool {
        let service = Arc::clone(&self.service);
        run_cycle(
            &service,
            &mut self.traversers,
            self.settings.thread_pool_size,
        )
    }

    /// Tears down the current service generation and restarts the
    /// traversers, typically after a schedule change.
    fn reinstall(&mut self) {
        debug!("schedule changed; rebuilding traversal service");
        self.service.shutdown_now();
        let service = Arc::new(TraversalService::new());
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&service);
        self.service = service;
        self.traversers = self.new_traversers(&Arc::clone(&self.service));
    }

    fn new_traversers(&self, service: &Arc<TraversalService>) -> Vec<Traverser> {
        self.settings
            .start_paths
            .iter()
            .map(|start_path| {
                Traverser::new(
                    start_path.clone(),
                    self.parser.clone(),
                    self.context.clone(),
                    self.credentials.clone(),
                    self.matcher.clone(),
                    Arc::clone(&self.acceptor),
                    Arc::clone(service),
                    Arc::clone(&self.clock),
                    self.settings.traverser.clone(),
                )
            })
            .collect()
    }

    /// Sleeps per the schedule, waking early for control messages.
    fn sleep(&mut self, kind: SleepKind) -> Wake {
        if self.service.is_shutdown() {
            return Wake::Shutdown;
        }
        let duration = if self.schedule.is_disabled() {
            INFINITE_SLEEP
        } else {
            match kind {
                SleepKind::Error => self.settings.traverser.error_delay,
                SleepKind::Retry => seconds_or_infinite(self.schedule.retry_delay_seconds()),
                SleepKind::Schedule => {
                    let seconds = self.schedule.next_interval_seconds();
                    if seconds == 0 {
                        // Already inside the window; still drain any
                        // pending control message.
                        Duration::ZERO
                    } else {
                        seconds_or_infinite(seconds)
                    }
                }
            }
        };

        debug!(?duration, "lister sleeping");
        match self.control_rx.recv_timeout(duration) {
            Ok(Control::Shutdown) => Wake::Shutdown,
            Ok(Control::ScheduleChanged(schedule)) => {
                self.schedule = schedule;
                Wake::ScheduleChanged
            }
            Err(RecvTimeoutError::Timeout) => Wake::Elapsed,
            // Every handle dropped: nothing can ever stop us later, so stop now.
            Err(RecvTimeoutError::Disconnected) => Wake::Shutdown,
        }
    }
}

fn seconds_or_infinite(seconds: i64) -> Duration {
    if seconds < 0 {
        INFINITE_SLEEP
    } else {
        Duration::from_secs(seconds.unsigned_abs())
    }
}

/// Runs all traversers for one cycle on a bounded worker pool; returns true
/// if any traverser failed.
fn run_cycle(
    service: &Arc<TraversalService>,
    traversers: &mut [Traverser],
    pool_size: usize,
) -> bool {
    let queue: Mutex<Vec<&mut Traverser>> = Mutex::new(traversers.iter_mut().collect());
    let got_error = AtomicBool::new(false);
    let workers = pool_size.max(1).min(
        queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len(),
    );

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let Some(traverser) = queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop()
                else {
                    break;
                };
                if service.is_shutdown() {
                    break;
                }
                if let Err(e) = traverser.run() {
                    warn!(root = %traverser.start_path(), error = %e, "traversal cycle failed");
                    got_error.store(true, Ordering::SeqCst);
                }
            });
        }
    });

    got_error.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::SystemClock;
    use fscrawl_feed::{
        ExtensionMimeDetector, FeedOptions, TraversalContext, VecAcceptor,
    };
    use fscrawl_vfs::{FileSystemType, MemoryFileSystem};
    use std::time::Instant;

    #[derive(Debug)]
    struct MockSchedule {
        disabled: bool,
        retry_delay: i64,
        next_interval: i64,
    }

    impl MockSchedule {
        fn always_on() -> Self {
            Self {
                disabled: false,
                // Park between cycles until something changes.
                retry_delay: -1,
                next_interval: 0,
            }
        }

        fn disabled() -> Self {
            Self {
                disabled: true,
                retry_delay: 0,
                next_interval: 0,
            }
        }
    }

    impl TraversalSchedule for MockSchedule {
        fn rate_docs_per_minute(&self) -> i64 {
            0
        }

        fn retry_delay_seconds(&self) -> i64 {
            self.retry_delay
        }

        fn is_disabled(&self) -> bool {
            self.disabled
        }

        fn in_scheduled_interval(&self) -> bool {
            !self.disabled && self.next_interval == 0
        }

        fn next_interval_seconds(&self) -> i64 {
            self.next_interval
        }
    }

    fn lister_over(
        fs: &MemoryFileSystem,
        schedule: MockSchedule,
    ) -> (FileLister, ListerHandle, Arc<VecAcceptor>) {
        let parser = PathParser::new(vec![FileSystemType::Memory(fs.clone())]);
        let context = DocumentContext::new(
            FeedOptions {
                push_acls: false,
                mark_all_documents_public: true,
                supports_inherited_acls: true,
            },
            Arc::new(ExtensionMimeDetector),
            TraversalContext::default(),
        );
        let acceptor = Arc::new(VecAcceptor::new());
        let settings = ListerSettings {
            start_paths: vec!["/root".to_owned()],
            thread_pool_size: 2,
            traverser: TraverserConfig {
                if_modified_since_cushion_millis: 0,
                full_traversal_interval_millis: -1,
                error_delay: Duration::from_millis(10),
            },
        };
        let (lister, handle) = FileLister::new(
            parser,
            context,
            None,
            FilePatternMatcher::accept_all(),
            Arc::clone(&acceptor) as Arc<dyn DocumentAcceptor>,
            Arc::new(schedule),
            Arc::new(SystemClock),
            settings,
        );
        (lister, handle, acceptor)
    }

    fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn runs_a_cycle_then_shuts_down_cleanly() {
        let fs = MemoryFileSystem::new("/root");
        fs.add_file("/root/a.txt", b"a");
        fs.add_file("/root/b.txt", b"b");

        let (mut lister, handle, acceptor) = lister_over(&fs, MockSchedule::always_on());
        let worker = thread::spawn(move || lister.run());

        assert!(wait_until(Duration::from_secs(5), || acceptor.len() == 2));
        assert_eq!(acceptor.docids(), vec!["/root/a.txt", "/root/b.txt"]);

        handle.shutdown();
        worker.join().expect("join");

        assert_eq!(acceptor.cancels(), 1);
        assert!(acceptor.flushes() >= 1);
    }

    #[test]
    fn schedule_change_wakes_the_retry_sleep() {
        let fs = MemoryFileSystem::new("/root");
        fs.add_file("/root/a.txt", b"a");

        let (mut lister, handle, acceptor) = lister_over(&fs, MockSchedule::always_on());
        let worker = thread::spawn(move || lister.run());

        // First cycle, then the lister parks on the infinite retry delay.
        assert!(wait_until(Duration::from_secs(5), || acceptor.len() == 1));
        acceptor.clear();

        // Installing a schedule restarts the traversers promptly.
        handle.set_traversal_schedule(Arc::new(MockSchedule::always_on()));
        assert!(wait_until(Duration::from_secs(5), || acceptor.len() == 1));

        handle.shutdown();
        worker.join().expect("join");
    }

    #[test]
    fn disabled_schedule_feeds_nothing_until_shutdown() {
        let fs = MemoryFileSystem::new("/root");
        fs.add_file("/root/a.txt", b"a");

        let (mut lister, handle, acceptor) = lister_over(&fs, MockSchedule::disabled());
        let worker = thread::spawn(move || lister.run());

        // Give the lister a moment to park on the disabled-schedule sleep.
        thread::sleep(Duration::from_millis(50));
        assert!(acceptor.is_empty());

        handle.shutdown();
        worker.join().expect("join");
        assert!(acceptor.is_empty());
        assert_eq!(acceptor.cancels(), 1);
    }

    #[test]
    fn dropping_the_handle_stops_the_lister() {
        let fs = MemoryFileSystem::new("/root");
        let (mut lister, handle, acceptor) = lister_over(&fs, MockSchedule::always_on());
        let worker = thread::spawn(move || lister.run());
        drop(handle);
        worker.join().expect("join");
        assert_eq!(acceptor.cancels(), 1);
    }
}
