use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::banner::state::{BannerState, BannerView};
use crate::broadcast::{FormatBus, Subscription};
use crate::schedule::model::ScheduleData;
use crate::schedule::time::TimeFormat;
use crate::time_provider::Clock;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(200);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type RenderSink = Box<dyn FnMut(Option<&BannerView>) + Send>;

pub struct BannerConfig {
    pub schedule: Option<Arc<ScheduleData>>,
    pub clock: Arc<dyn Clock>,
    pub format: TimeFormat,
    pub poll_interval: Duration,
}

/// A mounted live banner. Dropping the handle stops its thread and
/// releases its broadcast subscription.
pub struct BannerHandle {
    shared: Arc<Mutex<BannerState>>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl BannerHandle {
    pub fn view(&self) -> Option<BannerView> {
        self.shared.lock().ok().and_then(|state| state.view())
    }

    pub fn format(&self) -> TimeFormat {
        self.shared
            .lock()
            .map(|state| state.format())
            .unwrap_or_default()
    }

    pub fn polls(&self) -> u64 {
        self.shared.lock().map(|state| state.polls()).unwrap_or(0)
    }

    pub fn format_changes(&self) -> u64 {
        self.shared
            .lock()
            .map(|state| state.format_changes())
            .unwrap_or(0)
    }

    /// False when the poll thread could not be started.
    pub fn is_live(&self) -> bool {
        self.join.is_some()
    }
}

impl Drop for BannerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub fn mount(mut config: BannerConfig, bus: &FormatBus, sink: RenderSink) -> BannerHandle {
    if config.poll_interval < MIN_POLL_INTERVAL {
        warn!(
            "poll interval {:?} is too short, using {:?}",
            config.poll_interval, MIN_POLL_INTERVAL
        );
        config.poll_interval = MIN_POLL_INTERVAL;
    }
    let shared = Arc::new(Mutex::new(BannerState::new(config.format)));
    let stop = Arc::new(AtomicBool::new(false));

    let subscription = match bus.subscribe() {
        Ok(subscription) => subscription,
        Err(err) => {
            warn!("live banner disabled: {err:#}");
            return BannerHandle {
                shared,
                stop,
                join: None,
            };
        }
    };

    let mut worker = BannerWorker {
        config,
        shared: Arc::clone(&shared),
        stop: Arc::clone(&stop),
        subscription,
        sink,
    };
    worker.poll_cycle();

    let spawned = thread::Builder::new()
        .name("live-banner".to_string())
        .spawn(move || worker.run());
    let join = match spawned {
        Ok(join) => Some(join),
        Err(err) => {
            warn!("live banner disabled: failed to start poll thread: {err}");
            if let Ok(mut state) = shared.lock() {
                state.clear();
            }
            None
        }
    };

    BannerHandle { shared, stop, join }
}

struct BannerWorker {
    config: BannerConfig,
    shared: Arc<Mutex<BannerState>>,
    stop: Arc<AtomicBool>,
    subscription: Subscription,
    sink: RenderSink,
}

impl BannerWorker {
    fn run(mut self) {
        info!(
            "live banner polling every {}s",
            self.config.poll_interval.as_secs_f64()
        );
        let mut next_poll = Instant::now() + self.config.poll_interval;
        while !self.stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= next_poll {
                self.poll_cycle();
                while next_poll <= now {
                    next_poll += self.config.poll_interval;
                }
                continue;
            }

            let wait = next_poll
                .saturating_duration_since(now)
                .min(STOP_CHECK_INTERVAL);
            match self.subscription.recv_timeout(wait) {
                Ok(event) => self.format_changed(event.format),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => thread::sleep(wait),
            }
        }
        debug!("live banner stopped");
    }

    fn poll_cycle(&mut self) {
        let sample = self.config.clock.now();
        let view = {
            let Ok(mut state) = self.shared.lock() else {
                return;
            };
            match sample {
                Ok(now) => state.poll(self.config.schedule.as_deref(), now),
                Err(err) => {
                    warn!("clock unavailable, hiding banner: {err:#}");
                    state.clear();
                }
            }
            state.view()
        };
        (self.sink)(view.as_ref());
    }

    fn format_changed(&mut self, format: TimeFormat) {
        let clock = self.config.clock.now().ok().map(|now| now.time);
        let view = {
            let Ok(mut state) = self.shared.lock() else {
                return;
            };
            state.apply_format(format, clock);
            state.view()
        };
        debug!("live banner switched to {format}h");
        (self.sink)(view.as_ref());
    }
}
