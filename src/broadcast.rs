use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{debug, warn};
use serde::Serialize;

use crate::schedule::time::TimeFormat;

pub const TIME_FORMAT_CHANGED: &str = "timeFormatChanged";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct FormatChanged {
    pub format: TimeFormat,
}

/// In-process publish/subscribe channel for `timeFormatChanged`.
///
/// Cloning the bus shares the subscriber list. Each [`Subscription`] removes
/// itself when dropped.
#[derive(Clone, Default)]
pub struct FormatBus {
    inner: Arc<Mutex<BusInner>>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<(u64, Sender<FormatChanged>)>,
}

impl FormatBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Result<Subscription> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("failed to lock {TIME_FORMAT_CHANGED} subscribers"))?;
        let id = guard.next_id;
        guard.next_id += 1;
        let (sender, receiver) = mpsc::channel();
        guard.subscribers.push((id, sender));
        debug!("{TIME_FORMAT_CHANGED}: subscriber {id} added");
        Ok(Subscription {
            id,
            receiver,
            bus: self.clone(),
        })
    }

    /// Delivers the change to every live subscriber and returns how many got it.
    pub fn publish(&self, format: TimeFormat) -> usize {
        let Ok(mut guard) = self.inner.lock() else {
            warn!("{TIME_FORMAT_CHANGED}: subscriber list poisoned, dropping event");
            return 0;
        };
        let event = FormatChanged { format };
        guard
            .subscribers
            .retain(|(_, sender)| sender.send(event).is_ok());
        guard.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .map(|guard| guard.subscribers.len())
            .unwrap_or(0)
    }

    fn unsubscribe(&self, id: u64) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.subscribers.retain(|(existing, _)| *existing != id);
            debug!("{TIME_FORMAT_CHANGED}: subscriber {id} removed");
        }
    }
}

pub struct Subscription {
    id: u64,
    receiver: Receiver<FormatChanged>,
    bus: FormatBus,
}

impl Subscription {
    pub fn recv_timeout(&self, timeout: Duration) -> Result<FormatChanged, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<FormatChanged, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
