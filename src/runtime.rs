//! Scheduling primitives shared by the real-time loops.
//!
//! [`Latest`] is the single-slot "current value" cell between a producer
//! and its readers. [`LoopHandle`] owns a periodic task and guarantees that
//! once `stop()` returns no further iteration starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Last-writer-wins cell holding the most recent value.
///
/// No queue and no back-pressure: readers always see whatever was
/// published last, or `None` before the first publish.
#[derive(Debug)]
pub struct Latest<T> {
    slot: Arc<Mutex<Option<Arc<T>>>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Overwrite the current value.
    pub fn publish(&self, value: T) {
        self.publish_arc(Arc::new(value));
    }

    pub fn publish_arc(&self, value: Arc<T>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(value);
        }
    }

    /// The current value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        let slot = self.slot.lock().ok()?;
        slot.clone()
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// Handle to a periodic task started with [`spawn_periodic`].
#[derive(Debug)]
pub struct LoopHandle {
    name: &'static str,
    stop: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl LoopHandle {
    /// Stop the loop.
    ///
    /// The stop flag is set before the task is aborted, and the loop checks
    /// it right before every iteration, so no iteration begins after this
    /// returns.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("{} loop stopped", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `tick` once per `period` on the current tokio runtime.
///
/// Iterations never overlap: the next tick is awaited only after the
/// previous call returned. Late ticks are skipped rather than bunched up.
pub fn spawn_periodic<F>(name: &'static str, period: Duration, mut tick: F) -> LoopHandle
where
    F: FnMut() + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if flag.load(Ordering::SeqCst) {
                break;
            }
            tick();
        }
    });
    LoopHandle {
        name,
        stop,
        task: Some(task),
    }
}

/// Period for a given rate, at least one millisecond.
pub fn period_for_fps(fps: u32) -> Duration {
    Duration::from_millis((1000 / u64::from(fps.max(1))).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_latest_overwrites() {
        let cell = Latest::new();
        assert!(cell.get().is_none());
        cell.publish(1);
        cell.publish(2);
        assert_eq!(*cell.get().unwrap(), 2);
        let reader = cell.clone();
        cell.publish(3);
        assert_eq!(*reader.get().unwrap(), 3);
        reader.clear();
        assert!(cell.get().is_none());
    }

    #[test]
    fn test_period_for_fps() {
        assert_eq!(period_for_fps(10), Duration::from_millis(100));
        assert_eq!(period_for_fps(30), Duration::from_millis(33));
        assert_eq!(period_for_fps(0), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_no_tick_after_stop() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let mut handle = spawn_periodic("test", Duration::from_millis(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop();
        assert!(!handle.is_running());
        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }
}
