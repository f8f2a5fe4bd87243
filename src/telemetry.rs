//! Business event telemetry.
//!
//! Events go through a [`BusinessEventPublisher`]. [`OnceInTimePublisher`]
//! wraps a publisher and forwards a given (event, project) pair at most once
//! per interval, tracking the last emission time in process-wide state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to publish event {event}: {reason}")]
    Publish { event: String, reason: String },
}

/// A business event tied to a project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusinessEvent {
    pub name: String,
    pub project_id: i64,
}

impl BusinessEvent {
    pub fn new(name: impl Into<String>, project_id: i64) -> Self {
        Self {
            name: name.into(),
            project_id,
        }
    }
}

/// Destination for business events
pub trait BusinessEventPublisher: Send + Sync {
    fn publish(&self, event: &BusinessEvent) -> Result<(), TelemetryError>;
}

/// Publisher that records events in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl BusinessEventPublisher for LoggingEventPublisher {
    fn publish(&self, event: &BusinessEvent) -> Result<(), TelemetryError> {
        info!(
            event = %event.name,
            project_id = event.project_id,
            "Business event"
        );
        Ok(())
    }
}

/// Rate-limits events per (event name, project)
pub struct OnceInTimePublisher {
    inner: Arc<dyn BusinessEventPublisher>,
    /// Last emission time and the interval it was published with
    last_emitted: Mutex<HashMap<(String, i64), (DateTime<Utc>, Duration)>>,
}

impl OnceInTimePublisher {
    pub fn new(inner: Arc<dyn BusinessEventPublisher>) -> Self {
        Self {
            inner,
            last_emitted: Mutex::new(HashMap::new()),
        }
    }

    /// Publish unless the same event was published for the project within `interval`
    ///
    /// Returns whether the event was forwarded.
    pub fn publish_once_in_time(
        &self,
        event: &BusinessEvent,
        interval: Duration,
    ) -> Result<bool, TelemetryError> {
        self.publish_once_in_time_at(event, interval, Utc::now())
    }

    /// Same as [`Self::publish_once_in_time`] with an explicit current time
    pub fn publish_once_in_time_at(
        &self,
        event: &BusinessEvent,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, TelemetryError> {
        // Held across publish so concurrent callers cannot both emit
        let mut last_emitted = self
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        last_emitted.retain(|_, (last, window)| !window_elapsed(*last, *window, now));

        let key = (event.name.clone(), event.project_id);
        if last_emitted.contains_key(&key) {
            return Ok(false);
        }

        self.inner.publish(event)?;
        last_emitted.insert(key, (now, interval));
        Ok(true)
    }

    /// Number of (event, project) pairs still inside their window
    pub fn tracked_events(&self) -> usize {
        self.last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn window_elapsed(last: DateTime<Utc>, interval: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(last)
        .to_std()
        .is_ok_and(|elapsed| elapsed >= interval)
}

impl std::fmt::Debug for OnceInTimePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceInTimePublisher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[derive(Default)]
    struct CountingPublisher {
        published: AtomicUsize,
    }

    impl BusinessEventPublisher for CountingPublisher {
        fn publish(&self, _: &BusinessEvent) -> Result<(), TelemetryError> {
            self.published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingPublisher;

    impl BusinessEventPublisher for FailingPublisher {
        fn publish(&self, event: &BusinessEvent) -> Result<(), TelemetryError> {
            Err(TelemetryError::Publish {
                event: event.name.clone(),
                reason: "sink offline".to_string(),
            })
        }
    }

    #[test]
    fn test_once_per_window() {
        let counter = Arc::new(CountingPublisher::default());
        let publisher = OnceInTimePublisher::new(counter.clone());
        let event = BusinessEvent::new("EXPORT", 1);
        let start = Utc::now();

        assert!(publisher.publish_once_in_time_at(&event, DAY, start).unwrap());
        for hours in [1, 12, 23] {
            let now = start + chrono::Duration::hours(hours);
            assert!(!publisher.publish_once_in_time_at(&event, DAY, now).unwrap());
        }
        assert_eq!(counter.published.load(Ordering::SeqCst), 1);

        let next_day = start + chrono::Duration::hours(24);
        assert!(publisher.publish_once_in_time_at(&event, DAY, next_day).unwrap());
        assert_eq!(counter.published.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_expired_windows_are_forgotten() {
        let counter = Arc::new(CountingPublisher::default());
        let publisher = OnceInTimePublisher::new(counter.clone());
        let start = Utc::now();

        for project_id in 1..=50 {
            publisher
                .publish_once_in_time_at(&BusinessEvent::new("EXPORT", project_id), DAY, start)
                .unwrap();
        }
        assert_eq!(publisher.tracked_events(), 50);

        let later = start + chrono::Duration::hours(25);
        assert!(publisher
            .publish_once_in_time_at(&BusinessEvent::new("EXPORT", 99), DAY, later)
            .unwrap());
        assert_eq!(publisher.tracked_events(), 1);
    }

    #[test]
    fn test_projects_are_independent() {
        let counter = Arc::new(CountingPublisher::default());
        let publisher = OnceInTimePublisher::new(counter.clone());
        let now = Utc::now();

        assert!(publisher
            .publish_once_in_time_at(&BusinessEvent::new("EXPORT", 1), DAY, now)
            .unwrap());
        assert!(publisher
            .publish_once_in_time_at(&BusinessEvent::new("EXPORT", 2), DAY, now)
            .unwrap());
        assert_eq!(counter.published.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_publish_is_not_recorded() {
        let publisher = OnceInTimePublisher::new(Arc::new(FailingPublisher));
        let event = BusinessEvent::new("EXPORT", 1);
        let now = Utc::now();

        assert!(publisher.publish_once_in_time_at(&event, DAY, now).is_err());
        assert!(publisher.publish_once_in_time_at(&event, DAY, now).is_err());
    }

    #[test]
    fn test_concurrent_publishers_emit_once() {
        let counter = Arc::new(CountingPublisher::default());
        let publisher = Arc::new(OnceInTimePublisher::new(counter.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let publisher = publisher.clone();
                std::thread::spawn(move || {
                    publisher
                        .publish_once_in_time(&BusinessEvent::new("EXPORT", 7), DAY)
                        .unwrap()
                })
            })
            .collect();

        let emitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|emitted| *emitted)
            .count();
        assert_eq!(emitted, 1);
        assert_eq!(counter.published.load(Ordering::SeqCst), 1);
    }
}
