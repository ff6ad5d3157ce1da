use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

/// Drops repeats of the same warning for a while, so a cluster answering every poll with the
/// same error does not flood the log.
#[derive(Debug)]
pub(crate) struct LogThrottle {
    window: Duration,
    last_logged: HashMap<String, Instant>,
}

impl LogThrottle {
    const MAX_TRACKED: usize = 128;

    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_logged: HashMap::new(),
        }
    }

    pub(crate) fn warn(&mut self, message: &str) {
        if self.should_log(message) {
            tracing::warn!("{}", message);
        }
    }

    fn should_log(&mut self, message: &str) -> bool {
        let now = Instant::now();

        if let Some(last) = self.last_logged.get(message) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }

        if self.last_logged.len() >= Self::MAX_TRACKED {
            let window = self.window;
            self.last_logged
                .retain(|_, last| now.duration_since(*last) < window);
        }
        if self.last_logged.len() >= Self::MAX_TRACKED {
            let oldest = self
                .last_logged
                .iter()
                .min_by_key(|(_, last)| **last)
                .map(|(message, _)| message.clone());
            if let Some(oldest) = oldest {
                self.last_logged.remove(&oldest);
            }
        }

        self.last_logged.insert(message.to_string(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::LogThrottle;

    #[tokio::test(start_paused = true)]
    async fn repeats_are_suppressed_within_the_window() {
        let mut throttle = LogThrottle::new(Duration::from_secs(60));

        assert!(throttle.should_log("Failed to handle request"));
        assert!(!throttle.should_log("Failed to handle request"));
        assert!(throttle.should_log("Another error"));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(throttle.should_log("Failed to handle request"));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_evicted() {
        let mut throttle = LogThrottle::new(Duration::from_secs(1));
        for i in 0..LogThrottle::MAX_TRACKED {
            throttle.should_log(&format!("error {}", i));
        }

        tokio::time::advance(Duration::from_secs(2)).await;
        throttle.should_log("fresh");

        assert_eq!(throttle.last_logged.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn oldest_entry_makes_room_when_all_are_fresh() {
        let mut throttle = LogThrottle::new(Duration::from_secs(60));
        throttle.should_log("first");
        tokio::time::advance(Duration::from_millis(1)).await;
        for i in 1..LogThrottle::MAX_TRACKED {
            throttle.should_log(&format!("error {}", i));
        }

        assert!(throttle.should_log("overflow"));

        assert_eq!(throttle.last_logged.len(), LogThrottle::MAX_TRACKED);
        assert!(!throttle.last_logged.contains_key("first"));
        assert!(throttle.last_logged.contains_key("overflow"));
    }
}
