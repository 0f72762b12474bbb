//! Ambient state simulators
//!
//! Background timers that refresh cosmetic system stats and occasionally
//! produce social or trending notifications. Neither has a real data
//! source. The timers stop when the returned [`AmbientHandle`] is dropped.

mod notifications;
mod stats;

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;

use crate::config::AmbientConfig;
use crate::session::Session;
use crate::voice::SpeechOutput;

pub use notifications::{FEED_CAPACITY, Notification, NotificationFeed, NotificationKind};
pub use stats::SystemStats;

/// Running simulator tasks
pub struct AmbientHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl AmbientHandle {
    /// Stop all simulator tasks
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for AmbientHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the stats and notification timers
///
/// Trending notifications are spoken when audio is enabled and the
/// assistant is neither speaking nor waiting on the model.
#[must_use]
pub fn spawn(
    config: &AmbientConfig,
    session: Arc<Session>,
    speech: Option<Arc<SpeechOutput>>,
) -> AmbientHandle {
    if !config.enabled {
        tracing::debug!("ambient simulators disabled");
        return AmbientHandle { tasks: Vec::new() };
    }

    let stats_task = {
        let session = Arc::clone(&session);
        let period = config.stats_interval;
        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut interval = tokio::time::interval(period);
            // First tick fires immediately, keep the initial reading
            interval.tick().await;
            loop {
                interval.tick().await;
                session.set_stats(SystemStats::sample(&mut rng));
            }
        })
    };

    let notification_task = {
        let period = config.notification_interval;
        let chance = config.notification_chance;
        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(notification) = Notification::roll(&mut rng, chance) else {
                    continue;
                };

                tracing::debug!(
                    source = %notification.source,
                    kind = ?notification.kind,
                    "new notification"
                );

                let announce = (notification.kind == NotificationKind::Trending)
                    .then(|| trending_announcement(&notification.content));
                session.push_notification(notification);

                if let (Some(text), Some(speech)) = (announce, speech.as_ref()) {
                    if session.audio_enabled() && !speech.is_speaking() && !session.is_typing() {
                        let _ = speech.speak_detached(text);
                    }
                }
            }
        })
    };

    tracing::info!(
        stats_every = ?config.stats_interval,
        notifications_every = ?config.notification_interval,
        "ambient simulators started"
    );

    AmbientHandle {
        tasks: vec![stats_task, notification_task],
    }
}

/// Spoken line for a trending notification
#[must_use]
pub fn trending_announcement(content: &str) -> String {
    format!("Madam, there's something trending you might find interesting: {content}")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stats_refresh_on_interval() {
        let session = Arc::new(Session::default());
        let config = AmbientConfig {
            enabled: true,
            stats_interval: Duration::from_secs(3),
            notification_interval: Duration::from_secs(45),
            notification_chance: 1.0,
        };

        let mut rx = session.subscribe();
        let _handle = spawn(&config, Arc::clone(&session), None);

        tokio::time::sleep(Duration::from_secs(50)).await;

        let mut stats_updates = 0;
        let mut notifications = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                crate::session::SessionEvent::StatsUpdated(_) => stats_updates += 1,
                crate::session::SessionEvent::Notification(_) => notifications += 1,
                _ => {}
            }
        }

        assert!(stats_updates >= 15, "got {stats_updates} stats updates");
        assert_eq!(notifications, 1);
        assert_eq!(session.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_spawns_nothing() {
        let session = Arc::new(Session::default());
        let config = AmbientConfig {
            enabled: false,
            ..AmbientConfig::default()
        };
        let handle = spawn(&config, session, None);
        assert!(handle.tasks.is_empty());
    }

    #[test]
    fn test_trending_announcement() {
        assert_eq!(
            trending_announcement("#LiaAI is trending globally!"),
            "Madam, there's something trending you might find interesting: #LiaAI is trending globally!"
        );
    }
}
