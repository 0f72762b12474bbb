//! Simulated notification feed

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use uuid::Uuid;

/// Feed keeps only the newest entries
pub const FEED_CAPACITY: usize = 5;

const SOURCES: &[&str] = &["Instagram", "WhatsApp", "Twitter", "TechNews", "Fashion"];

const CONTENTS: &[&str] = &[
    "#LiaAI is trending globally!",
    "New breakthrough in sustainable energy.",
    "Viral challenge alert on social media.",
    "Upcoming tech event in your area.",
    "New message from your friend.",
];

/// Category of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Social,
    System,
    Alert,
    Trending,
}

/// A single notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: String,
    pub source: String,
    pub content: String,
    pub time: DateTime<Utc>,
    pub kind: NotificationKind,
}

impl Notification {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        content: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            content: content.into(),
            time: Utc::now(),
            kind,
        }
    }

    /// Maybe produce a random social or trending notification
    ///
    /// Returns `None` unless the `chance` roll succeeds. Half of the
    /// emitted notifications are trending.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> Option<Self> {
        if !rng.gen_bool(chance.clamp(0.0, 1.0)) {
            return None;
        }

        let content = CONTENTS.choose(rng).copied().unwrap_or(CONTENTS[0]);
        if rng.gen_bool(0.5) {
            Some(Self::new("Trending", content, NotificationKind::Trending))
        } else {
            let source = SOURCES.choose(rng).copied().unwrap_or(SOURCES[0]);
            Some(Self::new(source, content, NotificationKind::Social))
        }
    }
}

/// Bounded feed, newest first
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    items: Vec<Notification>,
}

impl NotificationFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed holding the startup notice
    #[must_use]
    pub fn seeded() -> Self {
        let mut feed = Self::new();
        feed.push(Notification::new(
            "System",
            "Lia Core initialized.",
            NotificationKind::System,
        ));
        feed
    }

    /// Insert at the front, evicting the oldest past capacity
    pub fn push(&mut self, notification: Notification) {
        self.items.insert(0, notification);
        self.items.truncate(FEED_CAPACITY);
    }

    /// Notifications, newest first
    #[must_use]
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_feed_caps_and_orders() {
        let mut feed = NotificationFeed::seeded();
        for i in 0..12 {
            feed.push(Notification::new("Test", format!("n{i}"), NotificationKind::Social));
            assert!(feed.len() <= FEED_CAPACITY);
            assert_eq!(feed.items()[0].content, format!("n{i}"));
        }

        let contents: Vec<_> = feed.items().iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["n11", "n10", "n9", "n8", "n7"]);
    }

    #[test]
    fn test_roll_respects_chance() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..100).all(|_| Notification::roll(&mut rng, 0.0).is_none()));

        let rolled: Vec<_> = (0..100)
            .filter_map(|_| Notification::roll(&mut rng, 1.0))
            .collect();
        assert_eq!(rolled.len(), 100);
        assert!(rolled.iter().all(|n| {
            match n.kind {
                NotificationKind::Trending => n.source == "Trending",
                NotificationKind::Social => SOURCES.contains(&n.source.as_str()),
                _ => false,
            }
        }));
    }
}
