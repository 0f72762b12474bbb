//! In-memory session state shared by every component
//!
//! Holds the transcript, phone link, stats, notifications and UI flags.
//! Every mutation is broadcast as a [`SessionEvent`] so front ends can
//! re-render without polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::ambient::{Notification, NotificationFeed, SystemStats};
use crate::conversation::{Action, Message, Transcript};
use crate::phone::PhoneLinkState;

/// Capacity of the event channel before slow subscribers lag
const EVENT_CAPACITY: usize = 256;

/// Something observable changed in the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageAppended(Message),
    Typing(bool),
    Notification(Notification),
    StatsUpdated(SystemStats),
    PhoneChanged(PhoneLinkState),
    AudioToggled(bool),
}

/// Shared state for one conversation session
pub struct Session {
    transcript: Mutex<Transcript>,
    phone: Mutex<PhoneLinkState>,
    stats: Mutex<SystemStats>,
    notifications: Mutex<NotificationFeed>,
    audio_enabled: AtomicBool,
    typing: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Create a session with the greeting transcript and a seeded notification feed
    #[must_use]
    pub fn new(phone: PhoneLinkState, audio_enabled: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            transcript: Mutex::new(Transcript::with_greeting()),
            phone: Mutex::new(phone),
            stats: Mutex::new(SystemStats::default()),
            notifications: Mutex::new(NotificationFeed::seeded()),
            audio_enabled: AtomicBool::new(audio_enabled),
            typing: AtomicBool::new(false),
            events,
        }
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Append a message to the transcript
    pub fn append(&self, message: Message) {
        lock(&self.transcript).push(message.clone());
        self.emit(SessionEvent::MessageAppended(message));
    }

    /// Copy of the transcript
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.transcript).messages().to_vec()
    }

    #[must_use]
    pub fn transcript_len(&self) -> usize {
        lock(&self.transcript).len()
    }

    /// Most recent deep link offered by the assistant
    #[must_use]
    pub fn last_action(&self) -> Option<Action> {
        lock(&self.transcript).last_action().cloned()
    }

    #[must_use]
    pub fn phone(&self) -> PhoneLinkState {
        lock(&self.phone).clone()
    }

    pub fn connect_phone(&self) {
        let snapshot = {
            let mut phone = lock(&self.phone);
            phone.connect();
            phone.clone()
        };
        self.emit(SessionEvent::PhoneChanged(snapshot));
    }

    pub fn disconnect_phone(&self) {
        let snapshot = {
            let mut phone = lock(&self.phone);
            phone.disconnect();
            phone.clone()
        };
        self.emit(SessionEvent::PhoneChanged(snapshot));
    }

    #[must_use]
    pub fn stats(&self) -> SystemStats {
        *lock(&self.stats)
    }

    pub fn set_stats(&self, stats: SystemStats) {
        *lock(&self.stats) = stats;
        self.emit(SessionEvent::StatsUpdated(stats));
    }

    /// Notifications, newest first
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).items().to_vec()
    }

    pub fn push_notification(&self, notification: Notification) {
        lock(&self.notifications).push(notification.clone());
        self.emit(SessionEvent::Notification(notification));
    }

    #[must_use]
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled.load(Ordering::SeqCst)
    }

    pub fn set_audio_enabled(&self, enabled: bool) {
        self.audio_enabled.store(enabled, Ordering::SeqCst);
        self.emit(SessionEvent::AudioToggled(enabled));
    }

    /// Whether a turn is waiting on the model
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.typing.load(Ordering::SeqCst)
    }

    pub fn set_typing(&self, typing: bool) {
        self.typing.store(typing, Ordering::SeqCst);
        self.emit(SessionEvent::Typing(typing));
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PhoneLinkState::default(), true)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_broadcasts() {
        let session = Session::default();
        let mut rx = session.subscribe();

        session.append(Message::user("hi", false));

        assert_eq!(session.transcript_len(), 2);
        match rx.recv().await.unwrap() {
            SessionEvent::MessageAppended(m) => assert_eq!(m.text, "hi"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_phone_toggle() {
        let session = Session::default();
        assert!(!session.phone().connected);
        session.connect_phone();
        assert!(session.phone().connected);
        session.disconnect_phone();
        assert!(!session.phone().connected);
    }

    #[test]
    fn test_seeded_notification() {
        let session = Session::default();
        let notifications = session.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].content, "Lia Core initialized.");
    }
}
