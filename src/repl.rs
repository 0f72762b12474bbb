//! Interactive terminal front end
//!
//! Reads commands and plain text from stdin, drives the speech input
//! state machine, and prints session events as they arrive.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

use crate::assistant::{Assistant, UserInput};
use crate::conversation::{ImageAttachment, Message, Role};
use crate::session::SessionEvent;
use crate::tools::LinkOpener;
use crate::voice::{InputEffect, ListenMode, RecognitionEvent, Recognizer, SpeechInput};
use crate::{Error, Result};

const HELP: &str = "\
Commands:
  <text>                 talk to Lia
  /image <path> [text]   send an image, optionally with a question
  /listen                start or stop dictation
  /wake                  start or stop wake-word listening
  /audio [on|off]        toggle spoken replies
  /connect, /disconnect  link or unlink the phone
  /phone                 show phone status
  /stats                 show system stats
  /notifications         show recent notifications
  /open                  open the last link Lia offered
  /history               print the conversation
  /help                  show this help
  /quit                  exit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    Send(String),
    Image { path: PathBuf, text: String },
    Listen,
    Wake,
    /// `None` toggles
    Audio(Option<bool>),
    Connect,
    Disconnect,
    Phone,
    Stats,
    Notifications,
    Open,
    History,
    Help,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(n, r)| (n, r.trim()));

        match name.to_ascii_lowercase().as_str() {
            "image" | "img" => {
                let (path, text) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, ""), |(p, t)| (p, t.trim()));
                if path.is_empty() {
                    return Self::Unknown("/image needs a path".to_string());
                }
                Self::Image {
                    path: PathBuf::from(path),
                    text: text.to_string(),
                }
            }
            "listen" | "mic" => Self::Listen,
            "wake" => Self::Wake,
            "audio" => match rest.to_ascii_lowercase().as_str() {
                "" => Self::Audio(None),
                "on" => Self::Audio(Some(true)),
                "off" => Self::Audio(Some(false)),
                other => Self::Unknown(format!("/audio expects on or off, got {other:?}")),
            },
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "phone" => Self::Phone,
            "stats" => Self::Stats,
            "notifications" | "notifs" => Self::Notifications,
            "open" => Self::Open,
            "history" => Self::History,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Unknown(format!("unknown command /{other}")),
        }
    }
}

/// REPL state
pub struct Repl<R> {
    assistant: Arc<Assistant>,
    input: SpeechInput<R>,
    opener: Arc<dyn LinkOpener>,
}

impl<R: Recognizer> Repl<R> {
    #[must_use]
    pub fn new(assistant: Arc<Assistant>, input: SpeechInput<R>, opener: Arc<dyn LinkOpener>) -> Self {
        Self {
            assistant,
            input,
            opener,
        }
    }

    /// Run until `/quit` or end of input
    ///
    /// # Errors
    ///
    /// Returns error if stdin cannot be read
    pub async fn run(mut self, mut recognition: mpsc::UnboundedReceiver<RecognitionEvent>) -> Result<()> {
        let mut events = self.assistant.session().subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        // Delayed dictation after the wake word
        let (resume_tx, mut resume_rx) = mpsc::unbounded_channel();

        for message in self.assistant.session().messages() {
            print_message(&message);
        }
        println!("(type /help for commands)");

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Some(event) = recognition.recv() => self.handle_recognition(event, &resume_tx),
                Some(()) = resume_rx.recv() => {
                    match self.input.begin_dictation() {
                        Ok(true) => println!("(listening...)"),
                        Ok(false) => {}
                        Err(e) => println!("! {e}"),
                    }
                }
                event = events.recv() => match event {
                    Ok(event) => render(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "terminal fell behind session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        self.input.stop();
        Ok(())
    }

    /// Returns false to quit
    fn handle_line(&mut self, line: &str) -> bool {
        let session = self.assistant.session();

        match ReplCommand::parse(line) {
            ReplCommand::Empty => {}
            ReplCommand::Send(text) => self.submit(UserInput::text(text)),
            ReplCommand::Image { path, text } => match ImageAttachment::from_path(&path) {
                Ok(image) => self.submit(UserInput::text(text).with_image(image)),
                Err(e) => println!("! {e}"),
            },
            ReplCommand::Listen => report_mode(self.input.toggle_dictation()),
            ReplCommand::Wake => report_mode(self.input.toggle_wake_listening()),
            ReplCommand::Audio(enabled) => {
                let enabled = enabled.unwrap_or(!session.audio_enabled());
                session.set_audio_enabled(enabled);
            }
            ReplCommand::Connect => session.connect_phone(),
            ReplCommand::Disconnect => session.disconnect_phone(),
            ReplCommand::Phone => {
                let phone = session.phone();
                println!(
                    "phone: {} (last seen {})",
                    phone.status_line(),
                    phone.last_seen.format("%H:%M:%S")
                );
            }
            ReplCommand::Stats => println!("system: {}", session.stats().status_line()),
            ReplCommand::Notifications => {
                for n in session.notifications() {
                    println!("[{}] {}: {}", n.time.format("%H:%M"), n.source, n.content);
                }
            }
            ReplCommand::Open => match session.last_action() {
                Some(action) => {
                    if let Err(e) = self.opener.open(&action.url) {
                        println!("! could not open {}: {e}", action.url);
                    }
                }
                None => println!("(no link to open)"),
            },
            ReplCommand::History => {
                for message in session.messages() {
                    print_message(&message);
                }
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => return false,
            ReplCommand::Unknown(reason) => println!("! {reason}"),
        }
        true
    }

    fn submit(&self, input: UserInput) {
        let assistant = Arc::clone(&self.assistant);
        tokio::spawn(async move {
            match assistant.send(input).await {
                Ok(_) => {}
                Err(Error::TurnInProgress) => println!("! Lia is still answering, try again shortly"),
                Err(e) => println!("! {e}"),
            }
        });
    }

    fn handle_recognition(&mut self, event: RecognitionEvent, resume: &mpsc::UnboundedSender<()>) {
        match self.input.handle(event) {
            InputEffect::None | InputEffect::Restarted => {}
            InputEffect::Interim(text) => println!("  ... {text}"),
            InputEffect::Transcript(text) => self.submit(UserInput::dictated(text)),
            InputEffect::WakeWordHeard {
                acknowledgement,
                resume_after,
            } => {
                println!("Lia: {acknowledgement}");
                let _ = self.assistant.speak(acknowledgement.to_string());
                let resume = resume.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(resume_after).await;
                    let _ = resume.send(());
                });
            }
            InputEffect::Reset => println!("(microphone off)"),
        }
    }
}

fn report_mode(result: Result<ListenMode>) {
    match result {
        Ok(ListenMode::Idle) => println!("(microphone off)"),
        Ok(ListenMode::Dictating) => println!("(listening...)"),
        Ok(ListenMode::WakeListening) => println!("(waiting for the wake word)"),
        Err(Error::RecognitionUnavailable) => {
            println!("! Speech recognition is not supported on this system.");
        }
        Err(e) => println!("! {e}"),
    }
}

fn print_message(message: &Message) {
    match message.role {
        Role::User if message.is_audio => println!("You (voice): {}", message.text),
        Role::User => println!("You: {}", message.text),
        Role::Model => {
            println!("Lia: {}", message.text);
            if let Some(action) = &message.action {
                println!("  -> {}: {} (/open)", action.label, action.url);
            }
        }
    }
}

fn render(event: &SessionEvent) {
    match event {
        // Typed lines are already on screen
        SessionEvent::MessageAppended(message) if message.role == Role::User && !message.is_audio => {}
        SessionEvent::MessageAppended(message) => print_message(message),
        SessionEvent::Typing(true) => println!("(Lia is thinking...)"),
        SessionEvent::Notification(n) => println!("[{}] {}", n.source, n.content),
        SessionEvent::PhoneChanged(phone) => println!("phone: {}", phone.status_line()),
        SessionEvent::AudioToggled(enabled) => {
            println!("spoken replies {}", if *enabled { "on" } else { "off" });
        }
        SessionEvent::Typing(false) | SessionEvent::StatsUpdated(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(
            ReplCommand::parse("  hello Lia "),
            ReplCommand::Send("hello Lia".to_string())
        );
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn test_image_command() {
        assert_eq!(
            ReplCommand::parse("/image cat.png what breed is this?"),
            ReplCommand::Image {
                path: PathBuf::from("cat.png"),
                text: "what breed is this?".to_string()
            }
        );
        assert_eq!(
            ReplCommand::parse("/image cat.png"),
            ReplCommand::Image {
                path: PathBuf::from("cat.png"),
                text: String::new()
            }
        );
        assert!(matches!(ReplCommand::parse("/image"), ReplCommand::Unknown(_)));
    }

    #[test]
    fn test_audio_command() {
        assert_eq!(ReplCommand::parse("/audio"), ReplCommand::Audio(None));
        assert_eq!(ReplCommand::parse("/audio OFF"), ReplCommand::Audio(Some(false)));
        assert!(matches!(ReplCommand::parse("/audio loud"), ReplCommand::Unknown(_)));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(ReplCommand::parse("/listen"), ReplCommand::Listen);
        assert_eq!(ReplCommand::parse("/wake"), ReplCommand::Wake);
        assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/open"), ReplCommand::Open);
        assert!(matches!(ReplCommand::parse("/dance"), ReplCommand::Unknown(_)));
    }
}
