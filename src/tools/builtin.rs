//! Built-in tools the model may call
//!
//! None of these reach a real service. Each turns the model's arguments
//! into a fixed confirmation reply; `openApp` also resolves and opens a link.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::opener::LinkOpener;
use super::{ToolHandler, ToolOutcome};
use crate::conversation::Action;
use crate::llm::FunctionDeclaration;

/// Known app names and their web addresses
const APP_URLS: &[(&str, &str)] = &[
    ("instagram", "https://www.instagram.com"),
    ("insta", "https://www.instagram.com"),
    ("facebook", "https://www.facebook.com"),
    ("youtube", "https://www.youtube.com"),
    ("google", "https://www.google.com"),
    ("twitter", "https://www.twitter.com"),
    ("x", "https://www.twitter.com"),
    ("github", "https://www.github.com"),
    ("spotify", "https://www.spotify.com"),
    ("netflix", "https://www.netflix.com"),
    ("whatsapp", "https://web.whatsapp.com"),
];

/// String argument, empty when missing
fn arg(args: &Map<String, Value>, key: &str) -> String {
    match args.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

fn declaration(name: &str, description: &str, parameters: Value) -> FunctionDeclaration {
    FunctionDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

pub struct SearchWeb;

impl ToolHandler for SearchWeb {
    fn declaration(&self) -> FunctionDeclaration {
        declaration(
            "searchWeb",
            "Search the web for real-time information, news, or facts.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "query": {
                        "type": "STRING",
                        "description": "The search query to look up on the internet."
                    }
                },
                "required": ["query"]
            }),
        )
    }

    fn invoke(&self, args: &Map<String, Value>) -> ToolOutcome {
        ToolOutcome::text(format!(
            "Searching the global network for \"{}\"... I've found some interesting results for you, madam.",
            arg(args, "query")
        ))
    }
}

pub struct GetWeather;

impl ToolHandler for GetWeather {
    fn declaration(&self) -> FunctionDeclaration {
        declaration(
            "getWeather",
            "Get the current weather for a specific location.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "location": {
                        "type": "STRING",
                        "description": "The city and country, e.g., 'London, UK'."
                    }
                },
                "required": ["location"]
            }),
        )
    }

    fn invoke(&self, args: &Map<String, Value>) -> ToolOutcome {
        ToolOutcome::text(format!(
            "Checking the local atmosphere for {}... It seems the conditions are quite pleasant, madam.",
            arg(args, "location")
        ))
    }
}

pub struct SetReminder;

impl ToolHandler for SetReminder {
    fn declaration(&self) -> FunctionDeclaration {
        declaration(
            "setReminder",
            "Set a reminder for the user.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "text": {
                        "type": "STRING",
                        "description": "What the reminder is about."
                    },
                    "time": {
                        "type": "STRING",
                        "description": "When to remind the user (e.g., 'in 5 minutes', 'at 5 PM')."
                    }
                },
                "required": ["text", "time"]
            }),
        )
    }

    fn invoke(&self, args: &Map<String, Value>) -> ToolOutcome {
        ToolOutcome::text(format!(
            "I've noted that down for you: \"{}\" for {}. I'll make sure you don't forget, madam.",
            arg(args, "text"),
            arg(args, "time")
        ))
    }
}

pub struct ControlHome;

impl ToolHandler for ControlHome {
    fn declaration(&self) -> FunctionDeclaration {
        declaration(
            "controlHome",
            "Control smart home devices like lights, thermostat, or security.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "device": {
                        "type": "STRING",
                        "description": "The device to control (e.g., 'living room lights', 'AC', 'front door')."
                    },
                    "action": {
                        "type": "STRING",
                        "description": "The action to perform (e.g., 'turn on', 'set to 22 degrees', 'lock')."
                    }
                },
                "required": ["device", "action"]
            }),
        )
    }

    fn invoke(&self, args: &Map<String, Value>) -> ToolOutcome {
        ToolOutcome::text(format!(
            "Certainly, madam. I've successfully {} the {} for you.",
            arg(args, "action"),
            arg(args, "device")
        ))
    }
}

/// Opens an app or website through the link opener
pub struct OpenApp {
    opener: Arc<dyn LinkOpener>,
}

impl OpenApp {
    #[must_use]
    pub fn new(opener: Arc<dyn LinkOpener>) -> Self {
        Self { opener }
    }
}

/// Resolve the address for `app_name`
///
/// A model-provided URL wins if it parses, then the app table, then a
/// web search for the name.
#[must_use]
pub fn resolve_app_url(app_name: &str, url: Option<&str>) -> String {
    if let Some(url) = url.map(str::trim).filter(|u| url::Url::parse(u).is_ok()) {
        return url.to_string();
    }

    let key = app_name.trim().to_lowercase();
    APP_URLS
        .iter()
        .find(|(name, _)| *name == key)
        .map_or_else(
            || {
                format!(
                    "https://www.google.com/search?q={}",
                    urlencoding::encode(app_name)
                )
            },
            |(_, url)| (*url).to_string(),
        )
}

impl ToolHandler for OpenApp {
    fn declaration(&self) -> FunctionDeclaration {
        declaration(
            "openApp",
            "Open a specific application or website for the user.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "appName": {
                        "type": "STRING",
                        "description": "The name of the app or website to open (e.g., 'Instagram', 'YouTube', 'Google')."
                    },
                    "url": {
                        "type": "STRING",
                        "description": "The direct URL to open if known, otherwise the assistant will determine it."
                    }
                },
                "required": ["appName"]
            }),
        )
    }

    fn invoke(&self, args: &Map<String, Value>) -> ToolOutcome {
        let app_name = arg(args, "appName");
        let url = arg(args, "url");
        let target = resolve_app_url(&app_name, Some(url.as_str()).filter(|u| !u.is_empty()));

        let text = match self.opener.open(&target) {
            Ok(()) => format!("I've opened {app_name} in a new tab for you, madam."),
            Err(e) => {
                tracing::debug!(error = %e, url = %target, "link not opened");
                format!(
                    "I've prepared the link for {app_name} for you, madam. (Note: Your browser may have blocked the automatic popup)."
                )
            }
        };

        ToolOutcome {
            text,
            action: Some(Action::open_app(format!("Open {app_name}"), target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Result;
    use crate::tools::NullOpener;

    struct Recording(Mutex<Vec<String>>);

    impl LinkOpener for Recording {
        fn open(&self, url: &str) -> Result<()> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_resolve_app_url_order() {
        assert_eq!(
            resolve_app_url("Instagram", Some("https://instagram.com/lia")),
            "https://instagram.com/lia"
        );
        assert_eq!(resolve_app_url("X", None), "https://www.twitter.com");
        assert_eq!(resolve_app_url("WhatsApp", Some("not a url")), "https://web.whatsapp.com");
        assert_eq!(
            resolve_app_url("Hacker News", None),
            "https://www.google.com/search?q=Hacker%20News"
        );
    }

    #[test]
    fn test_open_app_opens_link() {
        let opener = Arc::new(Recording(Mutex::new(Vec::new())));
        let tool = OpenApp::new(opener.clone());

        let outcome = tool.invoke(&args(json!({"appName": "YouTube"})));
        assert_eq!(outcome.text, "I've opened YouTube in a new tab for you, madam.");
        let action = outcome.action.unwrap();
        assert_eq!(action.label, "Open YouTube");
        assert_eq!(action.url, "https://www.youtube.com");
        assert_eq!(*opener.0.lock().unwrap(), vec!["https://www.youtube.com"]);
    }

    #[test]
    fn test_open_app_blocked() {
        let tool = OpenApp::new(Arc::new(NullOpener));
        let outcome = tool.invoke(&args(json!({"appName": "Spotify"})));
        assert!(outcome.text.starts_with("I've prepared the link for Spotify for you, madam."));
        assert_eq!(outcome.action.unwrap().url, "https://www.spotify.com");
    }

    #[test]
    fn test_fixed_replies() {
        let reminder = SetReminder.invoke(&args(json!({"text": "tea", "time": "5 PM"})));
        assert_eq!(
            reminder.text,
            "I've noted that down for you: \"tea\" for 5 PM. I'll make sure you don't forget, madam."
        );
        assert!(reminder.action.is_none());

        let home = ControlHome.invoke(&args(json!({"device": "lights", "action": "turned on"})));
        assert_eq!(home.text, "Certainly, madam. I've successfully turned on the lights for you.");

        let weather = GetWeather.invoke(&args(json!({"location": "London, UK"})));
        assert!(weather.text.starts_with("Checking the local atmosphere for London, UK..."));
    }
}
