//! Tools the model can call
//!
//! The registry maps a function name to a handler. Handlers are invoked
//! with the model's arguments and produce reply text plus an optional
//! deep link.

mod builtin;
mod opener;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::conversation::Action;
use crate::llm::{FunctionCall, FunctionDeclaration};

pub use builtin::{ControlHome, GetWeather, OpenApp, SearchWeb, SetReminder, resolve_app_url};
pub use opener::{LinkOpener, NullOpener, SystemOpener};

/// Result of running a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub text: String,
    pub action: Option<Action>,
}

impl ToolOutcome {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }
}

/// A callable tool
pub trait ToolHandler: Send + Sync {
    /// Schema advertised to the model
    fn declaration(&self) -> FunctionDeclaration;

    /// Run with the model's arguments
    fn invoke(&self, args: &Map<String, Value>) -> ToolOutcome;
}

/// Name → handler table, in declaration order
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    order: Vec<String>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five built-in tools
    #[must_use]
    pub fn with_builtins(opener: Arc<dyn LinkOpener>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchWeb));
        registry.register(Arc::new(GetWeather));
        registry.register(Arc::new(SetReminder));
        registry.register(Arc::new(OpenApp::new(opener)));
        registry.register(Arc::new(ControlHome));
        registry
    }

    /// Add a handler, replacing any with the same name
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.declaration().name;
        if self.handlers.insert(name.clone(), handler).is_none() {
            self.order.push(name);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Declarations for every registered tool
    #[must_use]
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.declaration())
            .collect()
    }

    /// Run a model tool call, `None` for unknown tools
    #[must_use]
    pub fn dispatch(&self, call: &FunctionCall) -> Option<ToolOutcome> {
        let Some(handler) = self.handlers.get(&call.name) else {
            tracing::debug!(tool = %call.name, "ignoring unknown tool call");
            return None;
        };

        tracing::info!(tool = %call.name, "dispatching tool call");
        Some(handler.invoke(&call.args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_declarations() {
        let registry = ToolRegistry::with_builtins(Arc::new(NullOpener));
        let names: Vec<_> = registry.declarations().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            ["searchWeb", "getWeather", "setReminder", "openApp", "controlHome"]
        );

        let open_app = &registry.declarations()[3];
        assert_eq!(open_app.parameters["required"], serde_json::json!(["appName"]));
    }

    #[test]
    fn test_dispatch_unknown_is_ignored() {
        let registry = ToolRegistry::with_builtins(Arc::new(NullOpener));
        let call = FunctionCall {
            name: "launchRocket".to_string(),
            args: Map::new(),
        };
        assert!(registry.dispatch(&call).is_none());
    }

    #[test]
    fn test_register_replaces_by_name() {
        struct Loud;
        impl ToolHandler for Loud {
            fn declaration(&self) -> FunctionDeclaration {
                SearchWeb.declaration()
            }
            fn invoke(&self, _args: &Map<String, Value>) -> ToolOutcome {
                ToolOutcome::text("LOUD")
            }
        }

        let mut registry = ToolRegistry::with_builtins(Arc::new(NullOpener));
        registry.register(Arc::new(Loud));
        assert_eq!(registry.len(), 5);

        let call = FunctionCall {
            name: "searchWeb".to_string(),
            args: Map::new(),
        };
        assert_eq!(registry.dispatch(&call).unwrap().text, "LOUD");
    }
}
