//! Event dispatcher for view subscribers

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::state::events::ViewEvent;

/// Trait for components that subscribe to view events
pub trait ViewSubscriber: Send {
    fn on_view_event(&mut self, event: &ViewEvent);

    /// Get subscriber name for debugging
    fn name(&self) -> &str;
}

/// Adapter so a plain closure can subscribe
pub struct FnSubscriber<F> {
    name: String,
    handler: F,
}

impl<F> FnSubscriber<F>
where
    F: FnMut(&ViewEvent) + Send,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> ViewSubscriber for FnSubscriber<F>
where
    F: FnMut(&ViewEvent) + Send,
{
    fn on_view_event(&mut self, event: &ViewEvent) {
        (self.handler)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Delivers view events to subscribers and keeps a short history
pub struct EventDispatcher {
    subscribers: Vec<Box<dyn ViewSubscriber>>,

    /// Event history for debugging
    event_history: VecDeque<ViewEvent>,

    max_history: usize,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            event_history: VecDeque::new(),
            max_history: 100,
        }
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn ViewSubscriber>) {
        info!(target: "view", "Adding subscriber: {}", subscriber.name());
        self.subscribers.push(subscriber);
    }

    pub fn dispatch(&mut self, event: ViewEvent) {
        debug!(target: "view", "Dispatching {}: {:?}", event.name(), event);

        for subscriber in &mut self.subscribers {
            subscriber.on_view_event(&event);
        }

        self.event_history.push_back(event);
        if self.event_history.len() > self.max_history {
            self.event_history.pop_front();
        }
    }

    pub fn get_event_history(&self) -> impl Iterator<Item = &ViewEvent> {
        self.event_history.iter()
    }

    pub fn last_event(&self) -> Option<&ViewEvent> {
        self.event_history.back()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
