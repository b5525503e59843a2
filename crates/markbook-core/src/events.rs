//! Typed lifecycle events for observers (UI, autosave).
//!
//! Subscribers are plain closures registered on the [`EventBus`]; every
//! emit fans out to all current subscribers in registration order.

/// A lifecycle event emitted by the project manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    /// The registry finished loading from storage.
    Loaded { count: usize },
    /// A project was created and inserted.
    Created { id: String },
    /// The current project switched. `previous` is the project that was
    /// current before the switch, if any.
    Opened {
        previous: Option<String>,
        id: String,
    },
    /// The current project's payload was captured and persisted.
    Saved { id: String },
    /// A registry entry was renamed in place.
    Renamed { id: String },
    /// A project was removed from the registry and storage.
    Deleted { id: String },
    /// A project was deep-copied into a new registry entry.
    Duplicated { source: String, id: String },
    /// An import batch finished.
    Imported { count: usize },
}

type Subscriber = Box<dyn Fn(&ProjectEvent)>;

/// Fan-out registry of event subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    /// Register a subscriber. There is no unsubscribe; observers live as
    /// long as the manager.
    pub fn subscribe(&mut self, subscriber: impl Fn(&ProjectEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Deliver an event to every subscriber.
    pub fn emit(&self, event: &ProjectEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, ProjectEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_all_subscribers_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();

        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            bus.subscribe(move |event| {
                seen.borrow_mut().push((tag, event.clone()));
            });
        }

        bus.emit(&ProjectEvent::Saved { id: "p-1".into() });

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "first");
        assert_eq!(seen[1].0, "second");
        assert_eq!(seen[0].1, ProjectEvent::Saved { id: "p-1".into() });
    }

    #[test]
    fn empty_bus_emit_is_a_noop() {
        let bus = EventBus::default();
        bus.emit(&ProjectEvent::Loaded { count: 0 });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
