use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Toast { level: ToastLevel, message: String },
    Navigate(String),
}

/// Fan-out of user-facing side effects (toasts, navigation) to whoever renders them.
#[derive(Clone)]
pub struct EventBus {
    events: broadcast::Sender<ClientEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn toast_success(&self, message: impl Into<String>) {
        self.emit(ClientEvent::Toast {
            level: ToastLevel::Success,
            message: message.into(),
        });
    }

    pub fn toast_error(&self, message: impl Into<String>) {
        self.emit(ClientEvent::Toast {
            level: ToastLevel::Error,
            message: message.into(),
        });
    }

    pub fn navigate(&self, path: impl Into<String>) {
        self.emit(ClientEvent::Navigate(path.into()));
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine; nobody is rendering right now.
        if self.events.send(event).is_err() {
            debug!("events: dropped event without subscribers");
        }
    }
}
