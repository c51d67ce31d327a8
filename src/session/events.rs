use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::path::PathBuf;

use crate::session::record::OutputRecord;

/// Observable session changes. The presentation layer (and the viewer/editor
/// collaborators) subscribe to this stream instead of binding to session
/// internals.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    RecordAppended(OutputRecord),
    RecordFinished(OutputRecord),
    CwdChanged(PathBuf),
    Cleared,
    OpenViewer(PathBuf),
    OpenEditor(PathBuf),
    OpenWithSystem(PathBuf),
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<UnboundedSender<SessionEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: SessionEvent) {
        // Dropped receivers are pruned on the way through.
        self.subscribers
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_fan_out_to_all_subscribers() {
        let mut bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        bus.emit(SessionEvent::CwdChanged(PathBuf::from("/tmp")));

        for rx in [&mut first, &mut second] {
            match rx.try_next() {
                Ok(Some(SessionEvent::CwdChanged(path))) => {
                    assert_eq!(path, PathBuf::from("/tmp"))
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.emit(SessionEvent::Cleared);
        assert!(bus.subscribers.is_empty());
    }
}
