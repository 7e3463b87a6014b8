//! The processing thread and its control handle.
//!
//! ```text
//!  control thread                          processing thread
//! ┌──────────────┐   ControlMessage    ┌────────────────────┐
//! │ ControlHandle│ ──────────────────► │ WorkletScope       │
//! │              │                     │   registry         │
//! │              │ ◄────────────────── │   dispatcher       │
//! └──────────────┘       Event         └────────────────────┘
//! ```
//!
//! Both directions are unbounded `crossbeam` channels. The processing thread
//! handles one message at a time, in order; a failed message is logged and
//! the loop moves on. The thread exits when the [`ControlHandle`] is dropped.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use worklet_config::RuntimeConfig;
use worklet_registry::ModuleLibrary;

use crate::error::RuntimeError;
use crate::message::{ControlMessage, Event};
use crate::reporter::LifecycleReporter;
use crate::scope::WorkletScope;

/// Control-side end of the processing thread.
#[derive(Debug)]
pub struct ControlHandle {
    tx: Sender<ControlMessage>,
    events: Receiver<Event>,
}

impl ControlHandle {
    /// Post a message to the processing thread.
    pub fn post(&self, message: ControlMessage) -> Result<(), RuntimeError> {
        self.tx.send(message).map_err(|_| RuntimeError::Disconnected)
    }

    /// Next pending event, without blocking.
    pub fn try_recv_event(&self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<Event> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Every event pending right now.
    pub fn drain_events(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    /// Post a fence and wait for its echo.
    ///
    /// Returns every event that arrived before the echo, in order. Once this
    /// returns, every message posted earlier has been fully handled.
    pub fn sync(&self, token: u64, timeout: Duration) -> Result<Vec<Event>, RuntimeError> {
        self.post(ControlMessage::Fence { token })?;
        let deadline = Instant::now() + timeout;
        let mut before = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(Event::Fence { token: t }) if t == token => return Ok(before),
                Ok(event) => before.push(event),
                Err(RecvTimeoutError::Timeout) => return Err(RuntimeError::FenceTimeout { token }),
                Err(RecvTimeoutError::Disconnected) => return Err(RuntimeError::Disconnected),
            }
        }
    }
}

/// A running processing thread.
#[derive(Debug)]
pub struct ProcessingThread {
    name: String,
    handle: JoinHandle<usize>,
}

impl ProcessingThread {
    /// Start the processing thread with a fresh scope.
    ///
    /// Modules become available through `import` messages resolved against
    /// `library`.
    pub fn spawn(
        config: &RuntimeConfig,
        library: ModuleLibrary,
    ) -> Result<(ControlHandle, ProcessingThread), RuntimeError> {
        let (tx, rx) = unbounded();
        let (event_tx, events) = unbounded();
        let scope = WorkletScope::new(config, library, LifecycleReporter::new(event_tx));

        let name = config.thread_name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(scope, &rx))?;
        tracing::info!("thread: '{name}' started");

        Ok((ControlHandle { tx, events }, ProcessingThread { name, handle }))
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the thread to exit and return how many messages it handled.
    ///
    /// The thread exits only once its [`ControlHandle`] is dropped.
    pub fn join(self) -> Result<usize, RuntimeError> {
        self.handle.join().map_err(|_| RuntimeError::ThreadPanicked)
    }
}

fn run(mut scope: WorkletScope, rx: &Receiver<ControlMessage>) -> usize {
    let mut handled = 0;
    for message in rx.iter() {
        let kind = message.kind();
        if let Err(err) = scope.handle(message) {
            tracing::warn!("thread: {kind} failed: {err}");
        }
        handled += 1;
    }
    tracing::info!(
        "thread: control side closed after {handled} messages, dropping {} instances",
        scope.dispatcher().len()
    );
    handled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_is_named_and_exits_on_drop() {
        let mut config = RuntimeConfig::default();
        config.thread_name = "worklet-test".to_string();
        let (control, thread) = ProcessingThread::spawn(&config, ModuleLibrary::builtin()).unwrap();
        assert_eq!(thread.name(), "worklet-test");

        control
            .post(ControlMessage::Init {
                sample_rate: 48000.0,
                origin: String::new(),
            })
            .unwrap();
        drop(control);
        assert_eq!(thread.join().unwrap(), 1);
    }

    #[test]
    fn sync_returns_events_before_fence() {
        let (control, thread) =
            ProcessingThread::spawn(&RuntimeConfig::default(), ModuleLibrary::builtin()).unwrap();
        control
            .post(ControlMessage::Import {
                url: "modules/bypass.js".into(),
            })
            .unwrap();
        let events = control.sync(1, Duration::from_secs(5)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], Event::Load { url } if url == "modules/bypass.js"));

        drop(control);
        assert_eq!(thread.join().unwrap(), 2);
    }

    #[test]
    fn failed_message_does_not_stop_the_thread() {
        let (control, thread) =
            ProcessingThread::spawn(&RuntimeConfig::default(), ModuleLibrary::new()).unwrap();
        control
            .post(ControlMessage::Import {
                url: "modules/gain.js".into(),
            })
            .unwrap();
        assert!(control.sync(7, Duration::from_secs(5)).unwrap().is_empty());
        drop(control);
        assert_eq!(thread.join().unwrap(), 2);
    }
}
