//! In-memory channel fakes for bridge tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::InboundMessage;
use crate::transport::{ClientChannel, DeviceChannel, ReadyState};

// ============================================================================
// RecordingClient
// ============================================================================

/// Client channel that records every frame it is asked to send.
pub(crate) struct RecordingClient {
    state: AtomicU8,
    closed: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub(crate) fn open() -> Arc<Self> {
        Self::with_state(ReadyState::Open)
    }

    pub(crate) fn with_state(state: ReadyState) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(state as u8),
            closed: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_state(&self, state: ReadyState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|text| serde_json::from_str(text).expect("sent frame is JSON"))
            .collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ClientChannel for RecordingClient {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn send_text(&self, text: String) -> Result<()> {
        if !self.ready_state().is_open() {
            return Err(Error::ChannelNotOpen);
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.set_state(ReadyState::Closed);
    }
}

// ============================================================================
// RecordingDevice
// ============================================================================

/// Device channel that records forwarded commands.
pub(crate) struct RecordingDevice {
    closed: AtomicBool,
    commands: Mutex<Vec<InboundMessage>>,
}

impl RecordingDevice {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            closed: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn commands(&self) -> Vec<InboundMessage> {
        self.commands.lock().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl DeviceChannel for RecordingDevice {
    fn send_command(&self, message: &InboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.commands.lock().push(message.clone());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
