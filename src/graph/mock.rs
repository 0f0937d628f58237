//! In-memory transport for tests.

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::error::TransportError;
use super::transport::GraphTransport;
use super::types::TransportCall;

/// Replays queued responses in order and records every call.
/// Once the queue is empty it answers `null`.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<TransportCall>>,
}

impl MockTransport {
    pub(crate) fn with_responses(responses: Vec<Result<Value, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl GraphTransport for MockTransport {
    async fn send(&self, call: TransportCall) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(call);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}
