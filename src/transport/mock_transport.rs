//! Mock GATT transport for testing

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    core::error::{TransportError, TransportResult},
    protocol::registry::Characteristic,
    transport::GattTransport,
};

/// A transport operation observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Read {
        service: Uuid,
        characteristic: Uuid,
    },
    Write {
        service: Uuid,
        characteristic: Uuid,
        value: Vec<u8>,
    },
}

impl TransportCall {
    pub fn characteristic(&self) -> Uuid {
        match self {
            TransportCall::Read { characteristic, .. }
            | TransportCall::Write { characteristic, .. } => *characteristic,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, TransportCall::Write { .. })
    }
}

/// Internal state for the mock transport
#[derive(Debug, Default)]
struct MockState {
    /// Values returned by every read until replaced
    values: HashMap<Uuid, Vec<u8>>,
    /// One-shot values consumed before `values`
    queued: HashMap<Uuid, VecDeque<Vec<u8>>>,
    failing_reads: HashSet<Uuid>,
    failing_writes: HashSet<Uuid>,
    calls: Vec<TransportCall>,
}

/// Mock GATT transport for testing
///
/// Serves scripted characteristic values, records every call and can be told
/// to fail reads or writes of specific characteristics. Each call yields to
/// the scheduler once so concurrent callers get a chance to interleave.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport with no characteristic values
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for every read of `characteristic`
    pub async fn set_value(&self, characteristic: Characteristic, value: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .await
            .values
            .insert(characteristic.uuid(), value.into());
    }

    /// Serve `value` for the next read of `characteristic` only
    pub async fn queue_value(&self, characteristic: Characteristic, value: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .await
            .queued
            .entry(characteristic.uuid())
            .or_default()
            .push_back(value.into());
    }

    /// Configure reads of `characteristic` to fail
    pub async fn set_read_failure(&self, characteristic: Characteristic, should_fail: bool) {
        let mut state = self.inner.lock().await;
        if should_fail {
            state.failing_reads.insert(characteristic.uuid());
        } else {
            state.failing_reads.remove(&characteristic.uuid());
        }
    }

    /// Configure writes to `characteristic` to fail
    pub async fn set_write_failure(&self, characteristic: Characteristic, should_fail: bool) {
        let mut state = self.inner.lock().await;
        if should_fail {
            state.failing_writes.insert(characteristic.uuid());
        } else {
            state.failing_writes.remove(&characteristic.uuid());
        }
    }

    /// All calls observed so far, in order
    pub async fn calls(&self) -> Vec<TransportCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Values written to `characteristic`, in order
    pub async fn writes_to(&self, characteristic: Characteristic) -> Vec<Vec<u8>> {
        let uuid = characteristic.uuid();
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Write {
                    characteristic,
                    value,
                    ..
                } if *characteristic == uuid => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls
    pub async fn clear_calls(&self) {
        self.inner.lock().await.calls.clear();
    }
}

impl GattTransport for MockTransport {
    async fn read(&self, service: Uuid, characteristic: Uuid) -> TransportResult<Vec<u8>> {
        tokio::task::yield_now().await;

        let mut state = self.inner.lock().await;
        state.calls.push(TransportCall::Read {
            service,
            characteristic,
        });

        if state.failing_reads.contains(&characteristic) {
            return Err(TransportError::NotPermitted(format!(
                "Mock read failure on {characteristic}"
            )));
        }

        if let Some(value) = state
            .queued
            .get_mut(&characteristic)
            .and_then(VecDeque::pop_front)
        {
            return Ok(value);
        }

        state
            .values
            .get(&characteristic)
            .cloned()
            .ok_or(TransportError::CharacteristicNotFound(characteristic))
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> TransportResult<()> {
        tokio::task::yield_now().await;

        let mut state = self.inner.lock().await;
        state.calls.push(TransportCall::Write {
            service,
            characteristic,
            value: value.to_vec(),
        });

        if state.failing_writes.contains(&characteristic) {
            return Err(TransportError::NotPermitted(format!(
                "Mock write failure on {characteristic}"
            )));
        }

        Ok(())
    }
}
