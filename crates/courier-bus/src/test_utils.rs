use crate::transport::{OnMessage, ShouldStop, Transport, TransportResult};
use courier_types::{Envelope, TransportError};
use std::cell::{Cell, RefCell};

/// Transport double that records every send and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: RefCell<Vec<(String, Envelope)>>,
    fail_sends: Cell<bool>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(String, Envelope)> {
        self.sent.borrow().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.set(fail);
    }
}

impl Transport for RecordingTransport {
    fn init(&self) -> TransportResult<()> {
        Ok(())
    }

    fn bind_queue(&self, _queue: &str, _routing_key: &str) -> TransportResult<()> {
        Ok(())
    }

    fn unbind_queue(&self, _queue: &str, _routing_key: &str) -> TransportResult<()> {
        Ok(())
    }

    fn pending(&self, _queue: &str) -> TransportResult<usize> {
        Ok(0)
    }

    fn purge(&self, _queue: &str) -> TransportResult<usize> {
        Ok(0)
    }

    fn send(&self, routing_key: &str, envelope: Envelope) -> TransportResult<()> {
        if self.fail_sends.get() {
            return Err(TransportError::Backend("send refused".into()));
        }
        self.sent.borrow_mut().push((routing_key.to_string(), envelope));
        Ok(())
    }

    fn recv(&self, _queue: &str) -> TransportResult<Option<Envelope>> {
        Ok(None)
    }

    fn accept(&self, _envelope: &Envelope) -> TransportResult<()> {
        Ok(())
    }

    fn reject(&self, _envelope: &Envelope, _requeue: bool) -> TransportResult<()> {
        Ok(())
    }

    fn subscribe(&self, _queue: &str) -> TransportResult<()> {
        Ok(())
    }

    fn consume(
        &self,
        _queue: &str,
        _on_message: &mut OnMessage<'_>,
        _should_stop: &mut ShouldStop<'_>,
    ) -> TransportResult<usize> {
        Ok(0)
    }
}
