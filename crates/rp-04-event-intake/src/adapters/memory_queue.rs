//! In-memory message queue with visibility timeouts.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use shared_types::TimeSource;
use uuid::Uuid;

use crate::ports::outbound::{MessageQueue, ReceivedMessage, TransportError};

#[derive(Debug)]
struct Slot {
    body: String,
    receipt: Option<String>,
    invisible_until: Option<DateTime<Utc>>,
    deliveries: u32,
}

impl Slot {
    fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.invisible_until.map_or(true, |t| t <= now)
    }
}

pub struct InMemoryMessageQueue<T: TimeSource> {
    slots: Mutex<Vec<Slot>>,
    clock: T,
}

impl<T: TimeSource> InMemoryMessageQueue<T> {
    pub fn new(clock: T) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            clock,
        }
    }

    pub fn push(&self, body: impl Into<String>) {
        self.slots.lock().push(Slot {
            body: body.into(),
            receipt: None,
            invisible_until: None,
            deliveries: 0,
        });
    }

    /// Messages not yet deleted, visible or not.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivery count of each remaining message, in queue order.
    pub fn deliveries(&self) -> Vec<u32> {
        self.slots.lock().iter().map(|s| s.deliveries).collect()
    }
}

#[async_trait::async_trait]
impl<T: TimeSource> MessageQueue for InMemoryMessageQueue<T> {
    async fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, TransportError> {
        let now = self.clock.now();
        let mut slots = self.slots.lock();
        let mut out = Vec::new();
        for slot in slots.iter_mut().filter(|s| s.is_visible(now)).take(max_messages) {
            let receipt = Uuid::new_v4().to_string();
            slot.receipt = Some(receipt.clone());
            slot.invisible_until = Some(now + visibility_timeout);
            slot.deliveries += 1;
            out.push(ReceivedMessage {
                receipt,
                body: slot.body.clone(),
            });
        }
        Ok(out)
    }

    async fn delete(&self, receipt: &str) -> Result<(), TransportError> {
        let mut slots = self.slots.lock();
        let position = slots
            .iter()
            .position(|s| s.receipt.as_deref() == Some(receipt))
            .ok_or_else(|| TransportError::UnknownReceipt(receipt.to_string()))?;
        slots.remove(position);
        Ok(())
    }
}
