//!
//! An in-process loopback transport. `MemoryExchange` accepts publishes like a broker exchange
//! bound to a single queue, and hands them back as envelopes.
//!
use crate::envelope::Envelope;
use crate::error::BrokerError;
use crate::exchange::{Exchange, PublishFlags};
use crate::message::Message;
use crate::properties::{HeaderValue, Headers, MessageProperties};
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

pub struct MemoryExchange {
    name: String,
    queue: Mutex<VecDeque<MemoryEnvelope>>,
    delivery_tags: AtomicU64,
    accepting: AtomicBool,
}

impl MemoryExchange {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            queue: Mutex::new(VecDeque::new()),
            delivery_tags: AtomicU64::new(1),
            accepting: AtomicBool::new(true),
        }
    }

    /// While not accepting, publishes return `Ok(false)` and nothing is queued.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Release);
    }

    /// Takes the next message off the queue.
    pub fn get(&self) -> Result<Option<MemoryEnvelope>, BrokerError> {
        Ok(self.lock()?.pop_front())
    }

    /// Puts a message back at the head of the queue; it is redelivered with a fresh tag.
    pub fn requeue(&self, mut envelope: MemoryEnvelope) -> Result<(), BrokerError> {
        envelope.redelivered = true;
        envelope.delivery_tag = self.next_delivery_tag();
        self.lock()?.push_front(envelope);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, BrokerError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, BrokerError> {
        Ok(self.lock()?.is_empty())
    }

    fn next_delivery_tag(&self) -> u64 {
        self.delivery_tags.fetch_add(1, Ordering::Relaxed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, VecDeque<MemoryEnvelope>>, BrokerError> {
        self.queue.lock().map_err(|e| {
            error!("Lock is poisoned. Cause: {}", e);
            BrokerError::new("memory exchange lock poisoned")
        })
    }
}

impl Exchange for MemoryExchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(
        &self,
        body: &Bytes,
        routing_key: Option<&str>,
        flags: PublishFlags,
        properties: &MessageProperties,
    ) -> Result<bool, BrokerError> {
        if !self.accepting.load(Ordering::Acquire) {
            debug!(exchange = %self.name, "Memory exchange declined message");
            return Ok(false);
        }

        let message = Message::new(body.clone(), properties.clone())
            .with_routing_key(routing_key.unwrap_or(""));
        let envelope = MemoryEnvelope {
            message,
            exchange: self.name.clone(),
            delivery_tag: self.next_delivery_tag(),
            redelivered: false,
            flags,
        };
        self.lock()?.push_back(envelope);
        Ok(true)
    }
}

/// Envelope over a message that went through a [`MemoryExchange`].
#[derive(Debug, Clone)]
pub struct MemoryEnvelope {
    message: Message,
    exchange: String,
    delivery_tag: u64,
    redelivered: bool,
    flags: PublishFlags,
}

impl MemoryEnvelope {
    /// Flags the message was published with.
    pub fn flags(&self) -> PublishFlags {
        self.flags
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}

impl Envelope for MemoryEnvelope {
    fn app_id(&self) -> Option<&str> {
        self.message.properties().app_id.as_deref()
    }

    fn body(&self) -> &Bytes {
        self.message.body()
    }

    fn content_encoding(&self) -> Option<&str> {
        self.message.properties().content_encoding.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.message.properties().content_type.as_deref()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.message.properties().correlation_id.as_deref()
    }

    fn delivery_mode(&self) -> Option<u8> {
        self.message.properties().delivery_mode.map(|mode| mode.as_u8())
    }

    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    fn exchange_name(&self) -> &str {
        &self.exchange
    }

    fn expiration(&self) -> Option<&str> {
        self.message
            .properties()
            .expiration
            .as_deref()
            .filter(|ttl| !ttl.is_empty())
    }

    fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.message.properties().header(key)
    }

    fn headers(&self) -> &Headers {
        &self.message.properties().headers
    }

    fn message_id(&self) -> Option<&str> {
        self.message.properties().message_id.as_deref()
    }

    fn priority(&self) -> Option<u8> {
        self.message.properties().priority
    }

    fn reply_to(&self) -> Option<&str> {
        self.message.properties().reply_to.as_deref()
    }

    fn routing_key(&self) -> &str {
        self.message.routing_key()
    }

    fn timestamp(&self) -> Option<u64> {
        self.message.properties().timestamp
    }

    fn message_type(&self) -> Option<&str> {
        self.message.properties().message_type.as_deref()
    }

    fn user_id(&self) -> Option<&str> {
        self.message.properties().user_id.as_deref()
    }

    fn is_redelivery(&self) -> bool {
        self.redelivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::CONTENT_TYPE_TEXT_PLAIN;

    fn publish(exchange: &MemoryExchange, body: &'static str, routing_key: Option<&str>) -> Result<bool, BrokerError> {
        let properties = MessageProperties::new()
            .with_content_type(CONTENT_TYPE_TEXT_PLAIN)
            .with_header("origin", "test");
        exchange.publish(&Bytes::from(body), routing_key, PublishFlags::NONE, &properties)
    }

    #[test]
    fn test_publish_and_get() -> Result<(), Box<dyn std::error::Error>> {
        let exchange = MemoryExchange::new("orders");
        assert!(publish(&exchange, "first", Some("created"))?);
        assert!(publish(&exchange, "second", None)?);
        assert_eq!(exchange.len()?, 2);

        let first = exchange.get()?.ok_or("queue is empty")?;
        assert_eq!(first.body(), &Bytes::from("first"));
        assert_eq!(first.routing_key(), "created");
        assert_eq!(first.exchange_name(), "orders");
        assert_eq!(first.content_type(), Some(CONTENT_TYPE_TEXT_PLAIN));
        assert_eq!(first.header("origin"), Some(&HeaderValue::from("test")));
        assert_eq!(first.header("nonexistent"), None);
        assert!(!first.is_redelivery());

        let second = exchange.get()?.ok_or("queue is empty")?;
        assert_eq!(second.routing_key(), "");
        assert!(second.delivery_tag() > first.delivery_tag());
        assert!(exchange.get()?.is_none());

        let message = first.into_message();
        assert_eq!(message.body(), &Bytes::from("first"));
        assert_eq!(message.routing_key(), "created");
        assert_eq!(message.properties().header("origin"), Some(&HeaderValue::from("test")));
        Ok(())
    }

    #[test]
    fn test_requeue_marks_redelivery() -> Result<(), Box<dyn std::error::Error>> {
        let exchange = MemoryExchange::new("orders");
        publish(&exchange, "first", None)?;
        publish(&exchange, "second", None)?;

        let envelope = exchange.get()?.ok_or("queue is empty")?;
        let tag = envelope.delivery_tag();
        exchange.requeue(envelope)?;

        let redelivered = exchange.get()?.ok_or("queue is empty")?;
        assert_eq!(redelivered.body(), &Bytes::from("first"));
        assert!(redelivered.is_redelivery());
        assert_ne!(redelivered.delivery_tag(), tag);
        Ok(())
    }

    #[test]
    fn test_declining_exchange() -> Result<(), Box<dyn std::error::Error>> {
        let exchange = MemoryExchange::new("orders");
        exchange.set_accepting(false);
        assert!(!publish(&exchange, "dropped", None)?);
        assert!(exchange.is_empty()?);
        Ok(())
    }
}
