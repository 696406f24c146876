//!
//! Read-only views over received deliveries.
//!
use crate::properties::{HeaderValue, Headers, MessageProperties};
use bytes::Bytes;

/// Transport metadata of a received message.
///
/// Every accessor is a projection of the delivery. Optional fields the broker did not set
/// read as `None`, and so does a header lookup for a missing key.
pub trait Envelope {
    fn app_id(&self) -> Option<&str>;

    fn body(&self) -> &Bytes;

    fn content_encoding(&self) -> Option<&str>;

    fn content_type(&self) -> Option<&str>;

    fn correlation_id(&self) -> Option<&str>;

    /// Wire value: 1 transient, 2 persistent.
    fn delivery_mode(&self) -> Option<u8>;

    fn delivery_tag(&self) -> u64;

    fn exchange_name(&self) -> &str;

    fn expiration(&self) -> Option<&str>;

    fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers().get(key)
    }

    fn headers(&self) -> &Headers;

    fn message_id(&self) -> Option<&str>;

    fn priority(&self) -> Option<u8>;

    fn reply_to(&self) -> Option<&str>;

    fn routing_key(&self) -> &str;

    fn timestamp(&self) -> Option<u64>;

    fn message_type(&self) -> Option<&str>;

    fn user_id(&self) -> Option<&str>;

    /// Whether the broker has delivered this message before, e.g. after a reject with requeue.
    fn is_redelivery(&self) -> bool;
}

/// A delivery as handed over by the broker client: the `basic.deliver` fields, the content
/// header properties and the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
    pub properties: MessageProperties,
    pub body: Bytes,
}

/// Envelope over a delivery received from an AMQP broker.
#[derive(Debug, Clone)]
pub struct AmqpEnvelope {
    delivery: Delivery,
}

impl AmqpEnvelope {
    pub fn new(delivery: Delivery) -> Self {
        Self { delivery }
    }

    pub fn into_delivery(self) -> Delivery {
        self.delivery
    }

    fn properties(&self) -> &MessageProperties {
        &self.delivery.properties
    }
}

impl From<Delivery> for AmqpEnvelope {
    fn from(delivery: Delivery) -> Self {
        Self::new(delivery)
    }
}

impl Envelope for AmqpEnvelope {
    fn app_id(&self) -> Option<&str> {
        self.properties().app_id.as_deref()
    }

    fn body(&self) -> &Bytes {
        &self.delivery.body
    }

    fn content_encoding(&self) -> Option<&str> {
        self.properties().content_encoding.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.properties().content_type.as_deref()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.properties().correlation_id.as_deref()
    }

    fn delivery_mode(&self) -> Option<u8> {
        self.properties().delivery_mode.map(|mode| mode.as_u8())
    }

    fn delivery_tag(&self) -> u64 {
        self.delivery.delivery_tag
    }

    fn exchange_name(&self) -> &str {
        &self.delivery.exchange
    }

    fn expiration(&self) -> Option<&str> {
        self.properties()
            .expiration
            .as_deref()
            .filter(|ttl| !ttl.is_empty())
    }

    fn headers(&self) -> &Headers {
        &self.properties().headers
    }

    fn message_id(&self) -> Option<&str> {
        self.properties().message_id.as_deref()
    }

    fn priority(&self) -> Option<u8> {
        self.properties().priority
    }

    fn reply_to(&self) -> Option<&str> {
        self.properties().reply_to.as_deref()
    }

    fn routing_key(&self) -> &str {
        &self.delivery.routing_key
    }

    fn timestamp(&self) -> Option<u64> {
        self.properties().timestamp
    }

    fn message_type(&self) -> Option<&str> {
        self.properties().message_type.as_deref()
    }

    fn user_id(&self) -> Option<&str> {
        self.properties().user_id.as_deref()
    }

    fn is_redelivery(&self) -> bool {
        self.delivery.redelivered
    }
}
