//!
//! This module defines the broker-side publish primitive the rest of the crate is written against.
//!
use crate::error::BrokerError;
use crate::properties::MessageProperties;
use bytes::Bytes;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

/// Bit-wise publish flags, numerically compatible with the common AMQP client constants.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublishFlags(u32);

impl PublishFlags {
    pub const NONE: PublishFlags = PublishFlags(0);

    /// Return the message if no queue is bound for its routing key.
    pub const MANDATORY: PublishFlags = PublishFlags(1);

    /// Return the message if it cannot be handed to a consumer right away.
    pub const IMMEDIATE: PublishFlags = PublishFlags(2);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: PublishFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PublishFlags {
    type Output = PublishFlags;

    fn bitor(self, rhs: PublishFlags) -> PublishFlags {
        PublishFlags(self.0 | rhs.0)
    }
}

/// Where a deferred message must eventually be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub exchange: String,

    /// `None` defers to the exchange's default routing.
    pub routing_key: Option<String>,
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.exchange,
            self.routing_key.as_deref().unwrap_or("")
        )
    }
}

/// A broker exchange handle.
///
/// Implementations are usually backed by a single AMQP channel and inherit its thread-safety
/// contract: share one handle between threads only if the underlying channel allows it.
pub trait Exchange: Send + Sync {
    fn name(&self) -> &str;

    /// One publish round-trip. `Ok(false)` is the broker declining the message; connection
    /// level failures surface as `Err`.
    fn publish(
        &self,
        body: &Bytes,
        routing_key: Option<&str>,
        flags: PublishFlags,
        properties: &MessageProperties,
    ) -> Result<bool, BrokerError>;
}

impl<E: Exchange + ?Sized> Exchange for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn publish(
        &self,
        body: &Bytes,
        routing_key: Option<&str>,
        flags: PublishFlags,
        properties: &MessageProperties,
    ) -> Result<bool, BrokerError> {
        (**self).publish(body, routing_key, flags, properties)
    }
}
