//!
//! This module defines the publisher: it validates the scheduling arguments of a publish and
//! routes each message either straight to the exchange or to a deferred queue.
//!
use crate::clock::{Clock, SystemClock};
use crate::composer::{MessageComposer, Payload};
use crate::deferred::DeferredQueue;
use crate::error::{CompositionError, PublishError, ValidationError};
use crate::exchange::{Exchange, PublishFlags, RoutingTarget};
use crate::message::Message;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

pub trait MessagePublisher {
    /// Builds a message from `body` with the composer's default properties.
    fn create_message(&self, body: Payload) -> Result<Message, CompositionError>;

    /// Publishes `message`.
    ///
    /// Without `publish_at`, or when it is exactly now, the message goes to the exchange right
    /// away, flagged for immediate delivery when `high_priority` is set. A future `publish_at`
    /// hands it to the deferred queue instead. The returned flag is the broker's (or the
    /// deferred queue's) answer, passed through unchanged.
    ///
    /// # Errors
    /// Raise ValidationError::PublishInPast if `publish_at` lies before now, and
    /// ValidationError::ScheduledHighPriority if a high priority message carries a publish date.
    /// Both are checked, in that order, before anything is sent.
    fn publish(
        &self,
        message: Message,
        high_priority: bool,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<bool, PublishError>;
}

/// Publisher bound to a single AMQP exchange.
///
/// High priority maps onto the broker's `immediate` publish flag: the broker returns the
/// message rather than queueing it when no consumer can take it at once. Brokers that do not
/// implement `immediate` (RabbitMQ 3.0 onwards) close the channel instead, which surfaces
/// here as a broker error.
pub struct AmqpMessagePublisher<E> {
    exchange: E,
    composer: Box<dyn MessageComposer>,
    deferred: Option<Box<dyn DeferredQueue>>,
    clock: Arc<dyn Clock>,
}

impl<E: Exchange> AmqpMessagePublisher<E> {
    pub fn new(exchange: E, composer: impl MessageComposer + 'static) -> Self {
        AmqpMessagePublisher {
            exchange,
            composer: Box::new(composer),
            deferred: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_deferred_queue(mut self, deferred: impl DeferredQueue + 'static) -> Self {
        self.deferred = Some(Box::new(deferred));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    fn validate(
        high_priority: bool,
        publish_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if let Some(at) = publish_at {
            if at < now {
                return Err(ValidationError::PublishInPast);
            }
            if high_priority {
                return Err(ValidationError::ScheduledHighPriority);
            }
        }
        Ok(())
    }

    fn publish_now(&self, message: &Message, high_priority: bool) -> Result<bool, PublishError> {
        let flags = if high_priority {
            PublishFlags::IMMEDIATE
        } else {
            PublishFlags::NONE
        };
        let routing_key = Some(message.routing_key()).filter(|key| !key.is_empty());

        debug!(
            exchange = self.exchange.name(),
            routing_key = message.routing_key(),
            high_priority,
            "Publishing message"
        );
        let published =
            self.exchange
                .publish(message.body(), routing_key, flags, message.properties())?;
        if !published {
            warn!(exchange = self.exchange.name(), "Broker did not accept message");
        }
        Ok(published)
    }

    fn publish_delayed(&self, message: Message, at: DateTime<Utc>) -> Result<bool, PublishError> {
        let deferred = self
            .deferred
            .as_ref()
            .ok_or(PublishError::NoDeferredQueue(at))?;
        let target = RoutingTarget {
            exchange: self.exchange.name().to_owned(),
            routing_key: Some(message.routing_key())
                .filter(|key| !key.is_empty())
                .map(str::to_owned),
        };

        debug!(%target, publish_at = %at, "Scheduling message");
        let accepted = deferred.schedule_at(message, target, at)?;
        if !accepted {
            warn!(publish_at = %at, "Deferred queue did not accept message");
        }
        Ok(accepted)
    }
}

impl<E: Exchange> MessagePublisher for AmqpMessagePublisher<E> {
    fn create_message(&self, body: Payload) -> Result<Message, CompositionError> {
        self.composer.compose(body, None)
    }

    fn publish(
        &self,
        message: Message,
        high_priority: bool,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<bool, PublishError> {
        let now = self.clock.now();
        Self::validate(high_priority, publish_at, now)?;

        match publish_at {
            Some(at) if at > now => self.publish_delayed(message, at),
            _ => self.publish_now(&message, high_priority),
        }
    }
}
