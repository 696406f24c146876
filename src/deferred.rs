//!
//! Deferred queues hold a message back until its publish date.
//!
//! Two mechanisms live on the broker (a dead-lettering holding queue, or the delayed-message
//! exchange plugin) and one lives in process on a tokio runtime.
//!
use crate::clock::{Clock, SystemClock};
use crate::error::BrokerError;
use crate::exchange::{Exchange, PublishFlags, RoutingTarget};
use crate::message::Message;
use crate::properties::MessageProperties;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

/// Header recording the exchange a deferred message is destined for.
pub const SCHEDULED_EXCHANGE_HEADER: &str = "x-scheduled-exchange";

/// Header recording the release time of a deferred message, RFC 3339.
pub const SCHEDULED_AT_HEADER: &str = "x-scheduled-at";

/// Delay header read by the delayed-message exchange plugin, in milliseconds.
pub const DELAY_HEADER: &str = "x-delay";

pub trait DeferredQueue: Send + Sync {
    /// Hands `message` off for release to `target` at `when`. `Ok(true)` means the hand-off
    /// was accepted, not that the message has been delivered.
    fn schedule_at(
        &self,
        message: Message,
        target: RoutingTarget,
        when: DateTime<Utc>,
    ) -> Result<bool, BrokerError>;
}

impl<D: DeferredQueue + ?Sized> DeferredQueue for Arc<D> {
    fn schedule_at(
        &self,
        message: Message,
        target: RoutingTarget,
        when: DateTime<Utc>,
    ) -> Result<bool, BrokerError> {
        (**self).schedule_at(message, target, when)
    }
}

/// Milliseconds from now until `when`, zero if it has already passed.
fn delay_ms(clock: &dyn Clock, when: DateTime<Utc>) -> u64 {
    (when - clock.now()).num_milliseconds().max(0) as u64
}

fn mark_scheduled(properties: &mut MessageProperties, target: &RoutingTarget, when: DateTime<Utc>) {
    properties.set_header(SCHEDULED_EXCHANGE_HEADER, target.exchange.as_str());
    properties.set_header(SCHEDULED_AT_HEADER, when.to_rfc3339());
}

/// Publishes to a holding exchange whose queue has no consumers and dead-letters into the
/// target exchange. The remaining delay travels as the per-message `expiration`, replacing
/// any expiration the message carried.
///
/// The holding exchange must route into a queue declared with `x-dead-letter-exchange` set to
/// `target.exchange`; the target is only recorded in a header here, not checked.
///
/// Brokers only expire messages at the head of a queue, so a long delay queued ahead of a
/// short one holds the short one back. Use one holding queue per delay bucket if that matters.
pub struct DeadLetterQueue<E> {
    holding: E,
    clock: Arc<dyn Clock>,
}

impl<E: Exchange> DeadLetterQueue<E> {
    pub fn new(holding: E) -> Self {
        Self {
            holding,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<E: Exchange> DeferredQueue for DeadLetterQueue<E> {
    fn schedule_at(
        &self,
        message: Message,
        target: RoutingTarget,
        when: DateTime<Utc>,
    ) -> Result<bool, BrokerError> {
        let delay = delay_ms(self.clock.as_ref(), when);
        let (body, properties, _) = message.into_parts();
        let mut properties = properties.with_expiration_ms(delay);
        mark_scheduled(&mut properties, &target, when);

        debug!(holding = self.holding.name(), %target, delay, "Deferring message via dead-letter queue");
        self.holding.publish(
            &body,
            target.routing_key.as_deref(),
            PublishFlags::NONE,
            &properties,
        )
    }
}

/// Publishes to an exchange of the delayed-message plugin type, which holds the message for
/// the number of milliseconds in its `x-delay` header before routing it.
///
/// The delayed exchange routes the message itself once the delay elapses, so it must be bound
/// to the queues `target.exchange` would have reached, typically through an exchange-to-exchange
/// binding. The target is only recorded in a header here, not checked.
pub struct DelayedExchangeQueue<E> {
    exchange: E,
    clock: Arc<dyn Clock>,
}

impl<E: Exchange> DelayedExchangeQueue<E> {
    pub fn new(exchange: E) -> Self {
        Self {
            exchange,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<E: Exchange> DeferredQueue for DelayedExchangeQueue<E> {
    fn schedule_at(
        &self,
        message: Message,
        target: RoutingTarget,
        when: DateTime<Utc>,
    ) -> Result<bool, BrokerError> {
        let delay = delay_ms(self.clock.as_ref(), when);
        let (body, mut properties, _) = message.into_parts();
        properties.set_header(DELAY_HEADER, delay as i64);
        mark_scheduled(&mut properties, &target, when);

        debug!(exchange = self.exchange.name(), %target, delay, "Deferring message via delayed exchange");
        self.exchange.publish(
            &body,
            target.routing_key.as_deref(),
            PublishFlags::NONE,
            &properties,
        )
    }
}

/// Counts a message as pending until dropped, whether the release task finishes or the
/// runtime drops it first.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(pending: &Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::AcqRel);
        PendingGuard(Arc::clone(pending))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Keeps deferred messages in process and publishes them to the target exchange from a tokio
/// task once their time comes. Pending messages are lost if the runtime shuts down first.
pub struct TimerQueue<E> {
    exchange: Arc<E>,
    handle: Handle,
    clock: Arc<dyn Clock>,
    pending: Arc<AtomicUsize>,
}

impl<E: Exchange + 'static> TimerQueue<E> {
    pub fn new(exchange: Arc<E>, handle: Handle) -> Self {
        Self {
            exchange,
            handle,
            clock: Arc::new(SystemClock),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Messages handed off and neither published yet nor dropped with the runtime.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl<E: Exchange + 'static> DeferredQueue for TimerQueue<E> {
    fn schedule_at(
        &self,
        message: Message,
        target: RoutingTarget,
        when: DateTime<Utc>,
    ) -> Result<bool, BrokerError> {
        if target.exchange != self.exchange.name() {
            warn!(
                exchange = self.exchange.name(),
                %target,
                "Timer queue cannot release to a different exchange"
            );
            return Ok(false);
        }

        let delay = std::time::Duration::from_millis(delay_ms(self.clock.as_ref(), when));
        let exchange = Arc::clone(&self.exchange);
        let (body, properties, _) = message.into_parts();

        let guard = PendingGuard::new(&self.pending);
        debug!(%target, ?delay, "Deferring message on in-process timer");
        self.handle.spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            let released = tokio::task::spawn_blocking(move || {
                exchange.publish(
                    &body,
                    target.routing_key.as_deref(),
                    PublishFlags::NONE,
                    &properties,
                )
            })
            .await;
            match released {
                Ok(Ok(true)) => debug!("Released deferred message"),
                Ok(Ok(false)) => warn!("Broker declined deferred message"),
                Ok(Err(e)) => error!(error = %e, "Failed to release deferred message"),
                Err(e) => error!(error = %e, "Deferred publish task panicked"),
            }
        });
        Ok(true)
    }
}
