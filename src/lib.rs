//! This crate composes messages for an AMQP broker and publishes them, either right away or at a
//! scheduled time through a deferred queue. It also exposes received deliveries through a
//! read-only [`envelope::Envelope`].
//!
//! The broker connection itself is not managed here: the crate is written against the
//! [`exchange::Exchange`] publish primitive, which an AMQP client binding implements.
pub mod clock;
pub mod composer;
pub mod config;
pub mod deferred;
pub mod envelope;
pub mod error;
pub mod exchange;
pub mod memory;
pub mod message;
pub mod properties;
pub mod publisher;
pub mod serializer;

pub use composer::{DefaultMessageComposer, MessageComposer, Payload};
pub use envelope::Envelope;
pub use error::{PublishError, ValidationError};
pub use exchange::{Exchange, PublishFlags};
pub use message::Message;
pub use properties::{DeliveryMode, MessageProperties};
pub use publisher::{AmqpMessagePublisher, MessagePublisher};
