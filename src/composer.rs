//!
//! Composers turn application payloads into publish-ready [`Message`]s.
//!
use crate::config::PublisherConfig;
use crate::error::{CompositionError, SerializationError};
use crate::message::Message;
use crate::properties::{DeliveryMode, MessageProperties, CONTENT_TYPE_TEXT_PLAIN};
use crate::serializer::{value_kind, Serializer};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What an application hands to a composer.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Already encoded; used as the body verbatim.
    Raw(Bytes),

    /// Encoded by the composer's serializer.
    Value(Value),
}

impl Payload {
    /// Captures any serde-serializable value. Fails for shapes JSON cannot hold, such as maps
    /// with non-string keys.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, SerializationError> {
        Ok(Payload::Value(serde_json::to_value(value)?))
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Raw(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Raw(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Raw(Bytes::from(v))
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Raw(b)
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Value(v)
    }
}

pub trait MessageComposer: Send + Sync {
    /// Builds a new message from `payload`, laying `overrides` over the composer's defaults.
    fn compose(
        &self,
        payload: Payload,
        overrides: Option<MessageProperties>,
    ) -> Result<Message, CompositionError>;
}

/// Composer with plain-text, persistent defaults and an optional serializer.
#[derive(Clone)]
pub struct DefaultMessageComposer {
    serializer: Option<Arc<dyn Serializer>>,
    defaults: MessageProperties,
}

impl DefaultMessageComposer {
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self {
            serializer: Some(serializer),
            defaults: Self::base_properties(),
        }
    }

    /// A composer for payloads that arrive already encoded.
    pub fn raw() -> Self {
        Self {
            serializer: None,
            defaults: Self::base_properties(),
        }
    }

    pub fn from_config(config: &PublisherConfig, serializer: Option<Arc<dyn Serializer>>) -> Self {
        Self {
            serializer,
            defaults: config.default_properties(),
        }
    }

    /// Replaces the base properties every composed message starts from.
    pub fn with_defaults(mut self, defaults: MessageProperties) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &MessageProperties {
        &self.defaults
    }

    fn base_properties() -> MessageProperties {
        MessageProperties::new()
            .with_content_type(CONTENT_TYPE_TEXT_PLAIN)
            .with_delivery_mode(DeliveryMode::Persistent)
    }

    fn encode(&self, payload: Payload) -> Result<Bytes, CompositionError> {
        match (payload, &self.serializer) {
            (Payload::Raw(body), _) => Ok(body),
            (Payload::Value(value), Some(serializer)) => Ok(serializer.serialize(&value)?),
            (Payload::Value(Value::String(text)), None) => Ok(Bytes::from(text)),
            (Payload::Value(other), None) => Err(CompositionError::Unencodable(value_kind(&other))),
        }
    }
}

impl Default for DefaultMessageComposer {
    fn default() -> Self {
        Self::raw()
    }
}

impl fmt::Debug for DefaultMessageComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultMessageComposer")
            .field("serializer", &self.serializer.is_some())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl MessageComposer for DefaultMessageComposer {
    fn compose(
        &self,
        payload: Payload,
        overrides: Option<MessageProperties>,
    ) -> Result<Message, CompositionError> {
        let body = self.encode(payload)?;
        let properties = match overrides {
            Some(overrides) => self.defaults.clone().merge(overrides),
            None => self.defaults.clone(),
        };
        Ok(Message::new(body, properties))
    }
}
