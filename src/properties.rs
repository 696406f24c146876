//!
//! This module defines the AMQP basic properties carried alongside a message body.
//!
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const CONTENT_TYPE_TEXT_PLAIN: &str = "text/plain";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Highest priority a classic broker queue honours.
pub const MAX_PRIORITY: u8 = 9;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// The broker may drop the message on restart.
    Transient = 1,
    /// The broker writes the message to disk.
    Persistent = 2,
}

impl DeliveryMode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DeliveryMode {
    type Error = u8;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            1 => Ok(DeliveryMode::Transient),
            2 => Ok(DeliveryMode::Persistent),
            other => Err(other),
        }
    }
}

/// Scalar header value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(b) => write!(f, "{}", b),
            HeaderValue::Int(i) => write!(f, "{}", i),
            HeaderValue::Float(x) => write!(f, "{}", x),
            HeaderValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(b: bool) -> Self {
        HeaderValue::Bool(b)
    }
}

impl From<i64> for HeaderValue {
    fn from(i: i64) -> Self {
        HeaderValue::Int(i)
    }
}

impl From<f64> for HeaderValue {
    fn from(x: f64) -> Self {
        HeaderValue::Float(x)
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Str(s.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Str(s)
    }
}

pub type Headers = HashMap<String, HeaderValue>;

/// Every field is optional; `MessageProperties::default()` is the empty property set and
/// the `with_*` methods configure it by name.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<DeliveryMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    /// Time-to-live in milliseconds, as decimal text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: Headers,
}

impl MessageProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_owned());
        self
    }

    pub fn with_content_encoding(mut self, encoding: &str) -> Self {
        self.content_encoding = Some(encoding.to_owned());
        self
    }

    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = Some(mode);
        self
    }

    /// Priorities above [`MAX_PRIORITY`] are clamped.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority.min(MAX_PRIORITY));
        self
    }

    pub fn with_correlation_id(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_owned());
        self
    }

    pub fn with_reply_to(mut self, reply_to: &str) -> Self {
        self.reply_to = Some(reply_to.to_owned());
        self
    }

    pub fn with_expiration_ms(mut self, ttl: u64) -> Self {
        self.expiration = Some(ttl.to_string());
        self
    }

    pub fn with_message_id(mut self, id: &str) -> Self {
        self.message_id = Some(id.to_owned());
        self
    }

    pub fn with_timestamp(mut self, secs: u64) -> Self {
        self.timestamp = Some(secs);
        self
    }

    pub fn with_type(mut self, message_type: &str) -> Self {
        self.message_type = Some(message_type.to_owned());
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_owned());
        self
    }

    pub fn with_app_id(mut self, app_id: &str) -> Self {
        self.app_id = Some(app_id.to_owned());
        self
    }

    pub fn with_header(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.set_header(key, value);
        self
    }

    pub fn set_header(&mut self, key: &str, value: impl Into<HeaderValue>) {
        self.headers.insert(key.to_owned(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    /// Expiration in milliseconds. `None` when unset, empty or not a number.
    pub fn expiration_ms(&self) -> Option<u64> {
        self.expiration
            .as_deref()
            .filter(|ttl| !ttl.is_empty())
            .and_then(|ttl| ttl.parse().ok())
    }

    /// Lays `overrides` on top of `self`. Fields set in `overrides` win; headers are merged
    /// key by key.
    pub fn merge(mut self, overrides: MessageProperties) -> Self {
        fn pick<T>(base: &mut Option<T>, over: Option<T>) {
            if over.is_some() {
                *base = over;
            }
        }

        pick(&mut self.content_type, overrides.content_type);
        pick(&mut self.content_encoding, overrides.content_encoding);
        pick(&mut self.delivery_mode, overrides.delivery_mode);
        pick(&mut self.priority, overrides.priority);
        pick(&mut self.correlation_id, overrides.correlation_id);
        pick(&mut self.reply_to, overrides.reply_to);
        pick(&mut self.expiration, overrides.expiration);
        pick(&mut self.message_id, overrides.message_id);
        pick(&mut self.timestamp, overrides.timestamp);
        pick(&mut self.message_type, overrides.message_type);
        pick(&mut self.user_id, overrides.user_id);
        pick(&mut self.app_id, overrides.app_id);
        self.headers.extend(overrides.headers);
        self
    }
}
