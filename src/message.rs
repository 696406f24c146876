use crate::properties::MessageProperties;
use bytes::Bytes;

/// A publish-ready unit: body, the properties it owns, and an optional routing key.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    body: Bytes,

    /// Owned exclusively by this message.
    properties: MessageProperties,

    /// Empty means the exchange's default routing applies.
    routing_key: String,
}

impl Message {
    pub fn new(body: impl Into<Bytes>, properties: MessageProperties) -> Self {
        Message {
            body: body.into(),
            properties,
            routing_key: String::new(),
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn properties(&self) -> &MessageProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut MessageProperties {
        &mut self.properties
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn set_routing_key(&mut self, routing_key: &str) {
        self.routing_key = routing_key.to_owned();
    }

    pub fn with_routing_key(mut self, routing_key: &str) -> Self {
        self.set_routing_key(routing_key);
        self
    }

    pub fn into_parts(self) -> (Bytes, MessageProperties, String) {
        (self.body, self.properties, self.routing_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{DeliveryMode, CONTENT_TYPE_TEXT_PLAIN};

    #[test]
    fn test_new_has_default_routing() {
        let message = Message::new("test", MessageProperties::default());
        assert_eq!(message.body(), &Bytes::from("test"));
        assert_eq!(message.routing_key(), "");
    }

    #[test]
    fn test_set_routing_key() {
        let mut message = Message::new("test", MessageProperties::default());
        message.set_routing_key("foo_route");
        assert_eq!(message.routing_key(), "foo_route");
    }

    #[test]
    fn test_properties_are_owned() {
        let properties = MessageProperties::new().with_content_type(CONTENT_TYPE_TEXT_PLAIN);
        let mut first = Message::new("a", properties.clone());
        let second = Message::new("b", properties);
        first.properties_mut().delivery_mode = Some(DeliveryMode::Transient);
        assert_eq!(second.properties().delivery_mode, None);
    }

    #[test]
    fn test_into_parts() {
        let message =
            Message::new(vec![1u8, 2, 3], MessageProperties::default()).with_routing_key("r");
        let (body, _, routing_key) = message.into_parts();
        assert_eq!(&body[..], &[1, 2, 3]);
        assert_eq!(routing_key, "r");
    }
}
