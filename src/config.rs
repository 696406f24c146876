//!
//! Publisher configuration, read from JSON.
//!
use crate::error::ConfigError;
use crate::properties::{DeliveryMode, MessageProperties, CONTENT_TYPE_TEXT_PLAIN, MAX_PRIORITY};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PublisherConfig {
    pub default_content_type: String,

    pub default_delivery_mode: DeliveryMode,

    /// Stamped on every composed message when set.
    pub app_id: Option<String>,

    pub default_priority: Option<u8>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            default_content_type: CONTENT_TYPE_TEXT_PLAIN.to_owned(),
            default_delivery_mode: DeliveryMode::Persistent,
            app_id: None,
            default_priority: None,
        }
    }
}

impl PublisherConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PublisherConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_content_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "defaultContentType",
                value: self.default_content_type.clone(),
            });
        }
        if let Some(priority) = self.default_priority {
            if priority > MAX_PRIORITY {
                return Err(ConfigError::InvalidValue {
                    key: "defaultPriority",
                    value: priority.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Base properties for every composed message.
    pub fn default_properties(&self) -> MessageProperties {
        let mut properties = MessageProperties::new()
            .with_content_type(&self.default_content_type)
            .with_delivery_mode(self.default_delivery_mode);
        properties.app_id = self.app_id.clone();
        properties.priority = self.default_priority;
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config = PublisherConfig::from_json("{}")?;
        assert_eq!(config, PublisherConfig::default());
        let properties = config.default_properties();
        assert_eq!(properties.content_type.as_deref(), Some(CONTENT_TYPE_TEXT_PLAIN));
        assert_eq!(properties.delivery_mode, Some(DeliveryMode::Persistent));
        assert_eq!(properties.app_id, None);
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), Box<dyn std::error::Error>> {
        let json = r#"
        {"defaultContentType": "application/json", "defaultDeliveryMode": "transient",
         "appId": "billing", "defaultPriority": 4}
        "#;
        let config = PublisherConfig::from_json(json)?;
        assert_eq!(config.default_delivery_mode, DeliveryMode::Transient);
        let properties = config.default_properties();
        assert_eq!(properties.content_type.as_deref(), Some("application/json"));
        assert_eq!(properties.app_id.as_deref(), Some("billing"));
        assert_eq!(properties.priority, Some(4));
        Ok(())
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            PublisherConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PublisherConfig::from_json(r#"{"defaultDeliveryMode": "sometimes"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PublisherConfig::from_json(r#"{"defaultContentType": " "}"#),
            Err(ConfigError::InvalidValue { key: "defaultContentType", .. })
        ));
        assert!(matches!(
            PublisherConfig::from_json(r#"{"defaultPriority": 10}"#),
            Err(ConfigError::InvalidValue { key: "defaultPriority", .. })
        ));
    }
}
