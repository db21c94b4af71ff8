//! `spring_input_booleans` configuration
//!
//! ```yaml
//! spring_input_booleans:
//!   entities:
//!     - input_boolean.doorbell_chime
//!   delay_seconds: 0
//!   enable_notifications: true
//!   notification_service: notify
//!   phone_entity_ids: [pixel_8]
//! ```

use crate::error::ConfigError;
use ha_core::EntityId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DOMAIN: &str = "input_boolean";
pub const DEFAULT_NOTIFICATION_SERVICE: &str = "notify";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpringConfig {
    /// Entity domain the reactor watches and switches
    pub domain: String,

    /// Entities to watch; empty means every entity of `domain`
    pub entities: Vec<EntityId>,

    /// Seconds to wait before reverting a change
    pub delay_seconds: u64,

    /// Send an actionable notification when an entity is turned off
    pub enable_notifications: bool,

    /// `notify`/`mobile_app` to address each phone, anything else is called as `notify.<name>`
    pub notification_service: String,

    /// Phones to notify, with or without the `mobile_app_` prefix
    pub phone_entity_ids: Vec<String>,

    /// Only revert changes that carry a user id in their context
    pub require_user: bool,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            entities: Vec::new(),
            delay_seconds: 0,
            enable_notifications: true,
            notification_service: DEFAULT_NOTIFICATION_SERVICE.to_string(),
            phone_entity_ids: Vec::new(),
            require_user: false,
        }
    }
}

impl SpringConfig {
    /// Parse and validate a YAML document holding only this section
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<string>"))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading spring configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"
        let config: Option<Self> =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source: e,
            })?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !EntityId::is_valid_domain(&self.domain) {
            return Err(ConfigError::InvalidValue {
                key: "domain".to_string(),
                reason: format!("'{}' is not a valid entity domain", self.domain),
            });
        }
        if let Some(stray) = self.entities.iter().find(|e| !e.in_domain(&self.domain)) {
            return Err(ConfigError::InvalidValue {
                key: "entities".to_string(),
                reason: format!("{} is not in domain '{}'", stray, self.domain),
            });
        }
        if self.notification_service.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "notification_service".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Whether changes to `entity_id` are reverted
    pub fn watches(&self, entity_id: &EntityId) -> bool {
        entity_id.in_domain(&self.domain)
            && (self.entities.is_empty() || self.entities.contains(entity_id))
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SpringConfig::from_yaml_str("").unwrap();
        assert_eq!(config, SpringConfig::default());
        assert_eq!(config.domain, "input_boolean");
        assert_eq!(config.delay(), Duration::ZERO);
        assert!(config.enable_notifications);
    }

    #[test]
    fn test_full_section() {
        let config = SpringConfig::from_yaml_str(
            r#"
entities:
  - input_boolean.chime
delay_seconds: 15
enable_notifications: false
notification_service: telegram
phone_entity_ids: [pixel_8, mobile_app_iphone]
require_user: true
"#,
        )
        .unwrap();

        assert_eq!(config.entities.len(), 1);
        assert_eq!(config.delay(), Duration::from_secs(15));
        assert_eq!(config.notification_service, "telegram");
        assert_eq!(config.phone_entity_ids, vec!["pixel_8", "mobile_app_iphone"]);
        assert!(config.require_user);
    }

    #[test]
    fn test_watches() {
        let all = SpringConfig::default();
        assert!(all.watches(&"input_boolean.a".parse().unwrap()));
        assert!(!all.watches(&"switch.a".parse().unwrap()));

        let some = SpringConfig {
            entities: vec!["input_boolean.a".parse().unwrap()],
            ..SpringConfig::default()
        };
        assert!(some.watches(&"input_boolean.a".parse().unwrap()));
        assert!(!some.watches(&"input_boolean.b".parse().unwrap()));
    }

    #[test]
    fn test_rejects_entity_outside_domain() {
        let err = SpringConfig::from_yaml_str("entities: [switch.spring]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "entities"));

        let switch = SpringConfig::from_yaml_str("domain: switch\nentities: [switch.spring]");
        assert!(switch.is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SpringConfig::from_yaml_str("domain: Not_A_Domain"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            SpringConfig::from_yaml_str("notification_service: ''"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            SpringConfig::from_yaml_str("delay: 3"),
            Err(ConfigError::ParseYaml { .. })
        ));
        assert!(matches!(
            SpringConfig::from_yaml_str("entities: [nope]"),
            Err(ConfigError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "delay_seconds: 3").unwrap();

        let config = SpringConfig::from_file(file.path()).unwrap();
        assert_eq!(config.delay_seconds, 3);

        assert!(matches!(
            SpringConfig::from_file("/nonexistent/spring.yaml"),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
