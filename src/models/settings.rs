use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.6;

/// User settings as persisted in the key/value store. The credential is
/// kept encrypted; see [`crate::repos::crypto`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key_encrypted: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub suggestion_threshold: f64,
    pub default_role: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key_encrypted: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
            default_role: None,
        }
    }
}

impl Settings {
    /// Applies a `key=value` assignment from the `config --set` command.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key.trim() {
            "model" => {
                if value.is_empty() {
                    return Err("model must not be empty".to_string());
                }
                self.model = value.to_string();
            }
            "temperature" => {
                let t: f32 = value
                    .parse()
                    .map_err(|_| format!("invalid temperature: {}", value))?;
                if !(0.0..=2.0).contains(&t) {
                    return Err("temperature must be between 0 and 2".to_string());
                }
                self.temperature = t;
            }
            "max_tokens" => {
                let n: u32 = value
                    .parse()
                    .map_err(|_| format!("invalid max_tokens: {}", value))?;
                if n == 0 {
                    return Err("max_tokens must be positive".to_string());
                }
                self.max_tokens = n;
            }
            "suggestion_threshold" => {
                let c: f64 = value
                    .parse()
                    .map_err(|_| format!("invalid suggestion_threshold: {}", value))?;
                if !(0.0..=1.0).contains(&c) {
                    return Err("suggestion_threshold must be between 0 and 1".to_string());
                }
                self.suggestion_threshold = c;
            }
            "default_role" => {
                self.default_role = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            other => return Err(format!("unknown setting: {}", other)),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key.trim() {
            "model" => Some(self.model.clone()),
            "temperature" => Some(self.temperature.to_string()),
            "max_tokens" => Some(self.max_tokens.to_string()),
            "suggestion_threshold" => Some(self.suggestion_threshold.to_string()),
            "default_role" => Some(self.default_role.clone().unwrap_or_default()),
            "api_key" => Some(
                if self.api_key_encrypted.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
                .to_string(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_validates_ranges() {
        let mut settings = Settings::default();
        assert!(settings.set("temperature", "0.2").is_ok());
        assert_eq!(settings.temperature, 0.2);
        assert!(settings.set("temperature", "3").is_err());
        assert!(settings.set("max_tokens", "0").is_err());
        assert!(settings.set("suggestion_threshold", "1.5").is_err());
        assert!(settings.set("colour", "blue").is_err());
        assert_eq!(settings.temperature, 0.2);
    }

    #[test]
    fn test_get_never_reveals_credential() {
        let settings = Settings {
            api_key_encrypted: Some("v1:abc".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.get("api_key").as_deref(), Some("(set)"));
        assert_eq!(settings.get("model").as_deref(), Some(DEFAULT_MODEL));
        assert_eq!(settings.get("nope"), None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"model":"gpt-4o"}"#).unwrap();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(settings.api_key_encrypted, None);
    }
}
