use std::time::Duration;

use secrecy::SecretString;

use crate::github::api::DEFAULT_REQUEST_TIMEOUT;
use crate::review::event::PullRequestAction;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced senior software engineer. \
You review pull requests thoroughly, point out real problems and keep your feedback concise and actionable.";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_MAX_PATCH_CHARS: usize = 2000;
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// Error in the process configuration. The server must not start when it happens.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Required secret {0} is missing or empty")]
    MissingSecret(&'static str),
    #[error("Invalid value of {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// How is the diff of a pull request obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DiffStrategy {
    /// List the changed files through the REST API.
    Files,
    /// Download the unified diff document of the pull request.
    Direct,
}

/// Read-only configuration of the review pipeline, loaded once at startup.
#[derive(Clone, Debug)]
pub struct ReviewConfig {
    /// Model identifier sent to the completion service.
    pub model: String,
    /// Instruction establishing the reviewer persona.
    pub system_prompt: String,
    pub temperature: f32,
    /// Upper bound on the length of the generated review.
    pub max_tokens: u32,
    /// Every patch fragment (or the whole raw diff) is truncated to this many characters.
    pub max_patch_chars: usize,
    /// Review again when new commits are pushed to a pull request.
    pub review_on_push: bool,
    /// Timeout of a single GitHub request.
    pub github_timeout: Duration,
    /// Timeout of a single completion request.
    pub completion_timeout: Duration,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_patch_chars: DEFAULT_MAX_PATCH_CHARS,
            review_on_push: true,
            github_timeout: DEFAULT_REQUEST_TIMEOUT,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }
}

impl ReviewConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.model.trim().is_empty() {
            return Err(invalid("model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid("temperature", "must be between 0 and 2"));
        }
        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", "must be positive"));
        }
        if self.max_patch_chars == 0 {
            return Err(invalid("max_patch_chars", "must be positive"));
        }
        if self.github_timeout.is_zero() || self.completion_timeout.is_zero() {
            return Err(invalid("timeout", "must be positive"));
        }
        Ok(self)
    }

    /// Should a pull request event with the given action be reviewed?
    pub fn should_review(&self, action: PullRequestAction) -> bool {
        match action {
            PullRequestAction::Opened => true,
            PullRequestAction::Synchronize => self.review_on_push,
        }
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.to_string(),
    }
}

/// Wraps a secret loaded from the environment, rejecting blank values.
pub fn require_secret(name: &'static str, value: String) -> Result<SecretString, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingSecret(name));
    }
    Ok(SecretString::new(value))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ReviewConfig::default().validate().unwrap();
        assert_eq!(config.temperature, 0.4);
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.max_patch_chars, 2000);
    }

    #[test]
    fn reject_invalid_values() {
        let cases = [
            ReviewConfig {
                model: " ".to_string(),
                ..Default::default()
            },
            ReviewConfig {
                temperature: 2.5,
                ..Default::default()
            },
            ReviewConfig {
                max_tokens: 0,
                ..Default::default()
            },
            ReviewConfig {
                max_patch_chars: 0,
                ..Default::default()
            },
            ReviewConfig {
                completion_timeout: Duration::ZERO,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn review_on_push_controls_synchronize() {
        let config = ReviewConfig::default();
        assert!(config.should_review(PullRequestAction::Opened));
        assert!(config.should_review(PullRequestAction::Synchronize));

        let config = ReviewConfig {
            review_on_push: false,
            ..Default::default()
        };
        assert!(config.should_review(PullRequestAction::Opened));
        assert!(!config.should_review(PullRequestAction::Synchronize));
    }

    #[test]
    fn require_non_empty_secret() {
        assert_eq!(
            require_secret("WEBHOOK_SECRET", "".to_string()).unwrap_err(),
            ConfigError::MissingSecret("WEBHOOK_SECRET")
        );
        assert_eq!(
            require_secret("WEBHOOK_SECRET", "  \n".to_string()).unwrap_err(),
            ConfigError::MissingSecret("WEBHOOK_SECRET")
        );
        assert_eq!(
            require_secret("WEBHOOK_SECRET", "abc".to_string())
                .unwrap()
                .expose_secret(),
            "abc"
        );
    }
}
