//! Environment-driven configuration.
//!
//! Everything the tool needs is injected through the process environment:
//! the build to watch, the SMTP relay, and the report addresses. No
//! credential or address literals live in the source.

use thiserror::Error;

use crate::notifications::EmailConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Environment tag, e.g. `np` or `prod`.
    pub environment: String,
    /// CodeBuild project the build belongs to.
    pub project: String,
    /// Build to watch, in CodeBuild's `project:uuid` form.
    pub build_id: String,
    /// SMTP relay and report addressing.
    pub email: EmailConfig,
}

impl Config {
    /// Load the configuration from the process environment.
    ///
    /// `CODEBUILD_BUILD_ID`, `SMTP_HOST`, `EMAIL_FROM` and `EMAIL_TO` are
    /// required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env_or("ENV", "np");
        let project = match optional("CODEBUILD_PROJECT") {
            Some(project) => project,
            None => derive_project(&environment),
        };
        let build_id = require("CODEBUILD_BUILD_ID")?;

        let smtp_port = match optional("SMTP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "SMTP_PORT",
                value: raw.clone(),
            })?,
            None => 587,
        };
        let smtp_tls = match optional("SMTP_TLS") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: "SMTP_TLS",
                value: raw.clone(),
            })?,
            None => true,
        };

        let email = EmailConfig {
            smtp_host: require("SMTP_HOST")?,
            smtp_port,
            smtp_username: optional("SMTP_USER"),
            smtp_password: optional("SMTP_PASSWORD"),
            smtp_tls,
            from_address: require("EMAIL_FROM")?,
            to_addresses: split_recipients(&require("EMAIL_TO")?),
        };

        if email.to_addresses.is_empty() {
            return Err(ConfigError::Invalid {
                var: "EMAIL_TO",
                value: String::new(),
            });
        }

        Ok(Self {
            environment,
            project,
            build_id,
            email,
        })
    }

    /// The single project name this deployment is expected to report on.
    pub fn monitored_project(&self) -> String {
        derive_project(&self.environment)
    }

    /// Whether the configured project is in the monitored list.
    pub fn is_monitored(&self) -> bool {
        self.project == self.monitored_project()
    }
}

fn env_or(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

/// Default project name for an environment tag.
pub fn derive_project(environment: &str) -> String {
    format!("codebuildtest-{environment}")
}

/// Split a comma-separated recipient list into individual addresses.
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(environment: &str, project: &str) -> Config {
        Config {
            environment: environment.to_string(),
            project: project.to_string(),
            build_id: "codebuildtest-np:1b2c3d4e".to_string(),
            email: EmailConfig {
                smtp_host: "smtp.example.com".to_string(),
                smtp_port: 587,
                smtp_username: None,
                smtp_password: None,
                smtp_tls: true,
                from_address: "builds@example.com".to_string(),
                to_addresses: vec!["team@example.com".to_string()],
            },
        }
    }

    #[test]
    fn test_derive_project() {
        assert_eq!(derive_project("np"), "codebuildtest-np");
        assert_eq!(derive_project("prod"), "codebuildtest-prod");
    }

    #[test]
    fn test_split_recipients() {
        assert_eq!(
            split_recipients("a@x.com,b@x.com"),
            vec!["a@x.com".to_string(), "b@x.com".to_string()]
        );
        assert_eq!(
            split_recipients(" a@x.com , b@x.com "),
            vec!["a@x.com".to_string(), "b@x.com".to_string()]
        );
        assert_eq!(split_recipients("a@x.com,,"), vec!["a@x.com".to_string()]);
        assert!(split_recipients("").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("starttls"), None);
    }

    #[test]
    fn test_is_monitored() {
        assert!(config_for("np", "codebuildtest-np").is_monitored());
        assert!(!config_for("np", "someone-elses-project").is_monitored());
        assert!(!config_for("prod", "codebuildtest-np").is_monitored());
    }

    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::Missing("CODEBUILD_BUILD_ID");
        assert!(missing.to_string().contains("CODEBUILD_BUILD_ID"));

        let invalid = ConfigError::Invalid {
            var: "SMTP_PORT",
            value: "lots".to_string(),
        };
        assert!(invalid.to_string().contains("SMTP_PORT"));
        assert!(invalid.to_string().contains("lots"));
    }
}
