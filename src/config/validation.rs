use super::ServerConfig;
use anyhow::Result;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
pub fn validate_config(config: &ServerConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if config.http.port == 0 {
        errors.push(ConfigValidationError {
            path: "http.port".to_string(),
            message: "Port must be greater than 0".to_string(),
        });
    }

    if let Some(secret) = &config.auth.jwt_secret {
        if secret.len() < 16 {
            errors.push(ConfigValidationError {
                path: "auth.jwtSecret".to_string(),
                message: "JWT secret must be at least 16 bytes".to_string(),
            });
        }
    }

    if config.demo.enabled && config.demo.user_ids.is_empty() {
        warn!("demo mode is enabled but no demo users are configured");
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &ServerConfig) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_empty());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = ServerConfig::default();
        config.http.port = 0;
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "http.port");
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = Some("short".to_string());
        assert!(validate_config_object(&config).is_err());
    }
}
