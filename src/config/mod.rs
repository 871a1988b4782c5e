use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::TrainType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub optimizer: OptimizerConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub request_timeout_seconds: u64,
}

/// Optimiser run defaults (§6 "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Wall-clock budget for a single solve, as exposed over HTTP (default 10,
    /// up to 300 for internal callers, §4.4).
    pub time_limit_seconds: u64,
    pub num_workers: usize,
    pub block_size_m: f64,
    pub blocks_per_segment: usize,
    pub max_earliness_min: i64,
    pub max_lateness_min: i64,
    pub priority_weights: HashMap<String, i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub prometheus_enabled: bool,
    pub prometheus_endpoint: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut priority_weights = HashMap::new();
        priority_weights.insert("express".to_string(), 10);
        priority_weights.insert("passenger".to_string(), 8);
        priority_weights.insert("local".to_string(), 5);
        priority_weights.insert("freight".to_string(), 1);

        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_enabled: true,
                request_timeout_seconds: 30,
            },
            optimizer: OptimizerConfig {
                time_limit_seconds: 10,
                num_workers: 1,
                block_size_m: 400.0,
                blocks_per_segment: 3,
                max_earliness_min: 5,
                max_lateness_min: 60,
                priority_weights,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
            security: SecurityConfig {
                jwt_secret: "dispatch-optimiser-dev-secret-change-in-production".to_string(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["*".to_string()],
            },
            monitoring: MonitoringConfig {
                prometheus_enabled: true,
                prometheus_endpoint: "/metrics".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&config_str)?;
        Ok(config)
    }

    /// Load configuration from environment variables, layered over defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(host) = std::env::var("SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            config.server.port = port.parse()?;
        }
        if let Ok(secs) = std::env::var("OPTIMIZER_TIME_LIMIT_SECONDS") {
            config.optimizer.time_limit_seconds = secs.parse()?;
        }
        if let Ok(workers) = std::env::var("OPTIMIZER_NUM_WORKERS") {
            config.optimizer.num_workers = workers.parse()?;
        }
        if let Ok(jwt_secret) = std::env::var("JWT_SECRET") {
            config.security.jwt_secret = jwt_secret;
        }
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.logging.level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }
        if self.optimizer.time_limit_seconds == 0 {
            return Err(anyhow::anyhow!("Optimizer time limit must be greater than 0"));
        }
        if self.optimizer.time_limit_seconds > 300 {
            return Err(anyhow::anyhow!(
                "Optimizer time limit may not exceed 300 seconds internally (§4.4)"
            ));
        }
        if self.optimizer.num_workers == 0 || self.optimizer.num_workers > 8 {
            return Err(anyhow::anyhow!("num_workers must be between 1 and 8 (§5)"));
        }
        if self.security.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!("JWT secret must be at least 32 characters"));
        }
        Ok(())
    }

    /// Priority weight for a train type, defaulting to 5 when unconfigured
    /// (§4.3 objective, matching the default `priority_weight` applies to
    /// any type not present in the map).
    pub fn priority_weight(&self, train_type: TrainType) -> i32 {
        let key = format!("{:?}", train_type).to_lowercase();
        *self.optimizer.priority_weights.get(&key).unwrap_or(&5)
    }

    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.optimizer.time_limit_seconds, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.server.port, deserialized.server.port);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();
        let loaded_config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.port, loaded_config.server.port);
        assert_eq!(
            config.optimizer.num_workers,
            loaded_config.optimizer.num_workers
        );
    }

    #[test]
    fn test_rejects_excessive_time_limit() {
        let mut config = AppConfig::default();
        config.optimizer.time_limit_seconds = 301;
        assert!(config.validate().is_err());
    }
}
