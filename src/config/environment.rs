//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEV_JWT_SECRET: &str = "dev-only-jwt-secret-change-me";

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    /// Sin URL se usa el store en memoria
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: i64,
    pub cors_origins: Vec<String>,
    pub mutation_timeout: Duration,
    pub route_list_limit: usize,
    pub default_user_password: Option<String>,
    pub notification_webhook_url: Option<String>,
    pub feed_buffer: usize,
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
    /// Coste de bcrypt para contraseñas nuevas
    pub password_hash_cost: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration: 86_400,
            cors_origins: Vec::new(),
            mutation_timeout: Duration::from_secs(15),
            route_list_limit: 50,
            default_user_password: None,
            notification_webhook_url: None,
            feed_buffer: 256,
            super_admin_email: None,
            super_admin_password: None,
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl EnvironmentConfig {
    /// Lee la configuración del entorno (y de `.env` si existe)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let jwt_secret = match optional("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "production" => bail!("JWT_SECRET must be set in production"),
            None => defaults.jwt_secret,
        };

        Ok(Self {
            port: parsed("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            database_url: optional("DATABASE_URL"),
            jwt_secret,
            jwt_expiration: parsed("JWT_EXPIRATION", defaults.jwt_expiration)?,
            cors_origins: optional("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            mutation_timeout: Duration::from_secs(parsed(
                "MUTATION_TIMEOUT_SECS",
                defaults.mutation_timeout.as_secs(),
            )?),
            route_list_limit: parsed("ROUTE_LIST_LIMIT", defaults.route_list_limit)?,
            default_user_password: optional("DEFAULT_USER_PASSWORD"),
            notification_webhook_url: optional("NOTIFICATION_WEBHOOK_URL"),
            feed_buffer: parsed("FEED_BUFFER", defaults.feed_buffer)?,
            super_admin_email: optional("SUPER_ADMIN_EMAIL"),
            super_admin_password: optional("SUPER_ADMIN_PASSWORD"),
            password_hash_cost: parsed("BCRYPT_COST", defaults.password_hash_cost)?,
            environment,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert_eq!(config.mutation_timeout, Duration::from_secs(15));
        assert_eq!(config.route_list_limit, 50);
        assert_eq!(config.server_url(), "0.0.0.0:3000");
    }
}
