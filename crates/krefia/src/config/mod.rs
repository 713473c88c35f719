use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::allegro::Bedrijf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" | "acceptance" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    /// Development mode surfaces uncensored error messages to the caller.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub allegro: AllegroConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let bsn_header = env::var("AUTH_BSN_HEADER").unwrap_or_else(|_| "x-verified-bsn".to_string());

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                bsn_header,
            },
            telemetry: TelemetryConfig { log_level },
            allegro: AllegroConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding and identity header.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Header carrying the verified BSN, set by the fronting auth proxy.
    pub bsn_header: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection and business settings for the Allegro SOAP backend.
#[derive(Debug, Clone)]
pub struct AllegroConfig {
    /// Base endpoint; individual services hang off `?service=<name>`.
    pub soap_endpoint: String,
    /// One timeout budget for every backend call, set once at the gateway.
    pub request_timeout: Duration,
    /// Opdrachtgever values whose schuldhulp dossiers must never surface.
    pub exclude_opdrachtgever: Vec<String>,
    /// Generic SSO landing pages; Krefia has no true deeplinks yet.
    pub sso_fibu: String,
    pub sso_kredietbank: String,
}

impl AllegroConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let soap_endpoint = env::var("ALLEGRO_SOAP_ENDPOINT").unwrap_or_default();
        let exclude_opdrachtgever = env::var("ALLEGRO_EXCLUDE_OPDRACHTGEVER")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            soap_endpoint,
            request_timeout: Duration::from_secs(60),
            exclude_opdrachtgever,
            sso_fibu: env::var("KREFIA_SSO_FIBU").unwrap_or_default(),
            sso_kredietbank: env::var("KREFIA_SSO_KREDIETBANK").unwrap_or_default(),
        })
    }

    pub fn service_endpoint(&self, service_name: &str) -> String {
        format!("{}?service={}", self.soap_endpoint, service_name)
    }

    pub fn sso_url(&self, bedrijf: Bedrijf) -> &str {
        match bedrijf {
            Bedrijf::Fibu => &self.sso_fibu,
            Bedrijf::Kredietbank => &self.sso_kredietbank,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("AUTH_BSN_HEADER");
        env::remove_var("ALLEGRO_SOAP_ENDPOINT");
        env::remove_var("ALLEGRO_EXCLUDE_OPDRACHTGEVER");
        env::remove_var("KREFIA_SSO_FIBU");
        env::remove_var("KREFIA_SSO_KREDIETBANK");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bsn_header, "x-verified-bsn");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.allegro.request_timeout, Duration::from_secs(60));
        assert!(config.allegro.exclude_opdrachtgever.is_empty());
    }

    #[test]
    fn allegro_settings_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ALLEGRO_SOAP_ENDPOINT", "https://localhost/SOAP");
        env::set_var("ALLEGRO_EXCLUDE_OPDRACHTGEVER", "Gemeente X, Gemeente Y");
        env::set_var("KREFIA_SSO_FIBU", "https://localhost/fibu/sso-login");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.allegro.service_endpoint("LoginService"),
            "https://localhost/SOAP?service=LoginService"
        );
        assert_eq!(
            config.allegro.exclude_opdrachtgever,
            vec!["Gemeente X".to_string(), "Gemeente Y".to_string()]
        );
        assert_eq!(config.allegro.sso_url(Bedrijf::Fibu), "https://localhost/fibu/sso-login");
        assert_eq!(config.allegro.sso_url(Bedrijf::Kredietbank), "");
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
