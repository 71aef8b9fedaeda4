//! Configuration management for MCollection Server

use serde::Deserialize;
use std::env;
use std::net::{AddrParseError, IpAddr, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub export: ExportConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Bind address from the configured host and port.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Minio,
    R2,
    S3,
    B2,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// PDF export engine configuration.
///
/// In production the browser binary is pinned (`CHROME_EXECUTABLE` or the
/// packaged chromium); outside production well-known local install paths
/// are probed per OS.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub production: bool,
    pub chrome_executable: Option<String>,
    /// Upper bound on every browser suspension point (launch, page load,
    /// rasterization). The browser process is force-terminated on expiry.
    pub render_timeout_secs: u64,
}

/// Upload adapter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub audio_classification: AudioClassification,
}

/// How `audio/*` MIME types are classified.
///
/// The two historical behaviors disagreed on this; it is an explicit
/// deployment choice rather than a silent pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioClassification {
    /// `audio/*` stores as a distinct `audio` type.
    Distinct,
    /// `audio/*` falls through to the generic `raw` bucket.
    Auto,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                provider: StorageProvider::Minio,
                endpoint: "http://localhost:9000".to_string(),
                bucket: "mcollection".to_string(),
                access_key: "admin".to_string(),
                secret_key: "password123".to_string(),
                region: Some("us-east-1".to_string()),
            },
            database: DatabaseConfig {
                url: "sqlite:./mcollection.db".to_string(),
            },
            export: ExportConfig {
                production: false,
                chrome_executable: None,
                render_timeout_secs: 30,
            },
            upload: UploadConfig {
                audio_classification: AudioClassification::Distinct,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            storage: StorageConfig {
                provider: match env::var("S3_PROVIDER")
                    .unwrap_or_else(|_| "minio".to_string())
                    .as_str()
                {
                    "r2" => StorageProvider::R2,
                    "s3" => StorageProvider::S3,
                    "b2" => StorageProvider::B2,
                    _ => StorageProvider::Minio,
                },
                endpoint: env::var("S3_ENDPOINT")?,
                bucket: env::var("S3_BUCKET")?,
                access_key: env::var("S3_ACCESS_KEY")?,
                secret_key: env::var("S3_SECRET_KEY")?,
                region: env::var("S3_REGION").ok(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./mcollection.db".to_string()),
            },
            export: ExportConfig {
                production: env::var("APP_ENV")
                    .map(|v| v == "production")
                    .unwrap_or(false),
                chrome_executable: env::var("CHROME_EXECUTABLE").ok(),
                render_timeout_secs: env::var("EXPORT_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            },
            upload: UploadConfig {
                audio_classification: match env::var("UPLOAD_AUDIO_CLASSIFICATION")
                    .unwrap_or_else(|_| "distinct".to_string())
                    .as_str()
                {
                    "auto" => AudioClassification::Auto,
                    _ => AudioClassification::Distinct,
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_addr() {
        let addr = Config::default().server.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_configured_host_is_bound() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        };
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_unparseable_host_is_an_error() {
        let server = ServerConfig {
            host: "not-an-ip".to_string(),
            port: 8080,
        };
        assert!(server.socket_addr().is_err());
    }
}
