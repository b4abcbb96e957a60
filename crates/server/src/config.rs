//! Service configuration from environment variables

use pdf_core::repair::Ghostscript;
use pdf_core::units::DEFAULT_EDITOR_ZOOM;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("ERP configuration is incomplete: {0} is missing")]
    PartialErp(&'static str),
}

/// ERPNext connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct ErpConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl ErpConfig {
    /// Value of the `Authorization` header
    pub fn auth_header(&self) -> String {
        format!("token {}:{}", self.api_key, self.api_secret)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub database_path: PathBuf,
    pub storage_root: PathBuf,
    /// Editor pixels per PDF point
    pub editor_zoom: f64,
    pub ghostscript: Option<Ghostscript>,
    pub max_upload_bytes: usize,
    pub erp: Option<ErpConfig>,
}

impl AppConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, treating blank values as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind = match get("DOCFILL_BIND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "DOCFILL_BIND",
                expected: "socket address",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let editor_zoom = match get("DOCFILL_EDITOR_ZOOM") {
            Some(value) => match value.parse::<f64>() {
                Ok(zoom) if zoom.is_finite() && zoom > 0.0 => zoom,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "DOCFILL_EDITOR_ZOOM",
                        expected: "positive number",
                        value,
                    })
                }
            },
            None => DEFAULT_EDITOR_ZOOM,
        };

        let max_upload_mb = match get("DOCFILL_MAX_UPLOAD_MB") {
            Some(value) => match value.parse::<usize>() {
                Ok(mb) if mb > 0 => mb,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "DOCFILL_MAX_UPLOAD_MB",
                        expected: "positive integer",
                        value,
                    })
                }
            },
            None => 25,
        };

        let erp = match (get("ERP_BASE_URL"), get("ERP_API_KEY"), get("ERP_API_SECRET")) {
            (Some(base_url), Some(api_key), Some(api_secret)) => Some(ErpConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                api_secret,
            }),
            (None, None, None) => None,
            (None, _, _) => return Err(ConfigError::PartialErp("ERP_BASE_URL")),
            (_, None, _) => return Err(ConfigError::PartialErp("ERP_API_KEY")),
            (_, _, None) => return Err(ConfigError::PartialErp("ERP_API_SECRET")),
        };

        Ok(Self {
            bind,
            database_path: get("DOCFILL_DATABASE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/docfill.db")),
            storage_root: get("DOCFILL_STORAGE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/storage")),
            editor_zoom,
            ghostscript: get("DOCFILL_GHOSTSCRIPT").map(Ghostscript::new),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            erp,
        })
    }
}
