use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_UPSTREAM: &str = "https://chatopenai.fr";

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("invalid global config field {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

/// Final, merged global configuration used by the running process.
///
/// Merge order: CLI > ENV > built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret for `/v1/*`. `None` disables the check.
    pub api_key: Option<String>,
    /// Root URL of the upstream site, without trailing slash.
    pub upstream: String,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
}

impl GlobalConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Optional values collected from CLI/ENV; unset fields take the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub upstream: Option<String>,
    pub proxy: Option<String>,
}

impl GlobalConfigPatch {
    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        let upstream = self
            .upstream
            .unwrap_or_else(|| DEFAULT_UPSTREAM.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(upstream.starts_with("http://") || upstream.starts_with("https://")) {
            return Err(GlobalConfigError::InvalidField {
                field: "upstream",
                message: format!("expected an http(s) url, got {upstream:?}"),
            });
        }
        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            api_key: self.api_key,
            upstream,
            proxy: self.proxy,
        })
    }
}
