use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use wproxy_common::{GlobalConfig, GlobalConfigPatch};

use crate::auth::{AuthProvider, NoopAuth, StaticKeyAuth};
use crate::core::Core;
use crate::proxy_engine::ProxyEngine;
use crate::upstream_client::{UpstreamClientConfig, WreqUpstreamClient};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "wproxy",
    version,
    about = "OpenAI-compatible proxy for a WordPress wpaicg site"
)]
pub struct CliArgs {
    /// Bind host.
    #[arg(long, env = "WPROXY_HOST")]
    pub host: Option<String>,

    /// Bind port.
    #[arg(long, env = "WPROXY_PORT")]
    pub port: Option<String>,

    /// Bearer token required on `/v1/*`. Unset disables the check.
    #[arg(long, env = "WPROXY_API_KEY")]
    pub api_key: Option<String>,

    /// Root URL of the upstream WordPress site.
    #[arg(long, env = "WPROXY_UPSTREAM")]
    pub upstream: Option<String>,

    /// Optional outbound proxy for upstream requests.
    #[arg(long, env = "WPROXY_PROXY")]
    pub proxy: Option<String>,
}

pub struct Bootstrap {
    pub config: GlobalConfig,
    pub core: Core,
}

pub fn bootstrap_from_env() -> anyhow::Result<Bootstrap> {
    let args = CliArgs::parse();
    bootstrap(args)
}

pub fn bootstrap(args: CliArgs) -> anyhow::Result<Bootstrap> {
    // clap already applies CLI > ENV precedence for each field.
    let patch = GlobalConfigPatch {
        host: sanitize_optional_env_value(args.host),
        port: parse_u16_env_value(args.port, "WPROXY_PORT")?,
        api_key: sanitize_optional_env_value(args.api_key),
        upstream: sanitize_optional_env_value(args.upstream),
        proxy: sanitize_optional_env_value(args.proxy),
    };
    let config = patch.into_config().context("finalize global config")?;
    let core = build_core(&config)?;

    info!(
        event = "config_loaded",
        host = %config.host,
        port = config.port,
        upstream = %config.upstream,
        proxy = %config.proxy.as_deref().unwrap_or(""),
        auth_enabled = config.api_key.is_some()
    );
    Ok(Bootstrap { config, core })
}

/// Wires the upstream client, engine and auth for `config`.
pub fn build_core(config: &GlobalConfig) -> anyhow::Result<Core> {
    let client = WreqUpstreamClient::new(UpstreamClientConfig::from_global(config))
        .context("build upstream client")?;
    let engine = Arc::new(ProxyEngine::new(Arc::new(client), config.upstream.clone()));
    let auth: Arc<dyn AuthProvider> = match &config.api_key {
        Some(key) => Arc::new(StaticKeyAuth::new(key.clone())),
        None => Arc::new(NoopAuth),
    };
    Ok(Core::new(engine, auth))
}

fn sanitize_optional_env_value(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    // Some PaaS systems may inject unresolved placeholders like `${VAR}`.
    if trimmed.starts_with("${") && trimmed.ends_with('}') {
        return None;
    }
    Some(trimmed)
}

fn parse_u16_env_value(value: Option<String>, env_name: &str) -> anyhow::Result<Option<u16>> {
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = raw
        .parse::<u16>()
        .with_context(|| format!("invalid {env_name} value: {raw}"))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("wproxy").chain(list.iter().copied())).unwrap()
    }

    #[test]
    fn placeholders_and_blanks_count_as_unset() {
        assert_eq!(sanitize_optional_env_value(Some("${API_KEY}".into())), None);
        assert_eq!(sanitize_optional_env_value(Some("   ".into())), None);
        assert_eq!(
            sanitize_optional_env_value(Some(" key ".into())),
            Some("key".to_string())
        );
    }

    #[test]
    fn port_must_be_numeric() {
        assert_eq!(parse_u16_env_value(Some("8080".into()), "WPROXY_PORT").unwrap(), Some(8080));
        assert!(parse_u16_env_value(Some("http".into()), "WPROXY_PORT").is_err());
    }

    #[test]
    fn cli_values_reach_the_config() {
        let boot = bootstrap(args(&[
            "--port",
            "9100",
            "--api-key",
            "sk-1",
            "--upstream",
            "http://127.0.0.1:9/",
        ]))
        .unwrap();
        assert_eq!(boot.config.bind_addr(), "0.0.0.0:9100");
        assert_eq!(boot.config.api_key.as_deref(), Some("sk-1"));
        assert_eq!(boot.config.upstream, "http://127.0.0.1:9");
    }

    #[test]
    fn non_http_upstream_fails_startup() {
        assert!(bootstrap(args(&["--upstream", "chatopenai.fr"])).is_err());
    }
}
