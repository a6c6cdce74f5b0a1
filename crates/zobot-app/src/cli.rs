//! CLI argument definitions for the Zobot server.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "zobot.toml";
/// Port used when nothing else names one.
pub const DEFAULT_PORT: u16 = 3000;

/// Zobot: scripted sales assistant backend for the chat widget.
#[derive(Parser, Debug)]
#[command(name = "zobot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Directory for the lead journals.
    #[arg(long = "log-dir")]
    pub log_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ZOBOT_CONFIG env var > ./zobot.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ZOBOT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Resolve the HTTP port.
    ///
    /// Priority: --port flag > ZOBOT_PORT > PORT > config file value > 3000.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        pick_port(
            self.port,
            &[std::env::var("ZOBOT_PORT").ok(), std::env::var("PORT").ok()],
            config_port,
        )
    }

    /// Resolve the bind address. Priority: --host flag > config file value.
    pub fn resolve_host(&self, config_host: &str) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| config_host.to_string())
    }

    /// Resolve the log level. Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Resolve the lead journal directory. Priority: --log-dir flag > config file value.
    pub fn resolve_log_dir(&self, config_dir: &str) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_dir))
    }
}

/// First usable port: the flag, then each env value that parses, then a
/// non-zero config value, then [`DEFAULT_PORT`].
fn pick_port(flag: Option<u16>, env_values: &[Option<String>], config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    for value in env_values.iter().flatten() {
        match value.parse::<u16>() {
            Ok(p) => return p,
            Err(_) => tracing::warn!(value = %value, "Ignoring unparsable port from environment"),
        }
    }
    if config_port != 0 {
        return config_port;
    }
    DEFAULT_PORT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("zobot").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = args(&[
            "-c",
            "/etc/zobot.toml",
            "-p",
            "8080",
            "--host",
            "127.0.0.1",
            "-l",
            "debug",
            "--log-dir",
            "/var/log/zobot",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/zobot.toml")));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_dir, Some(PathBuf::from("/var/log/zobot")));
    }

    #[test]
    fn test_config_flag_wins() {
        let cli = args(&["--config", "custom.toml"]);
        assert_eq!(cli.resolve_config_path(), PathBuf::from("custom.toml"));
    }

    #[test]
    fn test_rejects_invalid_port() {
        assert!(CliArgs::try_parse_from(["zobot", "--port", "99999"]).is_err());
    }

    #[test]
    fn test_pick_port_priority() {
        let env = [Some("4000".to_string()), Some("5000".to_string())];
        assert_eq!(pick_port(Some(8080), &env, 3001), 8080);
        assert_eq!(pick_port(None, &env, 3001), 4000);
        assert_eq!(pick_port(None, &[None, Some("5000".into())], 3001), 5000);
        assert_eq!(pick_port(None, &[None, None], 3001), 3001);
        assert_eq!(pick_port(None, &[None, None], 0), DEFAULT_PORT);
    }

    #[test]
    fn test_pick_port_skips_garbage_env() {
        let env = [Some("not-a-port".to_string()), Some("5000".to_string())];
        assert_eq!(pick_port(None, &env, 3001), 5000);
    }

    #[test]
    fn test_resolve_overrides_fall_back_to_config() {
        let cli = args(&[]);
        assert_eq!(cli.resolve_host("0.0.0.0"), "0.0.0.0");
        assert_eq!(cli.resolve_log_level("warn"), "warn");
        assert_eq!(cli.resolve_log_dir("logs"), PathBuf::from("logs"));

        let cli = args(&["--host", "::1", "-l", "trace", "--log-dir", "/tmp/z"]);
        assert_eq!(cli.resolve_host("0.0.0.0"), "::1");
        assert_eq!(cli.resolve_log_level("warn"), "trace");
        assert_eq!(cli.resolve_log_dir("logs"), PathBuf::from("/tmp/z"));
    }
}
