use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::constants;
use crate::errors::{self, ErrorKind, ResultExt};

/// Exports the state of a BOINC client as Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "boinc-exporter", version)]
pub struct Args {
    /// GUI RPC password of the BOINC client.
    #[arg(
        long,
        env = "BOINC_RPC_PASSWORD",
        hide_env_values = true,
        conflicts_with = "password_file",
        required_unless_present = "password_file"
    )]
    pub password: Option<String>,

    /// Read the GUI RPC password from a file, e.g. the client's gui_rpc_auth.cfg.
    #[arg(long, env = "BOINC_RPC_PASSWORD_FILE", value_name = "PATH")]
    pub password_file: Option<PathBuf>,

    /// Host running the BOINC client.
    #[arg(long, env = "BOINC_HOST", default_value = constants::DEFAULT_RPC_HOST)]
    pub host: String,

    /// GUI RPC port of the BOINC client.
    #[arg(long, env = "BOINC_PORT", default_value_t = constants::DEFAULT_RPC_PORT)]
    pub port: u16,

    /// Address to serve /metrics on.
    #[arg(long, env = "BOINC_EXPORTER_LISTEN", default_value = constants::DEFAULT_LISTEN_ADDR)]
    pub listen: SocketAddr,

    /// Do not start the HTTP listener.
    #[arg(long)]
    pub no_http: bool,

    /// Also write every document to this file, replacing it atomically.
    #[arg(long, env = "BOINC_EXPORTER_OUTPUT", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Seconds between polls.
    #[arg(
        long,
        env = "BOINC_EXPORTER_INTERVAL",
        default_value_t = constants::DEFAULT_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// `host:port` to dial.
    pub rpc_addr: String,
    pub host: String,
    pub password: String,
    pub listen: Option<SocketAddr>,
    pub output: Option<PathBuf>,
    pub interval: Duration,
}

impl Config {
    pub fn from_args(args: Args) -> errors::Result<Config> {
        let password = match (args.password, args.password_file) {
            (Some(password), _) => password,
            (None, Some(path)) => read_password_file(&path)?,
            (None, None) => {
                return Err(ErrorKind::ConfigError("no GUI RPC password given".into()).into())
            }
        };

        if args.no_http && args.output.is_none() {
            return Err(ErrorKind::ConfigError(
                "--no-http without --output leaves nowhere to publish".into(),
            )
            .into());
        }

        Ok(Config {
            rpc_addr: rpc_addr(&args.host, args.port),
            host: args.host,
            password,
            listen: if args.no_http { None } else { Some(args.listen) },
            output: args.output,
            interval: Duration::from_secs(args.interval),
        })
    }
}

fn rpc_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// The password is the first line of the file.
fn read_password_file(path: &Path) -> errors::Result<String> {
    let contents = fs::read_to_string(path).chain_err(|| {
        ErrorKind::ConfigError(format!("cannot read password file {}", path.display()))
    })?;
    Ok(contents.lines().next().unwrap_or("").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("boinc-exporter").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let config = Config::from_args(parse(&["--password", "pw"]).unwrap()).unwrap();
        assert_eq!(config.password, "pw");
        assert_eq!(config.rpc_addr, "localhost:31416");
        assert_eq!(config.listen, Some("0.0.0.0:9109".parse().unwrap()));
        assert_eq!(config.interval, Duration::from_secs(5));
        assert!(config.output.is_none());
    }

    #[test]
    fn password_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  s3cret  ").unwrap();
        writeln!(file, "ignored").unwrap();

        let path = file.path().to_str().unwrap();
        let config = Config::from_args(parse(&["--password-file", path]).unwrap()).unwrap();
        assert_eq!(config.password, "s3cret");
    }

    #[test]
    fn unreadable_password_file() {
        let args = parse(&["--password-file", "/nonexistent/gui_rpc_auth.cfg"]).unwrap();
        let e = Config::from_args(args).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::ConfigError(_)));
    }

    #[test]
    fn password_is_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--password", "a", "--password-file", "b"]).is_err());
    }

    #[test]
    fn ipv6_host() {
        let config =
            Config::from_args(parse(&["--password", "", "--host", "::1", "--port", "1"]).unwrap())
                .unwrap();
        assert_eq!(config.rpc_addr, "[::1]:1");
    }

    #[test]
    fn file_only() {
        let args = parse(&["--password", "pw", "--no-http", "--output", "/tmp/boinc.prom"]).unwrap();
        let config = Config::from_args(args).unwrap();
        assert!(config.listen.is_none());

        let args = parse(&["--password", "pw", "--no-http"]).unwrap();
        assert!(Config::from_args(args).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(parse(&["--password", "pw", "--interval", "0"]).is_err());
    }
}
