use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use isapictl::cmd_query::{self, QueryArgs};

const EXAMPLE: &str = "Ejemplo: isapictl 192.168.1.100 admin passw 80";

#[derive(Parser, Debug)]
#[command(name = "isapictl", version, about = "Read device information from an ISAPI recorder")]
struct Cli {
    /// Recorder IP address or host name
    host: String,
    /// User name for Digest authentication
    username: String,
    /// Password for Digest authentication
    password: String,
    /// HTTP port
    #[arg(default_value_t = 80)]
    port: u16,
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Print the query result as JSON instead of the text report
    #[arg(long)]
    json: bool,
    /// File the successful result is written to
    #[arg(long, default_value = isapi::DEFAULT_RESULT_FILE)]
    output: PathBuf,
    /// Use HTTPS instead of HTTP
    #[arg(long)]
    https: bool,
    /// Validate TLS certificates (self-signed recorders will fail)
    #[arg(long)]
    strict_tls: bool,
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            eprintln!("{EXAMPLE}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        host,
        username,
        password,
        port,
        verbose,
        json,
        output,
        https,
        strict_tls,
        timeout_ms,
    } = parse_cli();

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = QueryArgs {
        host,
        username,
        password,
        port,
        https,
        timeout_ms,
        strict_tls,
        output,
    };
    cmd_query::run(args, json).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positional_defaults() {
        let cli = Cli::parse_from(["isapictl", "192.168.1.100", "admin", "passw"]);
        assert_eq!(cli.host, "192.168.1.100");
        assert_eq!(cli.username, "admin");
        assert_eq!(cli.password, "passw");
        assert_eq!(cli.port, 80);
        assert_eq!(cli.output, PathBuf::from("device_info_result.json"));
        assert_eq!(cli.timeout_ms, 10_000);
        assert!(!cli.json && !cli.https && !cli.strict_tls);
    }

    #[test]
    fn parse_explicit_port() {
        let cli = Cli::parse_from(["isapictl", "10.0.0.5", "admin", "passw", "8000", "-vv"]);
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn missing_password_is_rejected() {
        let err = Cli::try_parse_from(["isapictl", "10.0.0.5", "admin"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let err = Cli::try_parse_from(["isapictl", "10.0.0.5", "admin", "pw", "http"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
