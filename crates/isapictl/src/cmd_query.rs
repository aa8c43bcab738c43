use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use isapi::{Credentials, QueryOptions, QueryResult, Scheme};
use tracing::info;

use crate::common;

#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub https: bool,
    pub timeout_ms: u64,
    pub strict_tls: bool,
    pub output: PathBuf,
}

impl QueryArgs {
    pub fn options(&self) -> QueryOptions {
        QueryOptions {
            port: self.port,
            scheme: if self.https {
                Scheme::Https
            } else {
                Scheme::Http
            },
            timeout: Duration::from_millis(self.timeout_ms),
            accept_invalid_certs: !self.strict_tls,
        }
    }
}

pub async fn run(args: QueryArgs, json: bool) -> Result<()> {
    let options = args.options();
    let url = isapi::device_info_url(&args.host, &options);
    if !json {
        println!(
            "Consultando información del grabador en {}:{}...",
            args.host, args.port
        );
        println!("Consultando información del dispositivo en: {url}");
    }

    let credentials = Credentials::new(args.username, args.password);
    let result = isapi::query_device(&args.host, credentials, &options).await;
    if json {
        common::print_json(&result)?;
    }

    match &result {
        QueryResult::Success { fields, .. } => {
            if !json {
                println!("\n{}", isapi::format_device_info(fields));
            }
            common::save_result(&result, &args.output)?;
            info!(path = %args.output.display(), "results saved");
            if !json {
                println!("Resultados guardados en '{}'", args.output.display());
            }
        }
        QueryResult::Failure { message, details } => {
            if !json {
                println!("\n{}", common::failure_report(message, details.as_deref()));
            }
        }
    }

    Ok(())
}
