use std::env;
use std::num::ParseIntError;

use isapi::{format_device_info, query_device, Credentials, QueryOptions, QueryResult};
use tracing::info;

fn parse_args() -> Result<Option<(String, Credentials, QueryOptions)>, ParseIntError> {
    let mut args = env::args().skip(1);
    let (Some(host), Some(username), Some(password)) = (args.next(), args.next(), args.next())
    else {
        return Ok(None);
    };
    let mut options = QueryOptions::default();
    if let Some(port) = args.next() {
        options.port = port.parse()?;
    }
    Ok(Some((host, Credentials::new(username, password), options)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let Some((host, credentials, options)) = parse_args()? else {
        eprintln!("usage: device_info <host> <username> <password> [port]");
        std::process::exit(1);
    };
    info!(%host, port = options.port, "querying recorder");

    match query_device(&host, credentials, &options).await {
        QueryResult::Success { fields, .. } => println!("{}", format_device_info(&fields)),
        QueryResult::Failure { message, details } => {
            println!("Error: {message}");
            if let Some(details) = details {
                println!("{details}");
            }
        }
    }
    Ok(())
}
