//! Logging Setup
//!
//! Builds the `tracing` subscriber from [`LoggingConfig`]:
//! - `RUST_LOG` directives win over the configured level
//! - `--verbose` forces DEBUG as the default directive
//! - Output format is `compact`, `pretty` or `json`

use anyhow::Result;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))?
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = build_subscriber(&config.format, filter, std::io::stdout);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

/// Build a subscriber writing `format` output to `writer`
///
/// Unknown formats fall back to `compact`; `Config::validate` rejects them
/// before this point in the binary.
pub fn build_subscriber<W>(
    format: &str,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    match format.to_lowercase().as_str() {
        "json" => Box::new(builder.json().finish()),
        "pretty" => Box::new(builder.pretty().finish()),
        _ => Box::new(builder.compact().finish()),
    }
}
