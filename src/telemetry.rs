use anyhow::Result;
use std::fs::OpenOptions;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// stdout carries the task reports, so logs always go elsewhere
pub fn init_telemetry() -> Result<()> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    match log_format.as_str() {
        "json" => init_json()?,
        "file" => init_file()?,
        "pretty" => init_stderr()?,
        _ => {
            eprintln!("Unknown LOG_FORMAT: {}, falling back to pretty", log_format);
            init_stderr()?;
        }
    }

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter())
        .try_init()?;

    Ok(())
}

fn init_json() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .with(env_filter())
        .try_init()?;

    Ok(())
}

fn init_file() -> Result<()> {
    let log_file_path = std::env::var("LOG_FILE")
        .unwrap_or_else(|_| "zbx-config.log".to_string());

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false)
        )
        .with(env_filter())
        .try_init()?;

    eprintln!("Logging to file: {}", log_file_path);

    Ok(())
}
