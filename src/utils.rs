use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber. `verbosity` is one of `silent`,
/// `normal` or `verbose`; anything else counts as `normal`. `RUST_LOG` still
/// applies on top.
pub fn setup_logging(verbosity: &str) -> Result<()> {
    let level = log_level(verbosity);

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("person_sift={}", level).parse()?);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn log_level(verbosity: &str) -> Level {
    match verbosity {
        "silent" => Level::ERROR,
        "verbose" => Level::DEBUG,
        _ => Level::INFO,
    }
}

pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
