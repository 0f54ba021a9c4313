//! Tracing/logging initialization.
//!
//! JSON lines for deployments, human-readable output for local work.

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Json,
    Pretty,
}

fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(filter: &str, output: LogOutput) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match output {
        LogOutput::Json => builder.json().with_target(false).try_init(),
        LogOutput::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init("warn", LogOutput::Pretty);
        init("debug", LogOutput::Json);
        ::tracing::info!("still alive");
    }
}
