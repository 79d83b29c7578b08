use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Noisy dependencies stay at warn unless RUST_LOG says otherwise.
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "h2=warn", "reqwest=warn"];

pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&settings.telemetry().log_level)));

    let builder = fmt().with_env_filter(filter).with_target(false);

    if settings.telemetry().json {
        builder
            .json()
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    } else {
        builder
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    }

    Ok(())
}

fn default_directives(level: &str) -> String {
    let level = match level.trim() {
        "" => "info",
        other => other,
    };
    std::iter::once(level).chain(QUIET_TARGETS.iter().copied()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::default_directives;

    #[test]
    fn directives_keep_level_and_quiet_dependencies() {
        assert_eq!(default_directives("debug"), "debug,sqlx=warn,hyper=warn,h2=warn,reqwest=warn");
        assert!(default_directives("  ").starts_with("info,"));
    }
}
