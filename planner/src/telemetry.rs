use tracing_subscriber::{
    EnvFilter, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber. Returns `false` if one was already set.
///
/// Timestamps are disabled because `SystemTime` is unavailable on
/// `wasm32-unknown-unknown`.
pub fn init_tracing<W>(directives: &str, writer: W) -> bool
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("invalid log directives {directives:?}: {err}");
        EnvFilter::new(crate::config::DEFAULT_LOG_DIRECTIVES)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .without_time()
                .with_target(true),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing("planner=debug", std::io::sink);
        assert!(!init_tracing("planner=debug", std::io::sink));
    }
}
