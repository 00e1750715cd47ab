use tracing::Level;
use tracing_subscriber::fmt;

/// Install the global subscriber.
///
/// Logs go to stderr so a shell can still capture the received bytes from
/// stdout. JSON output is for log shippers; the compact format is for humans
/// at a terminal.
pub fn setup_logging(level: Level, json: bool) {
    if json {
        fmt()
            .json()
            .with_timer(fmt::time())
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .with_span_list(false)
            .init()
    } else {
        fmt()
            .compact()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init()
    }
}
