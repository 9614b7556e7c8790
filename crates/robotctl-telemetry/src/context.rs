//! Per-invocation span helpers.

use tracing::Span;

/// Span covering one command invocation; every log line inside carries the
/// command name and the trace id sent to the Robot API as `x-request-id`.
#[must_use]
pub fn invocation_span(command: &str, trace_id: &str) -> Span {
    tracing::info_span!("invocation", command = %command, trace_id = %trace_id)
}
