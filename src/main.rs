//! Binary entrypoint that launches the reference conversation backend.

use std::process::ExitCode;

use convo_sync::start;

/// Serve the conversation persistence API in memory.
fn main() -> ExitCode {
    start::run()
}
