//! Binary entrypoint for the Stoxara server.

use std::process::ExitCode;

use stoxara::start_stoxara;

fn main() -> ExitCode {
    start_stoxara::run()
}
