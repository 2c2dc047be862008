//! Collect and rank contribution activity across a GitHub organization.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use orgpulse_lib::{Host, run};
use std::io::{Write, stderr, stdout};

/// Host bound to the real process streams.
#[derive(Debug, Clone, Copy, Default)]
struct ProcessHost;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Host for ProcessHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
#[cfg_attr(coverage_nightly, coverage(off))]
async fn main() {
    let mut host = ProcessHost;
    if let Err(e) = run(&mut host, std::env::args()).await {
        let _ = writeln!(host.error(), "error: {e:#}");
        host.exit(1);
    }
}
