//! # line-dedup CLI
//!
//! Command-line interface for the line deduplication filter.
//!
//! ## Usage
//! ```bash
//! line-dedup < input.log
//! line-dedup --period 10m < input.log
//! ```

mod cli;

use line_dedup::LineDedupError;
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, &mut io::stderr().lock());
            ExitCode::FAILURE
        }
    }
}

/// Write the failure straight to the operator; `RUST_LOG` cannot silence it.
fn report(error: &LineDedupError, out: &mut impl Write) {
    writeln!(out, "Error: {}", error).ok();
}
