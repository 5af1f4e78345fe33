//! tablestore CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`. Errors have already been
//! reported as JSON on stdout; the message is repeated on stderr and the
//! process exits non-zero.

use tablestore::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
