//! Reel command-line entry point.

fn main() {
    reel_lib::init_tracing();

    if let Err(err) = reel_lib::cli::run() {
        tracing::debug!(error = ?err, "command failed");
        eprintln!("reel: {err}");
        std::process::exit(1);
    }
}
