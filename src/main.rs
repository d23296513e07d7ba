//! aggcache command-line entry point.

use aggcache::cli::Cli;
use aggcache::core::error::user_friendly_error;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();
    let config = cli.build_config();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    init_logging(config.log_level.as_deref());

    // Execute the command
    if let Err(e) = cli.execute_with_config(config) {
        // Convert to user-friendly error with context and suggestions
        let error_ctx = user_friendly_error(e);
        error_ctx.display();
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise use `level`, or stay silent when it is `None`.
fn init_logging(level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(level) = level {
        EnvFilter::new(format!("aggcache={level}"))
    } else {
        return;
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}
