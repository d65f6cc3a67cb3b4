//! Courier: compile a stylesheet proxy file and publish it on every save.
//!
//! # Usage
//!
//! ```text
//! courier <FILE>
//! ```
//!
//! The first line of `FILE` names where the compiled output goes, e.g.
//! `// sftp://deploy@example.org/srv/www/site/style`. The rest of the file is
//! the stylesheet source.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "courier",
    version,
    about = "Watch a stylesheet, compile it on save, and publish it to its remote target",
    long_about = None,
)]
struct Cli {
    /// Proxy file to watch. Its first line is the remote descriptor.
    file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    courier_daemon::start_blocking(&cli.file)
        .with_context(|| format!("courier stopped watching {}", cli.file.display()))
}
