//! Campus map viewer.
//!
//! ```bash
//! campus3d [options.toml]
//! ```
//!
//! Without an argument `campus3d.toml` in the working directory is used when
//! present, otherwise the built-in defaults.

use std::path::PathBuf;

use anyhow::Context;
use campus3d::{CampusApp, ViewerOptions};

const DEFAULT_OPTIONS_FILE: &str = "campus3d.toml";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => ViewerOptions::load(&path)
            .with_context(|| format!("reading options from {}", path.display()))?,
        None => {
            let path = PathBuf::from(DEFAULT_OPTIONS_FILE);
            if path.exists() {
                ViewerOptions::load(&path)
                    .with_context(|| format!("reading options from {}", path.display()))?
            } else {
                log::info!("No {} found; using default options", DEFAULT_OPTIONS_FILE);
                ViewerOptions::default()
            }
        }
    };

    CampusApp::new(options)?.run()
}
