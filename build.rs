//! Build script for spotlake.
//!
//! Copies the configuration templates (`.env.example` and
//! `config.example.toml`) into the per-user data directory, where
//! `spotlake` looks for its `.env` file:
//!
//! - Linux: `~/.local/share/spotlake/`
//! - macOS: `~/Library/Application Support/spotlake/`
//! - Windows: `%LOCALAPPDATA%/spotlake/`
//!
//! A missing template only produces a cargo warning.

use std::{env, fs, path::PathBuf};

const TEMPLATES: [&str; 2] = [".env.example", "config.example.toml"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for template in TEMPLATES {
        println!("cargo:rerun-if-changed={}", template);
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("spotlake");
    if let Err(e) = fs::create_dir_all(&out_dir) {
        println!("cargo:warning=cannot create {}: {}", out_dir.display(), e);
        return Ok(());
    }

    for template in TEMPLATES {
        let source = manifest_dir.join(template);
        if !source.is_file() {
            println!("cargo:warning={} not found at {}", template, source.display());
            continue;
        }
        if let Err(e) = fs::copy(&source, out_dir.join(template)) {
            println!("cargo:warning=cannot copy {}: {}", template, e);
        }
    }

    Ok(())
}
