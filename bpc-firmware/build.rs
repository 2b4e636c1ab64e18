//! Build script for bpc-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Rejects a post_codes.toml the firmware parser would not accept

use std::env;
use std::fs;
use std::path::PathBuf;

use bpc_core::config::parse_config_located;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("memory.x"), include_bytes!("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    validate_config();
}

/// Run the embedded config through the same parser the firmware uses
fn validate_config() {
    println!("cargo:rerun-if-changed=post_codes.toml");

    let content = match fs::read_to_string("post_codes.toml") {
        Ok(content) => content,
        Err(e) => fail("Cannot read post_codes.toml", &e.to_string()),
    };

    // Syntax errors first: the toml crate reports them with more context
    if let Err(e) = toml::from_str::<toml::Value>(&content) {
        fail("Invalid TOML syntax in post_codes.toml", &e.to_string());
    }

    match parse_config_located(&content) {
        Ok(config) => println!(
            "cargo:warning=post_codes.toml: {} descriptions, {} ignored codes",
            config.codes.len(),
            config.ignore.len()
        ),
        Err(e) => fail(
            "Invalid configuration in post_codes.toml",
            &format!("line {}: {:?}", e.line, e.error),
        ),
    }
}

fn fail(title: &str, detail: &str) -> ! {
    let body = detail
        .lines()
        .map(|line| format!("║  {:<65} ║", line))
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n╔{bar}╗\n║  ERROR: {title:<58} ║\n╠{bar}╣\n{body}\n╚{bar}╝\n",
        bar = "═".repeat(68),
    );
}
