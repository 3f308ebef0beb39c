// SPDX-License-Identifier: MIT
// Fails if a committed config file carries something that looks like a
// private key. Keys belong in WALLET_KEY in the environment or an untracked .env.

use regex::Regex;
use std::fs;
use std::path::Path;

#[test]
fn no_committed_hex_keys_in_configs() {
    let key = Regex::new(r"(?i)\b(0x)?[a-f0-9]{64}\b").unwrap();
    let candidates = [
        "config.toml",
        "config.example.toml",
        "config.yaml",
        "config.json",
    ];
    for file in candidates {
        if !Path::new(file).exists() {
            continue;
        }
        let body = fs::read_to_string(file).expect("read config");
        for (idx, line) in body.lines().enumerate() {
            let line = line.trim_start();
            if line.starts_with('#') {
                continue;
            }
            if key.is_match(line) {
                panic!("Secret-looking hex in {} at line {}", file, idx + 1);
            }
        }
    }
}

#[test]
fn example_config_has_no_wallet_key() {
    let path = "config.example.toml";
    if !Path::new(path).exists() {
        return;
    }
    let body = fs::read_to_string(path).expect("read example");
    assert!(!body.to_ascii_lowercase().contains("wallet_key ="));
}
