#![allow(dead_code)]

use std::fs;
use std::path::Path;
use anyhow::Result;

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn write_config(dir: &Path, filename: &str, content: &str) -> Result<()> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(())
}
