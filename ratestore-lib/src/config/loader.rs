use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{RateStoreError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| RateStoreError::Config(format!("Failed to read config file: {e}")))?;
    parse(&txt)
}

pub fn parse(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| RateStoreError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    cfg.rate_store.validate().map_err(RateStoreError::Config)?;

    let mut seen = HashSet::new();
    for node in &cfg.nodes {
        if node.address.trim().is_empty() {
            return Err(RateStoreError::Config("node address cannot be empty".into()));
        }
        if !seen.insert(node.address.as_str()) {
            return Err(RateStoreError::Config(format!(
                "Duplicate node address: {}",
                node.address
            )));
        }
    }

    Ok(())
}
