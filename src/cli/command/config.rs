use anyhow::Result;

use crate::config::{default_config_path, Config};

/// The default configuration as TOML, headed by where it would be read from.
pub fn config() -> Result<String> {
    let location = match default_config_path() {
        Some(path) => format!("# Read from {} when present\n", path.display()),
        None => String::new(),
    };

    Ok(format!("{}{}", location, Config::default().to_toml_string()?))
}

// -- Tests -------------------------------------------------------------------
