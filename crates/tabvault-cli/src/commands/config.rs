use anyhow::{Context, Result};
use tabvault_etl::config::{self, CONFIG_KEYS};
use tabvault_etl::Config;
use toml_edit::{value, DocumentMut};

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let path = config::config_file_path();
    println!("Config file: {}", path.display());
    println!(
        "File exists: {}\n",
        if path.exists() { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    for key in CONFIG_KEYS {
        println!("  {key}: {}", config.get_value(key).unwrap_or_default());
    }
    println!("  blacklist: {}", config.blacklist.join(", "));
    println!("  logging.level: {}", config.logging.level);
    println!("  logging.coloured: {}", config.logging.coloured);

    println!("\nPriority: CLI args > ENV vars (TABVAULT_*) > Config file > Defaults");

    Ok(())
}

/// Print one config value, or the whole file when no key is given.
pub fn get_config(config: &Config, key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let Some(val) = config.get_value(&key) else {
            anyhow::bail!(
                "Unknown config key: {key}\n\nValid keys: {}",
                CONFIG_KEYS.join(", ")
            );
        };
        println!("{val}");
        return Ok(());
    }

    let config_path = config::config_file_path();
    if config_path.exists() {
        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        print!("{contents}");
    } else {
        println!("Config file does not exist: {}", config_path.display());
        println!("\nRun 'tabvault config init' to create it.");
    }

    Ok(())
}

/// Set a config value, keeping the rest of the file (comments included) intact.
pub fn set_config(key: &str, val: &str) -> Result<()> {
    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = apply_setting(&contents, key, val)?;
    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {key} = {val}");
    println!("  in {}", config_path.display());

    Ok(())
}

fn apply_setting(contents: &str, key: &str, val: &str) -> Result<String> {
    let mut doc: DocumentMut = contents.parse().context("Config file is not valid TOML")?;

    match key {
        "request_timeout_secs" | "requests_per_second" => {
            let n: i64 = val
                .parse()
                .with_context(|| format!("{key} must be a whole number, got {val:?}"))?;
            if n < 0 {
                anyhow::bail!("{key} must not be negative");
            }
            doc[key] = value(n);
        }
        "refresh_policy" => {
            if !matches!(val, "preserve_observed" | "overwrite_all") {
                anyhow::bail!("refresh_policy must be preserve_observed or overwrite_all");
            }
            doc[key] = value(val);
        }
        k if CONFIG_KEYS.contains(&k) => {
            doc[key] = value(val);
        }
        _ => {
            anyhow::bail!(
                "Unknown config key: {key}\n\nValid keys: {}",
                CONFIG_KEYS.join(", ")
            );
        }
    }

    Ok(doc.to_string())
}

/// Show the config file path.
pub fn show_path() {
    println!("{}", config::config_file_path().display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let config_path = config::config_file_path();

    if config::ensure_config_file()? {
        println!("✓ Created config file at {}", config_path.display());
        println!("\nEdit it directly or use 'tabvault config set <key> <value>'");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
