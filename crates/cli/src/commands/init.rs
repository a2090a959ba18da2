//! `promptwright init`: Write the default configuration.

use promptwright_config::AppConfig;
use std::path::Path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();

    println!("Promptwright — Setup");
    println!("====================\n");

    write_default_config(&config_dir)?;

    println!("\nNext steps:");
    println!("   1. Add your API key to the config (or export OPENAI_API_KEY)");
    println!("   2. Run: promptwright serve");
    println!("   3. Open the printed address in your browser\n");

    Ok(())
}

/// Create `dir/config.toml` unless one already exists. Returns whether it was written.
fn write_default_config(dir: &Path) -> Result<bool, std::io::Error> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        println!("Created config directory: {}", dir.display());
    }

    let config_path = dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run init.");
        return Ok(false);
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    Ok(true)
}
