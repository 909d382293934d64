use anyhow::Result;
use tabvault_core::schema::Database;
use tabvault_etl::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let stats = db.stats()?;

    println!("\nTabvault Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Songs: {}", stats.songs);
    println!("  Tabs with content: {}", stats.tabs - stats.placeholders);
    println!("  Sibling placeholders: {}", stats.placeholders);

    if stats.placeholders > 0 {
        println!("\n  Placeholders are fetched the first time you `tabvault get` them");
    }

    Ok(())
}
