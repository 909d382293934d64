use anyhow::Result;
use tabvault_core::schema::Database;
use tabvault_etl::Config;

pub fn list_tabs(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;

    for url in db.list_resolvable_tab_urls()? {
        println!("{url}");
    }

    Ok(())
}
