use anyhow::{Context, Result};
use tabvault_core::model::TabDocument;
use tabvault_etl::{Config, Resolution, TabResolutionService};

/// Resolve and print a tab. Returns whether anything was found.
pub async fn get_tab(config: &Config, key: &str, json: bool) -> Result<bool> {
    let service = TabResolutionService::new(config).context("Failed to build resolver")?;

    let resolution = service.resolve(key).await;

    match &resolution {
        Resolution::Found(doc) if json => {
            println!("{}", serde_json::to_string_pretty(doc)?);
        }
        Resolution::Found(doc) => print_document(doc),
        Resolution::Unsupported { content_type, .. } => {
            eprintln!("Couldn't display tab type {content_type:?}");
        }
        Resolution::NotFound => {
            eprintln!("Tab not found: {key}");
        }
    }

    // The process exits right after; let the background cache write land.
    for report in service.flush().await {
        if !report.is_clean() {
            log::warn!("{} cache write(s) failed; see log above", report.failures);
        }
    }

    Ok(resolution.is_found())
}

fn print_document(doc: &TabDocument) {
    println!("{} - {}", doc.song.artist, doc.song.name);
    println!("{} v{}  ({})", doc.tab_type, doc.version, format_rating(doc.rating));
    if doc.capo > 0 {
        println!("Capo {}", doc.capo);
    }
    if !doc.tuning.is_empty() {
        println!("Tuning: {} {}", doc.tuning.name, doc.tuning.value);
    }
    println!();
    println!("{}", doc.tab);
    println!();

    if doc.song.versions.len() > 1 {
        println!("Versions:");
        for v in &doc.song.versions {
            let marker = if v.tab_url == doc.tab_url { "*" } else { " " };
            println!("{marker} v{:<3} {:<8} {}", v.version, format_rating(v.rating), v.tab_url);
        }
    }

    if !doc.contributors.is_empty() {
        println!("\n{} Contributors: {}", doc.contributors.len(), doc.contributors.join(", "));
    }
}

fn format_rating(rating: f64) -> String {
    if rating < 0.0 {
        "unrated".to_string()
    } else {
        format!("{rating:.1}/5")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rating() {
        assert_eq!(format_rating(-1.0), "unrated");
        assert_eq!(format_rating(4.83), "4.8/5");
    }
}
