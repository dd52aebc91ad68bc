//! CSV export of this user's ratings
//!
//! One row per card of a view, one column per enabled format. The card name
//! goes last so names containing commas stay readable when pasted.

use mtgr_common::Format;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::filter::CatalogView;
use crate::ratings::Ratings;

/// File name for a collection's export
pub fn export_file_name(collection_id: &str) -> String {
    format!("ratings_{}.csv", collection_id)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Render the CSV text
///
/// Header is `set,collector_number,rating_<format>...,name`; an unrated
/// (card, format) is an empty cell.
pub fn export_csv(view: &CatalogView, ratings: &Ratings, formats: &[Format]) -> String {
    let enabled: Vec<&Format> = formats.iter().filter(|f| f.enabled).collect();

    let mut header = vec!["set".to_string(), "collector_number".to_string()];
    header.extend(enabled.iter().map(|f| format!("rating_{}", f.id)));
    header.push("name".to_string());

    let mut out = header.join(",");
    out.push('\n');

    for entry in view.iter() {
        let mut row = vec![
            entry.identity.set_code.clone(),
            entry.identity.card_code.clone(),
        ];
        for format in &enabled {
            let cell = ratings
                .aggregate(&entry.identity, &format.id)
                .and_then(|a| a.local_rating)
                .map(|v| v.to_string())
                .unwrap_or_default();
            row.push(cell);
        }
        row.push(quote(&entry.metadata.name));

        // Writing to a String cannot fail
        let _ = writeln!(out, "{}", row.join(","));
    }

    out
}

/// Write the export into `dir`, returning the file path
pub fn write_export(
    dir: &Path,
    collection_id: &str,
    view: &CatalogView,
    ratings: &Ratings,
    formats: &[Format],
) -> Result<PathBuf> {
    let path = dir.join(export_file_name(collection_id));
    std::fs::write(&path, export_csv(view, ratings, formats))?;
    info!(path = %path.display(), cards = view.len(), "Exported ratings");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ScryfallCard};
    use mtgr_common::{CardIdentity, CardRatings, RatingValue};
    use std::sync::Arc;

    fn setup() -> (CatalogView, Ratings, Vec<Format>) {
        let catalog = Arc::new(Catalog::from_cards(vec![
            ScryfallCard {
                set: "otj".to_string(),
                collector_number: "1".to_string(),
                name: "Aven Interrupter".to_string(),
                ..Default::default()
            },
            ScryfallCard {
                set: "otj".to_string(),
                collector_number: "2".to_string(),
                name: "Bovine Intervention, \"Deluxe\"".to_string(),
                ..Default::default()
            },
        ]));
        let mut ratings = Ratings::new();
        let mut first = CardRatings::zeroed(["limited", "cube"]);
        first.format_mut("cube").unwrap().local_rating = Some(RatingValue::Four);
        ratings.insert(CardIdentity::new("otj", "1"), first);
        ratings.insert(CardIdentity::new("otj", "2"), CardRatings::zeroed(["limited", "cube"]));

        let formats = vec![
            Format {
                id: "limited".to_string(),
                enabled: true,
            },
            Format {
                id: "cube".to_string(),
                enabled: true,
            },
            Format {
                id: "constructed".to_string(),
                enabled: false,
            },
        ];
        (CatalogView::all(catalog), ratings, formats)
    }

    #[test]
    fn test_export_layout() {
        let (view, ratings, formats) = setup();
        let csv = export_csv(&view, &ratings, &formats);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "set,collector_number,rating_limited,rating_cube,name");
        assert_eq!(lines[1], "otj,1,,4,\"Aven Interrupter\"");
        assert_eq!(lines[2], "otj,2,,,\"Bovine Intervention, \"\"Deluxe\"\"\"");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_export_file_name() {
        let (view, ratings, formats) = setup();
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_export(dir.path(), "otj", &view, &ratings, &formats).unwrap();
        assert!(path.ends_with("ratings_otj.csv"));
        assert!(std::fs::read_to_string(path).unwrap().starts_with("set,"));
    }
}
