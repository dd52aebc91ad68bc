//! Navigator listing: per-set segments and color swatches

use mtgr_common::Color;
use serde::Serialize;

use crate::catalog::ScryfallCard;
use crate::filter::CatalogView;
use crate::ratings::Ratings;

/// Contiguous run of cards from one set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Upper-cased set code
    pub header: String,
    /// First view index, inclusive
    pub start: usize,
    /// Last view index, inclusive
    pub end: usize,
}

impl Segment {
    pub fn card_count(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

/// Split a view wherever the set code changes
///
/// A set appearing in two separate runs gets two segments.
pub fn segments(view: &CatalogView) -> Vec<Segment> {
    let mut result: Vec<Segment> = Vec::new();
    let mut current_set: Option<&str> = None;

    for (index, entry) in view.iter().enumerate() {
        let set_code = entry.identity.set_code.as_str();
        if current_set == Some(set_code) {
            if let Some(segment) = result.last_mut() {
                segment.end = index;
                continue;
            }
        }
        result.push(Segment {
            header: set_code.to_uppercase(),
            start: index,
            end: index,
        });
        current_set = Some(set_code);
    }

    result
}

/// Color code of a navigator entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Swatch {
    Multicolor,
    Mono(Color),
    /// No swatch (typically lands)
    None,
}

impl Swatch {
    /// Display color as `#rrggbb`
    pub fn hex(self) -> Option<&'static str> {
        match self {
            Swatch::Multicolor => Some("#c0ac39"),
            Swatch::Mono(Color::White) => Some("#fefff8"),
            Swatch::Mono(Color::Blue) => Some("#3277a7"),
            Swatch::Mono(Color::Black) => Some("#393736"),
            Swatch::Mono(Color::Red) => Some("#da3946"),
            Swatch::Mono(Color::Green) => Some("#38614c"),
            Swatch::Mono(Color::Colorless) => Some("#94908e"),
            Swatch::None => None,
        }
    }
}

/// Classify a card by its colors
///
/// Uses `colors` when present and non-empty, otherwise the colored symbols
/// of the mana cost (devoid cards), otherwise the color identity. Non-land
/// cards that end up with no color count as colorless.
pub fn swatch(card: &ScryfallCard) -> Swatch {
    let colors: Vec<Color> = match (&card.colors, &card.mana_cost) {
        (Some(colors), _) if !colors.is_empty() => {
            colors.iter().filter_map(|c| Color::from_letter(c)).collect()
        }
        (_, Some(mana_cost)) => mana_cost
            .chars()
            .filter(|c| "WUBRG".contains(*c))
            .filter_map(|c| Color::from_letter(&c.to_string()))
            .collect(),
        _ => card
            .color_identity
            .iter()
            .filter_map(|c| Color::from_letter(c))
            .collect(),
    };
    let mut distinct: Vec<Color> = Vec::new();
    for color in colors {
        if !distinct.contains(&color) {
            distinct.push(color);
        }
    }

    // Generic-cost non-lands (e.g. artifacts) still get a swatch
    let non_land = card
        .type_line
        .as_deref()
        .map(|t| !t.contains("Land"))
        .unwrap_or(false);

    match distinct.as_slice() {
        [] if non_land => Swatch::Mono(Color::Colorless),
        [] => Swatch::None,
        [single] => Swatch::Mono(*single),
        _ => Swatch::Multicolor,
    }
}

/// One navigator row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigatorItem {
    pub index: usize,
    pub name: String,
    pub swatch: Swatch,
    /// The user rated this card in at least one format
    pub rated: bool,
}

/// Rows for every card of the view
pub fn items(view: &CatalogView, ratings: &Ratings) -> Vec<NavigatorItem> {
    view.iter()
        .enumerate()
        .map(|(index, entry)| NavigatorItem {
            index,
            name: entry.metadata.name.clone(),
            swatch: swatch(&entry.metadata),
            rated: ratings.has_local_rating(&entry.identity),
        })
        .collect()
}
