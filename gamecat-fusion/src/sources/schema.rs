// Per-source column schemas
//
// The column names here are the only place source-specific naming appears.
// Everything downstream works with logical [`Field`]s.

use crate::record::SourceId;

/// Logical field a source column maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Price,
    ReleaseDate,
    Genres,
    Tags,
    Categories,
    Developers,
    Publishers,
    Languages,
    /// Free-text platform description ("Windows, Mac")
    Platforms,
    Windows,
    Mac,
    Linux,
    Reviews,
    QualityScore,
    HeaderImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: Field,
    pub column: &'static str,
    pub required: bool,
}

const fn required(field: Field, column: &'static str) -> ColumnSpec {
    ColumnSpec {
        field,
        column,
        required: true,
    }
}

const fn optional(field: Field, column: &'static str) -> ColumnSpec {
    ColumnSpec {
        field,
        column,
        required: false,
    }
}

/// Ordering applied before keep-first deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOrder {
    /// Keep the most-reviewed row per key
    ReviewsDescending,
    /// Keep the cheapest row per key
    PriceAscending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSchema {
    pub id: SourceId,
    pub columns: Vec<ColumnSpec>,
    /// Prices are stored in minor currency units (cents)
    pub price_in_minor_units: bool,
    /// Price substituted when the cell is missing or unparsable
    pub price_default: Option<f64>,
    pub dedup_order: DedupOrder,
    /// Apply the configured review-count floor
    pub popularity_floor: bool,
}

impl SourceSchema {
    /// Review-rich primary source
    pub fn steam() -> Self {
        Self {
            id: SourceId::Steam,
            columns: vec![
                required(Field::Name, "name"),
                required(Field::Price, "price"),
                required(Field::ReleaseDate, "release_date"),
                optional(Field::Windows, "windows"),
                optional(Field::Mac, "mac"),
                optional(Field::Linux, "linux"),
                optional(Field::Reviews, "num_reviews_total"),
                optional(Field::QualityScore, "metacritic_score"),
                optional(Field::HeaderImage, "header_image"),
                optional(Field::Developers, "developers"),
                optional(Field::Publishers, "publishers"),
                optional(Field::Categories, "categories"),
                optional(Field::Genres, "genres"),
                optional(Field::Tags, "tags"),
                optional(Field::Languages, "supported_languages"),
            ],
            price_in_minor_units: false,
            price_default: None,
            dedup_order: DedupOrder::ReviewsDescending,
            popularity_floor: true,
        }
    }

    /// Low-signal secondary source; prices in cents, no popularity metric
    pub fn epic() -> Self {
        Self {
            id: SourceId::Epic,
            columns: vec![
                required(Field::Name, "name"),
                required(Field::Price, "price"),
                required(Field::ReleaseDate, "release_date"),
                optional(Field::Genres, "genres"),
                optional(Field::Developers, "developer"),
                optional(Field::Publishers, "publisher"),
                optional(Field::Platforms, "platform"),
            ],
            price_in_minor_units: true,
            price_default: Some(0.0),
            dedup_order: DedupOrder::PriceAscending,
            popularity_floor: false,
        }
    }

    pub fn column(&self, field: Field) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.field == field)
    }
}
