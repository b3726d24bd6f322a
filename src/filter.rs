// Catalog filter engine
// Reduces a fetched collection to the subset and ordering a catalog page displays.
// The engine never fails: out-of-range criteria are clamped to the nearest sane value.

use crate::catalog::{CatalogItem, Category, UnknownCategory};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_RATING: f64 = 5.0;

// Inclusive price interval; `max: None` means no upper bound
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self { min, max: None }
    }

    // Negative bounds clamp to zero, NaN bounds lift the restriction
    fn clamped(&self) -> PriceRange {
        let min = if self.min.is_nan() {
            0.0
        } else {
            self.min.max(0.0)
        };
        let max = self.max.filter(|m| !m.is_nan()).map(|m| m.max(0.0));
        PriceRange { min, max }
    }

    pub fn contains(&self, price: f64) -> bool {
        let range = self.clamped();
        price >= range.min && range.max.map_or(true, |max| price <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn admits(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") || s.trim().is_empty() {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    // Curation order as delivered by the backend
    #[default]
    Featured,
    PriceAscending,
    PriceDescending,
    RatingDescending,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "featured" => Ok(SortKey::Featured),
            "price-low" | "price-ascending" | "price-asc" => Ok(SortKey::PriceAscending),
            "price-high" | "price-descending" | "price-desc" => Ok(SortKey::PriceDescending),
            "rating" | "rating-descending" => Ok(SortKey::RatingDescending),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

// The combined category / price / rating / sort selection of a catalog page
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct FilterConfiguration {
    pub price_range: Option<PriceRange>,
    pub rating_threshold: Option<f64>,
    pub category_filter: CategoryFilter,
    pub sort_key: SortKey,
}

impl FilterConfiguration {
    pub fn with_category(mut self, category: Category) -> Self {
        self.category_filter = CategoryFilter::Only(category);
        self
    }

    pub fn with_price_range(mut self, range: PriceRange) -> Self {
        self.price_range = Some(range);
        self
    }

    pub fn with_rating_threshold(mut self, threshold: f64) -> Self {
        self.rating_threshold = Some(threshold);
        self
    }

    pub fn with_sort(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    // NaN means no restriction, everything else is pulled into [0, 5]
    fn effective_threshold(&self) -> Option<f64> {
        self.rating_threshold
            .filter(|t| !t.is_nan())
            .map(|t| t.clamp(0.0, MAX_RATING))
    }

    pub fn matches(&self, item: &CatalogItem) -> bool {
        if !self.category_filter.admits(item.category) {
            return false;
        }

        if !self
            .price_range
            .as_ref()
            .map_or(true, |range| range.contains(item.price))
        {
            return false;
        }

        // Unrated items only pass when no threshold is set
        self.effective_threshold().map_or(true, |threshold| {
            item.rating.map_or(false, |rating| rating >= threshold)
        })
    }
}

fn compare(sort_key: SortKey, a: &CatalogItem, b: &CatalogItem) -> Ordering {
    match sort_key {
        SortKey::Featured => Ordering::Equal,
        SortKey::PriceAscending => a.price.total_cmp(&b.price),
        SortKey::PriceDescending => b.price.total_cmp(&a.price),
        SortKey::RatingDescending => match (a.rating, b.rating) {
            (Some(ra), Some(rb)) => rb.total_cmp(&ra),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

// Category, then price, then rating restriction, then a stable sort.
// The input is left untouched and a new sequence is returned.
pub fn apply(items: &[CatalogItem], config: &FilterConfiguration) -> Vec<CatalogItem> {
    let mut filtered: Vec<CatalogItem> = items
        .iter()
        .filter(|item| config.matches(item))
        .cloned()
        .collect();

    // sort_by is stable, so ties keep curation order
    if config.sort_key != SortKey::Featured {
        filtered.sort_by(|a, b| compare(config.sort_key, a, b));
    }

    filtered
}
