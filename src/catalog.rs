// Catalog records as served by the content backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Category tags used across tours, hotels and festivals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Cultural,
    Adventure,
    Wildlife,
    Spiritual,
    Trekking,
    Luxury,
    Boutique,
    Homestay,
    Farmstay,
    Festival,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Cultural,
        Category::Adventure,
        Category::Wildlife,
        Category::Spiritual,
        Category::Trekking,
        Category::Luxury,
        Category::Boutique,
        Category::Homestay,
        Category::Farmstay,
        Category::Festival,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cultural => "cultural",
            Category::Adventure => "adventure",
            Category::Wildlife => "wildlife",
            Category::Spiritual => "spiritual",
            Category::Trekking => "trekking",
            Category::Luxury => "luxury",
            Category::Boutique => "boutique",
            Category::Homestay => "homestay",
            Category::Farmstay => "farmstay",
            Category::Festival => "festival",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

// Backend collections the core reads from or writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Tours,
    Hotels,
    Festivals,
    Bookings,
    Inquiries,
    CustomTours,
    Guides,
}

impl ResourceKind {
    // Key under which the collection is cached
    pub fn cache_key(&self) -> &'static str {
        match self {
            ResourceKind::Tours => "tours",
            ResourceKind::Hotels => "hotels",
            ResourceKind::Festivals => "festivals",
            ResourceKind::Bookings => "bookings",
            ResourceKind::Inquiries => "inquiries",
            ResourceKind::CustomTours => "custom-tours",
            ResourceKind::Guides => "guides",
        }
    }

    pub fn api_path(&self) -> String {
        format!("/api/{}", self.cache_key())
    }

    pub fn is_catalog(&self) -> bool {
        matches!(
            self,
            ResourceKind::Tours | ResourceKind::Hotels | ResourceKind::Festivals
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key())
    }
}

// A tour, hotel or festival. Hotels report price per night, tours the total price.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub category: Category,
    pub price: f64,
    #[serde(default, alias = "starRating")]
    pub rating: Option<f64>,
    pub name: String,
    #[serde(default, alias = "region")]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "activities")]
    pub amenities: Vec<String>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, category: Category, price: f64) -> Self {
        Self {
            id: id.into(),
            category,
            price,
            rating: None,
            name: String::new(),
            location: String::new(),
            description: String::new(),
            amenities: Vec::new(),
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
