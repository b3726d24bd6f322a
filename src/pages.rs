// Catalog pages as data: every tour / hotel / festival listing is one row here,
// rendered by the same parameterized view.

use crate::catalog::{CatalogItem, Category, ResourceKind};
use crate::filter::{self, CategoryFilter, FilterConfiguration, PriceRange, SortKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogPage {
    pub slug: &'static str,
    pub title: &'static str,
    pub resource: ResourceKind,
    // Fixed category of the page; None lets the visitor pick
    pub category: Option<Category>,
    pub default_sort: SortKey,
}

const fn listing(
    slug: &'static str,
    title: &'static str,
    resource: ResourceKind,
    category: Option<Category>,
) -> CatalogPage {
    CatalogPage {
        slug,
        title,
        resource,
        category,
        default_sort: SortKey::Featured,
    }
}

pub const CATALOG_PAGES: &[CatalogPage] = &[
    listing("tours", "All Tours", ResourceKind::Tours, None),
    listing("cultural-tours", "Cultural Tours", ResourceKind::Tours, Some(Category::Cultural)),
    listing("adventure-tours", "Adventure Tours", ResourceKind::Tours, Some(Category::Adventure)),
    listing("wildlife-tours", "Wildlife Safaris", ResourceKind::Tours, Some(Category::Wildlife)),
    listing("spiritual-tours", "Spiritual Journeys", ResourceKind::Tours, Some(Category::Spiritual)),
    listing("trekking-tours", "Treks", ResourceKind::Tours, Some(Category::Trekking)),
    listing("luxury-tours", "Luxury Tours", ResourceKind::Tours, Some(Category::Luxury)),
    listing("hotels", "All Stays", ResourceKind::Hotels, None),
    listing("luxury-hotels", "Luxury Hotels", ResourceKind::Hotels, Some(Category::Luxury)),
    listing("boutique-hotels", "Boutique Hotels", ResourceKind::Hotels, Some(Category::Boutique)),
    listing("homestays", "Homestays", ResourceKind::Hotels, Some(Category::Homestay)),
    listing("farmstays", "Farmstays", ResourceKind::Hotels, Some(Category::Farmstay)),
    listing("festivals", "Festivals", ResourceKind::Festivals, None),
];

pub fn page(slug: &str) -> Option<&'static CatalogPage> {
    CATALOG_PAGES.iter().find(|p| p.slug == slug)
}

pub fn pages_for(resource: ResourceKind) -> impl Iterator<Item = &'static CatalogPage> {
    CATALOG_PAGES.iter().filter(move |p| p.resource == resource)
}

// What the visitor picked in the filter sidebar
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageSelection {
    pub category: CategoryFilter,
    pub price_range: Option<PriceRange>,
    pub rating_threshold: Option<f64>,
    pub sort_key: Option<SortKey>,
}

impl PageSelection {
    // Reads `category`, `minPrice`, `maxPrice`, `rating` and `sort` from query pairs.
    // Unparseable values are dropped.
    pub fn from_query<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut selection = PageSelection::default();
        let mut min_price = None;
        let mut max_price = None;

        for (key, value) in pairs {
            match key {
                "category" => {
                    if let Ok(category) = value.parse() {
                        selection.category = category;
                    }
                }
                "minPrice" => min_price = value.trim().parse::<f64>().ok(),
                "maxPrice" => max_price = value.trim().parse::<f64>().ok(),
                "rating" => selection.rating_threshold = value.trim().parse::<f64>().ok(),
                "sort" => selection.sort_key = value.parse().ok(),
                _ => {}
            }
        }

        if min_price.is_some() || max_price.is_some() {
            selection.price_range = Some(PriceRange {
                min: min_price.unwrap_or(0.0),
                max: max_price,
            });
        }
        selection
    }
}

impl CatalogPage {
    // A fixed page category always wins over the visitor's category pick
    pub fn configuration(&self, selection: &PageSelection) -> FilterConfiguration {
        FilterConfiguration {
            price_range: selection.price_range,
            rating_threshold: selection.rating_threshold,
            category_filter: self
                .category
                .map_or(selection.category, CategoryFilter::Only),
            sort_key: selection.sort_key.unwrap_or(self.default_sort),
        }
    }

    pub fn view(&self, items: &[CatalogItem], selection: &PageSelection) -> Vec<CatalogItem> {
        filter::apply(items, &self.configuration(selection))
    }
}
