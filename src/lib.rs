// Catalog filtering and booking request pipeline for the tour marketing site

pub mod api;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod catalog_service;
pub mod config;
pub mod filter;
pub mod forms;
pub mod notify;
pub mod pages;
pub mod pipeline;

// Re-export key types for convenience
pub use api::{ApiClient, ApiError, HttpApiClient, ServerRecord};
pub use auth::{is_authorized, Authorizer, Role, RoleAuthorizer, User};
pub use cache::{CacheStatsReport, InMemoryQueryCache, QueryCache};
pub use catalog::{CatalogItem, Category, ResourceKind};
pub use catalog_service::{CatalogError, CatalogService};
pub use config::{CacheConfig, ClientConfig};
pub use filter::{apply, CategoryFilter, FilterConfiguration, PriceRange, SortKey};
pub use forms::{
    BookingRequest, BookingTarget, CustomTourRequest, FieldErrors, GuideRegistration,
    InquiryRequest, SubmissionForm,
};
pub use notify::{Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier};
pub use pages::{CatalogPage, PageSelection, CATALOG_PAGES};
pub use pipeline::{FormStatus, RequestPipeline, SubmitOutcome};
