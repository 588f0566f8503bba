// src/extractors/mod.rs
pub mod detail;
pub mod fields;
pub mod listing;

// Re-export the entry points used by the CLI
pub use detail::crawl_detail;
pub use listing::{build_listing_result, crawl_listing, parse_listing};
