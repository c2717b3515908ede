//! Domain module - products, the seen-set and the service seams
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod errors;
pub mod product;
pub mod seen_set;
pub mod services;

pub use errors::{FetchError, NotifyError, PersistError};
pub use product::{Product, PRICE_PLACEHOLDER};
pub use seen_set::{compute_delta, SeenEntry, SeenSet};
pub use services::{FetchedPage, Notifier, PageFetcher, SeenStore};
