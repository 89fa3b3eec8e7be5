pub mod document;
pub mod fetcher;

pub use document::{scrape_document, split_into_paragraphs};
pub use fetcher::{PageFetcher, Scraper};

pub mod prelude {
    pub use super::fetcher::Scraper;
    pub use na_core::{Error, Result, ScrapedPage};
}
