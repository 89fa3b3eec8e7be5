pub mod config;
pub mod error;
pub mod service;
pub mod session;
pub mod storage;
pub mod types;

pub use config::{ApiConfig, Endpoints};
pub use error::{Error, Result};
pub use service::AnalysisService;
pub use session::Session;
pub use storage::Storage;
pub use types::{
    AlternativeView, Analysis, AnalyzeRequest, AnalyzeResponse, ApiError, Criterion, DiffItem,
    NewsAnalysis, NewsQuery, Paragraph, ScrapedPage, Sentiment, SentimentPoint, Theme,
};
