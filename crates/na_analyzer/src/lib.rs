pub mod pipeline;
pub mod view_model;

pub use pipeline::{AnalysisPipeline, SyncReport};
pub use view_model::{AnalysisViewModel, FetchOutcome, ViewModelConfig};

pub mod prelude {
    pub use super::{AnalysisPipeline, AnalysisViewModel, FetchOutcome, ViewModelConfig};
    pub use na_core::{Analysis, AnalysisService, Result, Error};
}

#[cfg(test)]
pub(crate) mod test_support;
