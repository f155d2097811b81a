pub mod advisor;
pub mod analytics;
pub mod error;
pub mod features;
pub mod filter;
pub mod integrate;
pub mod loader;
pub mod models;
pub mod query;
pub mod reduce;
pub mod schema;

pub use advisor::{Advisor, Capabilities, RecommendationSource, Recommendations};
pub use analytics::{Analysis, AnalysisResult, CauseAnalysis};
pub use error::{AdvisorError, AnalysisError, DatasetError};
pub use filter::FilterSpec;
pub use integrate::{Dataset, IntegratedRecord, View};
pub use loader::{load_dir, read_table, Source, SourceSet, Table};
pub use query::{Analyzer, QueryResponse};
