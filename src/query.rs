//! Query orchestration: filter, analyse, recommend

use crate::advisor::{Advisor, Recommendations};
use crate::analytics::{self, Analysis, AnalysisResult};
use crate::error::DatasetError;
use crate::filter::FilterSpec;
use crate::integrate::Dataset;
use crate::loader::SourceSet;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub analysis_type: String,
    pub filters_applied: FilterSpec,
    pub matched_records: usize,
    pub results: AnalysisResult,
    pub recommendations: Recommendations,
    pub generated_at: DateTime<Utc>,
}

/// Holds one built dataset and answers any number of queries against it
pub struct Analyzer {
    dataset: Dataset,
    advisor: Advisor,
}

impl Analyzer {
    pub fn new(dataset: Dataset, advisor: Advisor) -> Self {
        Self { dataset, advisor }
    }

    pub fn from_sources(sources: &SourceSet, advisor: Advisor) -> Result<Self, DatasetError> {
        Ok(Self::new(Dataset::build(sources)?, advisor))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn query(&self, filters: &FilterSpec, analysis: &Analysis) -> QueryResponse {
        let view = self.dataset.filter(filters);
        info!(
            "Running {} over {} of {} records",
            analysis.name(),
            view.len(),
            self.dataset.len()
        );

        let results = analytics::run(&view, analysis);
        let recommendations = self.advisor.recommend(&results);

        QueryResponse {
            analysis_type: analysis.name().to_string(),
            filters_applied: filters.clone(),
            matched_records: view.len(),
            results,
            recommendations,
            generated_at: Utc::now(),
        }
    }
}
