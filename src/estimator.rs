use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::IssueCategory;

/// External image-severity collaborator. Returns a 1-10 score, or
/// `None` when no estimate is available for the image.
#[async_trait]
pub trait ImageSeverityEstimator: Send + Sync {
    async fn estimate(
        &self,
        image_ref: &str,
        category: IssueCategory,
    ) -> Result<Option<f64>, EngineError>;
}

/// Stand-in estimator that returns a fixed per-category baseline.
/// Keeps the recompute path exercisable without a vision backend.
pub struct CategoryBaselineEstimator;

#[async_trait]
impl ImageSeverityEstimator for CategoryBaselineEstimator {
    async fn estimate(
        &self,
        _image_ref: &str,
        category: IssueCategory,
    ) -> Result<Option<f64>, EngineError> {
        let baseline = match category {
            IssueCategory::Electricity => 8.0,
            IssueCategory::Road => 7.0,
            IssueCategory::Water => 6.0,
            IssueCategory::Transport => 5.0,
            IssueCategory::Sanitation => 4.0,
            IssueCategory::Others => 5.0,
        };
        Ok(Some(baseline))
    }
}
