// Career risk pipeline: efficiency estimation, missing-data normalization,
// longitudinal feature engineering and weighted risk scoring.

pub mod efficiency;
pub mod error;
pub mod features;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod provider;
pub mod risk;
pub mod stats;
pub mod summary;

pub use error::PipelineError;
pub use model::{Biography, CareerTable, Column, SeasonRecord};
pub use pipeline::{Pipeline, PipelineOptions, PlayerReport};
pub use risk::{RiskAssessment, RiskComponents};
