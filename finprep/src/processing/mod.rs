//! Table transformations applied by the pipeline stages.

pub mod anonymizer;
pub mod cleaner;
pub mod relevance;
pub mod scaling;

pub use anonymizer::{AnonymizationReport, AnonymizationStrategy, Anonymizer};
pub use cleaner::{
    CategoricalImputation, CleanerSettings, CleaningReport, DataCleaner, MissingValueStrategy,
    NumericImputation,
};
pub use relevance::{AnonymizationCheck, RelevanceFilter, RelevanceReport};
pub use scaling::{NormalizationMethod, Normalizer, Standardizer, TransformationReport};
