//! Request parsing, schema alignment, and feature preparation for astrobit.

mod coerce;
mod error;
mod mapping;
mod matrix;
mod reader;
mod record;
mod scaler;
mod schema;

pub use coerce::{coerce_and_impute, to_number, ImputationReport, DEFAULT_FILL};
pub use error::IoError;
pub use mapping::{resolve, ColumnMapping, MappedTable};
pub use matrix::{ProcessedMatrix, ScaledMatrix};
pub use reader::RecordReader;
pub use record::{CellValue, RawRecord, RawTable};
pub use scaler::StandardScaler;
pub use schema::{FeatureSchema, EXOPLANET_FEATURES};
