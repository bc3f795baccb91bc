pub mod context;
pub mod derive;
pub mod etl;
pub mod pacing;
pub mod paginate;
pub mod timestamp;

pub use crate::domain::model::{Artifact, Dataset, OutputFormat, Table, Value};
pub use crate::domain::ports::{Pacer, Pipeline, Storage};
pub use crate::utils::error::Result;
