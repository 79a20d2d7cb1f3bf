pub mod etl;
pub mod join;
pub mod pipeline;
pub mod registry;

pub use crate::domain::model::{Table, TableSet, TransformPlan, Value};
pub use crate::domain::ports::{Destination, Source};
pub use crate::utils::error::Result;
