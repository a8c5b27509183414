pub mod errors;
pub mod line;
pub mod model;

pub use errors::RecordError;
pub use line::{parse_line, HEADER_PREFIX, MIN_FIELDS};
pub use model::{Coordinates, Earthquake};
