mod luhn;
pub mod op;
mod points;

pub use luhn::luhn_valid;
pub use points::{Points, PointsConversionError};
