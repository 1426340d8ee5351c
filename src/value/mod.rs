// Value model shared by params and schemas
mod coerce;
mod pattern;
mod text;
mod types;

pub use coerce::{cast, parse_date, parse_number};
pub use pattern::Pattern;
pub use text::{deburr, normalize, words};
pub use types::{CustomCast, Value, ValueType, number_to_bson};
