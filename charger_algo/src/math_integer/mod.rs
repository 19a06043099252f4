pub mod units;
pub mod saturating;
