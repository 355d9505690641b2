pub mod dates;
pub mod persistence;
pub mod validation;
