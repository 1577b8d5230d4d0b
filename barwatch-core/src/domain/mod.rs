//! Domain types for barwatch

pub mod bar;
pub mod series;

pub use bar::{Bar, Field};
pub use series::Series;
