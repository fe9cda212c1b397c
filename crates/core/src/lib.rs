#![forbid(unsafe_code)]

pub mod achievements;
pub mod difficulty;
pub mod domains;
pub mod grading;
pub mod model;
pub mod scoring;
pub mod time;

pub use time::Clock;
