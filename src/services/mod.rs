pub mod analytics;
pub mod clock_in;
