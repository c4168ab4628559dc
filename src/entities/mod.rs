pub mod location;
pub mod shift;
pub mod user;
