pub mod account;
pub mod manager;
pub mod shifts;
