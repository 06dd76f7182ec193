pub mod config;
pub mod duality;
pub mod error;
pub mod form;
pub mod load;
pub mod name_resolver;
pub mod numeric;
pub mod odds;
pub mod pipeline;
pub mod roster;
pub mod season;
pub mod snapshot;
pub mod tables;
pub mod valuation;
