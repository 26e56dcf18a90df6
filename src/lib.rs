pub mod config;
pub mod context;
pub mod export;
pub mod formation;
pub mod lineup;
pub mod lineup_pdf;
pub mod model;
pub mod notify;
pub mod permissions;
pub mod seed;
pub mod store;
pub mod summary;
pub mod theme;
pub mod tracking;
