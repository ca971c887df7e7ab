pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod htft;
pub mod model;
pub mod rates;
pub mod scoreline;
pub mod state;
pub mod value;
