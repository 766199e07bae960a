pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{EnsembleError, Result};
pub use services::{
    EnsembleBuilder, EnsembleService, Loader, PopularityTable, ResultBlender, SimilarityEngine,
};
