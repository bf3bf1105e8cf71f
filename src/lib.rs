#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
pub mod builder;
pub mod cli;
pub mod config;
pub mod database;
pub mod download;
pub mod error;
pub mod import;
pub mod kdtree;
pub mod normalize;
pub mod parser;
pub mod record;
pub mod search;
pub mod store;
pub mod utils;

pub use builder::{Builder, Tables};
pub use cli::Cli;
pub use config::Config;
pub use database::{Database, Nearest};
pub use error::{GeocoderError, GeocoderResult};
pub use import::{FileKind, RawRecord};
pub use parser::Parser;
pub use record::{Commune, Department, KdNode, Localisation, Postal, Voie};
pub use search::{Position, Quality};
pub use store::Table;
pub use utils::trace_init;
