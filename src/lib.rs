pub mod config;
pub mod extract;
pub mod output;
pub mod record;
pub mod yelp;

pub use config::Config;
pub use extract::{extract_file, ExtractSpec, ExtractStats};
pub use record::Record;
