pub mod analyzers;
pub mod config;
pub mod departures;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod recorder;
pub mod stats;
pub mod time;
