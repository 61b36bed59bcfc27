pub mod analyzers;
pub mod charts;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod output;
pub mod report;
pub mod session;
