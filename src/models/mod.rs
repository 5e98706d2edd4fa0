//! Data models and structures for the exporter

pub mod config;
pub mod measurement;

pub use config::{Backend, Config};
pub use measurement::{
    ParsedFields, PartialResult, Reading, ServerSelector, ServerTarget, SubTest, UserInfo,
};
