//! Typed errors for each fallible subsystem.
//!
//! None of these ever abort the overall run; every call site that produces
//! one is responsible for logging it and falling back to an empty/default
//! result, per the error taxonomy in SPEC_FULL.md §7.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} exceeds the 1 GB trace-body cap")]
    TooBig { path: PathBuf },
    #[error("malformed XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "unsupported configuration file extension {extension:?} (expected .yaml, .yml, or .json)"
    )]
    UnsupportedExtension { extension: String },
    #[error("could not parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("could not read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not deserialize cache file {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("could not write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
