//! Phloem Core Library
//!
//! This crate provides the benchmark execution engine for phloem, a
//! synthetic-load generator for graph-shaped backends reachable through a
//! request/response API: key-space management, weighted operation
//! selection, the retrying insert driver, and the deadline-bound request
//! executor.

pub mod backend;
pub mod chooser;
pub mod config;
pub mod error;
pub mod executor;
pub mod keyspace;
pub mod outcome;
pub mod seed;
pub mod threading;
pub mod transport;
pub mod workload;

pub use backend::Backend;
pub use chooser::{Operation, OperationChooser, OperationClass};
pub use error::{Error, Result};
pub use executor::DeadlineExecutor;
pub use keyspace::KeySpace;
pub use outcome::RequestOutcome;
pub use threading::{Runtime, Shutdown};
pub use transport::{HttpResponse, HttpTransport, Transport};
pub use workload::SocialWorkload;
