//! GKE Cluster Operator
//!
//! This operator reconciles `GkeCluster` custom resources against clusters
//! hosted on Google Kubernetes Engine: it creates missing clusters, waits
//! for them to reach a running state and records the observed phase.

pub mod adapters;
pub mod cloud;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;

pub use error::{Error, Result};
