//! Prometheus metrics for the GKE Cluster Operator
//!
//! Reconciliation counters, cluster creation outcomes and the HTTP server
//! exposing them alongside health probes.

mod prometheus;

pub use prometheus::*;
