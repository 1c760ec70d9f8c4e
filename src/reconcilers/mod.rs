//! Reconcilers for the GKE Cluster Operator
//!
//! Reconcilers hold the business logic that compares a resource with the
//! cloud state, acts on the difference and updates the resource status.

pub mod gke_cluster;

pub use gke_cluster::Reconciler;
