//! Kubernetes-side adapters
//!
//! Implementations of the resource store and notification sink the
//! reconciler talks to, backed by the Kubernetes API.

pub mod events;
pub mod store;

pub use events::{ClusterEvent, EventKind, EventSink, KubeEventSink};
pub use store::{ClusterStore, KubeClusterStore, ResourceId};
