//! EIR data model, graph, DCD, package manifest, and Event Tensor I/O
//! (`spec.md` §3, C2/C4).

pub mod dcd;
pub mod event_tensor;
pub mod graph;
pub mod package;
pub mod types;

pub use dcd::DeviceCapabilityDescriptor;
pub use event_tensor::{Header as EventTensorHeader, Record as EventRecord};
pub use graph::EirGraph;
pub use package::PackageManifest;
pub use types::Eir;
