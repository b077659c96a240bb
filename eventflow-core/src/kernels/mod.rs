//! Acceleration kernels (`spec.md` §4.7, C8): `bucket_sum`,
//! `fuse_coincidence`, and the optional columnar DVS flow. These share
//! precise semantics with the plain per-event operators in [`crate::ops`]
//! but operate on struct-of-arrays input for the performance-critical path.

pub mod bucket_sum;
pub mod dvs_flow;
pub mod fuse_coincidence;

pub use bucket_sum::bucket_sum;
pub use dvs_flow::{dvs_flow, DvsEvent};
pub use fuse_coincidence::fuse_coincidence;
