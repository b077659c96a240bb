//! The fixed operator set (`spec.md` §4.3, C5): LIF neuron, exponential
//! synapse, delay line, coincidence fuse, STFT, mel filterbank, XY→channel,
//! and spatial shift. Each is a pull-based `EventIter` over one or two
//! bound upstream iterators, per `spec.md` §9 REDESIGN FLAGS.

pub mod delay;
pub mod exp_syn;
pub mod fuse;
pub mod lif;
pub mod mel;
pub mod stft;
pub mod shift_xy;
pub mod xy_to_ch;

pub use delay::DelayOp;
pub use exp_syn::ExpSynOp;
pub use fuse::FuseOp;
pub use lif::LifOp;
pub use mel::MelOp;
pub use shift_xy::ShiftXyOp;
pub use stft::StftOp;
pub use xy_to_ch::XyToChOp;
