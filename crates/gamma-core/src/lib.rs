//! Gamma Core — display gamma adjustment layer.
//!
//! This crate holds the resource model, ramp I/O contract and capability
//! negotiation shared by every adjustment method. Display protocol code lives
//! in backends behind [`AdjustmentBackend`]; the in-process [`DummyBackend`]
//! ships here, native methods come from `gamma-native`.
//!
//! ```text
//! Registry ──► AdjustmentBackend (per method)
//!                 │
//!   Site ─► Partition ─► Crtc ─► information / get_gamma / set_gamma / restore
//! ```

pub mod backend;
pub mod capabilities;
pub mod dummy;
pub mod edid;
pub mod error;
pub mod handle;
pub mod hierarchy;
pub mod info;
pub mod method;
pub mod ramp;
pub mod registry;

// Re-exports for convenience.
pub use backend::{AdjustmentBackend, Opened};
pub use capabilities::{Capabilities, CrtcFields};
pub use dummy::{DummyBackend, DummyConfig};
pub use error::{ErrorKind, GammaError, name_of, value_of};
pub use handle::{CrtcId, HandleArena, PartitionId, SiteId};
pub use hierarchy::{Crtc, Partition, Site};
pub use info::{ConnectorType, CrtcInformation, SubpixelOrder, behex, unhex};
pub use method::{AdjustmentMethod, MethodSelector};
pub use ramp::{GammaRampSet, RampBuffer, RampChannelMut, RampEncoding, Stop};
pub use registry::Registry;
