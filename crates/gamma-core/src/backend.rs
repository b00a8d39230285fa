//! Backend contract for adjustment methods.
//!
//! Each adjustment method is served by a *backend*: an implementation of
//! [`AdjustmentBackend`] that speaks one display protocol. The core owns the
//! resource model, argument checks and capability enforcement; backends own
//! protocol I/O and the state behind each handle.
//!
//! Backends are driven through the [`hierarchy`](crate::hierarchy) types,
//! which guarantee the following before a backend method runs:
//!
//! - Handles passed in were issued by this backend and are still open.
//! - A parent handle outlives every child opened from it.
//! - Each handle is closed exactly once.
//! - Ramp sets passed to [`AdjustmentBackend::set_gamma`] have one encoding
//!   across their channels.
//!
//! Backends must serialise access to their own state; callers may use one
//! backend from several threads.

use crate::capabilities::{Capabilities, CrtcFields};
use crate::error::GammaError;
use crate::handle::{CrtcId, PartitionId, SiteId};
use crate::info::CrtcInformation;
use crate::method::AdjustmentMethod;
use crate::ramp::GammaRampSet;

/// A freshly opened handle together with the number of children it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opened<H> {
    pub handle: H,
    /// Partitions in a site, or CRTCs in a partition.
    pub children: usize,
}

/// Protocol-specific half of an adjustment method.
pub trait AdjustmentBackend: Send + Sync {
    /// The method this backend implements.
    fn method(&self) -> AdjustmentMethod;

    /// Whether the method can be used in this process. Must not fail.
    fn is_available(&self) -> bool;

    fn capabilities(&self) -> Capabilities;

    /// Default site name derived from the environment, `None` when the
    /// method has no notion of a default or it is unset.
    fn default_site(&self) -> Option<String>;

    /// Environment variable holding the default site, if the method uses one.
    fn default_site_variable(&self) -> Option<&'static str>;

    /// Open a site. `None` selects the default site.
    fn open_site(&self, site: Option<&str>) -> Result<Opened<SiteId>, GammaError>;

    fn close_site(&self, site: SiteId);

    /// Restore every CRTC in the site to system settings.
    fn restore_site(&self, site: SiteId) -> Result<(), GammaError>;

    /// Open the partition at `index` within `site`.
    fn open_partition(&self, site: SiteId, index: usize) -> Result<Opened<PartitionId>, GammaError>;

    fn close_partition(&self, partition: PartitionId);

    fn restore_partition(&self, partition: PartitionId) -> Result<(), GammaError>;

    /// Open the CRTC at `index` within `partition`.
    fn open_crtc(&self, partition: PartitionId, index: usize) -> Result<CrtcId, GammaError>;

    fn close_crtc(&self, crtc: CrtcId);

    fn restore_crtc(&self, crtc: CrtcId) -> Result<(), GammaError>;

    /// Read the requested fields. Per-field failures are recorded in the
    /// record; `Err` is reserved for failures of the query as a whole.
    fn crtc_information(&self, crtc: CrtcId, fields: CrtcFields) -> Result<CrtcInformation, GammaError>;

    /// Fill `ramps` with the current curves, converting from the native
    /// depth to the set's encoding. Sizes must match the CRTC.
    fn get_gamma(&self, crtc: CrtcId, ramps: &mut GammaRampSet) -> Result<(), GammaError>;

    /// Apply `ramps`, converting to the native depth as needed.
    fn set_gamma(&self, crtc: CrtcId, ramps: &GammaRampSet) -> Result<(), GammaError>;
}
