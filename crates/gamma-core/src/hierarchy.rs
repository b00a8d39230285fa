//! Site → partition → CRTC resource handles.
//!
//! A [`Site`] is a display server instance or the system itself; it owns a
//! number of [`Partition`]s (screens or graphics cards), each owning a number
//! of [`Crtc`]s. Children borrow their parent, so a parent cannot be closed
//! while any child is open. Every handle closes itself exactly once on drop.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::AdjustmentBackend;
use crate::capabilities::{Capabilities, CrtcFields};
use crate::error::{ErrorKind, GammaError};
use crate::handle::{CrtcId, PartitionId, SiteId};
use crate::info::CrtcInformation;
use crate::method::AdjustmentMethod;
use crate::ramp::{GammaRampSet, RampEncoding};

/// An open site.
pub struct Site {
    backend: Arc<dyn AdjustmentBackend>,
    id: SiteId,
    name: Option<String>,
    partitions_available: usize,
}

impl Site {
    /// Open `site` on `backend`. `None` selects the method's default site.
    pub fn open(backend: Arc<dyn AdjustmentBackend>, site: Option<&str>) -> Result<Self, GammaError> {
        let method = backend.method();
        let opened = backend.open_site(site).inspect_err(|err| {
            warn!("Failed to open {method} site {site:?}: {err}");
        })?;
        debug!(
            "Opened {method} site {site:?} with {} partition(s)",
            opened.children
        );
        Ok(Self {
            backend,
            id: opened.handle,
            name: site.map(str::to_string),
            partitions_available: opened.children,
        })
    }

    pub fn method(&self) -> AdjustmentMethod {
        self.backend.method()
    }

    /// Site name as given when opening, `None` for the default site.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn partitions_available(&self) -> usize {
        self.partitions_available
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    pub fn backend(&self) -> &Arc<dyn AdjustmentBackend> {
        &self.backend
    }

    pub fn id(&self) -> SiteId {
        self.id
    }

    /// Open the partition at `index`.
    pub fn partition(&self, index: usize) -> Result<Partition<'_>, GammaError> {
        if index >= self.partitions_available {
            return Err(ErrorKind::NoSuchPartition.into());
        }
        let opened = self.backend.open_partition(self.id, index)?;
        debug!(
            "Opened partition {index} of {} site with {} CRTC(s)",
            self.method(),
            opened.children
        );
        Ok(Partition {
            site: self,
            id: opened.handle,
            index,
            crtcs_available: opened.children,
        })
    }

    /// Restore every CRTC in the site to system settings.
    pub fn restore(&self) -> Result<(), GammaError> {
        ensure_supported(self.method(), self.capabilities().site_restore, "site restore")?;
        debug!("Restoring {} site {:?}", self.method(), self.name);
        self.backend.restore_site(self.id)
    }
}

impl Drop for Site {
    fn drop(&mut self) {
        debug!("Closing {} site {:?}", self.method(), self.name);
        self.backend.close_site(self.id);
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("method", &self.method())
            .field("id", &self.id)
            .field("name", &self.name)
            .field("partitions_available", &self.partitions_available)
            .finish()
    }
}

/// An open partition: a screen or a graphics card.
pub struct Partition<'site> {
    site: &'site Site,
    id: PartitionId,
    index: usize,
    crtcs_available: usize,
}

impl<'site> Partition<'site> {
    pub fn site(&self) -> &'site Site {
        self.site
    }

    /// Index within the site.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn crtcs_available(&self) -> usize {
        self.crtcs_available
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    /// Open the CRTC at `index`.
    pub fn crtc(&self, index: usize) -> Result<Crtc<'_>, GammaError> {
        if index >= self.crtcs_available {
            return Err(ErrorKind::NoSuchCrtc.into());
        }
        let id = self.site.backend.open_crtc(self.id, index)?;
        debug!("Opened CRTC {index} of partition {}", self.index);
        Ok(Crtc {
            partition: self,
            id,
            index,
        })
    }

    /// Restore every CRTC in the partition to system settings.
    pub fn restore(&self) -> Result<(), GammaError> {
        let site = self.site;
        ensure_supported(
            site.method(),
            site.capabilities().partition_restore,
            "partition restore",
        )?;
        debug!("Restoring partition {}", self.index);
        site.backend.restore_partition(self.id)
    }
}

impl Drop for Partition<'_> {
    fn drop(&mut self) {
        debug!("Closing partition {}", self.index);
        self.site.backend.close_partition(self.id);
    }
}

impl fmt::Debug for Partition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("crtcs_available", &self.crtcs_available)
            .finish()
    }
}

/// An open CRTC: one video output whose gamma ramps can be read and written.
pub struct Crtc<'partition> {
    partition: &'partition Partition<'partition>,
    id: CrtcId,
    index: usize,
}

impl<'partition> Crtc<'partition> {
    pub fn partition(&self) -> &'partition Partition<'partition> {
        self.partition
    }

    /// Index within the partition.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> CrtcId {
        self.id
    }

    fn backend(&self) -> &dyn AdjustmentBackend {
        self.partition.site.backend.as_ref()
    }

    fn method(&self) -> AdjustmentMethod {
        self.backend().method()
    }

    /// Restore the CRTC's ramps to system settings.
    pub fn restore(&self) -> Result<(), GammaError> {
        ensure_supported(
            self.method(),
            self.backend().capabilities().crtc_restore,
            "CRTC restore",
        )?;
        debug!("Restoring CRTC {}", self.index);
        self.backend().restore_crtc(self.id)
    }

    /// Query the fields in `fields`. Fields outside the mask come back at
    /// their defaults without errors, whatever the backend filled in.
    pub fn information(&self, fields: CrtcFields) -> Result<CrtcInformation, GammaError> {
        let mut info = self.backend().crtc_information(self.id, fields)?;
        info.retain(fields);
        if info.has_error() {
            debug!(
                "CRTC {} information query failed for {}",
                self.index,
                info.failed_fields()
            );
        }
        Ok(info)
    }

    /// Read the current ramps into `ramps`, whose sizes must match the CRTC.
    pub fn get_gamma(&self, ramps: &mut GammaRampSet) -> Result<(), GammaError> {
        ramps.validate()?;
        self.backend().get_gamma(self.id, ramps)
    }

    /// Apply `ramps` to the CRTC.
    pub fn set_gamma(&self, ramps: &GammaRampSet) -> Result<(), GammaError> {
        ramps.validate()?;
        if self.backend().capabilities().identical_gamma_sizes && !ramps.has_identical_sizes() {
            warn!(
                "Rejecting ramps with mixed sizes {:?} for {}",
                ramps.sizes(),
                self.method()
            );
            return Err(ErrorKind::MixedGammaRampSize.into());
        }
        self.backend().set_gamma(self.id, ramps)
    }

    /// Allocate ramps of the CRTC's size in `encoding` and read the current
    /// curves into them.
    pub fn read_ramps(&self, encoding: RampEncoding) -> Result<GammaRampSet, GammaError> {
        let info = self.information(CrtcFields::GAMMA_SIZE)?;
        if let Some(err) = info.gamma_size_error {
            return Err(err);
        }
        let mut ramps = GammaRampSet::new(
            info.red_gamma_size,
            info.green_gamma_size,
            info.blue_gamma_size,
            encoding,
        );
        self.get_gamma(&mut ramps)?;
        Ok(ramps)
    }
}

impl Drop for Crtc<'_> {
    fn drop(&mut self) {
        debug!("Closing CRTC {}", self.index);
        self.backend().close_crtc(self.id);
    }
}

impl fmt::Debug for Crtc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crtc")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish()
    }
}

fn ensure_supported(
    method: AdjustmentMethod,
    supported: bool,
    operation: &'static str,
) -> Result<(), GammaError> {
    if supported {
        Ok(())
    } else {
        warn!("{operation} is not supported by {method}");
        Err(GammaError::Unsupported { method, operation })
    }
}
