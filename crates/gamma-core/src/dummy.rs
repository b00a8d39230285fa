//! In-process dummy adjustment method.
//!
//! The dummy backend simulates a configurable set of sites, partitions and
//! CRTCs entirely in memory. Ramps written to a CRTC persist until restored,
//! even across closing and reopening the handle, the way they would on real
//! hardware. Capabilities can be overridden to exercise error paths.

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{AdjustmentBackend, Opened};
use crate::capabilities::{Capabilities, CrtcFields};
use crate::edid;
use crate::error::{ErrorKind, GammaError};
use crate::handle::{CrtcId, HandleArena, PartitionId, SiteId};
use crate::info::{self, ConnectorType, CrtcInformation, SubpixelOrder};
use crate::method::AdjustmentMethod;
use crate::ramp::{GammaRampSet, RampEncoding};

/// Errors loading a [`DummyConfig`].
#[derive(Debug, thiserror::Error)]
pub enum DummyConfigError {
    #[error("failed to read dummy configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dummy configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dummy configuration: {0}")]
    Invalid(GammaError),
}

/// Layout and behaviour of the simulated display system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyConfig {
    /// Method id the backend registers under.
    pub method: AdjustmentMethod,
    pub capabilities: Capabilities,
    /// Sites; opening the default site selects the first.
    pub sites: Vec<DummySite>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            method: AdjustmentMethod::Dummy,
            capabilities: Capabilities {
                crtc_information: CrtcFields::ALL,
                default_site_known: true,
                multiple_sites: true,
                multiple_partitions: true,
                multiple_crtcs: true,
                partitions_are_graphics_cards: false,
                site_restore: true,
                partition_restore: true,
                crtc_restore: true,
                identical_gamma_sizes: false,
                fixed_gamma_size: false,
                fixed_gamma_depth: false,
                real: false,
                fake: false,
            },
            sites: vec![DummySite::default()],
        }
    }
}

impl DummyConfig {
    pub fn from_json_str(text: &str) -> Result<Self, DummyConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate().map_err(DummyConfigError::Invalid)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DummyConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject depths and EDIDs the backend could not serve.
    pub fn validate(&self) -> Result<(), GammaError> {
        for crtc in self.crtcs() {
            RampEncoding::from_depth(crtc.gamma_depth)?;
            if let Some(text) = &crtc.edid {
                info::unhex(text)?;
            }
        }
        Ok(())
    }

    fn crtcs(&self) -> impl Iterator<Item = &DummyCrtc> {
        self.sites
            .iter()
            .flat_map(|site| &site.partitions)
            .flat_map(|partition| &partition.crtcs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DummySite {
    /// Name the site is opened by. Unnamed sites can only be reached as the
    /// default site.
    pub name: Option<String>,
    pub partitions: Vec<DummyPartition>,
}

impl Default for DummySite {
    fn default() -> Self {
        Self {
            name: None,
            partitions: vec![DummyPartition::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyPartition {
    pub crtcs: Vec<DummyCrtc>,
}

impl Default for DummyPartition {
    fn default() -> Self {
        Self {
            crtcs: vec![DummyCrtc::default()],
        }
    }
}

/// One simulated CRTC and its monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyCrtc {
    pub red_gamma_size: usize,
    pub green_gamma_size: usize,
    pub blue_gamma_size: usize,
    /// Native depth code; ramps are stored in this encoding.
    pub gamma_depth: i16,
    pub gamma_support: bool,
    pub active: bool,
    pub width_mm: usize,
    pub height_mm: usize,
    pub subpixel_order: SubpixelOrder,
    pub connector_name: Option<String>,
    pub connector_type: ConnectorType,
    /// Monitor EDID as hexadecimal text.
    pub edid: Option<String>,
}

impl Default for DummyCrtc {
    fn default() -> Self {
        Self {
            red_gamma_size: 256,
            green_gamma_size: 256,
            blue_gamma_size: 256,
            gamma_depth: 16,
            gamma_support: true,
            active: true,
            width_mm: 0,
            height_mm: 0,
            subpixel_order: SubpixelOrder::Unknown,
            connector_name: None,
            connector_type: ConnectorType::Unknown,
            edid: None,
        }
    }
}

/// Simulated CRTC: its template and ramps.
struct Device {
    template: DummyCrtc,
    edid: Option<Vec<u8>>,
    initial: GammaRampSet,
    current: GammaRampSet,
}

impl Device {
    /// Build a device from its template. An invalid depth falls back to
    /// 16 bits and an invalid EDID is dropped, both with a warning; use
    /// [`DummyConfig::validate`] to reject them up front.
    fn new(template: &DummyCrtc) -> Self {
        let encoding = RampEncoding::from_depth(template.gamma_depth).unwrap_or_else(|err| {
            warn!("Dummy CRTC depth {}: {err}", template.gamma_depth);
            RampEncoding::U16
        });
        let mut initial = GammaRampSet::new(
            template.red_gamma_size,
            template.green_gamma_size,
            template.blue_gamma_size,
            encoding,
        );
        initial.fill_identity();
        let edid = template.edid.as_deref().and_then(|text| {
            info::unhex(text)
                .inspect_err(|err| warn!("Dummy CRTC EDID dropped: {err}"))
                .ok()
        });
        Self {
            template: template.clone(),
            edid,
            current: initial.clone(),
            initial,
        }
    }

    fn restore(&mut self) {
        self.current = self.initial.clone();
    }

    fn check_sizes(&self, ramps: &GammaRampSet) -> Result<(), GammaError> {
        if ramps.sizes() != self.current.sizes() {
            return Err(ErrorKind::WrongGammaRampSize.into());
        }
        Ok(())
    }
}

struct DummyState {
    /// Devices indexed by site, partition, CRTC.
    devices: Vec<Vec<Vec<Device>>>,
    sites: HandleArena<SiteId, usize>,
    partitions: HandleArena<PartitionId, (usize, usize)>,
    crtcs: HandleArena<CrtcId, (usize, usize, usize)>,
}

/// In-memory backend driven by a [`DummyConfig`].
pub struct DummyBackend {
    config: DummyConfig,
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Build the simulated system.
    pub fn new(config: DummyConfig) -> Self {
        let devices = config
            .sites
            .iter()
            .map(|site| {
                site.partitions
                    .iter()
                    .map(|partition| partition.crtcs.iter().map(Device::new).collect())
                    .collect()
            })
            .collect();
        Self {
            state: Mutex::new(DummyState {
                devices,
                sites: HandleArena::new(),
                partitions: HandleArena::new(),
                crtcs: HandleArena::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Number of handles of any level currently open.
    pub fn open_handles(&self) -> usize {
        let state = self.state.lock();
        state.sites.len() + state.partitions.len() + state.crtcs.len()
    }

    fn with_device<R>(
        &self,
        crtc: CrtcId,
        f: impl FnOnce(&mut Device) -> Result<R, GammaError>,
    ) -> Result<R, GammaError> {
        let mut state = self.state.lock();
        let Some(&(s, p, c)) = state.crtcs.get(crtc) else {
            return Err(unknown_handle(crtc));
        };
        f(&mut state.devices[s][p][c])
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new(DummyConfig::default())
    }
}

fn unknown_handle(handle: impl std::fmt::Debug) -> GammaError {
    debug_assert!(false, "{handle:?} was not issued by this backend");
    GammaError::InvalidArgument("handle was not issued by this backend")
}

impl AdjustmentBackend for DummyBackend {
    fn method(&self) -> AdjustmentMethod {
        self.config.method
    }

    fn is_available(&self) -> bool {
        true
    }

    fn capabilities(&self) -> Capabilities {
        self.config.capabilities
    }

    fn default_site(&self) -> Option<String> {
        None
    }

    fn default_site_variable(&self) -> Option<&'static str> {
        None
    }

    fn open_site(&self, site: Option<&str>) -> Result<Opened<SiteId>, GammaError> {
        let index = match site {
            None if !self.config.sites.is_empty() => 0,
            None => return Err(ErrorKind::NoSuchSite.into()),
            Some(name) => self
                .config
                .sites
                .iter()
                .position(|candidate| candidate.name.as_deref() == Some(name))
                .ok_or(GammaError::Library(ErrorKind::NoSuchSite))?,
        };
        let children = self.config.sites[index].partitions.len();
        let handle = self.state.lock().sites.insert(index);
        debug!("Dummy site {index} opened as {handle:?}");
        Ok(Opened { handle, children })
    }

    fn close_site(&self, site: SiteId) {
        let removed = self.state.lock().sites.remove(site);
        debug_assert!(removed.is_some(), "{site:?} closed twice");
    }

    fn restore_site(&self, site: SiteId) -> Result<(), GammaError> {
        let mut state = self.state.lock();
        let Some(&s) = state.sites.get(site) else {
            return Err(unknown_handle(site));
        };
        state.devices[s].iter_mut().flatten().for_each(Device::restore);
        Ok(())
    }

    fn open_partition(&self, site: SiteId, index: usize) -> Result<Opened<PartitionId>, GammaError> {
        let mut state = self.state.lock();
        let Some(&s) = state.sites.get(site) else {
            return Err(unknown_handle(site));
        };
        let partition = self.config.sites[s]
            .partitions
            .get(index)
            .ok_or(GammaError::Library(ErrorKind::NoSuchPartition))?;
        let handle = state.partitions.insert((s, index));
        Ok(Opened {
            handle,
            children: partition.crtcs.len(),
        })
    }

    fn close_partition(&self, partition: PartitionId) {
        let removed = self.state.lock().partitions.remove(partition);
        debug_assert!(removed.is_some(), "{partition:?} closed twice");
    }

    fn restore_partition(&self, partition: PartitionId) -> Result<(), GammaError> {
        let mut state = self.state.lock();
        let Some(&(s, p)) = state.partitions.get(partition) else {
            return Err(unknown_handle(partition));
        };
        state.devices[s][p].iter_mut().for_each(Device::restore);
        Ok(())
    }

    fn open_crtc(&self, partition: PartitionId, index: usize) -> Result<CrtcId, GammaError> {
        let mut state = self.state.lock();
        let Some(&(s, p)) = state.partitions.get(partition) else {
            return Err(unknown_handle(partition));
        };
        if index >= state.devices[s][p].len() {
            return Err(ErrorKind::NoSuchCrtc.into());
        }
        Ok(state.crtcs.insert((s, p, index)))
    }

    fn close_crtc(&self, crtc: CrtcId) {
        let removed = self.state.lock().crtcs.remove(crtc);
        debug_assert!(removed.is_some(), "{crtc:?} closed twice");
    }

    fn restore_crtc(&self, crtc: CrtcId) -> Result<(), GammaError> {
        self.with_device(crtc, |device| {
            device.restore();
            Ok(())
        })
    }

    fn crtc_information(&self, crtc: CrtcId, fields: CrtcFields) -> Result<CrtcInformation, GammaError> {
        let supported = self.config.capabilities.crtc_information;
        self.with_device(crtc, |device| Ok(describe(device, fields, supported)))
    }

    fn get_gamma(&self, crtc: CrtcId, ramps: &mut GammaRampSet) -> Result<(), GammaError> {
        self.with_device(crtc, |device| {
            if !device.template.gamma_support {
                return Err(ErrorKind::GammaRampReadFailed.into());
            }
            device.check_sizes(ramps)?;
            *ramps = device.current.converted(ramps.encoding());
            Ok(())
        })
    }

    fn set_gamma(&self, crtc: CrtcId, ramps: &GammaRampSet) -> Result<(), GammaError> {
        self.with_device(crtc, |device| {
            if !device.template.gamma_support {
                return Err(ErrorKind::GammaRampWriteFailed.into());
            }
            device.check_sizes(ramps)?;
            device.current = ramps.converted(device.current.encoding());
            Ok(())
        })
    }
}

/// Answer an information query from a device template.
fn describe(device: &Device, fields: CrtcFields, supported: CrtcFields) -> CrtcInformation {
    let template = &device.template;
    let mut info = CrtcInformation::default();

    for field in fields.iter() {
        if !supported.contains(field) {
            info.set_error(field, Some(ErrorKind::CrtcInfoNotSupported.into()));
            continue;
        }
        if !template.active
            && CrtcFields::ACTIVE_FIELDS.contains(field)
            && field != CrtcFields::ACTIVE
        {
            info.set_error(field, Some(ErrorKind::NotConnected.into()));
            continue;
        }
        match field {
            CrtcFields::EDID => match &device.edid {
                Some(edid) => info.edid = edid.clone(),
                None => info.edid_error = Some(ErrorKind::EdidNotFound.into()),
            },
            CrtcFields::WIDTH_MM => info.width_mm = template.width_mm,
            CrtcFields::HEIGHT_MM => info.height_mm = template.height_mm,
            CrtcFields::GAMMA_SIZE => {
                info.red_gamma_size = template.red_gamma_size;
                info.green_gamma_size = template.green_gamma_size;
                info.blue_gamma_size = template.blue_gamma_size;
            }
            CrtcFields::GAMMA_DEPTH => info.gamma_depth = template.gamma_depth,
            CrtcFields::GAMMA_SUPPORT => info.gamma_support = template.gamma_support,
            CrtcFields::SUBPIXEL_ORDER => info.subpixel_order = template.subpixel_order,
            CrtcFields::ACTIVE => info.active = template.active,
            CrtcFields::CONNECTOR_NAME => info.connector_name = template.connector_name.clone(),
            CrtcFields::CONNECTOR_TYPE => info.connector_type = template.connector_type,
            // Derived from the EDID below.
            _ => {}
        }
    }

    let derived = (fields & supported & (CrtcFields::EDID_VIEWPORT | CrtcFields::GAMMA))
        .iter()
        .filter(|field| info.error(*field).is_none())
        .fold(CrtcFields::NONE, |mask, field| mask | field);
    if !derived.is_empty() {
        match &device.edid {
            Some(raw) => {
                let requested_edid = fields.contains(CrtcFields::EDID);
                info.edid = raw.clone();
                edid::fill_from_edid(&mut info, derived);
                if !requested_edid {
                    info.edid.clear();
                }
            }
            None => info.fail(derived, &ErrorKind::EdidNotFound.into()),
        }
    }

    info
}
