use std::ffi::{CString, c_int};
use std::ptr;

use gamma_core::ramp::RampStop;
use gamma_core::{
    AdjustmentBackend, AdjustmentMethod, Capabilities, ConnectorType, CrtcFields, CrtcId,
    CrtcInformation, ErrorKind, GammaError, GammaRampSet, HandleArena, Opened, PartitionId,
    RampEncoding, Registry, SiteId, SubpixelOrder,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{NativeError, check, field_error};
use crate::library::{NativeLibrary, cstr_to_string};
use crate::sys;

/// Open library states. Boxed so the addresses handed to libgamma stay put;
/// partitions and CRTCs keep pointers to their parent's state.
struct NativeState {
    sites: HandleArena<SiteId, Box<sys::SiteState>>,
    partitions: HandleArena<PartitionId, Box<sys::PartitionState>>,
    crtcs: HandleArena<CrtcId, Box<sys::CrtcState>>,
}

// SAFETY: the states are only touched while holding the backend mutex, and
// libgamma does not tie them to the thread that created them.
unsafe impl Send for NativeState {}

/// An adjustment method served by libgamma.
pub struct NativeBackend {
    library: &'static NativeLibrary,
    method: AdjustmentMethod,
    state: Mutex<NativeState>,
}

impl NativeBackend {
    /// Backend for `method` on the shared library.
    pub fn new(method: AdjustmentMethod) -> Result<Self, NativeError> {
        Ok(Self::with_library(NativeLibrary::load()?, method))
    }

    pub fn with_library(library: &'static NativeLibrary, method: AdjustmentMethod) -> Self {
        Self {
            library,
            method,
            state: Mutex::new(NativeState {
                sites: HandleArena::new(),
                partitions: HandleArena::new(),
                crtcs: HandleArena::new(),
            }),
        }
    }

    fn raw_method(&self) -> c_int {
        self.method.value()
    }

    fn check(&self, code: c_int) -> Result<(), GammaError> {
        check(self.library, code)
    }

    fn read_ramps<T: RampStop>(
        &self,
        get: sys::GetRamps<T>,
        crtc: *mut sys::CrtcState,
        ramps: &mut GammaRampSet,
    ) -> Result<(), GammaError> {
        let (red, green, blue) = ramps.sizes();
        let mut staging = vec![T::from_unit(0.0); red + green + blue];
        let mut raw = stage_pointers(&mut staging, ramps.sizes());
        // SAFETY: `crtc` is an initialised state and `raw` points into
        // `staging`, which holds exactly the advertised number of stops.
        let code = unsafe { get(crtc, &mut raw) };
        self.check(code)?;
        unstage(&staging, ramps)
    }

    fn write_ramps<T: RampStop>(
        &self,
        set: sys::SetRamps<T>,
        crtc: *mut sys::CrtcState,
        ramps: &GammaRampSet,
    ) -> Result<(), GammaError> {
        let (red, green, blue) = ramps.sizes();
        let mut staging = Vec::with_capacity(red + green + blue);
        for channel in ramps.channels() {
            staging.extend_from_slice(channel.as_slice::<T>().ok_or_else(encoding_mismatch)?);
        }
        let raw = stage_pointers(&mut staging, ramps.sizes());
        // SAFETY: `crtc` is an initialised state and `raw` points into
        // `staging`, which outlives the call.
        let code = unsafe { set(crtc, raw) };
        self.check(code)
    }
}

fn encoding_mismatch() -> GammaError {
    GammaError::InvalidArgument("red, green and blue ramps must share one encoding")
}

/// Describe one contiguous staging buffer as three channels.
fn stage_pointers<T>(staging: &mut [T], (red, green, _blue): (usize, usize, usize)) -> sys::GammaRamps<T> {
    let base = staging.as_mut_ptr();
    let blue = staging.len() - red - green;
    // SAFETY: offsets stay within `staging`, whose length is the sum of the
    // three channel sizes.
    unsafe {
        sys::GammaRamps {
            red_size: red,
            green_size: green,
            blue_size: blue,
            red: base,
            green: base.add(red),
            blue: base.add(red + green),
        }
    }
}

fn unstage<T: RampStop>(staging: &[T], ramps: &mut GammaRampSet) -> Result<(), GammaError> {
    let mut offset = 0;
    for mut channel in ramps.channels_mut() {
        let stops = channel.as_mut_slice::<T>().ok_or_else(encoding_mismatch)?;
        stops.copy_from_slice(&staging[offset..offset + stops.len()]);
        offset += stops.len();
    }
    Ok(())
}

/// Decode the library's capability record.
pub(crate) fn decode_capabilities(raw: sys::MethodCapabilities) -> Capabilities {
    let flag = |bit: u32| raw.flags & (1 << bit) != 0;
    Capabilities {
        crtc_information: CrtcFields::from_bits(raw.crtc_information as u32),
        default_site_known: flag(0),
        multiple_sites: flag(1),
        multiple_partitions: flag(2),
        multiple_crtcs: flag(3),
        partitions_are_graphics_cards: flag(4),
        site_restore: flag(5),
        partition_restore: flag(6),
        crtc_restore: flag(7),
        identical_gamma_sizes: flag(8),
        fixed_gamma_size: flag(9),
        fixed_gamma_depth: flag(10),
        real: flag(11),
        fake: flag(12),
    }
}

/// Copy a library information record into an owned one.
///
/// # Safety
///
/// `raw` must have been filled by `libgamma_get_crtc_information`.
unsafe fn convert_information(raw: &sys::CrtcInformation) -> CrtcInformation {
    let edid = if raw.edid.is_null() {
        Vec::new()
    } else {
        // SAFETY: the library allocates `edid_length` bytes at `edid`.
        unsafe { std::slice::from_raw_parts(raw.edid, raw.edid_length) }.to_vec()
    };

    let mut subpixel_order_error = field_error(raw.subpixel_order_error);
    let subpixel_order = SubpixelOrder::from_raw(raw.subpixel_order).unwrap_or_else(|| {
        subpixel_order_error.get_or_insert(ErrorKind::SubpixelOrderNotRecognised.into());
        SubpixelOrder::Unknown
    });
    let mut connector_type_error = field_error(raw.connector_type_error);
    let connector_type = ConnectorType::from_raw(raw.connector_type).unwrap_or_else(|| {
        connector_type_error.get_or_insert(ErrorKind::ConnectorTypeNotRecognised.into());
        ConnectorType::Unknown
    });

    CrtcInformation {
        edid,
        edid_error: field_error(raw.edid_error),
        width_mm: raw.width_mm,
        width_mm_error: field_error(raw.width_mm_error),
        height_mm: raw.height_mm,
        height_mm_error: field_error(raw.height_mm_error),
        width_mm_edid: raw.width_mm_edid,
        width_mm_edid_error: field_error(raw.width_mm_edid_error),
        height_mm_edid: raw.height_mm_edid,
        height_mm_edid_error: field_error(raw.height_mm_edid_error),
        red_gamma_size: raw.red_gamma_size,
        green_gamma_size: raw.green_gamma_size,
        blue_gamma_size: raw.blue_gamma_size,
        gamma_size_error: field_error(raw.gamma_size_error),
        gamma_depth: i16::try_from(raw.gamma_depth).unwrap_or(0),
        gamma_depth_error: field_error(raw.gamma_depth_error),
        gamma_support: raw.gamma_support != 0,
        gamma_support_error: field_error(raw.gamma_support_error),
        subpixel_order,
        subpixel_order_error,
        active: raw.active != 0,
        active_error: field_error(raw.active_error),
        connector_name: cstr_to_string(raw.connector_name),
        connector_name_error: field_error(raw.connector_name_error),
        connector_type,
        connector_type_error,
        gamma_red: raw.gamma_red,
        gamma_green: raw.gamma_green,
        gamma_blue: raw.gamma_blue,
        gamma_error: field_error(raw.gamma_error),
    }
}

fn unknown_handle(handle: impl std::fmt::Debug) -> GammaError {
    debug_assert!(false, "{handle:?} was not issued by this backend");
    GammaError::InvalidArgument("handle was not issued by this backend")
}

impl AdjustmentBackend for NativeBackend {
    fn method(&self) -> AdjustmentMethod {
        self.method
    }

    fn is_available(&self) -> bool {
        self.library.is_method_available(self.raw_method())
    }

    fn capabilities(&self) -> Capabilities {
        decode_capabilities(self.library.method_capabilities(self.raw_method()))
    }

    fn default_site(&self) -> Option<String> {
        self.library.default_site(self.raw_method())
    }

    fn default_site_variable(&self) -> Option<&'static str> {
        self.library.default_site_variable(self.raw_method())
    }

    fn open_site(&self, site: Option<&str>) -> Result<Opened<SiteId>, GammaError> {
        let name = match site {
            Some(name) => {
                let name = CString::new(name)
                    .map_err(|_| GammaError::InvalidArgument("site name contains a NUL byte"))?;
                // SAFETY: `name` is NUL-terminated; the library takes
                // ownership of the malloc'd copy and frees it on destroy.
                let copy = unsafe { libc::strdup(name.as_ptr()) };
                if copy.is_null() {
                    return Err(GammaError::os(libc::ENOMEM));
                }
                copy
            }
            None => ptr::null_mut(),
        };

        let mut state = Box::new(sys::SiteState::empty());
        // SAFETY: `state` is a writable record; `name` is null or a
        // NUL-terminated malloc'd string.
        let code = unsafe { (self.library.api.site_initialise)(&mut *state, self.raw_method(), name) };
        // Read errno and the group globals before `free` can touch them.
        let opened = self.check(code);
        if opened.is_err() && !name.is_null() {
            // SAFETY: the library only takes ownership of the name once the
            // site opens; on failure the `strdup` copy is still ours.
            unsafe { libc::free(name.cast()) };
        }
        opened?;
        let children = state.partitions_available;
        let handle = self.state.lock().sites.insert(state);
        Ok(Opened { handle, children })
    }

    fn close_site(&self, site: SiteId) {
        let Some(mut state) = self.state.lock().sites.remove(site) else {
            debug_assert!(false, "{site:?} closed twice");
            return;
        };
        // SAFETY: the state was initialised by `open_site` and is destroyed
        // once; every partition opened from it has been closed.
        unsafe { (self.library.api.site_destroy)(&mut *state) };
    }

    fn restore_site(&self, site: SiteId) -> Result<(), GammaError> {
        let mut guard = self.state.lock();
        let state = guard.sites.get_mut(site).ok_or_else(|| unknown_handle(site))?;
        // SAFETY: initialised state, accessed under the lock.
        let code = unsafe { (self.library.api.site_restore)(&mut **state) };
        self.check(code)
    }

    fn open_partition(&self, site: SiteId, index: usize) -> Result<Opened<PartitionId>, GammaError> {
        let mut guard = self.state.lock();
        let site_state: *mut sys::SiteState = &mut **guard
            .sites
            .get_mut(site)
            .ok_or_else(|| unknown_handle(site))?;
        let mut state = Box::new(sys::PartitionState::empty());
        // SAFETY: both records are valid; the site state is boxed and stays
        // open until this partition is closed.
        let code = unsafe { (self.library.api.partition_initialise)(&mut *state, site_state, index) };
        self.check(code)?;
        let children = state.crtcs_available;
        let handle = guard.partitions.insert(state);
        Ok(Opened { handle, children })
    }

    fn close_partition(&self, partition: PartitionId) {
        let Some(mut state) = self.state.lock().partitions.remove(partition) else {
            debug_assert!(false, "{partition:?} closed twice");
            return;
        };
        // SAFETY: initialised by `open_partition`, destroyed once.
        unsafe { (self.library.api.partition_destroy)(&mut *state) };
    }

    fn restore_partition(&self, partition: PartitionId) -> Result<(), GammaError> {
        let mut guard = self.state.lock();
        let state = guard
            .partitions
            .get_mut(partition)
            .ok_or_else(|| unknown_handle(partition))?;
        // SAFETY: initialised state, accessed under the lock.
        let code = unsafe { (self.library.api.partition_restore)(&mut **state) };
        self.check(code)
    }

    fn open_crtc(&self, partition: PartitionId, index: usize) -> Result<CrtcId, GammaError> {
        let mut guard = self.state.lock();
        let partition_state: *mut sys::PartitionState = &mut **guard
            .partitions
            .get_mut(partition)
            .ok_or_else(|| unknown_handle(partition))?;
        let mut state = Box::new(sys::CrtcState::empty());
        // SAFETY: both records are valid; the partition state is boxed and
        // stays open until this CRTC is closed.
        let code = unsafe { (self.library.api.crtc_initialise)(&mut *state, partition_state, index) };
        self.check(code)?;
        debug!("libgamma CRTC {index} opened");
        Ok(guard.crtcs.insert(state))
    }

    fn close_crtc(&self, crtc: CrtcId) {
        let Some(mut state) = self.state.lock().crtcs.remove(crtc) else {
            debug_assert!(false, "{crtc:?} closed twice");
            return;
        };
        // SAFETY: initialised by `open_crtc`, destroyed once.
        unsafe { (self.library.api.crtc_destroy)(&mut *state) };
    }

    fn restore_crtc(&self, crtc: CrtcId) -> Result<(), GammaError> {
        let mut guard = self.state.lock();
        let state = guard.crtcs.get_mut(crtc).ok_or_else(|| unknown_handle(crtc))?;
        // SAFETY: initialised state, accessed under the lock.
        let code = unsafe { (self.library.api.crtc_restore)(&mut **state) };
        self.check(code)
    }

    fn crtc_information(&self, crtc: CrtcId, fields: CrtcFields) -> Result<CrtcInformation, GammaError> {
        let mut guard = self.state.lock();
        let state = guard.crtcs.get_mut(crtc).ok_or_else(|| unknown_handle(crtc))?;
        let mut raw = sys::CrtcInformation::empty();
        // SAFETY: `raw` is writable and `state` initialised. The return value
        // only says whether some field failed; per-field codes say which.
        unsafe {
            (self.library.api.get_crtc_information)(&mut raw, &mut **state, fields.bits() as i32);
        }
        // SAFETY: `raw` was filled by the call above and is destroyed once.
        let info = unsafe {
            let info = convert_information(&raw);
            (self.library.api.crtc_information_destroy)(&mut raw);
            info
        };
        Ok(info)
    }

    fn get_gamma(&self, crtc: CrtcId, ramps: &mut GammaRampSet) -> Result<(), GammaError> {
        let mut guard = self.state.lock();
        let state: *mut sys::CrtcState = &mut **guard.crtcs.get_mut(crtc).ok_or_else(|| unknown_handle(crtc))?;
        let api = &self.library.api;
        match ramps.encoding() {
            RampEncoding::U8 => self.read_ramps(api.get_ramps8, state, ramps),
            RampEncoding::U16 => self.read_ramps(api.get_ramps16, state, ramps),
            RampEncoding::U32 => self.read_ramps(api.get_ramps32, state, ramps),
            RampEncoding::U64 => self.read_ramps(api.get_ramps64, state, ramps),
            RampEncoding::F32 => self.read_ramps(api.get_rampsf, state, ramps),
            RampEncoding::F64 => self.read_ramps(api.get_rampsd, state, ramps),
        }
    }

    fn set_gamma(&self, crtc: CrtcId, ramps: &GammaRampSet) -> Result<(), GammaError> {
        let mut guard = self.state.lock();
        let state: *mut sys::CrtcState = &mut **guard.crtcs.get_mut(crtc).ok_or_else(|| unknown_handle(crtc))?;
        let api = &self.library.api;
        match ramps.encoding() {
            RampEncoding::U8 => self.write_ramps(api.set_ramps8, state, ramps),
            RampEncoding::U16 => self.write_ramps(api.set_ramps16, state, ramps),
            RampEncoding::U32 => self.write_ramps(api.set_ramps32, state, ramps),
            RampEncoding::U64 => self.write_ramps(api.set_ramps64, state, ramps),
            RampEncoding::F32 => self.write_ramps(api.set_rampsf, state, ramps),
            RampEncoding::F64 => self.write_ramps(api.set_rampsd, state, ramps),
        }
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let open = state.sites.len() + state.partitions.len() + state.crtcs.len();
        if open > 0 {
            warn!("libgamma {} backend dropped with {open} handle(s) open", self.method);
        }
    }
}

/// Register a backend for every real method the library reports available.
///
/// The library's own dummy method is skipped; the in-process one serves it.
/// Returns the number of backends registered.
pub fn register_available(registry: &mut Registry) -> Result<usize, NativeError> {
    let library = NativeLibrary::load()?;
    let mut registered = 0;
    for &method in AdjustmentMethod::all() {
        if method == AdjustmentMethod::Dummy || !library.is_method_available(method.value()) {
            continue;
        }
        registry.register(std::sync::Arc::new(NativeBackend::with_library(library, method)));
        registered += 1;
    }
    info!("Registered {registered} libgamma method(s) from {}", library.path());
    Ok(registered)
}
