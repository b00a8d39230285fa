//! `#[repr(C)]` mirrors of the libgamma state and record structures.

use std::ffi::{c_char, c_float, c_int, c_uchar, c_uint, c_void};
use std::ptr;

#[repr(C)]
pub struct SiteState {
    pub data: *mut c_void,
    pub method: c_int,
    /// Owned by the library once initialised; freed on destroy.
    pub site: *mut c_char,
    pub partitions_available: usize,
}

impl SiteState {
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            method: 0,
            site: ptr::null_mut(),
            partitions_available: 0,
        }
    }
}

#[repr(C)]
pub struct PartitionState {
    pub data: *mut c_void,
    pub site: *mut SiteState,
    pub partition: usize,
    pub crtcs_available: usize,
}

impl PartitionState {
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            site: ptr::null_mut(),
            partition: 0,
            crtcs_available: 0,
        }
    }
}

#[repr(C)]
pub struct CrtcState {
    pub data: *mut c_void,
    pub partition: *mut PartitionState,
    pub crtc: usize,
}

impl CrtcState {
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            partition: ptr::null_mut(),
            crtc: 0,
        }
    }
}

/// Capability record: the field mask followed by a bit-field word whose
/// flags are allocated from the least significant bit.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodCapabilities {
    pub crtc_information: i32,
    pub flags: c_uint,
}

#[repr(C)]
pub struct CrtcInformation {
    pub edid: *mut c_uchar,
    pub edid_length: usize,
    pub edid_error: c_int,
    pub width_mm: usize,
    pub width_mm_error: c_int,
    pub height_mm: usize,
    pub height_mm_error: c_int,
    pub width_mm_edid: usize,
    pub width_mm_edid_error: c_int,
    pub height_mm_edid: usize,
    pub height_mm_edid_error: c_int,
    pub red_gamma_size: usize,
    pub green_gamma_size: usize,
    pub blue_gamma_size: usize,
    pub gamma_size_error: c_int,
    pub gamma_depth: c_int,
    pub gamma_depth_error: c_int,
    pub gamma_support: c_int,
    pub gamma_support_error: c_int,
    pub subpixel_order: c_int,
    pub subpixel_order_error: c_int,
    pub active: c_int,
    pub active_error: c_int,
    pub connector_name: *mut c_char,
    pub connector_name_error: c_int,
    pub connector_type: c_int,
    pub connector_type_error: c_int,
    pub gamma_red: c_float,
    pub gamma_green: c_float,
    pub gamma_blue: c_float,
    pub gamma_error: c_int,
}

impl CrtcInformation {
    pub const fn empty() -> Self {
        Self {
            edid: ptr::null_mut(),
            edid_length: 0,
            edid_error: 0,
            width_mm: 0,
            width_mm_error: 0,
            height_mm: 0,
            height_mm_error: 0,
            width_mm_edid: 0,
            width_mm_edid_error: 0,
            height_mm_edid: 0,
            height_mm_edid_error: 0,
            red_gamma_size: 0,
            green_gamma_size: 0,
            blue_gamma_size: 0,
            gamma_size_error: 0,
            gamma_depth: 0,
            gamma_depth_error: 0,
            gamma_support: 0,
            gamma_support_error: 0,
            subpixel_order: 0,
            subpixel_order_error: 0,
            active: 0,
            active_error: 0,
            connector_name: ptr::null_mut(),
            connector_name_error: 0,
            connector_type: 0,
            connector_type_error: 0,
            gamma_red: 0.0,
            gamma_green: 0.0,
            gamma_blue: 0.0,
            gamma_error: 0,
        }
    }
}

/// Ramp set of any depth; `T` is the stop type.
#[repr(C)]
pub struct GammaRamps<T> {
    pub red_size: usize,
    pub green_size: usize,
    pub blue_size: usize,
    pub red: *mut T,
    pub green: *mut T,
    pub blue: *mut T,
}

pub type GetRamps<T> = unsafe extern "C" fn(*mut CrtcState, *mut GammaRamps<T>) -> c_int;
pub type SetRamps<T> = unsafe extern "C" fn(*mut CrtcState, GammaRamps<T>) -> c_int;
