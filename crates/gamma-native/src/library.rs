//! Runtime loading of the libgamma shared library.

use std::env;
use std::ffi::{CStr, c_char, c_int};
use std::sync::OnceLock;

use libloading::Library;
use tracing::{debug, info, warn};

use crate::error::NativeError;
use crate::sys::{
    CrtcInformation, CrtcState, GetRamps, MethodCapabilities, PartitionState, SetRamps, SiteState,
};

/// Environment variable overriding the library path.
pub const LIBRARY_PATH_VARIABLE: &str = "GAMMA_NATIVE_LIBRARY";

/// Library names tried when no override is set.
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["libgamma.so.0", "libgamma.so"];

macro_rules! native_api {
    ($($field:ident = $symbol:literal: $ty:ty;)+) => {
        /// Function table resolved from the library.
        pub(crate) struct Api {
            $(pub $field: $ty,)+
        }

        impl Api {
            /// # Safety
            ///
            /// Every symbol must have the declared signature.
            unsafe fn resolve(library: &Library) -> Result<Self, NativeError> {
                Ok(Self {
                    $(
                        // SAFETY: caller guarantees the signature.
                        $field: *unsafe { library.get::<$ty>(concat!($symbol, "\0").as_bytes()) }
                            .map_err(|err| NativeError::Symbol {
                                name: $symbol,
                                message: err.to_string(),
                            })?,
                    )+
                })
            }
        }
    };
}

native_api! {
    is_method_available = "libgamma_is_method_available":
        unsafe extern "C" fn(c_int) -> c_int;
    method_capabilities = "libgamma_method_capabilities":
        unsafe extern "C" fn(*mut MethodCapabilities, c_int);
    method_default_site = "libgamma_method_default_site":
        unsafe extern "C" fn(c_int) -> *const c_char;
    method_default_site_variable = "libgamma_method_default_site_variable":
        unsafe extern "C" fn(c_int) -> *const c_char;

    site_initialise = "libgamma_site_initialise":
        unsafe extern "C" fn(*mut SiteState, c_int, *mut c_char) -> c_int;
    site_destroy = "libgamma_site_destroy":
        unsafe extern "C" fn(*mut SiteState);
    site_restore = "libgamma_site_restore":
        unsafe extern "C" fn(*mut SiteState) -> c_int;

    partition_initialise = "libgamma_partition_initialise":
        unsafe extern "C" fn(*mut PartitionState, *mut SiteState, usize) -> c_int;
    partition_destroy = "libgamma_partition_destroy":
        unsafe extern "C" fn(*mut PartitionState);
    partition_restore = "libgamma_partition_restore":
        unsafe extern "C" fn(*mut PartitionState) -> c_int;

    crtc_initialise = "libgamma_crtc_initialise":
        unsafe extern "C" fn(*mut CrtcState, *mut PartitionState, usize) -> c_int;
    crtc_destroy = "libgamma_crtc_destroy":
        unsafe extern "C" fn(*mut CrtcState);
    crtc_restore = "libgamma_crtc_restore":
        unsafe extern "C" fn(*mut CrtcState) -> c_int;

    get_crtc_information = "libgamma_get_crtc_information":
        unsafe extern "C" fn(*mut CrtcInformation, *mut CrtcState, i32) -> c_int;
    crtc_information_destroy = "libgamma_crtc_information_destroy":
        unsafe extern "C" fn(*mut CrtcInformation);

    get_ramps8 = "libgamma_crtc_get_gamma_ramps8": GetRamps<u8>;
    get_ramps16 = "libgamma_crtc_get_gamma_ramps16": GetRamps<u16>;
    get_ramps32 = "libgamma_crtc_get_gamma_ramps32": GetRamps<u32>;
    get_ramps64 = "libgamma_crtc_get_gamma_ramps64": GetRamps<u64>;
    get_rampsf = "libgamma_crtc_get_gamma_rampsf": GetRamps<f32>;
    get_rampsd = "libgamma_crtc_get_gamma_rampsd": GetRamps<f64>;
    set_ramps8 = "libgamma_crtc_set_gamma_ramps8": SetRamps<u8>;
    set_ramps16 = "libgamma_crtc_set_gamma_ramps16": SetRamps<u16>;
    set_ramps32 = "libgamma_crtc_set_gamma_ramps32": SetRamps<u32>;
    set_ramps64 = "libgamma_crtc_set_gamma_ramps64": SetRamps<u64>;
    set_rampsf = "libgamma_crtc_set_gamma_rampsf": SetRamps<f32>;
    set_rampsd = "libgamma_crtc_set_gamma_rampsd": SetRamps<f64>;
}

/// Addresses of the library's group globals, set alongside
/// `LIBGAMMA_DEVICE_REQUIRE_GROUP`.
pub(crate) struct GroupGlobals {
    pub gid: *const libc::gid_t,
    pub name: *const *const c_char,
}

/// A loaded libgamma.
pub struct NativeLibrary {
    pub(crate) api: Api,
    pub(crate) group: Option<GroupGlobals>,
    path: String,
    // Dropped last so the function table never outlives the mapping.
    _library: Library,
}

// SAFETY: the table holds function pointers and addresses into a library
// that stays mapped for the life of `self`; libgamma's method-level entry
// points do not depend on the calling thread.
unsafe impl Send for NativeLibrary {}
// SAFETY: see above; nothing in `self` is mutated after loading.
unsafe impl Sync for NativeLibrary {}

static SHARED: OnceLock<Result<NativeLibrary, NativeError>> = OnceLock::new();

impl NativeLibrary {
    /// Load the shared library once per process.
    ///
    /// `GAMMA_NATIVE_LIBRARY` overrides the search; otherwise
    /// [`DEFAULT_LIBRARY_NAMES`] are tried in order. Later calls return the
    /// first outcome, success or failure.
    pub fn load() -> Result<&'static Self, NativeError> {
        SHARED
            .get_or_init(|| match env::var(LIBRARY_PATH_VARIABLE) {
                Ok(path) if !path.is_empty() => Self::open(&path),
                _ => Self::open_default(),
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn open_default() -> Result<Self, NativeError> {
        let mut last = None;
        for name in DEFAULT_LIBRARY_NAMES {
            match Self::open(name) {
                Ok(library) => return Ok(library),
                Err(err) => {
                    debug!("libgamma not found as {name}: {err}");
                    last = Some(err);
                }
            }
        }
        Err(last.unwrap_or(NativeError::NotFound))
    }

    /// Load the library at `path` without caching it.
    pub fn open(path: &str) -> Result<Self, NativeError> {
        // SAFETY: loading libgamma runs no initialisers with preconditions.
        let library = unsafe { Library::new(path) }.map_err(|err| NativeError::Load {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        // SAFETY: the declared signatures match the libgamma C ABI.
        let api = unsafe { Api::resolve(&library) }?;
        let group = resolve_group_globals(&library);
        if group.is_none() {
            warn!("libgamma at {path} does not export its group globals");
        }
        info!("Loaded libgamma from {path}");
        Ok(Self {
            api,
            group,
            path: path.to_string(),
            _library: library,
        })
    }

    /// Path or name the library was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Library-side availability of a raw method id.
    pub fn is_method_available(&self, method: c_int) -> bool {
        // SAFETY: any integer is a valid argument.
        unsafe { (self.api.is_method_available)(method) != 0 }
    }

    pub(crate) fn method_capabilities(&self, method: c_int) -> MethodCapabilities {
        let mut caps = MethodCapabilities::default();
        // SAFETY: `caps` is a valid, writable record.
        unsafe { (self.api.method_capabilities)(&mut caps, method) };
        caps
    }

    pub(crate) fn default_site(&self, method: c_int) -> Option<String> {
        // SAFETY: returns null or a NUL-terminated string owned by the
        // environment, which we copy immediately.
        let ptr = unsafe { (self.api.method_default_site)(method) };
        cstr_to_string(ptr)
    }

    pub(crate) fn default_site_variable(&'static self, method: c_int) -> Option<&'static str> {
        // SAFETY: returns null or a static string inside the library, which
        // stays mapped for as long as `self` is borrowed for `'static`.
        let ptr = unsafe { (self.api.method_default_site_variable)(method) };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: non-null and NUL-terminated per the contract above.
        unsafe { CStr::from_ptr(ptr) }.to_str().ok()
    }

    /// Group the library last asked the caller to join.
    pub(crate) fn required_group(&self) -> Option<(u32, Option<String>)> {
        let group = self.group.as_ref()?;
        // SAFETY: addresses resolved from the loaded library; the name is
        // null or a NUL-terminated string the library owns.
        unsafe {
            let gid = *group.gid;
            let name = cstr_to_string(*group.name);
            Some((gid, name))
        }
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary").field("path", &self.path).finish()
    }
}

fn resolve_group_globals(library: &Library) -> Option<GroupGlobals> {
    // SAFETY: data symbols are only read through the returned addresses.
    unsafe {
        let gid = library.get::<*const libc::gid_t>(b"libgamma_group_gid\0").ok()?;
        let name = library
            .get::<*const *const c_char>(b"libgamma_group_name\0")
            .ok()?;
        Some(GroupGlobals {
            gid: *gid,
            name: *name,
        })
    }
}

pub(crate) fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: caller passes a valid NUL-terminated string when non-null.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_library_fails() {
        let err = NativeLibrary::open("/nonexistent/libgamma.so.0").unwrap_err();
        match err {
            NativeError::Load { path, .. } => assert_eq!(path, "/nonexistent/libgamma.so.0"),
            other => panic!("expected a load error, got {other:?}"),
        }
    }

    #[test]
    fn test_cstr_to_string_null() {
        assert_eq!(cstr_to_string(std::ptr::null()), None);
        let text = c"DISPLAY";
        assert_eq!(cstr_to_string(text.as_ptr()), Some("DISPLAY".to_string()));
    }
}
