//! libgamma integration crate for the gamma adjustment layer.
//!
//! This crate loads the system libgamma at runtime and exposes each of its
//! adjustment methods (RandR, VidMode, DRM, GDI, CoreGraphics) as a
//! [`gamma_core::AdjustmentBackend`].
#![allow(unsafe_code)]
// FFI wrappers necessarily use unsafe externs and raw pointers.

mod backend;
mod error;
mod library;
mod sys;

pub use backend::{NativeBackend, register_available};
pub use error::NativeError;
pub use library::{DEFAULT_LIBRARY_NAMES, LIBRARY_PATH_VARIABLE, NativeLibrary};

use gamma_core::{AdjustmentMethod, GammaError, Site};

/// Open a site of `method` through libgamma. `None` selects the default site.
pub fn open_site(method: AdjustmentMethod, site: Option<&str>) -> Result<Site, GammaError> {
    let backend = NativeBackend::new(method)?;
    Site::open(std::sync::Arc::new(backend), site)
}
