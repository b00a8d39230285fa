use std::ffi::c_int;
use std::io;

use gamma_core::{ErrorKind, GammaError};

use crate::library::{NativeLibrary, cstr_to_string};

#[derive(Debug, Clone, thiserror::Error)]
pub enum NativeError {
    #[error("failed to load libgamma from {path}: {message}")]
    Load { path: String, message: String },
    #[error("libgamma does not export {name}: {message}")]
    Symbol { name: &'static str, message: String },
    #[error("no libgamma library found")]
    NotFound,
    #[error("adjustment method {0} is not available in libgamma")]
    MethodUnavailable(gamma_core::AdjustmentMethod),
}

impl From<NativeError> for GammaError {
    fn from(_: NativeError) -> Self {
        GammaError::Library(ErrorKind::NoSuchAdjustmentMethod)
    }
}

/// Turn a libgamma return value into a `Result`.
///
/// Must be called right after the failing call, before anything else can
/// overwrite `errno` or the group globals.
pub(crate) fn check(library: &NativeLibrary, code: c_int) -> Result<(), GammaError> {
    match code {
        0 => Ok(()),
        code if code == ErrorKind::ErrnoSet.code() => Err(errno_error()),
        code if code == ErrorKind::DeviceRequireGroup.code() => Err(match library.required_group() {
            Some((gid, name)) => GammaError::require_group(gid, name.or_else(|| group_name(gid))),
            None => GammaError::Library(ErrorKind::DeviceRequireGroup),
        }),
        code => Err(GammaError::from_code(code)),
    }
}

/// Error recorded for one CRTC information field; zero means success.
pub(crate) fn field_error(code: c_int) -> Option<GammaError> {
    (code != 0).then(|| GammaError::from_code(code))
}

/// Largest buffer offered to `getgrgid_r` before giving up on a group.
#[cfg(unix)]
const MAX_GROUP_BUFFER: usize = 1 << 20;

/// Name of group `gid` in the system group database, going through NSS so
/// groups from LDAP or userdb resolve as well. `None` when there is no such
/// group or the lookup fails.
#[cfg(unix)]
pub(crate) fn group_name(gid: u32) -> Option<String> {
    let mut buffer: Vec<std::ffi::c_char> = vec![0; 1024];
    loop {
        // SAFETY: `group` is plain data that `getgrgid_r` overwrites.
        let mut group: libc::group = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::group = std::ptr::null_mut();
        // SAFETY: every pointer is valid and `buffer.len()` is its capacity.
        let code = unsafe {
            libc::getgrgid_r(
                gid as libc::gid_t,
                &mut group,
                buffer.as_mut_ptr(),
                buffer.len(),
                &mut result,
            )
        };
        match code {
            0 if result.is_null() => return None,
            // `gr_name` points into `buffer`, which is still alive.
            0 => return cstr_to_string(group.gr_name),
            libc::ERANGE if buffer.len() < MAX_GROUP_BUFFER => {
                let len = buffer.len() * 2;
                buffer.resize(len, 0);
            }
            _ => return None,
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn group_name(_gid: u32) -> Option<String> {
    None
}

fn errno_error() -> GammaError {
    match io::Error::last_os_error().raw_os_error() {
        Some(errno) if errno > 0 => GammaError::os(errno),
        _ => GammaError::Library(ErrorKind::ErrnoSet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_zero_is_success() {
        assert_eq!(field_error(0), None);
        assert_eq!(
            field_error(-43),
            Some(GammaError::Library(ErrorKind::EdidNotFound))
        );
        assert_eq!(field_error(libc::ENOENT).and_then(|err| err.code()), Some(libc::ENOENT));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_group_name_resolves_through_system_database() {
        assert_eq!(group_name(0).as_deref(), Some("root"));
        assert_eq!(group_name(u32::MAX - 1), None);
    }

    #[test]
    fn test_native_error_maps_to_missing_method() {
        let err: GammaError = NativeError::NotFound.into();
        assert_eq!(err, GammaError::Library(ErrorKind::NoSuchAdjustmentMethod));
    }
}
