//! Error catalog and the crate error type.
//!
//! Failures come in two families. Negative codes belong to the library
//! catalog ([`ErrorKind`]); non-negative codes are operating system error
//! numbers passed through from the transport. Zero means "no error" and is
//! never turned into a [`GammaError`].

use crate::method::AdjustmentMethod;

macro_rules! error_kinds {
    ($($variant:ident = $code:literal => $name:literal, $description:literal;)+) => {
        /// Library-defined failure codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum ErrorKind {
            $(
                #[doc = $description]
                $variant = $code,
            )+
        }

        impl ErrorKind {
            /// Every catalog entry, from `-1` downwards.
            pub fn all() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            /// Symbolic name, as used by the native library.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Human-readable description.
            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $description,)+
                }
            }

            /// Look an entry up by code.
            pub const fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

error_kinds! {
    ErrnoSet = -1 => "LIBGAMMA_ERRNO_SET",
        "The error is stored in errno, which held no value when read.";
    NoSuchAdjustmentMethod = -2 => "LIBGAMMA_NO_SUCH_ADJUSTMENT_METHOD",
        "The selected adjustment method does not exist or has been excluded at compile-time.";
    NoSuchSite = -3 => "LIBGAMMA_NO_SUCH_SITE",
        "The selected site does not exist.";
    NoSuchPartition = -4 => "LIBGAMMA_NO_SUCH_PARTITION",
        "The selected partition does not exist.";
    NoSuchCrtc = -5 => "LIBGAMMA_NO_SUCH_CRTC",
        "The selected CRTC does not exist.";
    ImpossibleAmount = -6 => "LIBGAMMA_IMPOSSIBLE_AMOUNT",
        "Counter overflowed when counting the number of available items.";
    ConnectorDisabled = -7 => "LIBGAMMA_CONNECTOR_DISABLED",
        "The selected connector is disabled, it does not have a CRTC.";
    OpenCrtcFailed = -8 => "LIBGAMMA_OPEN_CRTC_FAILED",
        "The selected CRTC could not be opened, reason unknown.";
    CrtcInfoNotSupported = -9 => "LIBGAMMA_CRTC_INFO_NOT_SUPPORTED",
        "The CRTC information field is not supported by the adjustment method.";
    GammaRampReadFailed = -10 => "LIBGAMMA_GAMMA_RAMP_READ_FAILED",
        "Failed to read the current gamma ramps for the selected CRTC, reason unknown.";
    GammaRampWriteFailed = -11 => "LIBGAMMA_GAMMA_RAMP_WRITE_FAILED",
        "Failed to write the current gamma ramps for the selected CRTC, reason unknown.";
    GammaRampSizeChanged = -12 => "LIBGAMMA_GAMMA_RAMP_SIZE_CHANGED",
        "The specified ramp sizes do not match the ramp sizes returned by the adjustment method.";
    MixedGammaRampSize = -13 => "LIBGAMMA_MIXED_GAMMA_RAMP_SIZE",
        "The specified ramp sizes are not identical, which the adjustment method requires.";
    WrongGammaRampSize = -14 => "LIBGAMMA_WRONG_GAMMA_RAMP_SIZE",
        "The specified ramp sizes are not supported by the adjustment method.";
    SingletonGammaRamp = -15 => "LIBGAMMA_SINGLETON_GAMMA_RAMP",
        "The adjustment method reported a gamma ramp size of 1, or perhaps even zero or negative.";
    ListCrtcsFailed = -16 => "LIBGAMMA_LIST_CRTCS_FAILED",
        "The adjustment method failed to list available CRTCs, reason unknown.";
    AcquiringModeResourcesFailed = -17 => "LIBGAMMA_ACQUIRING_MODE_RESOURCES_FAILED",
        "Failed to acquire mode resources from the adjustment method.";
    NegativePartitionCount = -18 => "LIBGAMMA_NEGATIVE_PARTITION_COUNT",
        "The adjustment method reported a negative number of partitions in the site.";
    NegativeCrtcCount = -19 => "LIBGAMMA_NEGATIVE_CRTC_COUNT",
        "The adjustment method reported a negative number of CRTCs in the partition.";
    DeviceRestricted = -20 => "LIBGAMMA_DEVICE_RESTRICTED",
        "Device cannot be accessed because of insufficient permissions.";
    DeviceAccessFailed = -21 => "LIBGAMMA_DEVICE_ACCESS_FAILED",
        "Device cannot be accessed, reason unknown.";
    DeviceRequireGroup = -22 => "LIBGAMMA_DEVICE_REQUIRE_GROUP",
        "Device cannot be accessed, membership of a specific group is required.";
    GraphicsCardRemoved = -23 => "LIBGAMMA_GRAPHICS_CARD_REMOVED",
        "The graphics card appears to have been removed.";
    StateUnknown = -24 => "LIBGAMMA_STATE_UNKNOWN",
        "The state of the requested information is unknown.";
    ConnectorUnknown = -25 => "LIBGAMMA_CONNECTOR_UNKNOWN",
        "Failed to determine which connector the CRTC belongs to.";
    ConnectorTypeNotRecognised = -26 => "LIBGAMMA_CONNECTOR_TYPE_NOT_RECOGNISED",
        "The detected connector type is not recognised.";
    SubpixelOrderNotRecognised = -27 => "LIBGAMMA_SUBPIXEL_ORDER_NOT_RECOGNISED",
        "The detected subpixel order is not recognised.";
    EdidLengthUnsupported = -28 => "LIBGAMMA_EDID_LENGTH_UNSUPPORTED",
        "The length of the EDID does not match that of any supported EDID structure revision.";
    EdidWrongMagicNumber = -29 => "LIBGAMMA_EDID_WRONG_MAGIC_NUMBER",
        "The magic number in the EDID does not match that of any supported EDID structure revision.";
    EdidRevisionUnsupported = -30 => "LIBGAMMA_EDID_REVISION_UNSUPPORTED",
        "The EDID structure revision used by the monitor is not supported.";
    GammaNotSpecified = -31 => "LIBGAMMA_GAMMA_NOT_SPECIFIED",
        "The gamma characteristics field in the EDID is left unspecified.";
    EdidChecksumError = -32 => "LIBGAMMA_EDID_CHECKSUM_ERROR",
        "The checksum in the EDID is incorrect; the provided values cannot be trusted.";
    GammaNotSpecifiedAndEdidChecksumError = -33 => "LIBGAMMA_GAMMA_NOT_SPECIFIED_AND_EDID_CHECKSUM_ERROR",
        "The EDID gamma is unspecified and the EDID checksum is incorrect.";
    GammaRampsSizeQueryFailed = -34 => "LIBGAMMA_GAMMA_RAMPS_SIZE_QUERY_FAILED",
        "Failed to query the gamma ramp size from the adjustment method, reason unknown.";
    OpenPartitionFailed = -35 => "LIBGAMMA_OPEN_PARTITION_FAILED",
        "The selected partition could not be opened, reason unknown.";
    OpenSiteFailed = -36 => "LIBGAMMA_OPEN_SITE_FAILED",
        "The selected site could not be opened, reason unknown.";
    ProtocolVersionQueryFailed = -37 => "LIBGAMMA_PROTOCOL_VERSION_QUERY_FAILED",
        "Failed to query the adjustment method for its protocol version, reason unknown.";
    ProtocolVersionNotSupported = -38 => "LIBGAMMA_PROTOCOL_VERSION_NOT_SUPPORTED",
        "The adjustment method's version of its protocol is not supported.";
    ListPartitionsFailed = -39 => "LIBGAMMA_LIST_PARTITIONS_FAILED",
        "The adjustment method failed to list available partitions, reason unknown.";
    NullPartition = -40 => "LIBGAMMA_NULL_PARTITION",
        "The partition exists by index, but the partition at that index does not exist.";
    NotConnected = -41 => "LIBGAMMA_NOT_CONNECTED",
        "There is no monitor connected to the connector of the selected CRTC.";
    ReplyValueExtractionFailed = -42 => "LIBGAMMA_REPLY_VALUE_EXTRACTION_FAILED",
        "Data extraction from a reply from the adjustment method failed, reason unknown.";
    EdidNotFound = -43 => "LIBGAMMA_EDID_NOT_FOUND",
        "No EDID property was found on the output.";
    ListPropertiesFailed = -44 => "LIBGAMMA_LIST_PROPERTIES_FAILED",
        "Failed to list properties on the output, reason unknown.";
    PropertyValueQueryFailed = -45 => "LIBGAMMA_PROPERTY_VALUE_QUERY_FAILED",
        "Failed to query a property's value from the output, reason unknown.";
    OutputInformationQueryFailed = -46 => "LIBGAMMA_OUTPUT_INFORMATION_QUERY_FAILED",
        "A request for information on an output failed, reason unknown.";
}

impl ErrorKind {
    /// Lowest code in the catalog. A native library reporting anything lower
    /// is newer than this crate.
    pub const MIN: i32 = -46;

    /// Raw code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Symbolic name of a library error code, `None` for codes outside the catalog.
pub fn name_of(code: i32) -> Option<&'static str> {
    ErrorKind::from_code(code).map(ErrorKind::name)
}

/// Code of a library error referred to by symbolic name, `0` when the name is
/// not in the catalog.
pub fn value_of(name: &str) -> i32 {
    ErrorKind::all()
        .iter()
        .find(|kind| kind.name() == name)
        .map_or(0, |kind| kind.code())
}

/// Errors reported by the adjustment layer and its backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GammaError {
    /// A library-defined failure.
    #[error("{}: {}", .0.name(), .0.description())]
    Library(ErrorKind),
    /// Device access requires membership of a group.
    #[error("device access requires membership of group {}", group_label(.gid, .name.as_deref()))]
    RequireGroup {
        /// Numeric group identifier.
        gid: u32,
        /// Group name, when it could be resolved.
        name: Option<String>,
    },
    /// An operating system error number passed through from the transport.
    #[error("{message}")]
    Os { code: i32, message: String },
    /// The operation is not offered by the backend's capabilities.
    #[error("{operation} is not supported by the {method} adjustment method")]
    Unsupported {
        method: AdjustmentMethod,
        operation: &'static str,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// A negative code outside the catalog, from a newer native library.
    #[error("unrecognised error code {0}")]
    Unrecognised(i32),
}

impl GammaError {
    /// Build an error from a raw code.
    ///
    /// Code `0` means success; passing it is a caller mistake and trips a
    /// debug assertion. [`ErrorKind::DeviceRequireGroup`] carries no group
    /// here; backends that know the group use [`GammaError::require_group`].
    pub fn from_code(code: i32) -> Self {
        debug_assert_ne!(code, 0, "error code 0 means success");
        if code > 0 {
            return Self::os(code);
        }
        match ErrorKind::from_code(code) {
            Some(kind) => Self::Library(kind),
            None => Self::Unrecognised(code),
        }
    }

    /// Operating system error with its text from the host error-string facility.
    pub fn os(code: i32) -> Self {
        Self::Os {
            code,
            message: std::io::Error::from_raw_os_error(code).to_string(),
        }
    }

    /// Group-membership error. `name` is `None` when the group could not be
    /// resolved.
    pub fn require_group(gid: u32, name: Option<String>) -> Self {
        Self::RequireGroup { gid, name }
    }

    /// Raw code, where the error has one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Library(kind) => Some(kind.code()),
            Self::RequireGroup { .. } => Some(ErrorKind::DeviceRequireGroup.code()),
            Self::Os { code, .. } | Self::Unrecognised(code) => Some(*code),
            Self::Unsupported { .. } | Self::InvalidArgument(_) => None,
        }
    }

    /// Catalog entry, where the error has one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Library(kind) => Some(*kind),
            Self::RequireGroup { .. } => Some(ErrorKind::DeviceRequireGroup),
            _ => None,
        }
    }
}

impl From<ErrorKind> for GammaError {
    fn from(kind: ErrorKind) -> Self {
        Self::Library(kind)
    }
}

fn group_label(gid: &u32, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{name} ({gid})"),
        None => gid.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_code_once() {
        let codes: Vec<i32> = ErrorKind::all().iter().map(|k| k.code()).collect();
        let expected: Vec<i32> = (ErrorKind::MIN..=-1).rev().collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn test_name_of_no_such_site() {
        assert_eq!(name_of(-3), Some("LIBGAMMA_NO_SUCH_SITE"));
        assert_eq!(value_of("LIBGAMMA_NO_SUCH_SITE"), -3);
    }

    #[test]
    fn test_name_and_value_are_inverse_for_every_entry() {
        for kind in ErrorKind::all() {
            let name = name_of(kind.code()).expect("catalog entry has a name");
            assert_eq!(value_of(name), kind.code());
        }
    }

    #[test]
    fn test_unknown_lookups_do_not_fail() {
        assert_eq!(name_of(0), None);
        assert_eq!(name_of(5), None);
        assert_eq!(name_of(ErrorKind::MIN - 1), None);
        assert_eq!(value_of("LIBGAMMA_NOT_A_REAL_ERROR"), 0);
        assert_eq!(value_of(""), 0);
    }

    #[test]
    fn test_positive_codes_are_os_errors() {
        let err = GammaError::from_code(5);
        assert_eq!(err.code(), Some(5));
        let expected = std::io::Error::from_raw_os_error(5).to_string();
        assert_eq!(err.to_string(), expected);
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_out_of_catalog_negative_code() {
        assert_eq!(GammaError::from_code(-1000), GammaError::Unrecognised(-1000));
    }

    #[test]
    fn test_library_error_display_uses_name_and_description() {
        let err = GammaError::from_code(-5);
        assert_eq!(err.kind(), Some(ErrorKind::NoSuchCrtc));
        assert!(err.to_string().starts_with("LIBGAMMA_NO_SUCH_CRTC: "));
    }

    #[test]
    fn test_require_group_reports_catalog_code() {
        let err = GammaError::RequireGroup {
            gid: 44,
            name: Some("video".to_string()),
        };
        assert_eq!(err.code(), Some(-22));
        assert_eq!(
            err.to_string(),
            "device access requires membership of group video (44)"
        );
    }

    #[test]
    fn test_unresolved_group_shows_gid() {
        let err = GammaError::require_group(1234, None);
        assert_eq!(err.kind(), Some(ErrorKind::DeviceRequireGroup));
        assert_eq!(err.to_string(), "device access requires membership of group 1234");
    }
}
