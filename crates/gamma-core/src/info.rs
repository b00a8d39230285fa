//! CRTC information records.
//!
//! A query asks for a set of [`CrtcFields`]. Each requested field succeeds or
//! fails on its own; a failure is recorded next to the field and the rest of
//! the record is still usable. Fields that were not requested keep their
//! default values and carry no error.

use crate::capabilities::CrtcFields;
use crate::error::GammaError;
use crate::ramp::RampEncoding;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical layout of the subpixels on the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum SubpixelOrder {
    /// The order could not be determined.
    #[default]
    Unknown = 0,
    /// No subpixels, or not applicable.
    None = 1,
    HorizontalRgb = 2,
    HorizontalBgr = 3,
    VerticalRgb = 4,
    VerticalBgr = 5,
}

impl SubpixelOrder {
    pub fn all() -> &'static [Self] {
        &[
            Self::Unknown,
            Self::None,
            Self::HorizontalRgb,
            Self::HorizontalBgr,
            Self::VerticalRgb,
            Self::VerticalBgr,
        ]
    }

    pub fn from_raw(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::all().get(index).copied())
    }

    pub const fn value(self) -> i32 {
        self as i32
    }
}

/// Kind of connector a CRTC drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConnectorType {
    #[default]
    Unknown = 0,
    Vga = 1,
    Dvi = 2,
    /// Integrated DVI (DVI-I).
    DviI = 3,
    /// Digital DVI (DVI-D).
    DviD = 4,
    /// Analogue DVI (DVI-A).
    DviA = 5,
    Composite = 6,
    /// Separate Video (S-video).
    SVideo = 7,
    /// Low-voltage differential signaling.
    Lvds = 8,
    Component = 9,
    /// 9 pin DIN (Deutsches Institut für Normung) connector.
    NinePinDin = 10,
    DisplayPort = 11,
    /// High-Definition Multimedia Interface.
    Hdmi = 12,
    /// HDMI type A.
    HdmiA = 13,
    /// HDMI type B.
    HdmiB = 14,
    /// Television.
    Tv = 15,
    /// Embedded DisplayPort.
    EDp = 16,
    /// A virtual connector.
    Virtual = 17,
    /// Display Serial Interface.
    Dsi = 18,
    /// LFP connector.
    Lfp = 19,
}

impl ConnectorType {
    pub fn all() -> &'static [Self] {
        &[
            Self::Unknown,
            Self::Vga,
            Self::Dvi,
            Self::DviI,
            Self::DviD,
            Self::DviA,
            Self::Composite,
            Self::SVideo,
            Self::Lvds,
            Self::Component,
            Self::NinePinDin,
            Self::DisplayPort,
            Self::Hdmi,
            Self::HdmiA,
            Self::HdmiB,
            Self::Tv,
            Self::EDp,
            Self::Virtual,
            Self::Dsi,
            Self::Lfp,
        ]
    }

    pub fn from_raw(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::all().get(index).copied())
    }

    pub const fn value(self) -> i32 {
        self as i32
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Vga => "VGA",
            Self::Dvi => "DVI",
            Self::DviI => "DVI-I",
            Self::DviD => "DVI-D",
            Self::DviA => "DVI-A",
            Self::Composite => "Composite",
            Self::SVideo => "S-video",
            Self::Lvds => "LVDS",
            Self::Component => "Component",
            Self::NinePinDin => "9PinDIN",
            Self::DisplayPort => "DisplayPort",
            Self::Hdmi => "HDMI",
            Self::HdmiA => "HDMI-A",
            Self::HdmiB => "HDMI-B",
            Self::Tv => "TV",
            Self::EDp => "eDP",
            Self::Virtual => "Virtual",
            Self::Dsi => "DSI",
            Self::Lfp => "LFP",
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Information about one CRTC and the monitor connected to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrtcInformation {
    /// Raw EDID of the monitor.
    pub edid: Vec<u8>,
    pub edid_error: Option<GammaError>,

    /// Physical width of the viewport in millimetres, as reported by the
    /// display protocol. Zero if unknown.
    pub width_mm: usize,
    pub width_mm_error: Option<GammaError>,
    pub height_mm: usize,
    pub height_mm_error: Option<GammaError>,

    /// Physical width of the viewport in millimetres, as read from the EDID.
    /// The EDID stores whole centimetres.
    pub width_mm_edid: usize,
    pub width_mm_edid_error: Option<GammaError>,
    pub height_mm_edid: usize,
    pub height_mm_edid_error: Option<GammaError>,

    pub red_gamma_size: usize,
    pub green_gamma_size: usize,
    pub blue_gamma_size: usize,
    /// Shared by the three size fields.
    pub gamma_size_error: Option<GammaError>,

    /// Native ramp depth code, see [`RampEncoding::depth`].
    pub gamma_depth: i16,
    pub gamma_depth_error: Option<GammaError>,

    /// Whether the CRTC accepts gamma ramp adjustments.
    pub gamma_support: bool,
    pub gamma_support_error: Option<GammaError>,

    pub subpixel_order: SubpixelOrder,
    pub subpixel_order_error: Option<GammaError>,

    /// Whether a monitor is connected.
    pub active: bool,
    pub active_error: Option<GammaError>,

    pub connector_name: Option<String>,
    pub connector_name_error: Option<GammaError>,
    pub connector_type: ConnectorType,
    pub connector_type_error: Option<GammaError>,

    /// Monitor gamma per channel, as read from the EDID.
    pub gamma_red: f32,
    pub gamma_green: f32,
    pub gamma_blue: f32,
    /// Shared by the three gamma fields.
    pub gamma_error: Option<GammaError>,
}

impl CrtcInformation {
    /// Whether any field reported an error.
    pub fn has_error(&self) -> bool {
        CrtcFields::singles().any(|field| self.error(field).is_some())
    }

    /// Error recorded for a single field. Composite masks yield `None`.
    pub fn error(&self, field: CrtcFields) -> Option<&GammaError> {
        self.error_slot(field)?.as_ref()
    }

    /// Record the outcome for a single field. Composite masks are ignored.
    pub fn set_error(&mut self, field: CrtcFields, error: Option<GammaError>) {
        if let Some(slot) = self.error_slot_mut(field) {
            *slot = error;
        }
    }

    /// Record the same error for every field in `fields`.
    pub fn fail(&mut self, fields: CrtcFields, error: &GammaError) {
        for field in fields.iter() {
            self.set_error(field, Some(error.clone()));
        }
    }

    /// Fields that reported an error.
    pub fn failed_fields(&self) -> CrtcFields {
        CrtcFields::singles()
            .filter(|field| self.error(*field).is_some())
            .fold(CrtcFields::NONE, |mask, field| mask | field)
    }

    /// Native ramp encoding, when the depth was read and is one we know.
    pub fn encoding(&self) -> Option<RampEncoding> {
        if self.gamma_depth_error.is_some() {
            return None;
        }
        RampEncoding::from_depth(self.gamma_depth).ok()
    }

    /// Reset every field outside `fields`, values and errors alike.
    pub fn retain(&mut self, fields: CrtcFields) {
        let blank = Self::default();
        for field in CrtcFields::singles().filter(|field| !fields.contains(*field)) {
            match field {
                CrtcFields::EDID => self.edid = Vec::new(),
                CrtcFields::WIDTH_MM => self.width_mm = blank.width_mm,
                CrtcFields::HEIGHT_MM => self.height_mm = blank.height_mm,
                CrtcFields::WIDTH_MM_EDID => self.width_mm_edid = blank.width_mm_edid,
                CrtcFields::HEIGHT_MM_EDID => self.height_mm_edid = blank.height_mm_edid,
                CrtcFields::GAMMA_SIZE => {
                    self.red_gamma_size = 0;
                    self.green_gamma_size = 0;
                    self.blue_gamma_size = 0;
                }
                CrtcFields::GAMMA_DEPTH => self.gamma_depth = blank.gamma_depth,
                CrtcFields::GAMMA_SUPPORT => self.gamma_support = blank.gamma_support,
                CrtcFields::SUBPIXEL_ORDER => self.subpixel_order = blank.subpixel_order,
                CrtcFields::ACTIVE => self.active = blank.active,
                CrtcFields::CONNECTOR_NAME => self.connector_name = None,
                CrtcFields::CONNECTOR_TYPE => self.connector_type = blank.connector_type,
                CrtcFields::GAMMA => {
                    self.gamma_red = 0.0;
                    self.gamma_green = 0.0;
                    self.gamma_blue = 0.0;
                }
                _ => {}
            }
            self.set_error(field, None);
        }
    }

    /// EDID as lowercase hexadecimal.
    pub fn edid_hex(&self) -> String {
        behex(&self.edid)
    }

    fn error_slot(&self, field: CrtcFields) -> Option<&Option<GammaError>> {
        Some(match field {
            CrtcFields::EDID => &self.edid_error,
            CrtcFields::WIDTH_MM => &self.width_mm_error,
            CrtcFields::HEIGHT_MM => &self.height_mm_error,
            CrtcFields::WIDTH_MM_EDID => &self.width_mm_edid_error,
            CrtcFields::HEIGHT_MM_EDID => &self.height_mm_edid_error,
            CrtcFields::GAMMA_SIZE => &self.gamma_size_error,
            CrtcFields::GAMMA_DEPTH => &self.gamma_depth_error,
            CrtcFields::GAMMA_SUPPORT => &self.gamma_support_error,
            CrtcFields::SUBPIXEL_ORDER => &self.subpixel_order_error,
            CrtcFields::ACTIVE => &self.active_error,
            CrtcFields::CONNECTOR_NAME => &self.connector_name_error,
            CrtcFields::CONNECTOR_TYPE => &self.connector_type_error,
            CrtcFields::GAMMA => &self.gamma_error,
            _ => return None,
        })
    }

    fn error_slot_mut(&mut self, field: CrtcFields) -> Option<&mut Option<GammaError>> {
        Some(match field {
            CrtcFields::EDID => &mut self.edid_error,
            CrtcFields::WIDTH_MM => &mut self.width_mm_error,
            CrtcFields::HEIGHT_MM => &mut self.height_mm_error,
            CrtcFields::WIDTH_MM_EDID => &mut self.width_mm_edid_error,
            CrtcFields::HEIGHT_MM_EDID => &mut self.height_mm_edid_error,
            CrtcFields::GAMMA_SIZE => &mut self.gamma_size_error,
            CrtcFields::GAMMA_DEPTH => &mut self.gamma_depth_error,
            CrtcFields::GAMMA_SUPPORT => &mut self.gamma_support_error,
            CrtcFields::SUBPIXEL_ORDER => &mut self.subpixel_order_error,
            CrtcFields::ACTIVE => &mut self.active_error,
            CrtcFields::CONNECTOR_NAME => &mut self.connector_name_error,
            CrtcFields::CONNECTOR_TYPE => &mut self.connector_type_error,
            CrtcFields::GAMMA => &mut self.gamma_error,
            _ => return None,
        })
    }
}

/// Lowercase hexadecimal, two characters per byte, no separators.
pub fn behex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Inverse of [`behex`]. Either case is accepted; odd lengths and non-hex
/// characters are rejected.
pub fn unhex(text: &str) -> Result<Vec<u8>, GammaError> {
    hex::decode(text).map_err(|err| match err {
        hex::FromHexError::OddLength => {
            GammaError::InvalidArgument("hexadecimal text must have an even length")
        }
        _ => GammaError::InvalidArgument("hexadecimal text contains a non-hex character"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_hex_round_trip() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = behex(&bytes);
        assert_eq!(text.len(), 512);
        assert!(text.starts_with("000102"));
        assert!(text.ends_with("fdfeff"));
        assert_eq!(unhex(&text).unwrap(), bytes);
    }

    #[test]
    fn test_unhex_accepts_uppercase() {
        assert_eq!(unhex("00FFaB").unwrap(), vec![0x00, 0xff, 0xab]);
        assert_eq!(unhex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_unhex_rejects_bad_input() {
        assert_eq!(
            unhex("abc"),
            Err(GammaError::InvalidArgument("hexadecimal text must have an even length"))
        );
        assert_eq!(
            unhex("0g"),
            Err(GammaError::InvalidArgument("hexadecimal text contains a non-hex character"))
        );
        assert!(unhex("0 ").is_err(), "separator");
        assert!(unhex("0x00").is_err(), "prefix");
    }

    #[test]
    fn test_enum_raw_values() {
        assert_eq!(SubpixelOrder::from_raw(5), Some(SubpixelOrder::VerticalBgr));
        assert_eq!(SubpixelOrder::from_raw(6), None);
        assert_eq!(ConnectorType::from_raw(16), Some(ConnectorType::EDp));
        assert_eq!(ConnectorType::from_raw(19), Some(ConnectorType::Lfp));
        assert_eq!(ConnectorType::from_raw(20), None);
        for (index, connector) in ConnectorType::all().iter().enumerate() {
            assert_eq!(connector.value() as usize, index);
        }
    }

    #[test]
    fn test_default_record_has_no_error() {
        let info = CrtcInformation::default();
        assert!(!info.has_error());
        assert_eq!(info.failed_fields(), CrtcFields::NONE);
    }

    #[test]
    fn test_has_error_covers_active_and_gamma() {
        let mut info = CrtcInformation::default();
        info.set_error(CrtcFields::ACTIVE, Some(ErrorKind::StateUnknown.into()));
        assert!(info.has_error());

        let mut info = CrtcInformation::default();
        info.set_error(CrtcFields::GAMMA, Some(ErrorKind::GammaNotSpecified.into()));
        assert!(info.has_error());
        assert_eq!(info.failed_fields(), CrtcFields::GAMMA);
    }

    #[test]
    fn test_retain_resets_unrequested_fields() {
        let mut info = CrtcInformation {
            red_gamma_size: 256,
            green_gamma_size: 256,
            blue_gamma_size: 256,
            gamma_depth: 16,
            active: true,
            connector_name: Some("VGA-1".to_string()),
            ..Default::default()
        };
        info.fail(CrtcFields::EDID_FIELDS, &ErrorKind::EdidNotFound.into());

        info.retain(CrtcFields::GAMMA_SIZE);

        assert_eq!(info.red_gamma_size, 256);
        assert_eq!(info.gamma_depth, 0);
        assert!(!info.active);
        assert_eq!(info.connector_name, None);
        assert!(!info.has_error(), "errors outside the mask are cleared too");
    }

    #[test]
    fn test_encoding_from_depth() {
        let info = CrtcInformation {
            gamma_depth: -2,
            ..Default::default()
        };
        assert_eq!(info.encoding(), Some(RampEncoding::F64));
        assert_eq!(CrtcInformation::default().encoding(), None);
    }
}
