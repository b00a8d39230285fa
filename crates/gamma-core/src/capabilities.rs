//! Capability descriptors and CRTC information field masks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Bit mask over the CRTC information fields.
///
/// Bits the crate does not know about are preserved, so a mask reported by a
/// newer native library survives a round trip untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrtcFields(u32);

impl CrtcFields {
    pub const NONE: Self = Self(0);
    pub const EDID: Self = Self(1 << 0);
    pub const WIDTH_MM: Self = Self(1 << 1);
    pub const HEIGHT_MM: Self = Self(1 << 2);
    pub const WIDTH_MM_EDID: Self = Self(1 << 3);
    pub const HEIGHT_MM_EDID: Self = Self(1 << 4);
    pub const GAMMA_SIZE: Self = Self(1 << 5);
    pub const GAMMA_DEPTH: Self = Self(1 << 6);
    pub const GAMMA_SUPPORT: Self = Self(1 << 7);
    pub const SUBPIXEL_ORDER: Self = Self(1 << 8);
    pub const ACTIVE: Self = Self(1 << 9);
    pub const CONNECTOR_NAME: Self = Self(1 << 10);
    pub const CONNECTOR_TYPE: Self = Self(1 << 11);
    pub const GAMMA: Self = Self(1 << 12);

    /// Number of single-field constants.
    pub const COUNT: usize = 13;

    /// Viewport size as read from the monitor's EDID.
    pub const EDID_VIEWPORT: Self = Self(Self::WIDTH_MM_EDID.0 | Self::HEIGHT_MM_EDID.0);
    /// Everything derived from the EDID, plus the EDID itself.
    pub const EDID_FIELDS: Self = Self(Self::EDID.0 | Self::EDID_VIEWPORT.0 | Self::GAMMA.0);
    /// Viewport size as reported by the display protocol.
    pub const VIEWPORT: Self = Self(Self::WIDTH_MM.0 | Self::HEIGHT_MM.0);
    /// Gamma ramp size and depth.
    pub const RAMP: Self = Self(Self::GAMMA_SIZE.0 | Self::GAMMA_DEPTH.0);
    /// Connector name and type.
    pub const CONNECTOR: Self = Self(Self::CONNECTOR_NAME.0 | Self::CONNECTOR_TYPE.0);
    /// Fields that can only be answered while a monitor is connected.
    pub const ACTIVE_FIELDS: Self = Self(
        Self::EDID_FIELDS.0 | Self::VIEWPORT.0 | Self::SUBPIXEL_ORDER.0 | Self::ACTIVE.0,
    );
    /// Every known field.
    pub const ALL: Self = Self((1 << Self::COUNT) - 1);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// The known single fields in bit order.
    pub fn singles() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(|bit| Self(1 << bit))
    }

    /// The known single fields set in this mask.
    pub fn iter(self) -> impl Iterator<Item = Self> {
        Self::singles().filter(move |field| self.contains(*field))
    }

    /// Display name of a single field; `None` for composite or unknown masks.
    pub const fn label(self) -> Option<&'static str> {
        Some(match self {
            Self::EDID => "edid",
            Self::WIDTH_MM => "width_mm",
            Self::HEIGHT_MM => "height_mm",
            Self::WIDTH_MM_EDID => "width_mm_edid",
            Self::HEIGHT_MM_EDID => "height_mm_edid",
            Self::GAMMA_SIZE => "gamma_size",
            Self::GAMMA_DEPTH => "gamma_depth",
            Self::GAMMA_SUPPORT => "gamma_support",
            Self::SUBPIXEL_ORDER => "subpixel_order",
            Self::ACTIVE => "active",
            Self::CONNECTOR_NAME => "connector_name",
            Self::CONNECTOR_TYPE => "connector_type",
            Self::GAMMA => "gamma",
            _ => return None,
        })
    }
}

impl BitOr for CrtcFields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CrtcFields {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CrtcFields {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for CrtcFields {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for CrtcFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in self.iter() {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(field.label().unwrap_or("?"))?;
        }
        let unknown = self.0 & !Self::ALL.0;
        if unknown != 0 {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            write!(f, "{unknown:#x}")?;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// What an adjustment method can do.
///
/// Flags describe the method in general; a particular site may still fail an
/// operation the flags allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Information fields the method can answer.
    pub crtc_information: CrtcFields,
    /// The default site can be determined from the environment.
    pub default_site_known: bool,
    /// More than one site may exist.
    pub multiple_sites: bool,
    /// A site may hold more than one partition.
    pub multiple_partitions: bool,
    /// A partition may hold more than one CRTC.
    pub multiple_crtcs: bool,
    /// Partitions correspond to graphics cards.
    pub partitions_are_graphics_cards: bool,
    /// Sites can be restored to system settings.
    pub site_restore: bool,
    /// Partitions can be restored to system settings.
    pub partition_restore: bool,
    /// CRTCs can be restored to system settings.
    pub crtc_restore: bool,
    /// The red, green and blue ramps of a CRTC always have the same size.
    pub identical_gamma_sizes: bool,
    /// Ramp sizes are the same on every CRTC.
    pub fixed_gamma_size: bool,
    /// Ramp depth is the same on every CRTC.
    pub fixed_gamma_depth: bool,
    /// The method talks to real hardware or a display server.
    pub real: bool,
    /// The method is a translation layer over another one.
    pub fake: bool,
}

impl Capabilities {
    /// Bit position of the first flag in the combined encoding.
    pub const FLAG_SHIFT: u32 = 33;

    /// Number of flags in the combined encoding.
    pub const FLAG_COUNT: u32 = 13;

    fn flags(&self) -> [bool; Self::FLAG_COUNT as usize] {
        [
            self.default_site_known,
            self.multiple_sites,
            self.multiple_partitions,
            self.multiple_crtcs,
            self.partitions_are_graphics_cards,
            self.site_restore,
            self.partition_restore,
            self.crtc_restore,
            self.identical_gamma_sizes,
            self.fixed_gamma_size,
            self.fixed_gamma_depth,
            self.real,
            self.fake,
        ]
    }

    /// Decode the combined encoding: the low 32 bits are the field mask and
    /// bits 33 through 45 are the flags. Bit 32 is ignored.
    pub fn from_bits(bits: u64) -> Self {
        let flag = |n: u32| bits & (1 << (Self::FLAG_SHIFT + n)) != 0;
        Self {
            crtc_information: CrtcFields::from_bits(bits as u32),
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

    /// Encode into the combined form read by [`Capabilities::from_bits`].
    pub fn to_bits(&self) -> u64 {
        self.flags()
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .fold(u64::from(self.crtc_information.bits()), |bits, (n, _)| {
                bits | 1 << (Self::FLAG_SHIFT + n as u32)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FLAGS: u64 = ((1 << Capabilities::FLAG_COUNT) - 1) << Capabilities::FLAG_SHIFT;

    #[test]
    fn test_all_flags_set() {
        let caps = Capabilities::from_bits(ALL_FLAGS);
        assert!(caps.flags().iter().all(|set| *set), "every flag should be set");
        assert!(caps.crtc_information.is_empty());
    }

    #[test]
    fn test_all_clear() {
        let caps = Capabilities::from_bits(0);
        assert_eq!(caps, Capabilities::default());
        assert_eq!(caps.to_bits(), 0);
    }

    #[test]
    fn test_mask_is_low_32_bits() {
        let caps = Capabilities::from_bits(0xdead_beef | ALL_FLAGS);
        assert_eq!(caps.crtc_information.bits(), 0xdead_beef);
        assert_eq!(caps.to_bits(), 0xdead_beef | ALL_FLAGS);
    }

    #[test]
    fn test_flag_order() {
        let caps = Capabilities::from_bits(1 << 33);
        assert!(caps.default_site_known);
        assert!(!caps.multiple_sites);

        let caps = Capabilities::from_bits(1 << 44);
        assert!(caps.real);
        assert!(!caps.fake);

        let caps = Capabilities::from_bits(1 << 45);
        assert!(caps.fake);
    }

    #[test]
    fn test_bit_32_is_ignored() {
        assert_eq!(Capabilities::from_bits(1 << 32), Capabilities::default());
    }

    #[test]
    fn test_composite_masks() {
        assert_eq!(CrtcFields::EDID_FIELDS.bits(), 0b1_0000_0001_1001);
        assert_eq!(CrtcFields::RAMP.bits(), 0b110_0000);
        assert!(CrtcFields::ACTIVE_FIELDS.contains(CrtcFields::GAMMA));
        assert!(CrtcFields::ACTIVE_FIELDS.contains(CrtcFields::SUBPIXEL_ORDER));
        assert!(!CrtcFields::ACTIVE_FIELDS.intersects(CrtcFields::CONNECTOR));
        assert_eq!(CrtcFields::ALL.iter().count(), CrtcFields::COUNT);
    }

    #[test]
    fn test_fields_display() {
        assert_eq!(CrtcFields::RAMP.to_string(), "gamma_size|gamma_depth");
        assert_eq!(CrtcFields::NONE.to_string(), "none");
        assert_eq!(CrtcFields::from_bits(1 << 20).to_string(), "0x100000");
    }
}
