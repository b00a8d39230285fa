//! Extended Display Identification Data.
//!
//! Only the base block of EDID 1.x is read: the header, the version, the
//! maximum image size and the display gamma.

use crate::capabilities::CrtcFields;
use crate::error::{ErrorKind, GammaError};
use crate::info::CrtcInformation;

/// Length of an EDID 1.x base block.
pub const EDID_LENGTH: usize = 128;

/// Fixed header of every EDID 1.x base block.
pub const EDID_MAGIC: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

const VERSION: usize = 18;
const REVISION: usize = 19;
const WIDTH_CM: usize = 21;
const HEIGHT_CM: usize = 22;
const GAMMA: usize = 23;

const MAX_REVISION: u8 = 4;
const GAMMA_UNSPECIFIED: u8 = 0xff;

/// Check the length, header and version of an EDID.
pub fn validate(edid: &[u8]) -> Result<(), ErrorKind> {
    if edid.len() != EDID_LENGTH {
        return Err(ErrorKind::EdidLengthUnsupported);
    }
    if edid[..EDID_MAGIC.len()] != EDID_MAGIC {
        return Err(ErrorKind::EdidWrongMagicNumber);
    }
    if edid[VERSION] != 1 || edid[REVISION] > MAX_REVISION {
        return Err(ErrorKind::EdidRevisionUnsupported);
    }
    Ok(())
}

/// Whether the bytes of the block sum to zero modulo 256.
pub fn checksum_ok(edid: &[u8]) -> bool {
    edid.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte)) == 0
}

/// Display gamma encoded in the block, `None` when left unspecified.
pub fn display_gamma(edid: &[u8]) -> Option<f32> {
    match edid.get(GAMMA).copied() {
        None | Some(GAMMA_UNSPECIFIED) => None,
        Some(byte) => Some((f32::from(byte) + 100.0) / 100.0),
    }
}

/// Fill the EDID-derived fields of `info` from `info.edid`.
///
/// Only fields in `fields` are touched: [`CrtcFields::WIDTH_MM_EDID`],
/// [`CrtcFields::HEIGHT_MM_EDID`] and [`CrtcFields::GAMMA`]. A bad checksum
/// still yields the parsed values but flags them as untrustworthy.
pub fn fill_from_edid(info: &mut CrtcInformation, fields: CrtcFields) {
    let derived = fields & (CrtcFields::EDID_VIEWPORT | CrtcFields::GAMMA);
    if derived.is_empty() {
        return;
    }

    if let Err(kind) = validate(&info.edid) {
        info.fail(derived, &GammaError::Library(kind));
        return;
    }

    let edid = &info.edid;
    let width = usize::from(edid[WIDTH_CM]) * 10;
    let height = usize::from(edid[HEIGHT_CM]) * 10;
    let gamma = display_gamma(edid);
    let checksum = checksum_ok(edid);

    if fields.contains(CrtcFields::WIDTH_MM_EDID) {
        info.width_mm_edid = width;
    }
    if fields.contains(CrtcFields::HEIGHT_MM_EDID) {
        info.height_mm_edid = height;
    }
    if fields.contains(CrtcFields::GAMMA) {
        let value = gamma.unwrap_or(0.0);
        info.gamma_red = value;
        info.gamma_green = value;
        info.gamma_blue = value;
    }

    let checksum_error = (!checksum).then_some(ErrorKind::EdidChecksumError);
    for field in (fields & CrtcFields::EDID_VIEWPORT).iter() {
        info.set_error(field, checksum_error.map(GammaError::Library));
    }
    if fields.contains(CrtcFields::GAMMA) {
        let gamma_error = match (gamma.is_some(), checksum) {
            (true, true) => None,
            (true, false) => Some(ErrorKind::EdidChecksumError),
            (false, true) => Some(ErrorKind::GammaNotSpecified),
            (false, false) => Some(ErrorKind::GammaNotSpecifiedAndEdidChecksumError),
        };
        info.gamma_error = gamma_error.map(GammaError::Library);
    }
}

/// Build a minimal valid EDID base block with the given image size in
/// centimetres and gamma byte. Used by the dummy backend and tests.
pub fn synthesize(width_cm: u8, height_cm: u8, gamma_byte: u8) -> Vec<u8> {
    let mut edid = vec![0u8; EDID_LENGTH];
    edid[..EDID_MAGIC.len()].copy_from_slice(&EDID_MAGIC);
    edid[VERSION] = 1;
    edid[REVISION] = 3;
    edid[WIDTH_CM] = width_cm;
    edid[HEIGHT_CM] = height_cm;
    edid[GAMMA] = gamma_byte;
    let sum = edid[..EDID_LENGTH - 1]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    edid[EDID_LENGTH - 1] = sum.wrapping_neg();
    edid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with(edid: Vec<u8>) -> CrtcInformation {
        CrtcInformation {
            edid,
            ..Default::default()
        }
    }

    #[test]
    fn test_synthesized_block_is_valid() {
        let edid = synthesize(52, 32, 120);
        assert_eq!(validate(&edid), Ok(()));
        assert!(checksum_ok(&edid));
        assert_eq!(display_gamma(&edid), Some(2.2));
    }

    #[test]
    fn test_fill_reads_size_and_gamma() {
        let mut info = info_with(synthesize(52, 32, 120));
        fill_from_edid(&mut info, CrtcFields::EDID_FIELDS);
        assert_eq!(info.width_mm_edid, 520);
        assert_eq!(info.height_mm_edid, 320);
        assert!((info.gamma_red - 2.2).abs() < f32::EPSILON);
        assert_eq!(info.gamma_blue, info.gamma_red);
        assert!(!info.has_error());
    }

    #[test]
    fn test_fill_respects_mask() {
        let mut info = info_with(synthesize(52, 32, 120));
        fill_from_edid(&mut info, CrtcFields::WIDTH_MM_EDID);
        assert_eq!(info.width_mm_edid, 520);
        assert_eq!(info.height_mm_edid, 0);
        assert_eq!(info.gamma_red, 0.0);
    }

    #[test]
    fn test_wrong_length() {
        let mut info = info_with(vec![0; 100]);
        fill_from_edid(&mut info, CrtcFields::EDID_VIEWPORT);
        assert_eq!(
            info.error(CrtcFields::WIDTH_MM_EDID),
            Some(&GammaError::Library(ErrorKind::EdidLengthUnsupported))
        );
        assert_eq!(info.error(CrtcFields::GAMMA), None, "gamma was not requested");
    }

    #[test]
    fn test_wrong_magic_and_revision() {
        let mut edid = synthesize(1, 1, 0);
        edid[0] = 1;
        assert_eq!(validate(&edid), Err(ErrorKind::EdidWrongMagicNumber));

        let mut edid = synthesize(1, 1, 0);
        edid[VERSION] = 2;
        assert_eq!(validate(&edid), Err(ErrorKind::EdidRevisionUnsupported));
    }

    #[test]
    fn test_bad_checksum_without_gamma() {
        let mut edid = synthesize(40, 30, GAMMA_UNSPECIFIED);
        edid[EDID_LENGTH - 1] = edid[EDID_LENGTH - 1].wrapping_add(1);
        let mut info = info_with(edid);
        fill_from_edid(&mut info, CrtcFields::EDID_FIELDS);
        assert_eq!(info.width_mm_edid, 400, "values are kept despite the checksum");
        assert_eq!(
            info.error(CrtcFields::HEIGHT_MM_EDID).and_then(GammaError::kind),
            Some(ErrorKind::EdidChecksumError)
        );
        assert_eq!(
            info.error(CrtcFields::GAMMA).and_then(GammaError::kind),
            Some(ErrorKind::GammaNotSpecifiedAndEdidChecksumError)
        );
    }

    #[test]
    fn test_gamma_not_specified() {
        let mut info = info_with(synthesize(40, 30, GAMMA_UNSPECIFIED));
        fill_from_edid(&mut info, CrtcFields::GAMMA);
        assert_eq!(
            info.error(CrtcFields::GAMMA).and_then(GammaError::kind),
            Some(ErrorKind::GammaNotSpecified)
        );
    }
}
