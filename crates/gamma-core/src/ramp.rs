//! Gamma ramp buffers.
//!
//! A ramp is a lookup table mapping input intensity to output intensity for
//! one colour channel. Ramps come in six encodings: unsigned integers of 8, 16,
//! 32 or 64 bits, and single or double precision floats. The encoding is fixed
//! when a buffer is created and is shared by the three channels of a
//! [`GammaRampSet`].

use crate::error::GammaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Element encoding of a ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RampEncoding {
    U8,
    U16,
    U32,
    U64,
    /// Single precision float.
    F32,
    /// Double precision float.
    F64,
}

impl RampEncoding {
    pub fn all() -> &'static [Self] {
        &[Self::U8, Self::U16, Self::U32, Self::U64, Self::F32, Self::F64]
    }

    /// Depth code: bits per stop for integers, `-1` for single and `-2` for
    /// double precision floats.
    pub const fn depth(self) -> i16 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
            Self::F32 => -1,
            Self::F64 => -2,
        }
    }

    /// Encoding for a depth code. Any other code is rejected.
    pub fn from_depth(depth: i16) -> Result<Self, GammaError> {
        match depth {
            8 => Ok(Self::U8),
            16 => Ok(Self::U16),
            32 => Ok(Self::U32),
            64 => Ok(Self::U64),
            -1 => Ok(Self::F32),
            -2 => Ok(Self::F64),
            _ => Err(GammaError::InvalidArgument(
                "ramp depth must be 8, 16, 32, 64, -1 or -2",
            )),
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Size in bytes of one stop.
    pub const fn stop_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
            Self::U64 | Self::F64 => 8,
        }
    }
}

impl fmt::Display for RampEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        })
    }
}

/// One ramp element, tagged with its encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stop {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Stop {
    pub const fn encoding(self) -> RampEncoding {
        match self {
            Self::U8(_) => RampEncoding::U8,
            Self::U16(_) => RampEncoding::U16,
            Self::U32(_) => RampEncoding::U32,
            Self::U64(_) => RampEncoding::U64,
            Self::F32(_) => RampEncoding::F32,
            Self::F64(_) => RampEncoding::F64,
        }
    }

    /// Value on the unit interval. Integer stops map their full range onto
    /// `0.0..=1.0`; float stops are returned as-is.
    pub fn to_unit(self) -> f64 {
        match self {
            Self::U8(v) => v.to_unit(),
            Self::U16(v) => v.to_unit(),
            Self::U32(v) => v.to_unit(),
            Self::U64(v) => v.to_unit(),
            Self::F32(v) => v.to_unit(),
            Self::F64(v) => v.to_unit(),
        }
    }

    /// Stop of the given encoding for a unit-interval value. Integer
    /// encodings clamp to their range.
    pub fn from_unit(encoding: RampEncoding, value: f64) -> Self {
        match encoding {
            RampEncoding::U8 => Self::U8(u8::from_unit(value)),
            RampEncoding::U16 => Self::U16(u16::from_unit(value)),
            RampEncoding::U32 => Self::U32(u32::from_unit(value)),
            RampEncoding::U64 => Self::U64(u64::from_unit(value)),
            RampEncoding::F32 => Self::F32(f32::from_unit(value)),
            RampEncoding::F64 => Self::F64(f64::from_unit(value)),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Element types a [`RampBuffer`] can hold.
pub trait RampStop: bytemuck::Pod + PartialEq + fmt::Debug + sealed::Sealed {
    const ENCODING: RampEncoding;

    fn to_unit(self) -> f64;
    fn from_unit(value: f64) -> Self;

    #[doc(hidden)]
    fn slice(buffer: &RampBuffer) -> Option<&[Self]>;
    #[doc(hidden)]
    fn slice_mut(buffer: &mut RampBuffer) -> Option<&mut [Self]>;
    #[doc(hidden)]
    fn wrap(stops: Vec<Self>) -> RampBuffer;
}

macro_rules! integer_stop {
    ($ty:ty, $variant:ident) => {
        impl RampStop for $ty {
            const ENCODING: RampEncoding = RampEncoding::$variant;

            fn to_unit(self) -> f64 {
                self as f64 / <$ty>::MAX as f64
            }

            fn from_unit(value: f64) -> Self {
                // Float-to-int `as` saturates, NaN becomes 0.
                (value.clamp(0.0, 1.0) * <$ty>::MAX as f64).round() as $ty
            }

            fn slice(buffer: &RampBuffer) -> Option<&[Self]> {
                match buffer {
                    RampBuffer::$variant(stops) => Some(stops.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(buffer: &mut RampBuffer) -> Option<&mut [Self]> {
                match buffer {
                    RampBuffer::$variant(stops) => Some(stops.as_mut_slice()),
                    _ => None,
                }
            }

            fn wrap(stops: Vec<Self>) -> RampBuffer {
                RampBuffer::$variant(stops)
            }
        }
    };
}

macro_rules! float_stop {
    ($ty:ty, $variant:ident) => {
        impl RampStop for $ty {
            const ENCODING: RampEncoding = RampEncoding::$variant;

            fn to_unit(self) -> f64 {
                self as f64
            }

            fn from_unit(value: f64) -> Self {
                value as $ty
            }

            fn slice(buffer: &RampBuffer) -> Option<&[Self]> {
                match buffer {
                    RampBuffer::$variant(stops) => Some(stops.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(buffer: &mut RampBuffer) -> Option<&mut [Self]> {
                match buffer {
                    RampBuffer::$variant(stops) => Some(stops.as_mut_slice()),
                    _ => None,
                }
            }

            fn wrap(stops: Vec<Self>) -> RampBuffer {
                RampBuffer::$variant(stops)
            }
        }
    };
}

integer_stop!(u8, U8);
integer_stop!(u16, U16);
integer_stop!(u32, U32);
integer_stop!(u64, U64);
float_stop!(f32, F32);
float_stop!(f64, F64);

/// A fixed-length ramp for one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RampBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl RampBuffer {
    /// Zero-filled buffer of `len` stops.
    pub fn new(encoding: RampEncoding, len: usize) -> Self {
        match encoding {
            RampEncoding::U8 => Self::U8(vec![0; len]),
            RampEncoding::U16 => Self::U16(vec![0; len]),
            RampEncoding::U32 => Self::U32(vec![0; len]),
            RampEncoding::U64 => Self::U64(vec![0; len]),
            RampEncoding::F32 => Self::F32(vec![0.0; len]),
            RampEncoding::F64 => Self::F64(vec![0.0; len]),
        }
    }

    pub fn from_vec<T: RampStop>(stops: Vec<T>) -> Self {
        T::wrap(stops)
    }

    pub fn encoding(&self) -> RampEncoding {
        match self {
            Self::U8(_) => RampEncoding::U8,
            Self::U16(_) => RampEncoding::U16,
            Self::U32(_) => RampEncoding::U32,
            Self::U64(_) => RampEncoding::U64,
            Self::F32(_) => RampEncoding::F32,
            Self::F64(_) => RampEncoding::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one stop.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn get(&self, index: usize) -> Stop {
        match self {
            Self::U8(v) => Stop::U8(v[index]),
            Self::U16(v) => Stop::U16(v[index]),
            Self::U32(v) => Stop::U32(v[index]),
            Self::U64(v) => Stop::U64(v[index]),
            Self::F32(v) => Stop::F32(v[index]),
            Self::F64(v) => Stop::F64(v[index]),
        }
    }

    /// Write one stop.
    ///
    /// # Panics
    ///
    /// If `index` is out of range or the stop's encoding differs from the
    /// buffer's.
    pub fn set(&mut self, index: usize, stop: Stop) {
        match (self, stop) {
            (Self::U8(v), Stop::U8(s)) => v[index] = s,
            (Self::U16(v), Stop::U16(s)) => v[index] = s,
            (Self::U32(v), Stop::U32(s)) => v[index] = s,
            (Self::U64(v), Stop::U64(s)) => v[index] = s,
            (Self::F32(v), Stop::F32(s)) => v[index] = s,
            (Self::F64(v), Stop::F64(s)) => v[index] = s,
            (buffer, stop) => panic!(
                "cannot store a {} stop in a {} ramp",
                stop.encoding(),
                buffer.encoding()
            ),
        }
    }

    /// Typed view, `None` when `T` is not the buffer's encoding.
    pub fn as_slice<T: RampStop>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    pub fn as_mut_slice<T: RampStop>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Raw bytes in native endianness.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U8(v) => v.as_slice(),
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
            Self::U64(v) => bytemuck::cast_slice(v),
            Self::F32(v) => bytemuck::cast_slice(v),
            Self::F64(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::U8(v) => v.as_mut_slice(),
            Self::U16(v) => bytemuck::cast_slice_mut(v),
            Self::U32(v) => bytemuck::cast_slice_mut(v),
            Self::U64(v) => bytemuck::cast_slice_mut(v),
            Self::F32(v) => bytemuck::cast_slice_mut(v),
            Self::F64(v) => bytemuck::cast_slice_mut(v),
        }
    }

    /// Apply `f` to every stop through the unit interval.
    pub fn map_unit(&mut self, mut f: impl FnMut(f64) -> f64) {
        let encoding = self.encoding();
        for index in 0..self.len() {
            let value = f(self.get(index).to_unit());
            self.set(index, Stop::from_unit(encoding, value));
        }
    }

    /// Same-length copy in another encoding.
    pub fn converted(&self, encoding: RampEncoding) -> Self {
        if encoding == self.encoding() {
            return self.clone();
        }
        let mut out = Self::new(encoding, self.len());
        for index in 0..self.len() {
            out.set(index, Stop::from_unit(encoding, self.get(index).to_unit()));
        }
        out
    }

    /// Linear identity ramp from the bottom to the top of the range.
    pub fn fill_identity(&mut self) {
        let last = self.len().saturating_sub(1).max(1) as f64;
        let mut index = 0usize;
        self.map_unit(|_| {
            let value = index as f64 / last;
            index += 1;
            value
        });
    }
}

/// Red, green and blue ramps of one CRTC.
///
/// Channel sizes may differ. The three channels must share one encoding;
/// [`GammaRampSet::validate`] checks that before any backend sees the set.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaRampSet {
    red: RampBuffer,
    green: RampBuffer,
    blue: RampBuffer,
}

impl GammaRampSet {
    /// Zero-filled set with the given channel sizes.
    pub fn new(red: usize, green: usize, blue: usize, encoding: RampEncoding) -> Self {
        Self {
            red: RampBuffer::new(encoding, red),
            green: RampBuffer::new(encoding, green),
            blue: RampBuffer::new(encoding, blue),
        }
    }

    /// Zero-filled set for a depth code, rejecting unsupported depths.
    pub fn with_depth(red: usize, green: usize, blue: usize, depth: i16) -> Result<Self, GammaError> {
        Ok(Self::new(red, green, blue, RampEncoding::from_depth(depth)?))
    }

    /// Set of identical-size ramps with a linear identity curve.
    pub fn identity(size: usize, encoding: RampEncoding) -> Self {
        let mut set = Self::new(size, size, size, encoding);
        set.fill_identity();
        set
    }

    /// Assemble a set from three buffers of one encoding.
    pub fn from_buffers(red: RampBuffer, green: RampBuffer, blue: RampBuffer) -> Result<Self, GammaError> {
        let set = Self { red, green, blue };
        set.validate()?;
        Ok(set)
    }

    /// Check the three channels share one encoding.
    pub fn validate(&self) -> Result<(), GammaError> {
        let encoding = self.red.encoding();
        if self.green.encoding() != encoding || self.blue.encoding() != encoding {
            return Err(GammaError::InvalidArgument(
                "red, green and blue ramps must share one encoding",
            ));
        }
        Ok(())
    }

    /// Encoding of the set, taken from the red channel.
    pub fn encoding(&self) -> RampEncoding {
        self.red.encoding()
    }

    /// Red, green and blue sizes.
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.red.len(), self.green.len(), self.blue.len())
    }

    pub fn has_identical_sizes(&self) -> bool {
        let (red, green, blue) = self.sizes();
        red == green && green == blue
    }

    pub fn red(&self) -> &RampBuffer {
        &self.red
    }

    pub fn green(&self) -> &RampBuffer {
        &self.green
    }

    pub fn blue(&self) -> &RampBuffer {
        &self.blue
    }

    pub fn red_mut(&mut self) -> RampChannelMut<'_> {
        RampChannelMut(&mut self.red)
    }

    pub fn green_mut(&mut self) -> RampChannelMut<'_> {
        RampChannelMut(&mut self.green)
    }

    pub fn blue_mut(&mut self) -> RampChannelMut<'_> {
        RampChannelMut(&mut self.blue)
    }

    pub fn channels(&self) -> [&RampBuffer; 3] {
        [&self.red, &self.green, &self.blue]
    }

    pub fn channels_mut(&mut self) -> [RampChannelMut<'_>; 3] {
        [
            RampChannelMut(&mut self.red),
            RampChannelMut(&mut self.green),
            RampChannelMut(&mut self.blue),
        ]
    }

    pub fn fill_identity(&mut self) {
        for mut channel in self.channels_mut() {
            channel.fill_identity();
        }
    }

    /// Same-size copy in another encoding.
    pub fn converted(&self, encoding: RampEncoding) -> Self {
        Self {
            red: self.red.converted(encoding),
            green: self.green.converted(encoding),
            blue: self.blue.converted(encoding),
        }
    }
}

/// Mutable access to the stops of one channel of a [`GammaRampSet`].
///
/// Stops can be rewritten in place, but the channel cannot be swapped for a
/// buffer of another encoding or length.
#[derive(Debug)]
pub struct RampChannelMut<'set>(&'set mut RampBuffer);

impl RampChannelMut<'_> {
    /// See [`RampBuffer::set`].
    pub fn set(&mut self, index: usize, stop: Stop) {
        self.0.set(index, stop);
    }

    pub fn as_mut_slice<T: RampStop>(&mut self) -> Option<&mut [T]> {
        self.0.as_mut_slice()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.0.as_bytes_mut()
    }

    pub fn map_unit(&mut self, f: impl FnMut(f64) -> f64) {
        self.0.map_unit(f);
    }

    pub fn fill_identity(&mut self) {
        self.0.fill_identity();
    }
}

impl Deref for RampChannelMut<'_> {
    type Target = RampBuffer;

    fn deref(&self) -> &RampBuffer {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_codes() {
        for &encoding in RampEncoding::all() {
            assert_eq!(RampEncoding::from_depth(encoding.depth()), Ok(encoding));
        }
        for depth in [0, 1, 7, 12, 24, 128, -3] {
            assert!(
                RampEncoding::from_depth(depth).is_err(),
                "depth {depth} should be rejected"
            );
        }
    }

    #[test]
    fn test_with_depth_rejects_invalid_depth() {
        let err = GammaRampSet::with_depth(4, 4, 4, 12).unwrap_err();
        assert!(matches!(err, GammaError::InvalidArgument(_)));
    }

    #[test]
    fn test_get_set() {
        let mut ramp = RampBuffer::new(RampEncoding::U16, 4);
        ramp.set(2, Stop::U16(0x8000));
        assert_eq!(ramp.get(2), Stop::U16(0x8000));
        assert_eq!(ramp.as_slice::<u16>(), Some(&[0, 0, 0x8000, 0][..]));
        assert_eq!(ramp.as_slice::<u8>(), None);
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_range_panics() {
        RampBuffer::new(RampEncoding::F32, 4).get(4);
    }

    #[test]
    #[should_panic(expected = "cannot store a u8 stop in a u16 ramp")]
    fn test_set_wrong_encoding_panics() {
        RampBuffer::new(RampEncoding::U16, 4).set(0, Stop::U8(1));
    }

    #[test]
    fn test_identity_ramp_endpoints() {
        let mut ramp = RampBuffer::new(RampEncoding::U8, 256);
        ramp.fill_identity();
        let stops = ramp.as_slice::<u8>().unwrap();
        for (index, stop) in stops.iter().enumerate() {
            assert_eq!(*stop as usize, index);
        }

        let mut ramp = RampBuffer::new(RampEncoding::F64, 3);
        ramp.fill_identity();
        assert_eq!(ramp.as_slice::<f64>(), Some(&[0.0, 0.5, 1.0][..]));
    }

    #[test]
    fn test_conversion_keeps_extremes() {
        let ramp = RampBuffer::from_vec(vec![0u16, u16::MAX]);
        let wide = ramp.converted(RampEncoding::U32);
        assert_eq!(wide.as_slice::<u32>(), Some(&[0, u32::MAX][..]));
        let float = ramp.converted(RampEncoding::F32);
        assert_eq!(float.as_slice::<f32>(), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_byte_view_length() {
        let ramp = RampBuffer::new(RampEncoding::U64, 5);
        assert_eq!(ramp.as_bytes().len(), 40);
    }

    #[test]
    fn test_validate_rejects_mixed_encodings() {
        assert!(GammaRampSet::new(4, 4, 4, RampEncoding::U16).validate().is_ok());
        assert!(
            GammaRampSet::from_buffers(
                RampBuffer::new(RampEncoding::U8, 2),
                RampBuffer::new(RampEncoding::U8, 2),
                RampBuffer::new(RampEncoding::F64, 2),
            )
            .is_err()
        );
    }

    #[test]
    fn test_sizes_may_differ() {
        let set = GammaRampSet::new(256, 128, 64, RampEncoding::F32);
        assert_eq!(set.sizes(), (256, 128, 64));
        assert!(!set.has_identical_sizes());
    }

    #[test]
    fn test_channel_writes_keep_shape() {
        let mut set = GammaRampSet::new(256, 256, 7, RampEncoding::U16);
        {
            let mut blue = set.blue_mut();
            blue.set(6, Stop::U16(0xffff));
            blue.as_mut_slice::<u16>().unwrap()[0] = 1;
            assert_eq!(blue.len(), 7);
            assert_eq!(blue.encoding(), RampEncoding::U16);
        }
        for mut channel in set.channels_mut() {
            channel.map_unit(|value| value / 2.0);
        }
        assert!(set.validate().is_ok());
        assert_eq!(set.sizes(), (256, 256, 7));
        assert_eq!(set.blue().get(6), Stop::U16(0x8000));
        for channel in set.channels() {
            assert_eq!(channel.encoding(), RampEncoding::U16);
        }
    }
}
