//! Adjustment method identifiers and list selectors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a backend: a display protocol on a particular operating system.
///
/// The enum is a plain selector key. Everything a method can do is reached
/// through the [`Registry`](crate::registry::Registry) or a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum AdjustmentMethod {
    /// Configurable in-process method, useful for exercising error handling.
    Dummy = 0,
    /// The RandR protocol under the X display server.
    XRandr = 1,
    /// The older VidMode protocol under X. Controls only the primary CRTC
    /// of each screen.
    XVidMode = 2,
    /// The Direct Rendering Manager in Linux. Works without a display server.
    LinuxDrm = 3,
    /// The Graphics Device Interface in Windows.
    W32Gdi = 4,
    /// CoreGraphics under the Quartz display server.
    QuartzCoreGraphics = 5,
}

impl AdjustmentMethod {
    /// Highest raw value of a known method.
    pub const MAX: i32 = 5;

    /// Number of known methods, including ones a build may lack.
    pub const COUNT: usize = Self::MAX as usize + 1;

    /// Every known method, ordered by raw value.
    pub fn all() -> &'static [Self] {
        const ALL: [AdjustmentMethod; AdjustmentMethod::COUNT] = [
            AdjustmentMethod::Dummy,
            AdjustmentMethod::XRandr,
            AdjustmentMethod::XVidMode,
            AdjustmentMethod::LinuxDrm,
            AdjustmentMethod::W32Gdi,
            AdjustmentMethod::QuartzCoreGraphics,
        ];
        &ALL
    }

    /// Look a method up by its raw value. Unknown values yield `None`.
    pub fn from_raw(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::all().get(index).copied())
    }

    /// Raw numeric value shared with the native library.
    pub const fn value(self) -> i32 {
        self as i32
    }

    /// Short lowercase name for logs and status text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dummy => "dummy",
            Self::XRandr => "randr",
            Self::XVidMode => "vidmode",
            Self::LinuxDrm => "drm",
            Self::W32Gdi => "gdi",
            Self::QuartzCoreGraphics => "quartz",
        }
    }
}

impl fmt::Display for AdjustmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which methods [`Registry::list`](crate::registry::Registry::list) returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodSelector {
    /// Methods the environment suggests will work, excluding translation layers.
    LikelyWorkingReal = 0,
    /// Methods the environment suggests will work, including translation layers.
    LikelyWorkingIncludingFake = 1,
    /// Every real method that is not a translation layer.
    AllRealNonFake = 2,
    /// Every real method.
    AllReal = 3,
    /// Every available method.
    All = 4,
}

impl MethodSelector {
    /// Look a selector up by its raw value.
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::LikelyWorkingReal),
            1 => Some(Self::LikelyWorkingIncludingFake),
            2 => Some(Self::AllRealNonFake),
            3 => Some(Self::AllReal),
            4 => Some(Self::All),
            _ => None,
        }
    }
}
