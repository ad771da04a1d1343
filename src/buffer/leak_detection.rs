//! Detection of buffers dropped without being released.
//!
//! Every [`ManagedBuffer`](crate::ManagedBuffer) must be released exactly
//! once. Dropping one that is still live always returns its region to the
//! pool; [`LeakDetection`] decides whether that is also reported.

use std::backtrace::Backtrace;
use std::fmt;
use std::str::FromStr;

/// What to do when a live buffer is dropped.
///
/// Capturing allocation backtraces is expensive, so detection is off by
/// default. The mode is read when a buffer is allocated; switching it only
/// affects buffers allocated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LeakDetection {
    /// Reclaim silently.
    #[default]
    Disabled,
    /// Capture the allocation site, reclaim, count the leak and log it.
    Track,
    /// As `Track`, then panic at the drop site.
    Strict,
}

impl LeakDetection {
    /// Whether allocations capture a backtrace and leaks are counted.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, LeakDetection::Disabled)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            LeakDetection::Disabled => 0,
            LeakDetection::Track => 1,
            LeakDetection::Strict => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => LeakDetection::Track,
            2 => LeakDetection::Strict,
            _ => LeakDetection::Disabled,
        }
    }

    /// Capture the current call site if this mode wants one.
    pub(crate) fn capture(&self) -> Option<Backtrace> {
        self.is_enabled().then(Backtrace::force_capture)
    }
}

impl fmt::Display for LeakDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeakDetection::Disabled => write!(f, "disabled"),
            LeakDetection::Track => write!(f, "track"),
            LeakDetection::Strict => write!(f, "strict"),
        }
    }
}

/// Error returned when parsing an unknown leak detection mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown leak detection mode {0:?}, expected disabled, track or strict")]
pub struct ParseLeakDetectionError(String);

impl FromStr for LeakDetection {
    type Err = ParseLeakDetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "false" => Ok(LeakDetection::Disabled),
            "track" | "on" | "true" => Ok(LeakDetection::Track),
            "strict" => Ok(LeakDetection::Strict),
            _ => Err(ParseLeakDetectionError(s.to_string())),
        }
    }
}
