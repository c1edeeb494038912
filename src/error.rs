//! Error types for servo-control.
//!
//! Provides unified error handling across configuration, command entry points,
//! and the latched runtime fault register.

use core::fmt;

use crate::config::{ControlMode, InputMode};

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all servo-control operations.
///
/// These are synchronous, call-site errors: a failed call leaves prior state
/// intact. Runtime faults detected inside the control tick are latched as
/// [`Fault`] values instead and never abort the tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Command entry-point error
    Command(CommandError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Position gain must be finite and non-negative
    InvalidPosGain(f32),
    /// Velocity gain must be finite and non-negative
    InvalidVelGain(f32),
    /// Velocity integrator gain must be finite and non-negative
    InvalidVelIntegratorGain(f32),
    /// Velocity limit must be finite and positive
    InvalidVelLimit(f32),
    /// Velocity limit tolerance is a ratio and must be >= 1.0
    InvalidVelLimitTolerance(f32),
    /// Velocity ramp rate must be finite and positive
    InvalidVelRampRate(f32),
    /// Torque ramp rate must be finite and positive
    InvalidTorqueRampRate(f32),
    /// Circular setpoint range must be finite and positive
    InvalidCircularRange(f32),
    /// Inertia feed-forward coefficient must be finite and non-negative
    InvalidInertia(f32),
    /// Input filter bandwidth must be finite and positive
    InvalidFilterBandwidth(f32),
    /// Homing speed must be finite and non-negative
    InvalidHomingSpeed(f32),
    /// Gain scheduling width must be finite and positive
    InvalidGainSchedulingWidth(f32),
    /// Mirror ratio must be finite
    InvalidMirrorRatio(f32),
    /// Control mode and input mode cannot be combined
    InvalidModeCombination {
        /// Configured control mode
        control: ControlMode,
        /// Configured input mode
        input: InputMode,
    },
    /// Mirror axis index exceeds the axis count of the owning device
    MirrorAxisOutOfRange {
        /// Requested axis index
        axis: u8,
        /// Number of axes available
        count: u8,
    },
    /// Encoder index exceeds the estimator count of the owning axis
    EncoderOutOfRange {
        /// Requested estimator index
        encoder: u8,
        /// Number of estimators available
        count: u8,
    },
    /// Calibration sweep velocities must be positive with end <= start
    InvalidCalibrationVelocity {
        /// Sweep start velocity
        start: f32,
        /// Sweep end velocity
        end: f32,
    },
    /// Calibration gains must be finite and positive
    InvalidCalibrationGain {
        /// Calibration start gain
        start: f32,
        /// Calibration end gain
        end: f32,
    },
    /// Calibration convergence tolerance must be finite and positive
    InvalidCalibrationTolerance(f32),
    /// Maximum compensation torque must be finite and non-negative
    InvalidMaxCompensationTorque(f32),
    /// Failed to parse TOML configuration
    #[cfg(feature = "std")]
    ParseError(heapless::String<128>),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Command entry-point errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Cogging table index out of range (indices are rejected, never wrapped)
    IndexOutOfRange {
        /// Requested index
        index: u32,
        /// Table length
        len: usize,
    },
    /// Anticogging calibration is already running
    CalibrationRunning,
    /// Encoder selection rejected (no estimator at that index)
    InvalidEncoderSelection {
        /// Requested estimator index
        encoder: u8,
        /// Number of estimators available
        count: u8,
    },
}

/// Latched runtime fault kinds.
///
/// Faults are latched inside the control tick; the tick always completes and
/// keeps publishing a ramp-limited torque. Reacting to a fault (disarming) is
/// the owning axis's responsibility. When several faults occur in one tick,
/// the highest-severity one wins (see [`Fault::severity`]); a lower-severity
/// fault never overwrites an already-latched higher-severity one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Requested estimator index has no corresponding valid estimator
    InvalidEstimatorSelection,
    /// A required position/velocity estimate was absent this tick
    MissingEstimate,
    /// Control mode and input mode combination is invalid at runtime
    /// (e.g. torque-mode velocity limiting without a velocity estimate)
    InvalidModeCombination,
    /// Mirror input mode is active but no mirror source was supplied
    InvalidMirrorAxis,
    /// Velocity estimate magnitude exceeded limit × tolerance
    Overspeed,
    /// Anticogging calibration aborted without converging
    CalibrationAborted,
}

impl Fault {
    /// Severity rank; lower is more severe.
    ///
    /// Structural faults (bad estimator/mode wiring) outrank operating-point
    /// faults (overspeed) which outrank procedure outcomes (calibration).
    pub const fn severity(self) -> u8 {
        match self {
            Fault::InvalidEstimatorSelection => 0,
            Fault::MissingEstimate => 1,
            Fault::InvalidModeCombination => 2,
            Fault::InvalidMirrorAxis => 3,
            Fault::Overspeed => 4,
            Fault::CalibrationAborted => 5,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Command(e) => write!(f, "Command error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPosGain(v) => write!(f, "Invalid pos_gain: {}. Must be >= 0", v),
            ConfigError::InvalidVelGain(v) => write!(f, "Invalid vel_gain: {}. Must be >= 0", v),
            ConfigError::InvalidVelIntegratorGain(v) => {
                write!(f, "Invalid vel_integrator_gain: {}. Must be >= 0", v)
            }
            ConfigError::InvalidVelLimit(v) => write!(f, "Invalid vel_limit: {}. Must be > 0", v),
            ConfigError::InvalidVelLimitTolerance(v) => {
                write!(f, "Invalid vel_limit_tolerance: {}. Must be >= 1", v)
            }
            ConfigError::InvalidVelRampRate(v) => {
                write!(f, "Invalid vel_ramp_rate: {}. Must be > 0", v)
            }
            ConfigError::InvalidTorqueRampRate(v) => {
                write!(f, "Invalid torque_ramp_rate: {}. Must be > 0", v)
            }
            ConfigError::InvalidCircularRange(v) => {
                write!(f, "Invalid circular_setpoint_range: {}. Must be > 0", v)
            }
            ConfigError::InvalidInertia(v) => write!(f, "Invalid inertia: {}. Must be >= 0", v),
            ConfigError::InvalidFilterBandwidth(v) => {
                write!(f, "Invalid input_filter_bandwidth: {}. Must be > 0", v)
            }
            ConfigError::InvalidHomingSpeed(v) => {
                write!(f, "Invalid homing_speed: {}. Must be >= 0", v)
            }
            ConfigError::InvalidGainSchedulingWidth(v) => {
                write!(f, "Invalid gain_scheduling_width: {}. Must be > 0", v)
            }
            ConfigError::InvalidMirrorRatio(v) => {
                write!(f, "Invalid mirror_ratio: {}. Must be finite", v)
            }
            ConfigError::InvalidModeCombination { control, input } => {
                write!(f, "Input mode {:?} is invalid in control mode {:?}", input, control)
            }
            ConfigError::MirrorAxisOutOfRange { axis, count } => {
                write!(f, "Mirror axis {} out of range (device has {} axes)", axis, count)
            }
            ConfigError::EncoderOutOfRange { encoder, count } => {
                write!(f, "Encoder {} out of range ({} estimators available)", encoder, count)
            }
            ConfigError::InvalidCalibrationVelocity { start, end } => {
                write!(
                    f,
                    "Invalid calibration velocities: start {} end {}. Need 0 < end <= start",
                    start, end
                )
            }
            ConfigError::InvalidCalibrationGain { start, end } => {
                write!(f, "Invalid calibration gains: start {} end {}. Must be > 0", start, end)
            }
            ConfigError::InvalidCalibrationTolerance(v) => {
                write!(f, "Invalid calibration end_tolerance: {}. Must be > 0", v)
            }
            ConfigError::InvalidMaxCompensationTorque(v) => {
                write!(f, "Invalid anticogging max_torque: {}. Must be >= 0", v)
            }
            #[cfg(feature = "std")]
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::IndexOutOfRange { index, len } => {
                write!(f, "Cogging table index {} out of range (len {})", index, len)
            }
            CommandError::CalibrationRunning => {
                write!(f, "Anticogging calibration already running")
            }
            CommandError::InvalidEncoderSelection { encoder, count } => {
                write!(f, "Encoder {} rejected ({} estimators available)", encoder, count)
            }
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::InvalidEstimatorSelection => write!(f, "invalid estimator selection"),
            Fault::MissingEstimate => write!(f, "missing estimate"),
            Fault::InvalidModeCombination => write!(f, "invalid mode combination"),
            Fault::InvalidMirrorAxis => write!(f, "invalid mirror axis"),
            Fault::Overspeed => write!(f, "overspeed"),
            Fault::CalibrationAborted => write!(f, "calibration aborted"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Error::Command(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for CommandError {}
