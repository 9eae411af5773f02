//! Parameter error type

/// Reason a setter or operator command was rejected.
///
/// A rejected call never mutates controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    /// Motor index outside the configured motor count
    InvalidMotor,

    /// Value outside its permitted range
    OutOfRange,

    /// Raw value does not name a variant (commutation mode, direction, flag)
    InvalidEnum,

    /// Commutation is disabled, no motion objective can be entered
    CommutationDisabled,

    /// Current based objectives are not available with open-loop commutation
    NotSupportedInOpenLoop,

    /// Driver re-enable refused while the overtemperature flag is latched
    Overtemperature,
}
