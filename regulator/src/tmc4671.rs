// TMC4671 register map subset used by the regulation core
// Only this module knows about register addresses and bit layouts

/// TMC4671 register addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    AdcI1ScaleOffset = 0x08,
    AdcI0ScaleOffset = 0x09,
    MotorTypeNPolePairs = 0x1B,
    OpenloopVelocityTarget = 0x21,
    UqUdExt = 0x24,
    HallMode = 0x33,
    HallPhiEPhiMOffset = 0x37,
    PhiESelection = 0x52,
    PidFluxPFluxI = 0x54,
    PidTorquePTorqueI = 0x56,
    PidVelocityPVelocityI = 0x58,
    PidTorqueFluxLimits = 0x5E,
    PidVelocityLimit = 0x60,
    ModeRampModeMotion = 0x63,
    PidTorqueFluxTarget = 0x64,
    PidVelocityTarget = 0x66,
    PidTorqueFluxActual = 0x69,
    PidVelocityActual = 0x6A,
}

impl Register {
    /// Register address as sent in the SPI datagram
    pub const fn address(self) -> u8 {
        self as u8
    }
}

/// Bit field inside a 32 bit register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub register: Register,
    pub mask: u32,
    pub shift: u8,
    /// Field is a two's complement value and must be sign extended on read
    pub signed: bool,
}

impl Field {
    const fn new(register: Register, mask: u32, shift: u8, signed: bool) -> Self {
        Self {
            register,
            mask,
            shift,
            signed,
        }
    }

    /// Extract this field from a raw register value
    pub fn extract(&self, raw: i32) -> i32 {
        let bits = (raw as u32 & self.mask) >> self.shift;
        if self.signed {
            let width = (self.mask >> self.shift).count_ones();
            let unused = 32 - width;
            ((bits << unused) as i32) >> unused
        } else {
            bits as i32
        }
    }

    /// Replace this field inside a raw register value
    pub fn insert(&self, raw: i32, value: i32) -> i32 {
        let cleared = raw as u32 & !self.mask;
        let bits = ((value as u32) << self.shift) & self.mask;
        (cleared | bits) as i32
    }
}

/// Field definitions
pub mod fields {
    use super::{Field, Register};

    pub const ADC_I0_OFFSET: Field = Field::new(Register::AdcI0ScaleOffset, 0x0000_FFFF, 0, false);
    pub const ADC_I1_OFFSET: Field = Field::new(Register::AdcI1ScaleOffset, 0x0000_FFFF, 0, false);

    pub const N_POLE_PAIRS: Field = Field::new(Register::MotorTypeNPolePairs, 0x0000_FFFF, 0, false);

    pub const HALL_MODE: Field = Field::new(Register::HallMode, 0x0000_1111, 0, false);
    pub const HALL_PHI_E_OFFSET: Field =
        Field::new(Register::HallPhiEPhiMOffset, 0xFFFF_0000, 16, true);

    pub const PID_TORQUE_P: Field = Field::new(Register::PidTorquePTorqueI, 0xFFFF_0000, 16, false);
    pub const PID_TORQUE_I: Field = Field::new(Register::PidTorquePTorqueI, 0x0000_FFFF, 0, false);
    pub const PID_FLUX_P: Field = Field::new(Register::PidFluxPFluxI, 0xFFFF_0000, 16, false);
    pub const PID_FLUX_I: Field = Field::new(Register::PidFluxPFluxI, 0x0000_FFFF, 0, false);
    pub const PID_VELOCITY_P: Field =
        Field::new(Register::PidVelocityPVelocityI, 0xFFFF_0000, 16, false);
    pub const PID_VELOCITY_I: Field =
        Field::new(Register::PidVelocityPVelocityI, 0x0000_FFFF, 0, false);

    pub const MODE_MOTION: Field = Field::new(Register::ModeRampModeMotion, 0x0000_00FF, 0, false);

    pub const PID_TORQUE_TARGET: Field =
        Field::new(Register::PidTorqueFluxTarget, 0xFFFF_0000, 16, true);
    pub const PID_FLUX_TARGET: Field =
        Field::new(Register::PidTorqueFluxTarget, 0x0000_FFFF, 0, true);

    pub const PID_TORQUE_ACTUAL: Field =
        Field::new(Register::PidTorqueFluxActual, 0xFFFF_0000, 16, true);
    pub const PID_FLUX_ACTUAL: Field =
        Field::new(Register::PidTorqueFluxActual, 0x0000_FFFF, 0, true);
}

/// HALL_MODE bits
pub mod hall_mode {
    pub const POLARITY: i32 = 0x0000_0001;
    pub const INTERPOLATION: i32 = 0x0000_0100;
    pub const DIRECTION: i32 = 0x0000_1000;
}

/// Electrical motion mode of the driver (MODE_RAMP_MODE_MOTION)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DriverMotionMode {
    Stopped = 0,
    Torque = 1,
    Velocity = 2,
    UqUdExt = 8,
}

/// Electrical angle source (PHI_E_SELECTION)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PhiESelection {
    External = 1,
    OpenLoop = 2,
    Hall = 5,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_field_extract() {
        // torque = -100 (upper half), flux = 25 (lower half)
        let raw = ((-100i32 as u32) << 16 | 25) as i32;
        assert_eq!(fields::PID_TORQUE_ACTUAL.extract(raw), -100);
        assert_eq!(fields::PID_FLUX_ACTUAL.extract(raw), 25);
    }

    #[test]
    fn test_insert_keeps_other_bits() {
        let raw = fields::PID_FLUX_TARGET.insert(0, -1);
        assert_eq!(raw, 0x0000_FFFF);
        let raw = fields::PID_TORQUE_TARGET.insert(raw, 300);
        assert_eq!(fields::PID_TORQUE_TARGET.extract(raw), 300);
        assert_eq!(fields::PID_FLUX_TARGET.extract(raw), -1);
    }

    #[test]
    fn test_unsigned_field() {
        let raw = fields::N_POLE_PAIRS.insert(0x0003_0000, 7);
        assert_eq!(fields::N_POLE_PAIRS.extract(raw), 7);
        assert_eq!(raw as u32 & 0xFFFF_0000, 0x0003_0000);
    }
}
