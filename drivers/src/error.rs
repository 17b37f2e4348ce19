/*++

Licensed under the Apache-2.0 license.

File Name:

    error.rs

Abstract:

    File contains the error type and error constants used by the TRNG driver
    library.

--*/

use core::num::NonZeroU32;

/// TRNG Driver Error Type
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TrngError(pub NonZeroU32);

pub type TrngResult<T> = Result<T, TrngError>;

impl TrngError {
    /// Create a driver error; intended to only be used from const contexts, as
    /// we don't want runtime panics if val is zero.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("TrngError cannot be 0"),
        }
    }

    // Derivation function component.

    /// Entropy input exceeds the maximum pre-DF length
    pub const DRIVER_TRNG_DF_OVERFLOW: TrngError = TrngError::new_const(0x00010001);

    // Register protocol component.

    /// Timed out waiting for a full output queue
    pub const DRIVER_TRNG_GENERATE_TIMEOUT: TrngError = TrngError::new_const(0x00020001);

    /// Timed out waiting for reseed completion
    pub const DRIVER_TRNG_RESEED_TIMEOUT: TrngError = TrngError::new_const(0x00020002);

    /// Serial seed load read-back did not match the byte written
    pub const DRIVER_TRNG_SEED_READBACK: TrngError = TrngError::new_const(0x00020003);

    /// Masked register write did not read back as written
    pub const DRIVER_TRNG_REG_READBACK: TrngError = TrngError::new_const(0x00020004);

    /// Digitized-test fault during generation
    pub const DRIVER_TRNG_CATASTROPHIC_DTF: TrngError = TrngError::new_const(0x00020005);

    /// Two consecutive output bursts were bit-identical
    pub const DRIVER_TRNG_CATASTROPHIC_STUCK: TrngError = TrngError::new_const(0x00020006);

    // Controller component.

    /// Operation not permitted in the current instance state
    pub const DRIVER_TRNG_INVALID_STATE: TrngError = TrngError::new_const(0x00030001);

    /// Configuration rejected at instantiation
    pub const DRIVER_TRNG_INVALID_CONFIG: TrngError = TrngError::new_const(0x00030002);

    /// Seed missing, forbidden for the mode, or too short
    pub const DRIVER_TRNG_INVALID_SEED: TrngError = TrngError::new_const(0x00030003);

    /// DF length multiplier outside [2, 9], or nonzero with DF disabled
    pub const DRIVER_TRNG_INVALID_MULTIPLIER: TrngError = TrngError::new_const(0x00030004);

    /// Requested length below the security strength
    pub const DRIVER_TRNG_INVALID_LEN: TrngError = TrngError::new_const(0x00030005);

    /// Prediction resistance not permitted by the configuration
    pub const DRIVER_TRNG_PREDICT_RESISTANCE: TrngError = TrngError::new_const(0x00030006);

    /// DRNG seed life exhausted without a manual reseed
    pub const DRIVER_TRNG_SEED_LIFE_EXHAUSTED: TrngError = TrngError::new_const(0x00030007);

    /// Collected entropy failed the weak-seed screen
    pub const DRIVER_TRNG_WEAK_SEED: TrngError = TrngError::new_const(0x00030008);

    /// Entropy health test (CERTF) reported a failure
    pub const DRIVER_TRNG_HEALTH_TEST_FAILED: TrngError = TrngError::new_const(0x00030009);

    /// Reseed seed matches the original instantiation seed
    pub const DRIVER_TRNG_SEED_REPLAY: TrngError = TrngError::new_const(0x0003000A);

    /// Instance is in the terminal catastrophic state
    pub const DRIVER_TRNG_CATASTROPHIC_STATE: TrngError = TrngError::new_const(0x0003000B);

    // Self-test component.

    /// Known-answer test output mismatch
    pub const DRIVER_TRNG_KAT_MISMATCH: TrngError = TrngError::new_const(0x00040001);

    /// True if this error marks an unrecoverable hardware defect. The instance
    /// enters the terminal catastrophic state and stays there.
    pub fn is_catastrophic(&self) -> bool {
        matches!(
            *self,
            TrngError::DRIVER_TRNG_CATASTROPHIC_DTF | TrngError::DRIVER_TRNG_CATASTROPHIC_STUCK
        )
    }

    /// True for the abort class: continuing after one of these would silently
    /// weaken the cryptographic guarantees. The integrator is expected to
    /// escalate rather than retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            *self,
            TrngError::DRIVER_TRNG_DF_OVERFLOW | TrngError::DRIVER_TRNG_KAT_MISMATCH
        )
    }
}

impl From<TrngError> for u32 {
    fn from(val: TrngError) -> Self {
        val.0.get()
    }
}
