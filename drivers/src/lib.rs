/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Driver library for the Xilinx Versal PMC True Random Number Generator.

--*/

#![cfg_attr(not(test), no_std)]

mod cipher;
mod df;
mod error;
mod regs;
mod selftest;
mod trng;

pub use df::{DerivationFunction, DfPurpose, MAX_PRE_DF_LEN, PERS_LEN, SEED_LEN};
pub use error::{TrngError, TrngResult};
pub use regs::{Status, TrngBus, TrngRegs, TrngVersion};
pub use selftest::{HealthTest, KnownAnswerTest, KAT_EXPECTED_V1, KAT_EXPECTED_V2};
pub use trng::{
    TrngMode, TrngStats, TrngStatus, TrngUsrCfg, VersalTrng, MAX_SEED_LEN, SEC_STRENGTH_LEN,
    TRNG_MAX_DFLENMULT, TRNG_MIN_DFLENMULT,
};

/// Register map constants, exported for peripheral models and tests.
pub mod regmap {
    pub use crate::regs::{
        PRNGMODE_GEN, PRNGMODE_RESEED, RESET_DELAY_US, TRNG_BURST_SIZE, TRNG_BURST_WORDS,
        TRNG_BYTES_PER_REG, TRNG_CORE_OUTPUT, TRNG_CTRL, TRNG_CTRL_2, TRNG_CTRL_2_DIT_DEFVAL,
        TRNG_CTRL_2_DIT_MASK, TRNG_CTRL_2_DIT_SHIFT, TRNG_CTRL_2_RCTCUTOFF_DEFVAL,
        TRNG_CTRL_2_RCTCUTOFF_MASK, TRNG_CTRL_2_RCTCUTOFF_SHIFT, TRNG_CTRL_3,
        TRNG_CTRL_3_APTCUTOFF_DEFVAL, TRNG_CTRL_3_APTCUTOFF_MASK, TRNG_CTRL_3_APTCUTOFF_SHIFT,
        TRNG_CTRL_3_DLEN_DEFVAL, TRNG_CTRL_3_DLEN_MASK, TRNG_CTRL_3_DLEN_SHIFT, TRNG_CTRL_4,
        TRNG_CTRL_EUMODE_MASK, TRNG_CTRL_PERSODISABLE_MASK, TRNG_CTRL_PRNGMODE_MASK,
        TRNG_CTRL_PRNGSRST_MASK, TRNG_CTRL_PRNGSTART_MASK, TRNG_CTRL_PRNGXS_MASK,
        TRNG_CTRL_SINGLEGENMODE_MASK, TRNG_CTRL_TRSSEN_MASK, TRNG_CTRL_TSTMODE_MASK,
        TRNG_EXT_SEED_0, TRNG_GENERATE_TIMEOUT_US, TRNG_MAX_QCNT, TRNG_NUM_INIT_REGS,
        TRNG_OSC_EN, TRNG_OSC_EN_VAL_MASK, TRNG_PER_STRING_0, TRNG_RESEED_TIMEOUT_US, TRNG_RESET,
        TRNG_RESET_VAL_MASK, TRNG_STATUS, TRNG_STATUS_CERTF_MASK, TRNG_STATUS_DONE_MASK,
        TRNG_STATUS_DTF_MASK, TRNG_STATUS_QCNT_MASK, TRNG_STATUS_QCNT_SHIFT,
    };
}
