/*++

Licensed under the Apache-2.0 license.

File Name:

    trng.rs

Abstract:

    Driver for the Versal PMC True Random Number Generator: a ring
    oscillator entropy source feeding a NIST SP800-90A DRBG with health test
    logic. Supports three modes, each with or without the derivation
    function:

    DRNG  - deterministic mode; the caller supplies the seed.
    PTRNG - entropy mode; digitized entropy source output is the random
            data.
    HRNG  - hybrid mode; the entropy source seeds the DRBG which generates
            the random data.

    The silicon revision 1 DRBG has no derivation function of its own, so
    seed conditioning runs through the software implementation in df.rs.
    Revision 2 carries a native derivation function fed over the bit-serial
    seed interface.

--*/

use crate::cipher::BLOCK_LEN;
use crate::df::{DerivationFunction, DfPurpose, PERS_LEN, SEED_LEN};
use crate::error::{TrngError, TrngResult};
use crate::regs::{
    TrngBus, TrngRegs, TrngVersion, PRNGMODE_GEN, PRNGMODE_RESEED, TRNG_CTRL,
    TRNG_CTRL_2_DIT_DEFVAL, TRNG_CTRL_2_DIT_MASK, TRNG_CTRL_2_DIT_SHIFT,
    TRNG_CTRL_2_RCTCUTOFF_DEFVAL, TRNG_CTRL_2_RCTCUTOFF_MASK, TRNG_CTRL_2_RCTCUTOFF_SHIFT,
    TRNG_CTRL_3_APTCUTOFF_DEFVAL, TRNG_CTRL_3_APTCUTOFF_MASK, TRNG_CTRL_3_APTCUTOFF_SHIFT,
    TRNG_CTRL_3_DLEN_MASK, TRNG_CTRL_3_DLEN_SHIFT, TRNG_CTRL_EUMODE_MASK,
    TRNG_CTRL_PERSODISABLE_MASK, TRNG_CTRL_PRNGMODE_MASK, TRNG_CTRL_PRNGXS_MASK,
    TRNG_CTRL_TRSSEN_MASK, TRNG_CTRL_TSTMODE_MASK, TRNG_CTRL_2, TRNG_CTRL_3, TRNG_STATUS,
    TRNG_STATUS_DONE_MASK, TRNG_RESEED_TIMEOUT_US,
};
use crate::selftest::{HealthTest, KnownAnswerTest};

/// Security strength in bytes; every generate produces this much.
pub const SEC_STRENGTH_LEN: usize = 32;

/// Largest pre-DF seed: (TRNG_MAX_DFLENMULT + 1) blocks.
pub const MAX_SEED_LEN: usize = 160;

pub const TRNG_MIN_DFLENMULT: u32 = 2;
pub const TRNG_MAX_DFLENMULT: u32 = 9;

const ALL_A_PATTERN_32: u32 = 0xAAAA_AAAA;
const ALL_5_PATTERN_32: u32 = 0x5555_5555;

/// Operating mode of the TRNG instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrngMode {
    Drng,
    Ptrng,
    Hrng,
}

/// Lifecycle state of the instance.
///
/// `Catastrophic` is terminal: a digitized-test fault or stuck core output
/// means the hardware can no longer be trusted, and no operation (including
/// release) leaves the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrngStatus {
    Uninitialized,
    Healthy,
    Error,
    Catastrophic,
}

/// User configuration accepted by [`VersalTrng::instantiate`].
///
/// `init_seed` holds up to [`MAX_SEED_LEN`] bytes; the consumed length is
/// `(dfmul + 1) * 16` with the derivation function, [`SEED_LEN`] without.
#[derive(Clone, Copy)]
pub struct TrngUsrCfg {
    pub mode: TrngMode,
    pub seed_life: u32,
    pub predict_en: bool,
    pub df_disable: bool,
    pub dfmul: u32,
    pub init_seed: Option<[u8; MAX_SEED_LEN]>,
    pub pstr: Option<[u8; PERS_LEN]>,
}

/// Running counters; reset points differ by field. `bytes` accumulates over
/// the life of the driver, the other two restart at every reseed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrngStats {
    pub bytes: u64,
    pub bytes_reseed: u64,
    pub elapsed_seed_life: u32,
}

/// TRNG instance bound to one hardware block.
pub struct VersalTrng<B: TrngBus> {
    regs: TrngRegs<B>,
    status: TrngStatus,
    usr_cfg: Option<TrngUsrCfg>,
    stats: TrngStats,
    df: DerivationFunction,
    entropy: [u8; MAX_SEED_LEN],
    len: usize,
}

impl<B: TrngBus> VersalTrng<B> {
    pub fn new(bus: B, version: TrngVersion) -> Self {
        Self {
            regs: TrngRegs::new(bus, version),
            status: TrngStatus::Uninitialized,
            usr_cfg: None,
            stats: TrngStats::default(),
            df: DerivationFunction::new(),
            entropy: [0; MAX_SEED_LEN],
            len: 0,
        }
    }

    pub fn status(&self) -> TrngStatus {
        self.status
    }

    pub fn stats(&self) -> TrngStats {
        self.stats
    }

    pub fn version(&self) -> TrngVersion {
        self.regs.version()
    }

    /// Validates `usr_cfg`, resets the block and seeds the DRBG (except in
    /// PTRNG mode, which seeds nothing). On success the instance is
    /// `Healthy`.
    pub fn instantiate(&mut self, usr_cfg: &TrngUsrCfg) -> TrngResult<()> {
        self.guard_catastrophic()?;
        self.try_instantiate(usr_cfg).map_err(|err| self.fail(err))
    }

    fn try_instantiate(&mut self, usr_cfg: &TrngUsrCfg) -> TrngResult<()> {
        if self.status != TrngStatus::Uninitialized {
            return Err(TrngError::DRIVER_TRNG_INVALID_STATE);
        }
        if usr_cfg.mode != TrngMode::Ptrng && usr_cfg.seed_life == 0 {
            return Err(TrngError::DRIVER_TRNG_INVALID_CONFIG);
        }
        if usr_cfg.mode == TrngMode::Drng && usr_cfg.init_seed.is_none() {
            return Err(TrngError::DRIVER_TRNG_INVALID_SEED);
        }
        if usr_cfg.mode == TrngMode::Hrng && usr_cfg.init_seed.is_some() {
            return Err(TrngError::DRIVER_TRNG_INVALID_SEED);
        }
        Self::check_multiplier(usr_cfg.df_disable, usr_cfg.dfmul)?;
        if usr_cfg.mode == TrngMode::Ptrng
            && (usr_cfg.init_seed.is_some()
                || usr_cfg.pstr.is_some()
                || usr_cfg.predict_en
                || usr_cfg.seed_life != 0)
        {
            return Err(TrngError::DRIVER_TRNG_INVALID_CONFIG);
        }

        self.usr_cfg = Some(*usr_cfg);

        // Bring the TRNG and the PRNG unit core out of reset.
        self.regs.reset();

        if self.regs.version() == TrngVersion::V2
            && matches!(usr_cfg.mode, TrngMode::Ptrng | TrngMode::Hrng)
        {
            // Cutoff values for the adaptive proportion and repetition count
            // tests, plus the digitization interval.
            self.regs.clrset(
                TRNG_CTRL_3,
                TRNG_CTRL_3_APTCUTOFF_MASK,
                TRNG_CTRL_3_APTCUTOFF_DEFVAL << TRNG_CTRL_3_APTCUTOFF_SHIFT,
            );
            self.regs.clrset(
                TRNG_CTRL_2,
                TRNG_CTRL_2_RCTCUTOFF_MASK,
                TRNG_CTRL_2_RCTCUTOFF_DEFVAL << TRNG_CTRL_2_RCTCUTOFF_SHIFT,
            );
            self.regs.clrset(
                TRNG_CTRL_2,
                TRNG_CTRL_2_DIT_MASK,
                TRNG_CTRL_2_DIT_DEFVAL << TRNG_CTRL_2_DIT_SHIFT,
            );
        }

        if usr_cfg.mode != TrngMode::Ptrng {
            let seed = usr_cfg.init_seed;
            let pstr = usr_cfg.pstr;
            self.reseed_internal(
                seed.as_ref().map(|s| &s[..]),
                pstr.as_ref(),
                usr_cfg.dfmul,
            )?;
        }

        self.status = TrngStatus::Healthy;
        Ok(())
    }

    /// Reseeds a DRNG (caller-supplied seed) or HRNG (oscillator-sourced)
    /// instance. A DRNG seed identical to the instantiation seed is
    /// rejected.
    pub fn reseed(&mut self, eseed: Option<&[u8]>, mul: u32) -> TrngResult<()> {
        self.guard_catastrophic()?;
        self.try_reseed(eseed, mul).map_err(|err| self.fail(err))
    }

    fn try_reseed(&mut self, eseed: Option<&[u8]>, mul: u32) -> TrngResult<()> {
        if self.status != TrngStatus::Healthy {
            return Err(TrngError::DRIVER_TRNG_INVALID_STATE);
        }
        let usr_cfg = self.usr_cfg.ok_or(TrngError::DRIVER_TRNG_INVALID_STATE)?;
        if usr_cfg.mode == TrngMode::Ptrng {
            return Err(TrngError::DRIVER_TRNG_INVALID_CONFIG);
        }
        if usr_cfg.mode == TrngMode::Drng && eseed.is_none() {
            return Err(TrngError::DRIVER_TRNG_INVALID_SEED);
        }
        if usr_cfg.mode != TrngMode::Drng && eseed.is_some() {
            return Err(TrngError::DRIVER_TRNG_INVALID_SEED);
        }
        Self::check_multiplier(usr_cfg.df_disable, mul)?;
        if let (Some(eseed), Some(init_seed)) = (eseed, usr_cfg.init_seed.as_ref()) {
            let cmp_len = self.len.min(eseed.len());
            if eseed[..cmp_len] == init_seed[..cmp_len] {
                return Err(TrngError::DRIVER_TRNG_SEED_REPLAY);
            }
        }

        if self.regs.version() == TrngVersion::V2 {
            // A previous cycle may still be completing; the result of this
            // wait is deliberately ignored.
            let _ = self.regs.wait_for_event(
                TRNG_STATUS,
                TRNG_STATUS_DONE_MASK,
                TRNG_STATUS_DONE_MASK,
                TRNG_RESEED_TIMEOUT_US,
                TrngError::DRIVER_TRNG_RESEED_TIMEOUT,
            );
        }

        self.reseed_internal(eseed, None, mul)
    }

    /// Produces [`SEC_STRENGTH_LEN`] bytes into the front of `buf`.
    ///
    /// `predict` requests prediction resistance: the DRBG must reseed before
    /// this generate if anything was generated since the last seed. Only
    /// HRNG instances configured with `predict_en` can honor it.
    pub fn generate(&mut self, buf: &mut [u8], predict: bool) -> TrngResult<()> {
        self.guard_catastrophic()?;
        self.try_generate(buf, predict).map_err(|err| self.fail(err))
    }

    fn try_generate(&mut self, buf: &mut [u8], predict: bool) -> TrngResult<()> {
        if buf.len() < SEC_STRENGTH_LEN {
            return Err(TrngError::DRIVER_TRNG_INVALID_LEN);
        }
        if self.status != TrngStatus::Healthy {
            return Err(TrngError::DRIVER_TRNG_INVALID_STATE);
        }
        let usr_cfg = self.usr_cfg.ok_or(TrngError::DRIVER_TRNG_INVALID_STATE)?;
        if predict && (usr_cfg.mode == TrngMode::Ptrng || !usr_cfg.predict_en) {
            return Err(TrngError::DRIVER_TRNG_PREDICT_RESISTANCE);
        }

        let mut len = SEC_STRENGTH_LEN;
        let mut via_df = false;

        match usr_cfg.mode {
            TrngMode::Hrng => {
                if self.stats.elapsed_seed_life >= usr_cfg.seed_life {
                    self.reseed_internal(None, None, 0)?;
                }
                if predict && self.stats.elapsed_seed_life > 0 {
                    self.reseed_internal(None, None, 0)?;
                }
                self.regs.write(TRNG_CTRL, PRNGMODE_GEN);
            }
            TrngMode::Drng => {
                if self.stats.elapsed_seed_life > usr_cfg.seed_life {
                    return Err(TrngError::DRIVER_TRNG_SEED_LIFE_EXHAUSTED);
                }
                if predict && self.stats.elapsed_seed_life > 0 {
                    return Err(TrngError::DRIVER_TRNG_PREDICT_RESISTANCE);
                }
                self.regs.write(TRNG_CTRL, PRNGMODE_GEN);
            }
            TrngMode::Ptrng => {
                if !usr_cfg.df_disable {
                    len = (usr_cfg.dfmul as usize + 1) * BLOCK_LEN;
                    self.len = len;
                    via_df = true;
                }
                self.regs.enable_oscillators();
                self.regs.soft_reset();
                self.regs
                    .write(TRNG_CTRL, TRNG_CTRL_EUMODE_MASK | TRNG_CTRL_TRSSEN_MASK);
            }
        }

        let check_dtf = usr_cfg.mode != TrngMode::Ptrng;
        if via_df {
            self.regs
                .collect_random(Some(&mut self.entropy[..len]), len, check_dtf)?;
        } else {
            self.regs
                .collect_random(Some(&mut buf[..len]), len, check_dtf)?;
        }

        self.stats.bytes_reseed += len as u64;
        self.stats.bytes += len as u64;
        self.stats.elapsed_seed_life += 1;

        if via_df {
            let out = *self
                .df
                .derive(&self.entropy[..len], None, DfPurpose::Generate)?;
            buf[..SEC_STRENGTH_LEN].copy_from_slice(&out[..SEC_STRENGTH_LEN]);
        }

        Ok(())
    }

    /// Zeroizes the seed and personalization registers, holds the block in
    /// reset and clears the instance back to `Uninitialized`.
    ///
    /// A catastrophic instance is still scrubbed and held in reset, but the
    /// state is not cleared and the call reports the terminal condition.
    pub fn release(&mut self) -> TrngResult<()> {
        if self.status == TrngStatus::Catastrophic {
            self.scrub();
            return Err(TrngError::DRIVER_TRNG_CATASTROPHIC_STATE);
        }
        if self.status == TrngStatus::Uninitialized {
            return Err(self.fail(TrngError::DRIVER_TRNG_INVALID_STATE));
        }

        self.scrub();
        self.status = TrngStatus::Uninitialized;
        Ok(())
    }

    fn scrub(&mut self) {
        self.regs.write_seed_regs(None);
        self.regs.write_pstr_regs(None);
        self.regs.hold_reset();

        self.usr_cfg = None;
        self.df.clear();
        self.entropy = [0; MAX_SEED_LEN];
        self.len = 0;
    }

    /// Boot-time bring-up: known-answer test, entropy health test, then
    /// instantiation with `usr_cfg` and a first oscillator reseed. Only HRNG
    /// configurations pass the final reseed.
    pub fn hw_init(&mut self, usr_cfg: &TrngUsrCfg) -> TrngResult<()> {
        KnownAnswerTest::for_version(self.regs.version())
            .execute(self)
            .map_err(|err| {
                log::error!("KAT failed");
                err
            })?;

        HealthTest::default().execute(self).map_err(|err| {
            log::error!("health test failed");
            err
        })?;

        self.instantiate(usr_cfg).map_err(|err| {
            log::error!("driver instantiation failed");
            err
        })?;

        self.reseed(None, usr_cfg.dfmul).map_err(|err| {
            log::error!("initial reseed failed");
            err
        })
    }

    /// Fills `buf` with random data, one security-strength generate at a
    /// time. A trailing partial chunk is staged through a local buffer so
    /// the DRBG never produces less than full strength.
    pub fn get_random_bytes(&mut self, buf: &mut [u8]) -> TrngResult<()> {
        let mut chunks = buf.chunks_exact_mut(SEC_STRENGTH_LEN);
        for chunk in &mut chunks {
            self.generate(chunk, false)?;
        }

        let rem = chunks.into_remainder();
        if !rem.is_empty() {
            let mut random = [0u8; SEC_STRENGTH_LEN];
            self.generate(&mut random, false)?;
            rem.copy_from_slice(&random[..rem.len()]);
        }

        Ok(())
    }

    fn guard_catastrophic(&self) -> TrngResult<()> {
        if self.status == TrngStatus::Catastrophic {
            return Err(TrngError::DRIVER_TRNG_CATASTROPHIC_STATE);
        }
        Ok(())
    }

    /// Records a failure in the instance state and hands the error back.
    /// Catastrophic errors take over the state permanently; everything else
    /// degrades to `Error` unless the instance is already catastrophic.
    pub(crate) fn fail(&mut self, err: TrngError) -> TrngError {
        if err.is_catastrophic() {
            self.status = TrngStatus::Catastrophic;
        } else if self.status != TrngStatus::Catastrophic {
            self.status = TrngStatus::Error;
        }
        err
    }

    fn check_multiplier(df_disable: bool, mul: u32) -> TrngResult<()> {
        if !df_disable && !(TRNG_MIN_DFLENMULT..=TRNG_MAX_DFLENMULT).contains(&mul) {
            return Err(TrngError::DRIVER_TRNG_INVALID_MULTIPLIER);
        }
        if df_disable && mul != 0 {
            return Err(TrngError::DRIVER_TRNG_INVALID_MULTIPLIER);
        }
        Ok(())
    }

    /// Reseed state machine shared by instantiate, explicit reseed and the
    /// HRNG auto-reseed. Programs the seed source, starts the cycle, waits
    /// for completion and checks the entropy health test flag.
    fn reseed_internal(
        &mut self,
        eseed: Option<&[u8]>,
        pstr: Option<&[u8; PERS_LEN]>,
        mul: u32,
    ) -> TrngResult<()> {
        let usr_cfg = self.usr_cfg.ok_or(TrngError::DRIVER_TRNG_INVALID_STATE)?;

        self.stats.bytes_reseed = 0;
        self.stats.elapsed_seed_life = 0;

        self.len = if usr_cfg.df_disable {
            SEED_LEN
        } else {
            (mul as usize + 1) * BLOCK_LEN
        };

        match self.regs.version() {
            TrngVersion::V2 => self.reseed_v2(eseed, pstr, mul)?,
            TrngVersion::V1 if usr_cfg.df_disable => self.reseed_nodf(usr_cfg.mode, eseed, pstr)?,
            TrngVersion::V1 => self.reseed_df(usr_cfg.mode, eseed, pstr)?,
        }

        if self.regs.version() == TrngVersion::V1 {
            self.regs
                .write(TRNG_CTRL, PRNGMODE_RESEED | TRNG_CTRL_PRNGXS_MASK);
            self.regs.start();
        }

        self.regs
            .wait_for_event(
                TRNG_STATUS,
                TRNG_STATUS_DONE_MASK,
                TRNG_STATUS_DONE_MASK,
                TRNG_RESEED_TIMEOUT_US,
                TrngError::DRIVER_TRNG_RESEED_TIMEOUT,
            )
            .map_err(|err| {
                log::error!("timeout waiting for reseed completion");
                err
            })?;

        // SP800-90B entropy health test result.
        if self.regs.status().certf() {
            log::error!("entropy health test failure during reseed");
            return Err(TrngError::DRIVER_TRNG_HEALTH_TEST_FAILED);
        }

        self.regs.stop();
        Ok(())
    }

    /// Revision 1 reseed with the software derivation function: gather the
    /// pre-DF material, condition it and load the derived seed into the
    /// parallel seed registers.
    fn reseed_df(
        &mut self,
        mode: TrngMode,
        eseed: Option<&[u8]>,
        pstr: Option<&[u8; PERS_LEN]>,
    ) -> TrngResult<()> {
        let len = self.len;
        match mode {
            TrngMode::Hrng => {
                self.collect_entropy(len)?;
                self.screen_entropy(len)?;
            }
            TrngMode::Drng => {
                let eseed = eseed.ok_or(TrngError::DRIVER_TRNG_INVALID_SEED)?;
                if eseed.len() < len {
                    return Err(TrngError::DRIVER_TRNG_INVALID_SEED);
                }
                self.entropy[..len].copy_from_slice(&eseed[..len]);
            }
            TrngMode::Ptrng => {}
        }

        let seed = *self.df.derive(&self.entropy[..len], pstr, DfPurpose::Seed)?;
        self.regs.write_seed_regs(Some(&seed));
        Ok(())
    }

    /// Revision 1 reseed without the derivation function: raw seed material
    /// goes straight into the seed registers, the personalization string
    /// into its own bank.
    fn reseed_nodf(
        &mut self,
        mode: TrngMode,
        eseed: Option<&[u8]>,
        pstr: Option<&[u8; PERS_LEN]>,
    ) -> TrngResult<()> {
        match mode {
            TrngMode::Hrng => {
                self.collect_entropy(SEED_LEN)?;
                self.screen_entropy(SEED_LEN)?;
                let entropy = self.entropy;
                self.regs.write_seed_regs(Some(&entropy[..SEED_LEN]));
            }
            TrngMode::Drng => {
                let eseed = eseed.ok_or(TrngError::DRIVER_TRNG_INVALID_SEED)?;
                if eseed.len() < SEED_LEN {
                    return Err(TrngError::DRIVER_TRNG_INVALID_SEED);
                }
                self.regs.write_seed_regs(Some(&eseed[..SEED_LEN]));
            }
            TrngMode::Ptrng => self.regs.write_seed_regs(None),
        }

        if let Some(pstr) = pstr {
            self.regs.write_pstr_regs(Some(&pstr[..]));
        }
        Ok(())
    }

    /// Revision 2 reseed through the native derivation function. All
    /// configuration writes verify by read-back; external seed material is
    /// shifted in serially after the cycle starts.
    fn reseed_v2(
        &mut self,
        eseed: Option<&[u8]>,
        pstr: Option<&[u8; PERS_LEN]>,
        mul: u32,
    ) -> TrngResult<()> {
        self.regs
            .write_masked_checked(TRNG_CTRL_3, TRNG_CTRL_3_DLEN_MASK, mul << TRNG_CTRL_3_DLEN_SHIFT)?;

        let mut persmask = TRNG_CTRL_PERSODISABLE_MASK;
        if let Some(pstr) = pstr {
            self.regs.write_pstr_regs(Some(&pstr[..]));
            persmask = 0;
        }
        self.regs
            .write_masked_checked(TRNG_CTRL, TRNG_CTRL_PERSODISABLE_MASK, persmask)?;

        match eseed {
            Some(eseed) => {
                let len = self.len;
                if eseed.len() < len {
                    return Err(TrngError::DRIVER_TRNG_INVALID_SEED);
                }
                // Test mode gates the serial seed interface; PRNG mode 0
                // selects reseed.
                self.regs.write_masked_checked(
                    TRNG_CTRL,
                    TRNG_CTRL_PRNGMODE_MASK | TRNG_CTRL_TSTMODE_MASK | TRNG_CTRL_TRSSEN_MASK,
                    TRNG_CTRL_TSTMODE_MASK | TRNG_CTRL_TRSSEN_MASK,
                )?;
                // The derivation function only accepts seed input while the
                // cycle is running.
                self.regs.start();
                self.regs.load_seed_serial(&eseed[..len])?;
            }
            None => {
                self.regs.enable_oscillators();
                self.regs.write_masked_checked(
                    TRNG_CTRL,
                    TRNG_CTRL_PRNGMODE_MASK | TRNG_CTRL_TRSSEN_MASK | TRNG_CTRL_PRNGXS_MASK,
                    TRNG_CTRL_TRSSEN_MASK,
                )?;
                self.regs.start();
            }
        }
        Ok(())
    }

    /// Runs the entropy unit and captures `len` bytes of digitized entropy.
    fn collect_entropy(&mut self, len: usize) -> TrngResult<()> {
        self.regs.enable_oscillators();
        self.regs.soft_reset();
        self.regs
            .write(TRNG_CTRL, TRNG_CTRL_EUMODE_MASK | TRNG_CTRL_TRSSEN_MASK);
        self.regs
            .collect_random(Some(&mut self.entropy[..len]), len, true)
    }

    /// Rejects collected seed material containing the degenerate alternating
    /// bit patterns.
    fn screen_entropy(&self, len: usize) -> TrngResult<()> {
        for word in self.entropy[..len].chunks_exact(4) {
            let word = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
            if word == ALL_A_PATTERN_32 || word == ALL_5_PATTERN_32 {
                log::error!("collected entropy failed the weak seed screen");
                return Err(TrngError::DRIVER_TRNG_WEAK_SEED);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bus that panics on any access, proving that rejected operations
    /// never touch the hardware.
    struct DeadBus;

    impl TrngBus for DeadBus {
        fn read_u32(&mut self, _offset: u32) -> u32 {
            panic!("unexpected register read")
        }

        fn write_u32(&mut self, _offset: u32, _val: u32) {
            panic!("unexpected register write")
        }

        fn delay_us(&mut self, _us: u32) {
            panic!("unexpected delay")
        }
    }

    fn hrng_cfg() -> TrngUsrCfg {
        TrngUsrCfg {
            mode: TrngMode::Hrng,
            seed_life: 10,
            predict_en: false,
            df_disable: false,
            dfmul: 2,
            init_seed: None,
            pstr: None,
        }
    }

    #[test]
    fn instantiate_rejects_zero_seed_life() {
        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        let cfg = TrngUsrCfg {
            seed_life: 0,
            ..hrng_cfg()
        };
        assert_eq!(
            trng.instantiate(&cfg),
            Err(TrngError::DRIVER_TRNG_INVALID_CONFIG)
        );
        assert_eq!(trng.status(), TrngStatus::Error);
    }

    #[test]
    fn instantiate_rejects_bad_multiplier() {
        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        for dfmul in [0, 1, 10] {
            let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
            let cfg = TrngUsrCfg { dfmul, ..hrng_cfg() };
            assert_eq!(
                trng.instantiate(&cfg),
                Err(TrngError::DRIVER_TRNG_INVALID_MULTIPLIER)
            );
        }
        // Multiplier must be zero once the derivation function is disabled.
        let cfg = TrngUsrCfg {
            df_disable: true,
            dfmul: 2,
            ..hrng_cfg()
        };
        assert_eq!(
            trng.instantiate(&cfg),
            Err(TrngError::DRIVER_TRNG_INVALID_MULTIPLIER)
        );
    }

    #[test]
    fn instantiate_rejects_seed_mode_mismatch() {
        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        let cfg = TrngUsrCfg {
            mode: TrngMode::Drng,
            ..hrng_cfg()
        };
        assert_eq!(
            trng.instantiate(&cfg),
            Err(TrngError::DRIVER_TRNG_INVALID_SEED)
        );

        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        let cfg = TrngUsrCfg {
            init_seed: Some([0u8; MAX_SEED_LEN]),
            ..hrng_cfg()
        };
        assert_eq!(
            trng.instantiate(&cfg),
            Err(TrngError::DRIVER_TRNG_INVALID_SEED)
        );
    }

    #[test]
    fn instantiate_rejects_ptrng_extras() {
        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        let cfg = TrngUsrCfg {
            mode: TrngMode::Ptrng,
            seed_life: 0,
            pstr: Some([0u8; PERS_LEN]),
            ..hrng_cfg()
        };
        assert_eq!(
            trng.instantiate(&cfg),
            Err(TrngError::DRIVER_TRNG_INVALID_CONFIG)
        );
    }

    #[test]
    fn operations_require_instantiation() {
        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        let mut buf = [0u8; SEC_STRENGTH_LEN];
        assert_eq!(
            trng.generate(&mut buf, false),
            Err(TrngError::DRIVER_TRNG_INVALID_STATE)
        );

        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        assert_eq!(
            trng.reseed(None, 2),
            Err(TrngError::DRIVER_TRNG_INVALID_STATE)
        );

        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        assert_eq!(trng.release(), Err(TrngError::DRIVER_TRNG_INVALID_STATE));
        assert_eq!(trng.status(), TrngStatus::Error);
    }

    #[test]
    fn generate_rejects_short_buffer_before_state() {
        // The length check fires even on an uninstantiated driver.
        let mut trng = VersalTrng::new(DeadBus, TrngVersion::V1);
        let mut buf = [0u8; SEC_STRENGTH_LEN - 1];
        assert_eq!(
            trng.generate(&mut buf, false),
            Err(TrngError::DRIVER_TRNG_INVALID_LEN)
        );
    }
}
