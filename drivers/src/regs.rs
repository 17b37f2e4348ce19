/*++

Licensed under the Apache-2.0 license.

File Name:

    regs.rs

Abstract:

    Register-level protocol for the PMC TRNG block: reset sequencing, seed
    and personalization register loads, the rev-2 bit-serial seed path,
    polled event waits and burst collection from the core output queue.

--*/

use bitfield::bitfield;

use crate::error::{TrngError, TrngResult};

pub const TRNG_STATUS: u32 = 0x04;
pub const TRNG_CTRL: u32 = 0x08;
pub const TRNG_CTRL_2: u32 = 0x0C;
pub const TRNG_CTRL_3: u32 = 0x10;
pub const TRNG_CTRL_4: u32 = 0x14;
pub const TRNG_EXT_SEED_0: u32 = 0x40;
pub const TRNG_PER_STRING_0: u32 = 0x80;
pub const TRNG_CORE_OUTPUT: u32 = 0xC0;
pub const TRNG_RESET: u32 = 0xD0;
pub const TRNG_OSC_EN: u32 = 0xD4;

pub const TRNG_STATUS_QCNT_SHIFT: u32 = 9;
pub const TRNG_STATUS_QCNT_MASK: u32 = 0b111 << TRNG_STATUS_QCNT_SHIFT;
pub const TRNG_STATUS_CERTF_MASK: u32 = 1 << 3;
pub const TRNG_STATUS_DTF_MASK: u32 = 1 << 1;
pub const TRNG_STATUS_DONE_MASK: u32 = 1 << 0;

pub const TRNG_CTRL_PERSODISABLE_MASK: u32 = 1 << 10;
pub const TRNG_CTRL_SINGLEGENMODE_MASK: u32 = 1 << 9;
pub const TRNG_CTRL_EUMODE_MASK: u32 = 1 << 8;
pub const TRNG_CTRL_PRNGMODE_MASK: u32 = 1 << 7;
pub const TRNG_CTRL_TSTMODE_MASK: u32 = 1 << 6;
pub const TRNG_CTRL_PRNGSTART_MASK: u32 = 1 << 5;
pub const TRNG_CTRL_PRNGXS_MASK: u32 = 1 << 3;
pub const TRNG_CTRL_TRSSEN_MASK: u32 = 1 << 2;
pub const TRNG_CTRL_PRNGSRST_MASK: u32 = 1 << 0;

pub const TRNG_CTRL_2_RCTCUTOFF_SHIFT: u32 = 8;
pub const TRNG_CTRL_2_RCTCUTOFF_MASK: u32 = 0x0001_FF00;
pub const TRNG_CTRL_2_RCTCUTOFF_DEFVAL: u32 = 0x21;
pub const TRNG_CTRL_2_DIT_SHIFT: u32 = 0;
pub const TRNG_CTRL_2_DIT_MASK: u32 = 0x0000_001F;
pub const TRNG_CTRL_2_DIT_DEFVAL: u32 = 0xC;

pub const TRNG_CTRL_3_APTCUTOFF_SHIFT: u32 = 8;
pub const TRNG_CTRL_3_APTCUTOFF_MASK: u32 = 0x0003_FF00;
pub const TRNG_CTRL_3_APTCUTOFF_DEFVAL: u32 = 0x264;
pub const TRNG_CTRL_3_DLEN_SHIFT: u32 = 0;
pub const TRNG_CTRL_3_DLEN_MASK: u32 = 0x0000_00FF;
pub const TRNG_CTRL_3_DLEN_DEFVAL: u32 = 0x9;

pub const TRNG_RESET_VAL_MASK: u32 = 1 << 0;
pub const TRNG_OSC_EN_VAL_MASK: u32 = 1 << 0;

/// Reseed selects PRNG mode 0, generate selects PRNG mode 1.
pub const PRNGMODE_RESEED: u32 = 0;
pub const PRNGMODE_GEN: u32 = TRNG_CTRL_PRNGMODE_MASK;

pub const TRNG_NUM_INIT_REGS: usize = 12;
pub const TRNG_BYTES_PER_REG: usize = 4;
pub const TRNG_BURST_WORDS: usize = 4;
pub const TRNG_BURST_SIZE: usize = TRNG_BURST_WORDS * TRNG_BYTES_PER_REG;
pub const TRNG_MAX_QCNT: u32 = 4;

pub const TRNG_GENERATE_TIMEOUT_US: u32 = 8_000;
pub const TRNG_RESEED_TIMEOUT_US: u32 = 1_500_000;
pub const RESET_DELAY_US: u32 = 10;

// The serial seed interface needs 2us per byte and an additional 10us of
// settling time every eighth byte.
const SERIAL_BYTE_DELAY_US: u32 = 2;
const SERIAL_SETTLE_DELAY_US: u32 = 10;
const SERIAL_SETTLE_PERIOD: usize = 8;

bitfield! {
    /// STATUS register view.
    #[derive(Clone, Copy)]
    pub struct Status(u32);
    impl Debug;

    /// Reseed or KAT cycle complete
    pub done, _: 0;

    /// Digitized test fault during generation
    pub dtf, _: 1;

    /// SP800-90B entropy health test failure
    pub certf, _: 3;

    /// Number of 32-bit words queued in the core output FIFO
    pub u32, qcnt, _: 11, 9;
}

/// Silicon revision of the TRNG block. Rev 1 seeds through the parallel
/// EXT_SEED registers and relies on the software derivation function; rev 2
/// carries a native derivation function fed through the bit-serial CTRL_4
/// interface and verifies configuration writes by read-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrngVersion {
    V1,
    V2,
}

/// Hardware access used by the driver: 32-bit register reads and writes at
/// byte offsets from the block base, plus a microsecond busy-wait. Memory
/// mapped backends implement this over volatile pointers; tests implement it
/// over an emulated peripheral.
pub trait TrngBus {
    fn read_u32(&mut self, offset: u32) -> u32;
    fn write_u32(&mut self, offset: u32, val: u32);
    fn delay_us(&mut self, us: u32);
}

impl<T: TrngBus + ?Sized> TrngBus for &mut T {
    fn read_u32(&mut self, offset: u32) -> u32 {
        (**self).read_u32(offset)
    }

    fn write_u32(&mut self, offset: u32, val: u32) {
        (**self).write_u32(offset, val)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Register protocol driver. Owns the bus handle and the last output burst,
/// which backs the stuck-output check during collection.
pub struct TrngRegs<B: TrngBus> {
    bus: B,
    version: TrngVersion,
    burst: [u32; TRNG_BURST_WORDS],
}

impl<B: TrngBus> TrngRegs<B> {
    pub fn new(bus: B, version: TrngVersion) -> Self {
        Self {
            bus,
            version,
            burst: [0; TRNG_BURST_WORDS],
        }
    }

    pub fn version(&self) -> TrngVersion {
        self.version
    }

    pub fn read(&mut self, off: u32) -> u32 {
        self.bus.read_u32(off)
    }

    pub fn write(&mut self, off: u32, val: u32) {
        self.bus.write_u32(off, val)
    }

    pub fn delay_us(&mut self, us: u32) {
        self.bus.delay_us(us)
    }

    pub fn status(&mut self) -> Status {
        Status(self.read(TRNG_STATUS))
    }

    /// Read-modify-write of the masked field.
    pub fn clrset(&mut self, off: u32, mask: u32, val: u32) {
        let cur = self.read(off);
        self.write(off, (cur & !mask) | (mask & val));
    }

    /// Rev-2 masked write that verifies the field landed by reading it back.
    pub fn write_masked_checked(&mut self, off: u32, mask: u32, val: u32) -> TrngResult<()> {
        self.clrset(off, mask, val);
        if self.read(off) & mask != mask & val {
            log::error!("register write to offset {off:#x} did not read back");
            return Err(TrngError::DRIVER_TRNG_REG_READBACK);
        }
        Ok(())
    }

    /// Pulses the PRNG unit soft reset.
    pub fn soft_reset(&mut self) {
        self.clrset(TRNG_CTRL, TRNG_CTRL_PRNGSRST_MASK, TRNG_CTRL_PRNGSRST_MASK);
        self.delay_us(RESET_DELAY_US);
        self.clrset(TRNG_CTRL, TRNG_CTRL_PRNGSRST_MASK, 0);
    }

    /// Brings the whole block out of reset, then soft-resets the PRNG unit.
    pub fn reset(&mut self) {
        self.write(TRNG_RESET, TRNG_RESET_VAL_MASK);
        self.delay_us(RESET_DELAY_US);
        self.write(TRNG_RESET, 0);
        self.soft_reset();
        self.burst = [0; TRNG_BURST_WORDS];
    }

    /// Asserts both resets and leaves them held.
    pub fn hold_reset(&mut self) {
        self.clrset(TRNG_CTRL, TRNG_CTRL_PRNGSRST_MASK, TRNG_CTRL_PRNGSRST_MASK);
        self.write(TRNG_RESET, TRNG_RESET_VAL_MASK);
        self.delay_us(RESET_DELAY_US);
        self.burst = [0; TRNG_BURST_WORDS];
    }

    /// Enables the ring oscillator array feeding the entropy source.
    pub fn enable_oscillators(&mut self) {
        self.write(TRNG_OSC_EN, TRNG_OSC_EN_VAL_MASK);
    }

    /// Loads the twelve seed registers, highest-index register first with
    /// big-endian byte packing, or zeroes them when no seed is given.
    pub fn write_seed_regs(&mut self, seed: Option<&[u8]>) {
        self.write_reg_range(TRNG_EXT_SEED_0, seed);
    }

    /// Loads or zeroes the twelve personalization string registers.
    pub fn write_pstr_regs(&mut self, pstr: Option<&[u8]>) {
        self.write_reg_range(TRNG_PER_STRING_0, pstr);
    }

    fn write_reg_range(&mut self, start: u32, buf: Option<&[u8]>) {
        for i in 0..TRNG_NUM_INIT_REGS {
            let Some(buf) = buf else {
                self.write(start + (i * TRNG_BYTES_PER_REG) as u32, 0);
                continue;
            };
            let mut val = 0u32;
            for cnt in 0..TRNG_BYTES_PER_REG {
                val = (val << 8) | buf[i * TRNG_BYTES_PER_REG + cnt] as u32;
            }
            let off = start + ((TRNG_NUM_INIT_REGS - 1 - i) * TRNG_BYTES_PER_REG) as u32;
            self.write(off, val);
        }
    }

    /// Shifts `seed` into the rev-2 derivation function one bit at a time
    /// through CTRL_4, most significant bit first. CTRL_4 reads back the byte
    /// accumulated so far; a mismatch means the shift register dropped a bit.
    pub fn load_seed_serial(&mut self, seed: &[u8]) -> TrngResult<()> {
        for (idx, &byte) in seed.iter().enumerate() {
            for cnt in 0..8 {
                let bit = (byte >> (7 - cnt)) as u32 & 1;
                self.write(TRNG_CTRL_4, bit);
            }
            if self.read(TRNG_CTRL_4) as u8 != byte {
                log::error!("serial seed load failed read-back at byte {idx}");
                return Err(TrngError::DRIVER_TRNG_SEED_READBACK);
            }
            self.delay_us(SERIAL_BYTE_DELAY_US);
            if idx % SERIAL_SETTLE_PERIOD == 0 {
                self.delay_us(SERIAL_SETTLE_DELAY_US);
            }
        }
        Ok(())
    }

    /// Kicks off the programmed operation.
    pub fn start(&mut self) {
        self.clrset(TRNG_CTRL, TRNG_CTRL_PRNGSTART_MASK, TRNG_CTRL_PRNGSTART_MASK);
    }

    pub fn stop(&mut self) {
        self.clrset(TRNG_CTRL, TRNG_CTRL_PRNGSTART_MASK, 0);
    }

    /// Polls `off` until the masked value equals `event`, failing with `err`
    /// after `timeout_us`. The condition is re-checked once after the
    /// deadline; the polling thread may have been descheduled for longer
    /// than the whole budget.
    pub fn wait_for_event(
        &mut self,
        off: u32,
        mask: u32,
        event: u32,
        timeout_us: u32,
        err: TrngError,
    ) -> TrngResult<()> {
        let mut remaining_us = timeout_us;
        while self.read(off) & mask != event {
            if remaining_us == 0 {
                if self.read(off) & mask == event {
                    return Ok(());
                }
                return Err(err);
            }
            self.delay_us(1);
            remaining_us -= 1;
        }
        Ok(())
    }

    /// Starts generation and drains `len` bytes from the core output queue,
    /// one four-word burst at a time. Each burst waits for a full queue,
    /// checks DTF when `check_dtf` is set, and compares against the previous
    /// burst; two identical consecutive bursts mean the core output is stuck.
    /// `dst` may be `None` to run the state machine without keeping the data.
    pub fn collect_random(
        &mut self,
        mut dst: Option<&mut [u8]>,
        len: usize,
        check_dtf: bool,
    ) -> TrngResult<()> {
        let bursts = len / TRNG_BURST_SIZE;

        self.start();

        for bcnt in 0..bursts {
            self.wait_for_event(
                TRNG_STATUS,
                TRNG_STATUS_QCNT_MASK,
                TRNG_MAX_QCNT << TRNG_STATUS_QCNT_SHIFT,
                TRNG_GENERATE_TIMEOUT_US,
                TrngError::DRIVER_TRNG_GENERATE_TIMEOUT,
            )
            .map_err(|err| {
                log::error!("timeout waiting for randomness");
                err
            })?;

            if check_dtf && self.status().dtf() {
                log::error!("catastrophic DTF error");
                return Err(TrngError::DRIVER_TRNG_CATASTROPHIC_DTF);
            }

            let mut match_prev = true;
            for wcnt in 0..TRNG_BURST_WORDS {
                let val = self.read(TRNG_CORE_OUTPUT);
                if bcnt > 0 && self.burst[wcnt] != val {
                    match_prev = false;
                }
                self.burst[wcnt] = val;
                if let Some(dst) = dst.as_deref_mut() {
                    dst[(bcnt * TRNG_BURST_WORDS + wcnt) * TRNG_BYTES_PER_REG..]
                        [..TRNG_BYTES_PER_REG]
                        .copy_from_slice(&val.to_be_bytes());
                }
            }

            if bursts > 1 && bcnt > 0 && match_prev {
                log::error!("core output stuck across consecutive bursts");
                return Err(TrngError::DRIVER_TRNG_CATASTROPHIC_STUCK);
            }
        }

        Ok(())
    }
}
