/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Software model of the Versal PMC TRNG peripheral. Implements the
    driver's bus trait over an emulated register file backed by a NIST
    CTR_DRBG(AES-256) and a deterministic entropy source, with fault
    injection knobs for driving the driver's failure paths in tests.

--*/

mod ctr_drbg;

use std::collections::VecDeque;

pub use ctr_drbg::{block_cipher_df, CtrDrbg};
use versal_trng_drivers::regmap::{
    TRNG_CORE_OUTPUT, TRNG_CTRL, TRNG_CTRL_2, TRNG_CTRL_2_DIT_DEFVAL, TRNG_CTRL_2_RCTCUTOFF_DEFVAL,
    TRNG_CTRL_2_RCTCUTOFF_SHIFT, TRNG_CTRL_3, TRNG_CTRL_3_APTCUTOFF_DEFVAL,
    TRNG_CTRL_3_APTCUTOFF_SHIFT, TRNG_CTRL_3_DLEN_DEFVAL, TRNG_CTRL_3_DLEN_MASK, TRNG_CTRL_4,
    TRNG_CTRL_EUMODE_MASK, TRNG_CTRL_PERSODISABLE_MASK, TRNG_CTRL_PRNGMODE_MASK,
    TRNG_CTRL_PRNGSRST_MASK, TRNG_CTRL_PRNGSTART_MASK, TRNG_CTRL_TSTMODE_MASK, TRNG_EXT_SEED_0,
    TRNG_MAX_QCNT, TRNG_NUM_INIT_REGS, TRNG_OSC_EN, TRNG_PER_STRING_0, TRNG_RESET, TRNG_STATUS,
    TRNG_STATUS_QCNT_SHIFT,
};
use versal_trng_drivers::{TrngBus, TrngVersion};

const STATUS_DONE: u32 = 1 << 0;
const STATUS_DTF: u32 = 1 << 1;
const STATUS_CERTF: u32 = 1 << 3;

/// Value returned for reads the model has no data for.
const DEFAULT_READ_VAL: u32 = 0xCAFE_F00D;

const SEED_BYTES: usize = 48;
const BLOCK_BYTES: usize = 16;

/// Emulated TRNG peripheral.
///
/// Construct with [`TrngPeriph::new`] for a deterministic pseudo-random
/// entropy source, or [`TrngPeriph::with_entropy`] to script the digitized
/// entropy words the ring oscillator array would produce.
pub struct TrngPeriph {
    version: TrngVersion,
    in_reset: bool,
    ctrl: u32,
    ctrl2: u32,
    ctrl3: u32,
    osc_en: u32,
    ext_seed: [u32; TRNG_NUM_INIT_REGS],
    per_string: [u32; TRNG_NUM_INIT_REGS],
    drbg: CtrDrbg,
    entropy: Box<dyn Iterator<Item = u32>>,
    out_queue: VecDeque<u32>,
    override_queue: VecDeque<u32>,
    done: bool,
    serial_armed: bool,
    serial_expect: usize,
    serial_buf: Vec<u8>,
    serial_bits: u32,
    serial_cur: u8,
    serial_last_byte: u8,
    elapsed_us: u64,
    stall_done: bool,
    stall_output: bool,
    force_certf: bool,
    force_dtf: bool,
}

impl TrngPeriph {
    pub fn new(version: TrngVersion) -> Self {
        Self::with_entropy(version, default_entropy())
    }

    pub fn with_entropy(version: TrngVersion, entropy: Box<dyn Iterator<Item = u32>>) -> Self {
        Self {
            version,
            in_reset: true,
            ctrl: 0,
            ctrl2: ctrl2_reset_val(),
            ctrl3: ctrl3_reset_val(),
            osc_en: 0,
            ext_seed: [0; TRNG_NUM_INIT_REGS],
            per_string: [0; TRNG_NUM_INIT_REGS],
            drbg: CtrDrbg::new(),
            entropy,
            out_queue: VecDeque::new(),
            override_queue: VecDeque::new(),
            done: false,
            serial_armed: false,
            serial_expect: 0,
            serial_buf: Vec::new(),
            serial_bits: 0,
            serial_cur: 0,
            serial_last_byte: 0,
            elapsed_us: 0,
            stall_done: false,
            stall_output: false,
            force_certf: false,
            force_dtf: false,
        }
    }

    /// Virtual microseconds accumulated through the bus delay hook.
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// Keeps DONE deasserted so reseed cycles never complete.
    pub fn stall_done(&mut self, stall: bool) {
        self.stall_done = stall;
    }

    /// Keeps the output queue count at zero so generation times out.
    pub fn stall_output(&mut self, stall: bool) {
        self.stall_output = stall;
    }

    /// Asserts the SP800-90B health test failure flag.
    pub fn force_certf(&mut self, force: bool) {
        self.force_certf = force;
    }

    /// Asserts the digitized test fault flag.
    pub fn force_dtf(&mut self, force: bool) {
        self.force_dtf = force;
    }

    /// Scripts the next core output words, served ahead of the DRBG or
    /// entropy source.
    pub fn push_output_override(&mut self, words: &[u32]) {
        self.override_queue.extend(words.iter().copied());
    }

    fn reset_state(&mut self) {
        self.ctrl = 0;
        self.ctrl2 = ctrl2_reset_val();
        self.ctrl3 = ctrl3_reset_val();
        self.osc_en = 0;
        self.ext_seed = [0; TRNG_NUM_INIT_REGS];
        self.per_string = [0; TRNG_NUM_INIT_REGS];
        self.drbg.uninstantiate();
        self.out_queue.clear();
        self.done = false;
        self.disarm_serial();
    }

    fn disarm_serial(&mut self) {
        self.serial_armed = false;
        self.serial_expect = 0;
        self.serial_buf.clear();
        self.serial_bits = 0;
        self.serial_cur = 0;
    }

    fn write_ctrl(&mut self, val: u32) {
        let was_started = self.ctrl & TRNG_CTRL_PRNGSTART_MASK != 0;
        let prev = self.ctrl;
        self.ctrl = val;

        // PRNG unit soft reset flushes the output queue and any pending
        // completion.
        if prev & TRNG_CTRL_PRNGSRST_MASK == 0 && val & TRNG_CTRL_PRNGSRST_MASK != 0 {
            self.out_queue.clear();
            self.done = false;
            self.disarm_serial();
            return;
        }

        if !was_started && val & TRNG_CTRL_PRNGSTART_MASK != 0 {
            self.on_start();
        }
    }

    fn on_start(&mut self) {
        if self.ctrl & TRNG_CTRL_EUMODE_MASK != 0 {
            // Entropy unit output; words come straight off the oscillators.
            self.out_queue.clear();
            return;
        }
        if self.ctrl & TRNG_CTRL_PRNGMODE_MASK != 0 {
            // Generate cycle; bursts are produced on demand.
            self.out_queue.clear();
            return;
        }

        // Reseed cycle.
        self.done = false;
        match self.version {
            TrngVersion::V1 => {
                self.reseed_from_seed_regs();
                self.done = true;
            }
            TrngVersion::V2 => {
                if self.ctrl & TRNG_CTRL_TSTMODE_MASK != 0 {
                    // External seed arrives serially through CTRL_4.
                    self.serial_armed = true;
                    self.serial_expect = self.df_input_len();
                    self.serial_buf.clear();
                    self.serial_bits = 0;
                    self.serial_cur = 0;
                } else {
                    self.reseed_from_oscillators();
                    self.done = true;
                }
            }
        }
    }

    fn df_input_len(&self) -> usize {
        let dlen = (self.ctrl3 & TRNG_CTRL_3_DLEN_MASK) as usize;
        (dlen + 1) * BLOCK_BYTES
    }

    fn pstr_for_df(&self) -> Option<[u8; SEED_BYTES]> {
        if self.ctrl & TRNG_CTRL_PERSODISABLE_MASK != 0 {
            return None;
        }
        Some(unpack_init_regs(&self.per_string))
    }

    /// Revision 1 seeding: the DRBG consumes the parallel seed registers,
    /// XOR'd with the personalization string bank.
    fn reseed_from_seed_regs(&mut self) {
        let seed = unpack_init_regs(&self.ext_seed);
        let pstr = unpack_init_regs(&self.per_string);
        let mut seed_material = [0u8; SEED_BYTES];
        for (out, (s, p)) in seed_material.iter_mut().zip(seed.iter().zip(pstr.iter())) {
            *out = s ^ p;
        }
        self.drbg.instantiate(&seed_material);
    }

    /// Revision 2 oscillator seeding through the native derivation
    /// function.
    fn reseed_from_oscillators(&mut self) {
        let mut raw = Vec::with_capacity(self.df_input_len());
        while raw.len() < self.df_input_len() {
            let word = self.entropy.next().unwrap_or(DEFAULT_READ_VAL);
            raw.extend_from_slice(&word.to_be_bytes());
        }
        let pstr = self.pstr_for_df();
        let mut seed_material = [0u8; SEED_BYTES];
        block_cipher_df(&raw, pstr.as_ref(), &mut seed_material);
        self.drbg.instantiate(&seed_material);
    }

    fn write_serial_bit(&mut self, val: u32) {
        if !self.serial_armed {
            return;
        }
        self.serial_cur = (self.serial_cur << 1) | (val as u8 & 1);
        self.serial_bits += 1;
        if self.serial_bits < 8 {
            return;
        }
        self.serial_last_byte = self.serial_cur;
        self.serial_buf.push(self.serial_cur);
        self.serial_bits = 0;
        self.serial_cur = 0;

        if self.serial_buf.len() == self.serial_expect {
            let pstr = self.pstr_for_df();
            let mut seed_material = [0u8; SEED_BYTES];
            block_cipher_df(&self.serial_buf, pstr.as_ref(), &mut seed_material);
            self.drbg.instantiate(&seed_material);
            self.disarm_serial();
            self.done = true;
        }
    }

    fn eu_active(&self) -> bool {
        self.ctrl & TRNG_CTRL_EUMODE_MASK != 0 && self.ctrl & TRNG_CTRL_PRNGSTART_MASK != 0
    }

    fn gen_active(&self) -> bool {
        self.ctrl & TRNG_CTRL_EUMODE_MASK == 0
            && self.ctrl & TRNG_CTRL_PRNGMODE_MASK != 0
            && self.ctrl & TRNG_CTRL_PRNGSTART_MASK != 0
    }

    fn read_status(&self) -> u32 {
        let mut status = 0;
        if self.done && !self.stall_done {
            status |= STATUS_DONE;
        }
        if self.force_dtf {
            status |= STATUS_DTF;
        }
        if self.force_certf {
            status |= STATUS_CERTF;
        }
        if !self.stall_output && (self.eu_active() || self.gen_active()) {
            status |= TRNG_MAX_QCNT << TRNG_STATUS_QCNT_SHIFT;
        }
        status
    }

    fn read_core_output(&mut self) -> u32 {
        if let Some(word) = self.override_queue.pop_front() {
            return word;
        }
        if self.eu_active() {
            return self.entropy.next().unwrap_or(DEFAULT_READ_VAL);
        }
        if self.gen_active() && self.out_queue.is_empty() {
            for block in self.drbg.generate(1) {
                for word in block.chunks_exact(4) {
                    self.out_queue
                        .push_back(u32::from_be_bytes([word[0], word[1], word[2], word[3]]));
                }
            }
        }
        self.out_queue.pop_front().unwrap_or(DEFAULT_READ_VAL)
    }
}

impl TrngBus for TrngPeriph {
    fn read_u32(&mut self, offset: u32) -> u32 {
        match offset {
            TRNG_STATUS => self.read_status(),
            TRNG_CTRL => self.ctrl,
            TRNG_CTRL_2 => self.ctrl2,
            TRNG_CTRL_3 => self.ctrl3,
            TRNG_CTRL_4 => self.serial_last_byte as u32,
            TRNG_CORE_OUTPUT => self.read_core_output(),
            TRNG_RESET => self.in_reset as u32,
            TRNG_OSC_EN => self.osc_en,
            off if seed_reg_index(off, TRNG_EXT_SEED_0).is_some() => {
                self.ext_seed[seed_reg_index(off, TRNG_EXT_SEED_0).unwrap()]
            }
            off if seed_reg_index(off, TRNG_PER_STRING_0).is_some() => {
                self.per_string[seed_reg_index(off, TRNG_PER_STRING_0).unwrap()]
            }
            _ => DEFAULT_READ_VAL,
        }
    }

    fn write_u32(&mut self, offset: u32, val: u32) {
        match offset {
            TRNG_CTRL => self.write_ctrl(val),
            TRNG_CTRL_2 => self.ctrl2 = val,
            TRNG_CTRL_3 => self.ctrl3 = val,
            TRNG_CTRL_4 => self.write_serial_bit(val),
            TRNG_RESET => {
                let assert = val & 1 != 0;
                if assert && !self.in_reset {
                    self.reset_state();
                }
                self.in_reset = assert;
            }
            TRNG_OSC_EN => self.osc_en = val & 1,
            off if seed_reg_index(off, TRNG_EXT_SEED_0).is_some() => {
                self.ext_seed[seed_reg_index(off, TRNG_EXT_SEED_0).unwrap()] = val;
            }
            off if seed_reg_index(off, TRNG_PER_STRING_0).is_some() => {
                self.per_string[seed_reg_index(off, TRNG_PER_STRING_0).unwrap()] = val;
            }
            _ => {}
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
    }
}

fn ctrl2_reset_val() -> u32 {
    (TRNG_CTRL_2_RCTCUTOFF_DEFVAL << TRNG_CTRL_2_RCTCUTOFF_SHIFT) | TRNG_CTRL_2_DIT_DEFVAL
}

fn ctrl3_reset_val() -> u32 {
    (TRNG_CTRL_3_APTCUTOFF_DEFVAL << TRNG_CTRL_3_APTCUTOFF_SHIFT) | TRNG_CTRL_3_DLEN_DEFVAL
}

fn seed_reg_index(off: u32, start: u32) -> Option<usize> {
    if off < start {
        return None;
    }
    let idx = ((off - start) / 4) as usize;
    if off % 4 == 0 && idx < TRNG_NUM_INIT_REGS {
        Some(idx)
    } else {
        None
    }
}

/// Undoes the driver's highest-register-first big-endian packing of the
/// seed and personalization banks.
fn unpack_init_regs(regs: &[u32; TRNG_NUM_INIT_REGS]) -> [u8; SEED_BYTES] {
    let mut bytes = [0u8; SEED_BYTES];
    for (i, chunk) in bytes.chunks_exact_mut(4).enumerate() {
        chunk.copy_from_slice(&regs[TRNG_NUM_INIT_REGS - 1 - i].to_be_bytes());
    }
    bytes
}

/// Deterministic xorshift stream standing in for the digitized oscillator
/// output. Skips the two degenerate alternating patterns the driver screens
/// for.
pub fn default_entropy() -> Box<dyn Iterator<Item = u32>> {
    let mut state = 0x8a5c_3e21_u32;
    Box::new(std::iter::repeat_with(move || loop {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        if state != 0xAAAA_AAAA && state != 0x5555_5555 {
            return state;
        }
    }))
}
