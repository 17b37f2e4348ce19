/*++

Licensed under the Apache-2.0 license.

File Name:

    df.rs

Abstract:

    Software derivation function per sections 10.3.2 and 10.3.3 of
    NIST.SP.800-90Ar1. The DRBG hardware expects derived seed material but
    the first silicon revision carries no derivation function of its own,
    so the driver distills collected entropy (and an optional
    personalization string) down to seed or output material here.

--*/

use crate::cipher::{xor_block, BlockCipher, BLOCK_LEN, KEY_LEN};
use crate::error::{TrngError, TrngResult};
use crate::trng::SEC_STRENGTH_LEN;

/// Derived seed length in bytes: 256-bit key plus one block of V.
pub const SEED_LEN: usize = 48;

/// Personalization string length in bytes.
pub const PERS_LEN: usize = 48;

/// Maximum pre-DF entropy length when a personalization string is present.
pub const MAX_PRE_DF_LEN: usize = 160;

/// Fixed key for the compression pass.
const DF_KEY: [u8; KEY_LEN] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31,
];

const DF_PAD_VAL: u8 = 0x80;

// Formatted input: one counter block, the L and N words, the entropy, an
// optional personalization string, the pad byte and zero fill.
const DFIN_HEADER_LEN: usize = BLOCK_LEN + 8;
const DFIN_MAX_LEN: usize = DFIN_HEADER_LEN + MAX_PRE_DF_LEN + PERS_LEN + 8;

/// Selects the `N` field of the formatted input: seed material for the
/// DRBG's seed registers, or final random output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfPurpose {
    Seed,
    Generate,
}

/// Working state for the derivation function: the block cipher with its key
/// schedule, the formatted-input staging buffer and the chaining output.
/// One of these lives inside each TRNG instance; calls are not reentrant.
pub struct DerivationFunction {
    cipher: BlockCipher,
    dfin: [u8; DFIN_MAX_LEN],
    dfout: [u8; SEED_LEN],
}

impl DerivationFunction {
    pub const fn new() -> Self {
        Self {
            cipher: BlockCipher::new(),
            dfin: [0; DFIN_MAX_LEN],
            dfout: [0; SEED_LEN],
        }
    }

    /// Distills `entropy` (and `pstr`, when present) into [`SEED_LEN`] bytes
    /// of derived material. Seed consumers use all of it; generate consumers
    /// take the leading [`SEC_STRENGTH_LEN`] bytes.
    ///
    /// Entropy beyond the pre-DF maximum is the fatal
    /// [`TrngError::DRIVER_TRNG_DF_OVERFLOW`]: the caller sized a request the
    /// staging buffer cannot represent.
    pub fn derive(
        &mut self,
        entropy: &[u8],
        pstr: Option<&[u8; PERS_LEN]>,
        purpose: DfPurpose,
    ) -> TrngResult<&[u8; SEED_LEN]> {
        let max_len = match pstr {
            Some(_) => MAX_PRE_DF_LEN,
            None => MAX_PRE_DF_LEN + PERS_LEN,
        };
        if entropy.len() > max_len {
            log::error!("DF entropy length {} exceeds maximum", entropy.len());
            return Err(TrngError::DRIVER_TRNG_DF_OVERFLOW);
        }

        let dfin_len = self.pack_input(entropy, pstr, purpose);

        // Compression pass: three chained 16-byte blocks, each under a fresh
        // big-endian block counter in the leading block.
        self.cipher.set_key(&DF_KEY);
        for index in 0..SEED_LEN / BLOCK_LEN {
            self.dfin[..4].copy_from_slice(&(index as u32).to_be_bytes());
            let mut chain = [0u8; BLOCK_LEN];
            for block in self.dfin[..dfin_len].chunks_exact(BLOCK_LEN) {
                xor_block(&mut chain, block);
                chain = self.cipher.encrypt_block(&chain);
            }
            self.dfout[index * BLOCK_LEN..][..BLOCK_LEN].copy_from_slice(&chain);
        }

        // Generation pass: re-key with the leading 32 bytes of the
        // intermediate, start from its trailing block, then feed each output
        // block back in as the next input.
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&self.dfout[..KEY_LEN]);
        self.cipher.set_key(&key);
        let mut block = [0u8; BLOCK_LEN];
        block.copy_from_slice(&self.dfout[KEY_LEN..]);
        for index in 0..SEED_LEN / BLOCK_LEN {
            block = self.cipher.encrypt_block(&block);
            self.dfout[index * BLOCK_LEN..][..BLOCK_LEN].copy_from_slice(&block);
        }

        Ok(&self.dfout)
    }

    /// Packs the formatted input and returns its padded length. `L` counts
    /// the entropy and personalization bytes, `N` the requested output bytes.
    fn pack_input(
        &mut self,
        entropy: &[u8],
        pstr: Option<&[u8; PERS_LEN]>,
        purpose: DfPurpose,
    ) -> usize {
        self.dfin = [0; DFIN_MAX_LEN];

        let input_len = entropy.len() + pstr.map_or(0, |p| p.len());
        let output_len = match purpose {
            DfPurpose::Seed => SEED_LEN,
            DfPurpose::Generate => SEC_STRENGTH_LEN,
        };
        self.dfin[BLOCK_LEN..][..4].copy_from_slice(&(input_len as u32).to_be_bytes());
        self.dfin[BLOCK_LEN + 4..][..4].copy_from_slice(&(output_len as u32).to_be_bytes());

        let mut offset = DFIN_HEADER_LEN;
        self.dfin[offset..][..entropy.len()].copy_from_slice(entropy);
        offset += entropy.len();
        if let Some(pstr) = pstr {
            self.dfin[offset..][..pstr.len()].copy_from_slice(pstr);
            offset += pstr.len();
        }
        self.dfin[offset] = DF_PAD_VAL;
        offset += 1;

        // Zero fill up to the block boundary is already in place.
        (offset + BLOCK_LEN - 1) & !(BLOCK_LEN - 1)
    }

    /// Scrubs the staging buffers and the expanded key schedule.
    pub fn clear(&mut self) {
        self.cipher.clear();
        self.dfin = [0; DFIN_MAX_LEN];
        self.dfout = [0; SEED_LEN];
    }
}
