/*++

Licensed under the Apache-2.0 license.

File Name:

    ctr_drbg.rs

Abstract:

    Model of the DRBG inside the TRNG block: CTR_DRBG with AES-256 per
    section 10.2 of NIST.SP.800-90Ar1, plus the Block_Cipher_df of section
    10.3.2 used by the revision 2 silicon to condition seed material in
    hardware. Independent of the driver's own derivation function code.

--*/

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256Enc;

const BLOCK_LEN_BYTES: usize = 128 / 8;
const KEY_LEN_BYTES: usize = 256 / 8;
const SEED_LEN_BYTES: usize = BLOCK_LEN_BYTES + KEY_LEN_BYTES;

pub type Block = [u8; BLOCK_LEN_BYTES];
type Key = [u8; KEY_LEN_BYTES];
pub type Seed = [u8; SEED_LEN_BYTES];

pub struct CtrDrbg {
    v: Block,
    key: Key,
}

impl CtrDrbg {
    pub fn new() -> Self {
        Self {
            v: [0; BLOCK_LEN_BYTES],
            key: [0; KEY_LEN_BYTES],
        }
    }

    fn update(&mut self, provided_data: &Seed) {
        // Section 10.2.1.2 (page 51).
        let mut temp = [0_u8; SEED_LEN_BYTES];

        for chunk in temp.chunks_exact_mut(BLOCK_LEN_BYTES) {
            block_increment(&mut self.v);
            let output_block = block_encrypt(&self.key, &self.v);
            chunk.copy_from_slice(&output_block);
        }

        for (t, d) in temp.iter_mut().zip(provided_data.iter()) {
            *t ^= d;
        }

        self.key.copy_from_slice(&temp[..KEY_LEN_BYTES]);
        self.v.copy_from_slice(&temp[KEY_LEN_BYTES..]);
    }

    pub fn instantiate(&mut self, seed_material: &Seed) {
        // Section 10.2.1.3 (page 52).
        self.key = [0; KEY_LEN_BYTES];
        self.v = [0; BLOCK_LEN_BYTES];
        self.update(seed_material);
    }

    /// One generate request of `num_128_bit_blocks`, followed by the state
    /// update. Section 10.2.1.5 (page 55).
    pub fn generate(&mut self, num_128_bit_blocks: usize) -> Vec<Block> {
        let additional_input = [0; SEED_LEN_BYTES];
        let mut blocks = Vec::with_capacity(num_128_bit_blocks);

        for _ in 0..num_128_bit_blocks {
            block_increment(&mut self.v);
            blocks.push(block_encrypt(&self.key, &self.v));
        }

        self.update(&additional_input);
        blocks
    }

    pub fn uninstantiate(&mut self) {
        self.v = [0; BLOCK_LEN_BYTES];
        self.key = [0; KEY_LEN_BYTES];
    }
}

fn block_increment(block: &mut Block) {
    for byte in block.iter_mut().rev() {
        if *byte == u8::MAX {
            *byte = 0;
        } else {
            *byte += 1;
            break;
        }
    }
}

fn block_encrypt(key: &Key, block: &Block) -> Block {
    let cipher = Aes256Enc::new_from_slice(key).expect("construct AES-256");
    let mut output_block = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut output_block);
    output_block
        .as_slice()
        .try_into()
        .expect("block slice to block array")
}

/// Block_Cipher_df per section 10.3.2: distills `entropy` (and an optional
/// 48-byte personalization string) into one seed's worth of material.
pub fn block_cipher_df(entropy: &[u8], pstr: Option<&[u8; 48]>, out: &mut Seed) {
    const DF_KEY: Key = [
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31,
    ];

    // Formatted input: counter block, L and N as big-endian byte counts,
    // the payload, then 0x80 and zero fill to a block boundary.
    let input_len = entropy.len() + pstr.map_or(0, |p| p.len());
    let mut dfin = vec![0u8; BLOCK_LEN_BYTES];
    dfin.extend_from_slice(&(input_len as u32).to_be_bytes());
    dfin.extend_from_slice(&(SEED_LEN_BYTES as u32).to_be_bytes());
    dfin.extend_from_slice(entropy);
    if let Some(pstr) = pstr {
        dfin.extend_from_slice(pstr);
    }
    dfin.push(0x80);
    while dfin.len() % BLOCK_LEN_BYTES != 0 {
        dfin.push(0);
    }

    // BCC compression into three chained blocks.
    let mut intermediate = [0u8; SEED_LEN_BYTES];
    for (index, chunk) in intermediate.chunks_exact_mut(BLOCK_LEN_BYTES).enumerate() {
        dfin[..4].copy_from_slice(&(index as u32).to_be_bytes());
        let mut chain = [0u8; BLOCK_LEN_BYTES];
        for block in dfin.chunks_exact(BLOCK_LEN_BYTES) {
            for (c, b) in chain.iter_mut().zip(block.iter()) {
                *c ^= b;
            }
            chain = block_encrypt(&DF_KEY, &chain);
        }
        chunk.copy_from_slice(&chain);
    }

    // Expansion under the distilled key.
    let mut key = [0u8; KEY_LEN_BYTES];
    key.copy_from_slice(&intermediate[..KEY_LEN_BYTES]);
    let mut block: Block = intermediate[KEY_LEN_BYTES..]
        .try_into()
        .expect("trailing block");
    for chunk in out.chunks_exact_mut(BLOCK_LEN_BYTES) {
        block = block_encrypt(&key, &block);
        chunk.copy_from_slice(&block);
    }
}
