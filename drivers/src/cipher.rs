/*++

Licensed under the Apache-2.0 license.

File Name:

    cipher.rs

Abstract:

    Block cipher primitive backing the software derivation function. The
    silicon's DRBG is keyed with 256-bit seed material, so this is the
    14-round substitution-permutation network over 128-bit blocks with a
    15x16-byte key schedule. Encryption only; nothing in the driver ever
    decrypts.

--*/

pub const BLOCK_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

const ROUNDS: usize = 14;
const SCHEDULE_LEN: usize = BLOCK_LEN * (ROUNDS + 1);

/// Fixed byte-substitution table.
const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab,
    0x76, 0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4,
    0x72, 0xc0, 0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71,
    0xd8, 0x31, 0x15, 0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2,
    0xeb, 0x27, 0xb2, 0x75, 0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6,
    0xb3, 0x29, 0xe3, 0x2f, 0x84, 0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb,
    0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf, 0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45,
    0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8, 0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5,
    0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2, 0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44,
    0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73, 0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a,
    0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb, 0xe0, 0x32, 0x3a, 0x0a, 0x49,
    0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79, 0xe7, 0xc8, 0x37, 0x6d,
    0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08, 0xba, 0x78, 0x25,
    0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a, 0x70, 0x3e,
    0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e, 0xe1,
    0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb,
    0x16,
];

const fn xtime(b: u8) -> u8 {
    (b << 1) ^ (((b >> 7) & 1) * 0x1b)
}

/// GF(2^8) x2 multiples of the substitution table.
const SBOX2: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = xtime(SBOX[i]);
        i += 1;
    }
    table
};

/// GF(2^8) x3 multiples of the substitution table.
const SBOX3: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = SBOX2[i] ^ SBOX[i];
        i += 1;
    }
    table
};

pub(crate) fn xor_block(res: &mut [u8; BLOCK_LEN], input: &[u8]) {
    for (r, i) in res.iter_mut().zip(input.iter()) {
        *r ^= i;
    }
}

/// Substitute, rotate and substitute a 4-byte word of the key schedule.
fn rot_sub4(t: &mut [u8; 4]) {
    *t = [
        SBOX[t[1] as usize],
        SBOX[t[2] as usize],
        SBOX[t[3] as usize],
        SBOX[t[0] as usize],
    ];
}

fn sub4(t: &mut [u8; 4]) {
    for b in t.iter_mut() {
        *b = SBOX[*b as usize];
    }
}

/// Byte substitution combined with the row rotation, used for the final
/// round which omits column mixing.
fn shift_row_sbox(f: &mut [u8; BLOCK_LEN]) {
    for i in [0, 4, 8, 12] {
        f[i] = SBOX[f[i] as usize];
    }
    let t = f[1];
    f[1] = SBOX[f[5] as usize];
    f[5] = SBOX[f[9] as usize];
    f[9] = SBOX[f[13] as usize];
    f[13] = SBOX[t as usize];
    let t = f[2];
    f[2] = SBOX[f[10] as usize];
    f[10] = SBOX[t as usize];
    let t = f[6];
    f[6] = SBOX[f[14] as usize];
    f[14] = SBOX[t as usize];
    let t = f[15];
    f[15] = SBOX[f[11] as usize];
    f[11] = SBOX[f[7] as usize];
    f[7] = SBOX[f[3] as usize];
    f[3] = SBOX[t as usize];
}

/// Byte substitution, row rotation and column mixing fused into one table
/// pass over the state.
fn mix_column_sbox(dst: &mut [u8; BLOCK_LEN], f: &[u8; BLOCK_LEN]) {
    for i in 0..4 {
        let a = 4 * i;
        let b = (a + 0x5) % 16;
        let c = (a + 0xa) % 16;
        let d = (a + 0xf) % 16;
        dst[a] = SBOX2[f[a] as usize]
            ^ SBOX3[f[b] as usize]
            ^ SBOX[f[c] as usize]
            ^ SBOX[f[d] as usize];
        dst[a + 1] = SBOX[f[a] as usize]
            ^ SBOX2[f[b] as usize]
            ^ SBOX3[f[c] as usize]
            ^ SBOX[f[d] as usize];
        dst[a + 2] = SBOX[f[a] as usize]
            ^ SBOX[f[b] as usize]
            ^ SBOX2[f[c] as usize]
            ^ SBOX3[f[d] as usize];
        dst[a + 3] = SBOX3[f[a] as usize]
            ^ SBOX[f[b] as usize]
            ^ SBOX[f[c] as usize]
            ^ SBOX2[f[d] as usize];
    }
}

/// Key schedule plus single-block encryption. One of these lives inside the
/// derivation function; re-keying overwrites the schedule in place.
pub struct BlockCipher {
    schedule: [u8; SCHEDULE_LEN],
}

impl BlockCipher {
    pub const fn new() -> Self {
        Self {
            schedule: [0; SCHEDULE_LEN],
        }
    }

    /// Expands a 256-bit key into the full round-key schedule.
    pub fn set_key(&mut self, key: &[u8; KEY_LEN]) {
        self.schedule[..KEY_LEN].copy_from_slice(key);
        let mut rcon: u8 = 1;
        let mut i = KEY_LEN;
        while i < SCHEDULE_LEN {
            let mut t = [
                self.schedule[i - 4],
                self.schedule[i - 3],
                self.schedule[i - 2],
                self.schedule[i - 1],
            ];
            if i % KEY_LEN == 0 {
                rot_sub4(&mut t);
                t[0] ^= rcon;
                rcon = xtime(rcon);
            } else if i % KEY_LEN == BLOCK_LEN {
                sub4(&mut t);
            }
            for k in 0..4 {
                self.schedule[i + k] = self.schedule[i - KEY_LEN + k] ^ t[k];
            }
            i += 4;
        }
    }

    pub fn encrypt_block(&self, input: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let mut fa = *input;
        xor_block(&mut fa, self.round_key(0));
        let mut fb = [0u8; BLOCK_LEN];
        for round in 1..ROUNDS {
            mix_column_sbox(&mut fb, &fa);
            fa = fb;
            xor_block(&mut fa, self.round_key(round));
        }
        shift_row_sbox(&mut fa);
        xor_block(&mut fa, self.round_key(ROUNDS));
        fa
    }

    /// Scrubs the expanded key material.
    pub fn clear(&mut self) {
        self.schedule = [0; SCHEDULE_LEN];
    }

    fn round_key(&self, round: usize) -> &[u8] {
        &self.schedule[round * BLOCK_LEN..][..BLOCK_LEN]
    }
}
