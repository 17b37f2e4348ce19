// Licensed under the Apache-2.0 license

//! Driver lifecycle tests: `VersalTrng` running against the emulated
//! peripheral across all three operating modes and both silicon revisions.

use versal_trng_drivers::{
    TrngError, TrngMode, TrngStatus, TrngUsrCfg, TrngVersion, VersalTrng, MAX_SEED_LEN, PERS_LEN,
    SEC_STRENGTH_LEN,
};
use versal_trng_emu_periph::TrngPeriph;

fn hrng_cfg(seed_life: u32) -> TrngUsrCfg {
    TrngUsrCfg {
        mode: TrngMode::Hrng,
        seed_life,
        predict_en: false,
        df_disable: false,
        dfmul: 2,
        init_seed: None,
        pstr: None,
    }
}

fn drng_cfg(seed: &[u8], seed_life: u32, dfmul: u32) -> TrngUsrCfg {
    let mut init_seed = [0u8; MAX_SEED_LEN];
    init_seed[..seed.len()].copy_from_slice(seed);
    TrngUsrCfg {
        mode: TrngMode::Drng,
        seed_life,
        predict_en: false,
        df_disable: false,
        dfmul,
        init_seed: Some(init_seed),
        pstr: None,
    }
}

fn ptrng_cfg(df_disable: bool) -> TrngUsrCfg {
    TrngUsrCfg {
        mode: TrngMode::Ptrng,
        seed_life: 0,
        predict_en: false,
        df_disable,
        dfmul: if df_disable { 0 } else { 2 },
        init_seed: None,
        pstr: None,
    }
}

fn seed48(tweak: u8) -> [u8; 48] {
    let mut seed = [0u8; 48];
    for (i, byte) in seed.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(37).wrapping_add(tweak);
    }
    seed
}

fn seed128(tweak: u8) -> [u8; 128] {
    let mut seed = [0u8; 128];
    for (i, byte) in seed.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(29).wrapping_add(tweak);
    }
    seed
}

#[test]
fn hrng_v1_generates_distinct_blocks() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    trng.instantiate(&hrng_cfg(10)).unwrap();
    assert_eq!(trng.status(), TrngStatus::Healthy);

    let mut first = [0u8; SEC_STRENGTH_LEN];
    let mut second = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut first, false).unwrap();
    trng.generate(&mut second, false).unwrap();
    assert_ne!(first, second);
    assert_ne!(first, [0u8; SEC_STRENGTH_LEN]);

    let stats = trng.stats();
    assert_eq!(stats.bytes, 2 * SEC_STRENGTH_LEN as u64);
    assert_eq!(stats.bytes_reseed, 2 * SEC_STRENGTH_LEN as u64);
    assert_eq!(stats.elapsed_seed_life, 2);
}

#[test]
fn hrng_reseeds_itself_at_seed_life() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    trng.instantiate(&hrng_cfg(2)).unwrap();

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    for _ in 0..6 {
        trng.generate(&mut buf, false).unwrap();
    }
    assert_eq!(trng.status(), TrngStatus::Healthy);
    // The third generate triggered an automatic reseed.
    assert!(trng.stats().elapsed_seed_life <= 2);
}

#[test]
fn drng_exhausts_its_seed_life() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    trng.instantiate(&drng_cfg(&seed48(0), 2, 2)).unwrap();

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    for _ in 0..3 {
        trng.generate(&mut buf, false).unwrap();
    }
    assert_eq!(
        trng.generate(&mut buf, false),
        Err(TrngError::DRIVER_TRNG_SEED_LIFE_EXHAUSTED)
    );
    assert_eq!(trng.status(), TrngStatus::Error);
}

#[test]
fn drng_reseed_restarts_seed_life() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    trng.instantiate(&drng_cfg(&seed48(0), 2, 2)).unwrap();

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut buf, false).unwrap();
    trng.generate(&mut buf, false).unwrap();
    assert_eq!(trng.stats().elapsed_seed_life, 2);

    trng.reseed(Some(&seed48(0x5b)), 2).unwrap();
    assert_eq!(trng.stats().elapsed_seed_life, 0);
    assert_eq!(trng.stats().bytes_reseed, 0);

    for _ in 0..3 {
        trng.generate(&mut buf, false).unwrap();
    }
    assert_eq!(trng.status(), TrngStatus::Healthy);
}

#[test]
fn drng_rejects_replayed_seed() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    let seed = seed48(0);
    trng.instantiate(&drng_cfg(&seed, 5, 2)).unwrap();
    assert_eq!(
        trng.reseed(Some(&seed), 2),
        Err(TrngError::DRIVER_TRNG_SEED_REPLAY)
    );
    assert_eq!(trng.status(), TrngStatus::Error);
}

#[test]
fn predict_resistance_needs_configuration() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    trng.instantiate(&hrng_cfg(10)).unwrap();
    let mut buf = [0u8; SEC_STRENGTH_LEN];
    assert_eq!(
        trng.generate(&mut buf, true),
        Err(TrngError::DRIVER_TRNG_PREDICT_RESISTANCE)
    );
    assert_eq!(trng.status(), TrngStatus::Error);
}

#[test]
fn hrng_predict_resistance_reseeds_per_request() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    let cfg = TrngUsrCfg {
        predict_en: true,
        ..hrng_cfg(10)
    };
    trng.instantiate(&cfg).unwrap();

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut buf, true).unwrap();
    trng.generate(&mut buf, true).unwrap();
    // Every prediction-resistant generate leaves exactly one request worth
    // of seed life consumed.
    assert_eq!(trng.stats().elapsed_seed_life, 1);
}

#[test]
fn drng_predict_resistance_requires_fresh_seed() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    let cfg = TrngUsrCfg {
        predict_en: true,
        ..drng_cfg(&seed48(0), 5, 2)
    };
    trng.instantiate(&cfg).unwrap();

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut buf, true).unwrap();
    assert_eq!(
        trng.generate(&mut buf, true),
        Err(TrngError::DRIVER_TRNG_PREDICT_RESISTANCE)
    );
}

#[test]
fn ptrng_without_df_returns_raw_entropy() {
    let periph = TrngPeriph::with_entropy(TrngVersion::V1, Box::new(1u32..));
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    trng.instantiate(&ptrng_cfg(true)).unwrap();

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut buf, false).unwrap();

    let mut expected = [0u8; SEC_STRENGTH_LEN];
    for (chunk, word) in expected.chunks_exact_mut(4).zip(1u32..) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    assert_eq!(buf, expected);
}

#[test]
fn ptrng_with_df_conditions_entropy() {
    let make = || {
        let periph = TrngPeriph::with_entropy(TrngVersion::V1, Box::new(1u32..));
        let mut trng = VersalTrng::new(periph, TrngVersion::V1);
        trng.instantiate(&ptrng_cfg(false)).unwrap();
        let mut buf = [0u8; SEC_STRENGTH_LEN];
        trng.generate(&mut buf, false).unwrap();
        buf
    };

    let first = make();
    let second = make();
    // Same entropy stream, same conditioned output.
    assert_eq!(first, second);
    assert_ne!(first, [0u8; SEC_STRENGTH_LEN]);
}

#[test]
fn weak_entropy_fails_the_seed_screen() {
    let entropy = (0u32..).map(|i| if i % 4 == 0 { 0xAAAA_AAAA } else { i | 1 });
    let periph = TrngPeriph::with_entropy(TrngVersion::V1, Box::new(entropy));
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    assert_eq!(
        trng.instantiate(&hrng_cfg(10)),
        Err(TrngError::DRIVER_TRNG_WEAK_SEED)
    );
    assert_eq!(trng.status(), TrngStatus::Error);
}

#[test]
fn stuck_entropy_is_catastrophic_and_terminal() {
    let periph = TrngPeriph::with_entropy(TrngVersion::V1, Box::new(std::iter::repeat(7_u32)));
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    assert_eq!(
        trng.instantiate(&hrng_cfg(10)),
        Err(TrngError::DRIVER_TRNG_CATASTROPHIC_STUCK)
    );
    assert_eq!(trng.status(), TrngStatus::Catastrophic);

    // Nothing recovers a catastrophic instance, not even release.
    let mut buf = [0u8; SEC_STRENGTH_LEN];
    assert_eq!(
        trng.generate(&mut buf, false),
        Err(TrngError::DRIVER_TRNG_CATASTROPHIC_STATE)
    );
    assert_eq!(
        trng.instantiate(&hrng_cfg(10)),
        Err(TrngError::DRIVER_TRNG_CATASTROPHIC_STATE)
    );
    assert_eq!(
        trng.release(),
        Err(TrngError::DRIVER_TRNG_CATASTROPHIC_STATE)
    );
    assert_eq!(trng.status(), TrngStatus::Catastrophic);
}

#[test]
fn digitized_fault_is_catastrophic() {
    let mut periph = TrngPeriph::new(TrngVersion::V1);
    periph.force_dtf(true);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    assert_eq!(
        trng.instantiate(&hrng_cfg(10)),
        Err(TrngError::DRIVER_TRNG_CATASTROPHIC_DTF)
    );
    assert_eq!(trng.status(), TrngStatus::Catastrophic);
}

#[test]
fn health_test_failure_degrades_to_error() {
    let mut periph = TrngPeriph::new(TrngVersion::V1);
    periph.force_certf(true);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    assert_eq!(
        trng.instantiate(&hrng_cfg(10)),
        Err(TrngError::DRIVER_TRNG_HEALTH_TEST_FAILED)
    );
    assert_eq!(trng.status(), TrngStatus::Error);
}

#[test]
fn generate_times_out_on_stalled_output() {
    let mut periph = TrngPeriph::new(TrngVersion::V1);
    periph.stall_output(true);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    // DRNG instantiation never touches the output queue.
    trng.instantiate(&drng_cfg(&seed48(0), 5, 2)).unwrap();

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    assert_eq!(
        trng.generate(&mut buf, false),
        Err(TrngError::DRIVER_TRNG_GENERATE_TIMEOUT)
    );
    assert_eq!(trng.status(), TrngStatus::Error);
}

#[test]
fn reseed_times_out_when_done_never_asserts() {
    let mut periph = TrngPeriph::new(TrngVersion::V1);
    periph.stall_done(true);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    assert_eq!(
        trng.instantiate(&hrng_cfg(10)),
        Err(TrngError::DRIVER_TRNG_RESEED_TIMEOUT)
    );
    assert_eq!(trng.status(), TrngStatus::Error);
}

#[test]
fn release_allows_reinstantiation() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);

    trng.instantiate(&hrng_cfg(10)).unwrap();
    let mut buf = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut buf, false).unwrap();

    trng.release().unwrap();
    assert_eq!(trng.status(), TrngStatus::Uninitialized);

    trng.instantiate(&hrng_cfg(10)).unwrap();
    trng.generate(&mut buf, false).unwrap();
    assert_eq!(trng.status(), TrngStatus::Healthy);
}

#[test]
fn get_random_bytes_handles_partial_chunks() {
    let periph = TrngPeriph::new(TrngVersion::V1);
    let mut trng = VersalTrng::new(periph, TrngVersion::V1);
    trng.instantiate(&hrng_cfg(100)).unwrap();

    let mut buf = [0u8; 70];
    trng.get_random_bytes(&mut buf).unwrap();
    assert_ne!(&buf[64..], &[0u8; 6]);

    // Three full-strength generates back the 70 bytes.
    assert_eq!(trng.stats().bytes, 3 * SEC_STRENGTH_LEN as u64);
}

#[test]
fn hrng_v2_seeds_through_native_df() {
    let periph = TrngPeriph::new(TrngVersion::V2);
    let mut trng = VersalTrng::new(periph, TrngVersion::V2);

    trng.instantiate(&hrng_cfg(10)).unwrap();
    assert_eq!(trng.version(), TrngVersion::V2);

    let mut first = [0u8; SEC_STRENGTH_LEN];
    let mut second = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut first, false).unwrap();
    trng.generate(&mut second, false).unwrap();
    assert_ne!(first, second);
}

#[test]
fn drng_v2_seeds_over_the_serial_interface() {
    let periph = TrngPeriph::new(TrngVersion::V2);
    let mut trng = VersalTrng::new(periph, TrngVersion::V2);

    let seed = seed128(0);
    trng.instantiate(&drng_cfg(&seed, 5, 7)).unwrap();
    assert_eq!(trng.status(), TrngStatus::Healthy);

    let mut buf = [0u8; SEC_STRENGTH_LEN];
    trng.generate(&mut buf, false).unwrap();
    assert_ne!(buf, [0u8; SEC_STRENGTH_LEN]);

    trng.reseed(Some(&seed128(0x91)), 7).unwrap();
    trng.generate(&mut buf, false).unwrap();
    assert_eq!(trng.status(), TrngStatus::Healthy);
}

#[test]
fn drng_v2_is_deterministic_per_seed() {
    let run = |seed: &[u8; 128]| {
        let periph = TrngPeriph::new(TrngVersion::V2);
        let mut trng = VersalTrng::new(periph, TrngVersion::V2);
        trng.instantiate(&drng_cfg(seed, 5, 7)).unwrap();
        let mut buf = [0u8; SEC_STRENGTH_LEN];
        trng.generate(&mut buf, false).unwrap();
        buf
    };

    assert_eq!(run(&seed128(3)), run(&seed128(3)));
    assert_ne!(run(&seed128(3)), run(&seed128(4)));
}

#[test]
fn pstr_changes_drng_output() {
    let run = |pstr: Option<[u8; PERS_LEN]>| {
        let periph = TrngPeriph::new(TrngVersion::V2);
        let mut trng = VersalTrng::new(periph, TrngVersion::V2);
        let cfg = TrngUsrCfg {
            pstr,
            ..drng_cfg(&seed128(0), 5, 7)
        };
        trng.instantiate(&cfg).unwrap();
        let mut buf = [0u8; SEC_STRENGTH_LEN];
        trng.generate(&mut buf, false).unwrap();
        buf
    };

    assert_ne!(run(None), run(Some([0x6e; PERS_LEN])));
}
