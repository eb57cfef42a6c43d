//! Calibration feeds straight back into derivation.

use std::time::Duration;

use sceau_crypto_core::kdf::{calibrate, derive, DEFAULT_ITERATIONS, MAX_CALIBRATED_ITERATIONS};

#[test]
fn calibrated_params_are_usable() {
    let params = calibrate(Duration::from_millis(50)).expect("calibrate should succeed");
    assert!((DEFAULT_ITERATIONS..=MAX_CALIBRATED_ITERATIONS).contains(&params.iterations));

    let keys = derive(b"password", b"salt", &params).expect("derive should succeed");
    assert_eq!(keys.signing_key().expose().len(), 16);
}

#[test]
fn huge_target_is_capped() {
    let params = calibrate(Duration::from_secs(3600)).expect("calibrate should succeed");
    assert_eq!(params.iterations, MAX_CALIBRATED_ITERATIONS);
}
