mod concurrent_seal;
mod kdf_calibration;
