//! The facade holds no shared state: concurrent callers need no coordination.

use std::thread;

use sceau_crypto_core::{decrypt_with_params, encrypt_with_params, CryptoError, Pbkdf2Params};

const FAST: Pbkdf2Params = Pbkdf2Params { iterations: 1_000 };
const THREADS: u8 = 8;

#[test]
fn parallel_encrypt_decrypt_from_scoped_threads() {
    let shared = encrypt_with_params(b"shared", b"pw", Some(b"salt"), &FAST).unwrap();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let shared = &shared;
                scope.spawn(move || {
                    let password = [b'p', i];
                    let payload = vec![i; 100 + usize::from(i)];
                    let salt = (i % 2 == 0).then_some(&b"thread-salt"[..]);

                    for _ in 0..5 {
                        let token = encrypt_with_params(&payload, &password, salt, &FAST).unwrap();
                        let opened =
                            decrypt_with_params(&token, &password, salt, &FAST, None).unwrap();
                        assert_eq!(opened.expose(), payload.as_slice());
                    }

                    let opened = decrypt_with_params(shared, b"pw", Some(b"salt"), &FAST, None)
                        .unwrap();
                    assert_eq!(opened.expose(), b"shared");

                    let wrong = decrypt_with_params(shared, &password, Some(b"salt"), &FAST, None);
                    assert!(matches!(wrong, Err(CryptoError::Authentication)));
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker thread should not panic");
        }
    });
}
