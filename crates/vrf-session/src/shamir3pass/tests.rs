use super::*;

fn test_instance() -> Shamir3Pass {
    Shamir3Pass::new_default()
}

#[test]
fn lock_keys_are_inverse_exponents_mod_p_minus_1() {
    let sp = test_instance();
    let keys = sp.generate_lock_keys().unwrap();
    let product = (&keys.e * &keys.d) % sp.p_minus_1.clone();
    assert_eq!(product, BigUint::one());
}

#[test]
fn add_then_remove_lock_round_trips() {
    let sp = test_instance();
    let keys = sp.generate_lock_keys().unwrap();
    let message = BigUint::from(12345u64);

    let locked = sp.add_lock(&message, &keys.e);
    let unlocked = sp.remove_lock(&locked, &keys.d);
    assert_eq!(unlocked, message);
}

#[test]
fn locks_commute_across_two_parties() {
    let sp = test_instance();
    let client = sp.generate_lock_keys().unwrap();
    let server = sp.generate_lock_keys().unwrap();
    let message = BigUint::from(987654321u64);

    // client locks, server locks, client unlocks, server unlocks -> original
    let kek_c = sp.add_lock(&message, &client.e);
    let kek_cs = sp.add_lock(&kek_c, &server.e);
    let kek_s = sp.remove_lock(&kek_cs, &client.d);
    let recovered = sp.remove_lock(&kek_s, &server.d);

    assert_eq!(recovered, message);
}

#[test]
fn encrypt_decrypt_with_kek_round_trips() {
    let sp = test_instance();
    let plaintext = b"vrf secret key material";
    let (ciphertext, kek) = sp.encrypt_with_random_kek_key(plaintext).unwrap();
    let decrypted = sp.decrypt_with_key(&ciphertext, &kek).unwrap();
    assert_eq!(decrypted, plaintext);
}

#[test]
fn decrypt_with_wrong_kek_fails() {
    let sp = test_instance();
    let (ciphertext, _kek) = sp.encrypt_with_random_kek_key(b"secret").unwrap();
    let wrong_kek = sp.random_k().unwrap();
    assert!(sp.decrypt_with_key(&ciphertext, &wrong_kek).is_err());
}

#[test]
fn default_prime_meets_minimum_bit_length() {
    let sp = test_instance();
    assert!(sp.p().bits() >= SHAMIR_MIN_PRIME_BITS as u64);
}

#[test]
fn p_b64u_round_trips_through_decode() {
    let sp = test_instance();
    let encoded = sp.p_b64u();
    let decoded = decode_biguint_b64u(&encoded).unwrap();
    assert_eq!(&decoded, sp.p());
}

#[test]
fn rejects_prime_below_minimum_bits() {
    // 8 bits, far under SHAMIR_MIN_PRIME_BITS
    let small = encode_biguint_b64u(&BigUint::from(251u32));
    let err = Shamir3Pass::new(&small).unwrap_err();
    assert!(matches!(err, Shamir3PassError::PrimeTooSmall { .. }));
}
