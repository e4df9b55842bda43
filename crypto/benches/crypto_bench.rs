use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn digest_bench(c: &mut Criterion) {
    let data = vec![0xABu8; 1024];
    c.bench_function("blake2b_160_digest_1KB", |b| {
        b.iter(|| dao_crypto::digest(black_box(&data)))
    });
}

fn ballot_list_encrypt_bench(c: &mut Criterion) {
    let key = dao_crypto::SecretKey::generate();
    // Roughly 50 ballots of (tx id, vote) pairs.
    let plaintext = vec![0x5Au8; 50 * 34];
    c.bench_function("chacha20poly1305_encrypt_ballots", |b| {
        b.iter(|| key.encrypt(black_box(&plaintext)))
    });
}

fn ballot_list_decrypt_bench(c: &mut Criterion) {
    let key = dao_crypto::SecretKey::generate();
    let encrypted = key.encrypt(&vec![0x5Au8; 50 * 34]).unwrap();
    c.bench_function("chacha20poly1305_decrypt_ballots", |b| {
        b.iter(|| key.decrypt(black_box(&encrypted)))
    });
}

fn ed25519_verify_bench(c: &mut Criterion) {
    let kp = dao_crypto::generate_keypair();
    let msg = [42u8; 256];
    let sig = dao_crypto::sign_message(&msg, &kp.private);
    c.bench_function("ed25519_verify_proposal_256B", |b| {
        b.iter(|| dao_crypto::verify_signature(black_box(&msg), &sig, &kp.public))
    });
}

criterion_group!(
    benches,
    digest_bench,
    ballot_list_encrypt_bench,
    ballot_list_decrypt_bench,
    ed25519_verify_bench
);
criterion_main!(benches);
