//! AES-256-GCM and Argon2 benchmarks
//!
//! ```bash
//! cargo bench -p credstore-common --features runtime --bench crypto_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use credstore_common::crypto::EncryptionService;

// ============================================================================
// Payload sizes: a password, a PEM certificate bundle, a large JSON credential
// ============================================================================

const PAYLOADS: [(&str, usize); 3] = [("32B", 32), ("4KB", 4 * 1024), ("64KB", 64 * 1024)];

const TEST_PASSWORD: &str = "bench_password_for_key_derivation";

fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("aes_gcm");
    let service = EncryptionService::new(EncryptionService::generate_key())
        .expect("Failed to create encryption service");

    for (name, size) in PAYLOADS {
        let data = vec![0x5a_u8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", name), &data, |b, data| {
            b.iter(|| black_box(service.encrypt(black_box(data)).expect("encrypt")));
        });

        let sealed = service.encrypt(&data).expect("encrypt");
        group.bench_with_input(BenchmarkId::new("decrypt", name), &sealed, |b, sealed| {
            b.iter(|| {
                black_box(
                    service
                        .decrypt(black_box(&sealed.ciphertext), black_box(&sealed.nonce))
                        .expect("decrypt"),
                )
            });
        });
    }

    group.finish();
}

/// Rotation re-encrypts every field: decrypt under the old key, encrypt under the new.
fn bench_reencrypt(c: &mut Criterion) {
    let old = EncryptionService::new(EncryptionService::generate_key()).expect("old key");
    let new = EncryptionService::new(EncryptionService::generate_key()).expect("new key");
    let sealed = old.encrypt(&[0x11; 4096]).expect("encrypt");

    c.bench_function("reencrypt_4KB", |b| {
        b.iter(|| {
            let plain = old.decrypt(&sealed.ciphertext, &sealed.nonce).expect("decrypt");
            black_box(new.encrypt(&plain).expect("encrypt"))
        });
    });
}

fn bench_password_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("argon2");
    group.sample_size(10);

    let salt = EncryptionService::from_password_with_salt(TEST_PASSWORD, None)
        .expect("derive")
        .password_salt()
        .map(str::to_string)
        .expect("salt");

    group.bench_function("existing_salt", |b| {
        b.iter(|| {
            black_box(
                EncryptionService::from_password_with_salt(
                    black_box(TEST_PASSWORD),
                    Some(black_box(&salt)),
                )
                .expect("derive"),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encrypt_decrypt, bench_reencrypt, bench_password_derivation);
criterion_main!(benches);
