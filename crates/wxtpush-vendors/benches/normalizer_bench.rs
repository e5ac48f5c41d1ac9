// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the callback hot paths: simulated token
// derivation, binder transaction decoding and broadcast normalization.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Map, Value, json};

use wxtpush_core::{RawCallback, Vendor, VendorConfig};
use wxtpush_vendors::parcel::ParcelWriter;
use wxtpush_vendors::{CallbackNormalizer, simulated_token};

fn bench_simulated_token(c: &mut Criterion) {
    let config = VendorConfig {
        app_id: Some("100".into()),
        app_key: Some("abc".into()),
        ..VendorConfig::default()
    };
    c.bench_function("simulated_token (xiaomi)", |b| {
        b.iter(|| simulated_token(black_box(Vendor::Xiaomi), black_box("device-1"), &config));
    });
}

fn bench_transaction_decode(c: &mut Criterion) {
    let mut w = ParcelWriter::new();
    w.write_interface_token("com.heytap.msp.push.callback.ICallBackResultService")
        .write_i32(0)
        .write_string16(Some("OPPO_REGISTRATION_ID_0123456789"))
        .write_string16(Some("com.example.app"));
    let parcel = w.into_bytes();
    let normalizer = CallbackNormalizer::new();

    c.bench_function("heytap onRegister transaction", |b| {
        b.iter(|| {
            let raw = RawCallback::Transaction {
                vendor: Vendor::Oppo,
                code: 1,
                parcel: parcel.clone(),
            };
            black_box(normalizer.normalize(black_box(raw)))
        });
    });
}

fn bench_broadcast(c: &mut Criterion) {
    let extras: Map<String, Value> = match json!({
        "title": "Order shipped",
        "content": "{\"registerId\":\"EMBEDDED\"}",
        "extra_orderId": "42",
    }) {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    let normalizer = CallbackNormalizer::new();

    c.bench_function("generic heytap broadcast", |b| {
        b.iter(|| {
            let raw = RawCallback::Broadcast {
                vendor: Some(Vendor::Oppo),
                action: "com.heytap.mcs.action.RECEIVE_MCS_MESSAGE".into(),
                extras: extras.clone(),
            };
            black_box(normalizer.normalize(black_box(raw)))
        });
    });
}

criterion_group!(
    benches,
    bench_simulated_token,
    bench_transaction_decode,
    bench_broadcast
);
criterion_main!(benches);
