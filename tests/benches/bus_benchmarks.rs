//! # Courier Bus Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Naming | Queue name / routing key derivation (memoized) |
//! | Producer | Dispatch through the full middleware chain |
//! | Round trip | Dispatch then consume N commands |
//! | Signatures | HMAC-SHA256 sign and verify |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use courier_bus::middleware::{
    CorrelationIdMiddleware, EnvelopeIdMiddleware, EnvelopeTimestampMiddleware,
    SignatureVerificationMiddleware, SignedEnvelopeMiddleware,
};
use courier_bus::{
    naming, Consumer, HandleClassNameInflector, InMemoryLocator, MiddlewareChain, Produce,
    Producer, RequeuePolicy,
};
use courier_tests::fixtures::{
    billing_bus, charge, charge_handler, counting_listener, CHARGE_HANDLER, LEDGER, RECEIPT_MAILER,
};
use parking_lot::Mutex;

// ============================================================================
// Naming
// ============================================================================

fn bench_naming(c: &mut Criterion) {
    let mut group = c.benchmark_group("naming");

    group.bench_function("queue_name", |b| {
        b.iter(|| black_box(naming::queue_name(black_box("billing::ChargeCardHandler"))))
    });
    group.bench_function("routing_key", |b| {
        b.iter(|| black_box(naming::routing_key(black_box("billing::ChargeCard"))))
    });

    group.finish();
}

// ============================================================================
// Producer
// ============================================================================

fn stamping_chain() -> MiddlewareChain {
    let mut chain = MiddlewareChain::new();
    chain
        .add(EnvelopeIdMiddleware::default())
        .add(EnvelopeTimestampMiddleware)
        .add(CorrelationIdMiddleware);
    chain
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("producer");
    let Ok(bus) = billing_bus(RequeuePolicy::default()) else {
        return;
    };

    let mut plain = Producer::new(&bus);
    group.bench_function("dispatch_plain", |b| {
        b.iter(|| black_box(plain.dispatch(&charge(5)).is_ok()))
    });

    let mut stamped = Producer::new(&bus).with_middleware(stamping_chain());
    group.bench_function("dispatch_stamped", |b| {
        b.iter(|| black_box(stamped.dispatch(&charge(5)).is_ok()))
    });

    group.finish();
}

// ============================================================================
// Round trip
// ============================================================================

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");

    for size in [10u64, 100, 1000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("dispatch_consume", size), &size, |b, &size| {
            b.iter(|| {
                let Ok(bus) = billing_bus(RequeuePolicy::default()) else {
                    return 0;
                };
                let mut producer = Producer::new(&bus);
                for amount in 2..size + 2 {
                    let _ = producer.dispatch(&charge(amount));
                }

                let calls = Arc::new(Mutex::new(Vec::new()));
                let events = Arc::new(AtomicUsize::new(0));
                let locator = InMemoryLocator::new()
                    .with_instance(CHARGE_HANDLER, charge_handler(calls))
                    .with_instance(RECEIPT_MAILER, counting_listener(events.clone()))
                    .with_instance(LEDGER, counting_listener(events));
                Consumer::new(&bus, locator, HandleClassNameInflector)
                    .consume(None, None)
                    .map(|stats| stats.consumed)
                    .unwrap_or(0)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Signatures
// ============================================================================

fn bench_signatures(c: &mut Criterion) {
    let mut group = c.benchmark_group("signatures");
    let (Ok(signer), Ok(verifier)) = (
        SignedEnvelopeMiddleware::new("bench-key"),
        SignatureVerificationMiddleware::new("bench-key"),
    ) else {
        return;
    };

    for size in [64usize, 1024, 16 * 1024] {
        let body = vec![0xAB; size];
        let signature = signer.sign(&body);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("sign", size), &body, |b, body| {
            b.iter(|| black_box(signer.sign(body)))
        });
        group.bench_with_input(BenchmarkId::new("verify", size), &body, |b, body| {
            b.iter(|| black_box(verifier.verify(body, &signature)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_naming,
    bench_dispatch,
    bench_round_trip,
    bench_signatures
);
criterion_main!(benches);
