//! Benchmarks for the matching engine.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark
//! cargo bench -- single_match
//! ```
//!
//! Results are saved to `target/criterion/` with HTML reports.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use matchbook::engine::PriceTimeMatcher;
use matchbook::market::MarketState;
use matchbook::orderbook::Book;
use matchbook::publisher::EventLog;
use matchbook::types::{PriceValue, Side, TradableEntry};

const SYMBOL: &str = "AAA";

/// $100.00
const BASE_PRICE: i64 = 10_000;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn empty_book(capacity: usize) -> Book {
    Book::new(SYMBOL, Arc::new(PriceTimeMatcher::new()), Arc::new(EventLog::new()), capacity)
}

fn order(price: i64, volume: u64, side: Side) -> TradableEntry {
    // Volume is always positive here
    TradableEntry::order("bench", SYMBOL, PriceValue::limit(price), volume, side).unwrap()
}

/// Sell entries at `base`, `base + step`, ...
fn populate_asks(book: &mut Book, count: usize, base: i64, step: i64, volume: u64) {
    for i in 0..count {
        let entry = order(base + i as i64 * step, volume, Side::Sell);
        book.submit(entry, MarketState::Open).unwrap();
    }
}

/// Buy entries at `base`, `base - step`, ...
fn populate_bids(book: &mut Book, count: usize, base: i64, step: i64, volume: u64) {
    for i in 0..count {
        let entry = order(base - i as i64 * step, volume, Side::Buy);
        book.submit(entry, MarketState::Open).unwrap();
    }
}

/// Seeded orders around `BASE_PRICE`.
fn generate_order_batch(count: usize, seed: u64) -> Vec<TradableEntry> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let price = BASE_PRICE + rng.gen_range(-500..=500);
            order(price, rng.gen_range(1..=1_000), side)
        })
        .collect()
}

// ============================================================================
// BENCHMARK: Single Match Latency
// ============================================================================

fn bench_single_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_match");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("against_best_level", |b| {
        b.iter_batched(
            || {
                let mut book = empty_book(2_000);
                populate_asks(&mut book, 1_000, BASE_PRICE, 1, 100);
                (book, order(BASE_PRICE, 100, Side::Buy))
            },
            |(mut book, buy)| black_box(book.submit(buy, MarketState::Open)),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("multi_level_sweep", |b| {
        b.iter_batched(
            || {
                let mut book = empty_book(200);
                populate_asks(&mut book, 100, BASE_PRICE, 1, 10);
                (book, order(BASE_PRICE + 10, 100, Side::Buy))
            },
            |(mut book, buy)| black_box(book.submit(buy, MarketState::Open)),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("no_match_rest_on_book", |b| {
        b.iter_batched(
            || {
                let mut book = empty_book(2_000);
                populate_asks(&mut book, 1_000, BASE_PRICE, 1, 100);
                (book, order(BASE_PRICE - 100, 100, Side::Buy))
            },
            |(mut book, buy)| black_box(book.submit(buy, MarketState::Open)),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

// ============================================================================
// BENCHMARK: Cancels and the auction
// ============================================================================

fn bench_book_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_operations");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("cancel_order", |b| {
        b.iter_batched(
            || {
                let mut book = empty_book(2_000);
                populate_bids(&mut book, 999, BASE_PRICE, 1, 100);
                let target = order(BASE_PRICE - 500, 100, Side::Buy);
                let id = target.id().to_string();
                book.submit(target, MarketState::Open).unwrap();
                (book, id)
            },
            |(mut book, id)| black_box(book.cancel_order(Side::Buy, &id)),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("opening_auction_1k", |b| {
        let staged = generate_order_batch(1_000, 7);
        b.iter_batched(
            || {
                let mut book = empty_book(2_000);
                for entry in staged.clone() {
                    book.submit(entry, MarketState::PreOpen).unwrap();
                }
                book
            },
            |mut book| black_box(book.open_market()),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

// ============================================================================
// BENCHMARK: Throughput
// ============================================================================

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(15));
    group.sample_size(50);

    for batch_size in [1_000, 10_000] {
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::new("orders", batch_size), &batch_size, |b, &size| {
            let orders = generate_order_batch(size, 42);
            b.iter_batched(
                || (empty_book(size * 2), orders.clone()),
                |(mut book, orders)| {
                    for entry in orders {
                        let _ = black_box(book.submit(entry, MarketState::Open));
                    }
                    book.archive().len()
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// CRITERION ENTRY POINT
// ============================================================================

criterion_group!(benches, bench_single_match, bench_book_operations, bench_throughput);

criterion_main!(benches);
