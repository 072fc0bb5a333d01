//! Benchmarks for replay and change classification.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use depth_delta_reconstructor::{
    book_changes, MarketEvent, Order, OrderBook, Session, SessionConfig, Side, UpdateEntry,
};

/// Orders resting in the book at any time
const RESTING: u64 = 40;

/// Subscribe, then one update per step: add a new order and delete the one
/// added `RESTING` steps earlier.
fn create_test_events(count: u64) -> Vec<MarketEvent> {
    let mut events = Vec::with_capacity(count as usize + 1);
    events.push(MarketEvent::subscribe(0, 0));

    for i in 0..count {
        let id = i + 1;
        let is_bid = i % 2 == 0;
        let offset = (i % 10) as f64 * 0.00001;
        let (side, price) = if is_bid {
            (Side::Bid, 1.1182 - offset)
        } else {
            (Side::Ask, 1.1183 + offset)
        };

        let mut entries = vec![UpdateEntry::new_order(id, side, price, (i % 100 + 1) * 1_000)];
        if id > RESTING {
            entries.push(UpdateEntry::delete(id - RESTING));
        }
        events.push(MarketEvent::update(id, id as i64 * 1_000_000, entries));
    }

    events
}

fn bench_replay(c: &mut Criterion) {
    let events = create_test_events(10_000);

    let mut group = c.benchmark_group("replay");
    group.throughput(Throughput::Elements(events.len() as u64));

    for depth in [1usize, 5, 10] {
        group.bench_function(format!("depth_{depth}"), |b| {
            b.iter(|| {
                let config = SessionConfig::new("EUR/USD", depth).with_logging(false);
                let mut session = Session::with_config(config).unwrap();
                black_box(session.replay_events(events.iter().cloned()))
            })
        });
    }

    group.finish();
}

fn bench_book_changes(c: &mut Criterion) {
    let mut prev = OrderBook::new("EUR/USD");
    for i in 0..RESTING {
        let price = 1.1182 - (i / 2) as f64 * 0.00001;
        let order = if i % 2 == 0 {
            Order::bid(i + 1, price, 1_000)
        } else {
            Order::ask(i + 1, price + 0.0002, 1_000)
        };
        prev.add(order).unwrap();
    }

    let mut current = prev.clone();
    let removed = vec![current.delete(1).unwrap(), current.delete(2).unwrap()];
    let added = vec![Order::bid(100, 1.1182, 500), Order::ask(101, 1.11815, 500)];
    for order in &added {
        current.add(*order).unwrap();
    }

    let mut group = c.benchmark_group("diff");
    group.bench_function("book_changes_depth_5", |b| {
        b.iter(|| black_box(book_changes(&removed, &added, &prev, &current, 5)))
    });
    group.bench_function("depth_view_10", |b| {
        b.iter(|| black_box(current.depth_view(10)))
    });
    group.finish();
}

criterion_group!(benches, bench_replay, bench_book_changes);
criterion_main!(benches);
