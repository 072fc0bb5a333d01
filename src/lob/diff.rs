//! Classification of visible changes between two depth windows.
//!
//! The top-N window can change even when an event never mentions the
//! affected order: deeper orders are pulled into view when shallower ones
//! leave, and visible orders are pushed out when more competitive ones
//! arrive. [`book_changes`] reconciles the event's explicit add/delete lists
//! with that implicit churn.
//!
//! # Classification
//!
//! 1. A removed order that was visible is an `UPDATE` if a not-yet-consumed
//!    added order with the same price is visible afterwards (the added order
//!    is reported and consumed), otherwise a `DELETE`.
//! 2. A remaining added order that is visible afterwards and whose id was not
//!    visible before is `NEW`.
//! 3. Promotion: a visible order that was not visible before but already
//!    rested in the previous book is `NEW`.
//! 4. Demotion: a previously visible order that is no longer visible is a
//!    `DELETE`, unless already deleted or its price was absorbed by an
//!    `UPDATE`.
//!
//! The result is all deletes, then all updates, then all news, each bucket
//! in detection order.

use ahash::AHashMap;

use super::book::OrderBook;
use crate::types::{Change, Order};

/// True iff `order.id` is not a key of `existing`, regardless of price/size.
#[inline]
pub fn is_new(order: &Order, existing: &AHashMap<u64, Order>) -> bool {
    !existing.contains_key(&order.id)
}

/// Compute the ordered change list for one event.
///
/// # Arguments
/// * `removed` - Orders deleted by the event, in caller order
/// * `added` - Orders added by the event, in event order
/// * `prev_book` - Full book before the event
/// * `current_book` - Full book after the event
/// * `depth` - Window size per side
///
/// # Example
/// ```
/// use depth_delta_reconstructor::{book_changes, Action, Order, OrderBook};
///
/// let prev = OrderBook::new("EUR/USD");
/// let mut current = prev.clone();
/// let bid = Order::bid(1, 1.1182, 1_000_000);
/// current.add(bid).unwrap();
///
/// let changes = book_changes(&[], &[bid], &prev, &current, 2);
/// assert_eq!(changes.len(), 1);
/// assert_eq!(changes[0].action, Action::New);
/// ```
pub fn book_changes(
    removed: &[Order],
    added: &[Order],
    prev_book: &OrderBook,
    current_book: &OrderBook,
    depth: usize,
) -> Vec<Change> {
    let prev_view = prev_book.depth_view(depth);
    let curr_view = current_book.depth_view(depth);
    let prev_ids = prev_view.by_id();
    let curr_ids = curr_view.by_id();

    let mut deleted: Vec<Order> = Vec::new();
    let mut updated: Vec<Order> = Vec::new();
    let mut new_orders: Vec<Order> = Vec::new();
    let mut pending: Vec<Order> = added.to_vec();

    // Explicit removals: absorbed by a same-priced visible addition, or deleted
    for gone in removed.iter().filter(|o| prev_view.contains_exact(o)) {
        let absorbing = pending
            .iter()
            .position(|a| a.same_price(gone) && curr_view.contains_exact(a));

        match absorbing {
            Some(idx) => updated.push(pending.remove(idx)),
            None => deleted.push(*gone),
        }
    }

    // Explicit additions that became visible
    for order in &pending {
        if curr_view.contains_exact(order) && is_new(order, &prev_ids) {
            new_orders.push(*order);
        }
    }

    // Promotions: resting orders pulled into the window
    for order in curr_view.iter_by_price() {
        if is_new(order, &prev_ids)
            && prev_book.contains(order)
            && !new_orders.iter().any(|o| o.id == order.id)
        {
            new_orders.push(*order);
        }
    }

    // Demotions: orders pushed out of the window
    for order in prev_view.iter_by_price() {
        if is_new(order, &curr_ids)
            && !deleted.contains(order)
            && !updated.iter().any(|u| u.same_price(order))
        {
            deleted.push(*order);
        }
    }

    let mut changes = Vec::with_capacity(deleted.len() + updated.len() + new_orders.len());
    changes.extend(deleted.into_iter().map(Change::delete));
    changes.extend(updated.into_iter().map(Change::update));
    changes.extend(new_orders.into_iter().map(Change::new_order));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;

    fn load(book: &mut OrderBook, orders: &[Order]) {
        for order in orders {
            book.add(*order).unwrap();
        }
    }

    fn remove(book: &mut OrderBook, ids: &[u64]) -> Vec<Order> {
        ids.iter().map(|id| book.delete(*id).unwrap()).collect()
    }

    fn eurusd_bids() -> Vec<Order> {
        vec![
            Order::bid(8390570142, 1.11821, 1_000_000),
            Order::bid(8390592531, 1.11819, 6_250_000),
            Order::bid(8390592532, 1.11818, 1_000_000),
            Order::bid(8390592533, 1.11817, 2_500_000),
        ]
    }

    fn eurusd_asks() -> Vec<Order> {
        vec![
            Order::ask(8390573953, 1.11823, 1_000_000),
            Order::ask(8390592542, 1.11824, 500_000),
            Order::ask(8390592543, 1.11826, 1_000_000),
            Order::ask(8390592544, 1.11827, 1_750_000),
        ]
    }

    // =========================================================================
    // is_new
    // =========================================================================

    #[test]
    fn test_is_new_checks_id_only() {
        let mut book = OrderBook::new("EUR/USD");
        load(
            &mut book,
            &[
                Order::ask(1, 22.0, 5),
                Order::ask(2, 23.0, 10),
                Order::ask(3, 24.0, 25),
                Order::ask(4, 25.0, 22),
            ],
        );
        let existing = book.depth_view(10).by_id();

        assert!(!is_new(&Order::ask(3, 24.0, 25), &existing));
        assert!(!is_new(&Order::ask(3, 99.0, 1), &existing));
        assert!(is_new(&Order::ask(5, 123.0, 45), &existing));
    }

    // =========================================================================
    // EUR/USD sequence
    // =========================================================================

    #[test]
    fn test_first_fill_reports_top_levels_as_new() {
        let prev = OrderBook::new("EUR/USD");
        let mut current = prev.clone();
        let bids = eurusd_bids();
        let asks = eurusd_asks();
        load(&mut current, &bids);
        load(&mut current, &asks);

        let added: Vec<Order> = bids.iter().chain(asks.iter()).copied().collect();
        let changes = book_changes(&[], &added, &prev, &current, 2);

        assert_eq!(
            changes,
            vec![
                Change::new_order(bids[0]),
                Change::new_order(bids[1]),
                Change::new_order(asks[0]),
                Change::new_order(asks[1]),
            ]
        );
    }

    #[test]
    fn test_same_price_replacement_is_update() {
        let mut current = OrderBook::new("EUR/USD");
        load(&mut current, &eurusd_bids());
        load(&mut current, &eurusd_asks());
        let prev = current.clone();

        let bids = vec![
            Order::bid(8390598790, 1.11819, 6_750_000),
            Order::bid(8390598791, 1.11818, 500_000),
        ];
        let asks = vec![
            Order::ask(8390598803, 1.11827, 1_250_000),
            Order::ask(8390598804, 1.11828, 4_500_000),
        ];
        load(&mut current, &bids);
        load(&mut current, &asks);
        let removed = remove(&mut current, &[8390592531, 8390592532, 8390592544]);

        let added: Vec<Order> = bids.iter().chain(asks.iter()).copied().collect();
        let changes = book_changes(&removed, &added, &prev, &current, 2);

        assert_eq!(changes, vec![Change::update(bids[0])]);
    }

    #[test]
    fn test_mixed_delete_update_new() {
        let mut current = OrderBook::new("EUR/USD");
        load(&mut current, &eurusd_bids());
        load(&mut current, &eurusd_asks());
        load(
            &mut current,
            &[
                Order::bid(8390598790, 1.11819, 6_750_000),
                Order::bid(8390598791, 1.11818, 500_000),
                Order::ask(8390598803, 1.11827, 1_250_000),
                Order::ask(8390598804, 1.11828, 4_500_000),
            ],
        );
        remove(&mut current, &[8390592531, 8390592532, 8390592544]);
        let prev = current.clone();

        let removed = remove(&mut current, &[8390598790, 8390598791, 8390592533, 8390573953]);
        let bids = vec![
            Order::bid(8390599555, 1.1182, 500_000),
            Order::bid(8390599556, 1.11819, 6_250_000),
            Order::bid(8390599557, 1.11818, 2_500_000),
            Order::bid(8390599558, 1.11817, 3_500_000),
        ];
        let asks = vec![Order::ask(8390599567, 1.11823, 400_000)];
        load(&mut current, &bids);
        load(&mut current, &asks);

        let added: Vec<Order> = bids.iter().chain(asks.iter()).copied().collect();
        let changes = book_changes(&removed, &added, &prev, &current, 2);

        assert_eq!(
            changes,
            vec![
                Change::delete(removed[0]),
                Change::update(asks[0]),
                Change::new_order(bids[0]),
            ]
        );
    }

    // =========================================================================
    // Window churn
    // =========================================================================

    fn ladder() -> OrderBook {
        let mut book = OrderBook::new("EUR/USD");
        load(
            &mut book,
            &[
                Order::ask(5, 22.0, 5),
                Order::ask(6, 23.0, 10),
                Order::ask(7, 24.0, 25),
                Order::ask(8, 25.0, 22),
                Order::bid(1, 20.0, 10),
                Order::bid(2, 19.0, 12),
                Order::bid(3, 18.0, 17),
                Order::bid(4, 17.0, 18),
            ],
        );
        book
    }

    #[test]
    fn test_promotion_into_window() {
        let mut book = ladder();
        let prev = book.clone();

        let removed = remove(&mut book, &[1, 6, 5]);
        let replacement = Order::ask(9, 23.0, 12);
        book.add(replacement).unwrap();

        let changes = book_changes(&removed, &[replacement], &prev, &book, 2);

        assert_eq!(
            changes,
            vec![
                Change::delete(Order::bid(1, 20.0, 10)),
                Change::delete(Order::ask(5, 22.0, 5)),
                Change::update(replacement),
                Change::new_order(Order::bid(3, 18.0, 17)),
                Change::new_order(Order::ask(7, 24.0, 25)),
            ]
        );
    }

    #[test]
    fn test_demotion_by_more_competitive_orders() {
        let mut book = ladder();
        remove(&mut book, &[1, 6, 5]);
        book.add(Order::ask(9, 23.0, 12)).unwrap();
        let prev = book.clone();

        let added = vec![Order::ask(10, 20.0, 12), Order::ask(11, 21.0, 12)];
        for order in &added {
            book.add(*order).unwrap();
        }

        let changes = book_changes(&[], &added, &prev, &book, 2);

        assert_eq!(
            changes,
            vec![
                Change::delete(Order::ask(9, 23.0, 12)),
                Change::delete(Order::ask(7, 24.0, 25)),
                Change::new_order(added[0]),
                Change::new_order(added[1]),
            ]
        );
    }

    #[test]
    fn test_demotions_of_tied_bids_follow_arrival() {
        let mut book = OrderBook::new("EUR/USD");
        load(&mut book, &[Order::bid(1, 20.0, 10), Order::bid(2, 20.0, 5)]);
        let prev = book.clone();

        let added = vec![Order::bid(3, 21.0, 1), Order::bid(4, 21.0, 2)];
        load(&mut book, &added);

        assert_eq!(
            book_changes(&[], &added, &prev, &book, 2),
            vec![
                Change::delete(Order::bid(1, 20.0, 10)),
                Change::delete(Order::bid(2, 20.0, 5)),
                Change::new_order(added[0]),
                Change::new_order(added[1]),
            ]
        );
    }

    #[test]
    fn test_invisible_churn_produces_nothing() {
        let mut book = ladder();
        let prev = book.clone();
        let removed = remove(&mut book, &[4]);
        let added = vec![Order::bid(12, 16.0, 1)];
        book.add(added[0]).unwrap();

        assert!(book_changes(&removed, &added, &prev, &book, 2).is_empty());
    }

    #[test]
    fn test_buckets_are_ordered() {
        let mut book = ladder();
        let prev = book.clone();
        let removed = remove(&mut book, &[1, 5]);
        let added = vec![Order::bid(13, 20.0, 99), Order::ask(14, 21.5, 1)];
        for order in &added {
            book.add(*order).unwrap();
        }

        let changes = book_changes(&removed, &added, &prev, &book, 2);
        let rank = |a: Action| match a {
            Action::Delete => 0,
            Action::Update => 1,
            Action::New => 2,
        };
        assert!(changes
            .windows(2)
            .all(|w| rank(w[0].action) <= rank(w[1].action)));
        assert!(changes.contains(&Change::update(added[0])));
        assert!(changes.contains(&Change::delete(Order::ask(5, 22.0, 5))));
    }
}
