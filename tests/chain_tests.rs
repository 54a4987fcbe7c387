use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use fatoora::chain::{ChainState, ChainTracker, invoice_hash};
use fatoora::core::*;
use fatoora::rules::{RuleCode, RuleEngine};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine() -> RuleEngine {
    RuleEngine::new(
        ValidationConfig::default()
            .check_signatures(false)
            .verify_qr(false)
            .reference_date(date(2024, 12, 31)),
    )
}

fn party(name: &str, vat: &str) -> Party {
    PartyBuilder::new(name, AddressBuilder::new("Riyadh", "12211", "SA").build())
        .vat_number(vat)
        .build()
}

fn invoice(number: &str, day: u32, pih: Option<&str>) -> Invoice {
    let mut b = InvoiceBuilder::new(number, date(2024, 5, day))
        .seller(party("Seller", "310122393500003"))
        .buyer(party("Buyer", "300000000000003"))
        .add_line(LineItemBuilder::new("1", "Service", dec!(1), dec!(100) + Decimal::from(day)).build());
    if let Some(pih) = pih {
        b = b.previous_invoice_hash(pih);
    }
    b.build().unwrap()
}

/// Three invoices, each referencing the hash of the one before.
fn series() -> (Invoice, Invoice, Invoice) {
    let i1 = invoice("INV-1", 1, None);
    let i2 = invoice("INV-2", 2, Some(&invoice_hash(&i1)));
    let i3 = invoice("INV-3", 3, Some(&invoice_hash(&i2)));
    (i1, i2, i3)
}

#[test]
fn linked_series_accepted_in_order() {
    let (i1, i2, i3) = series();
    let tracker = ChainTracker::new();
    let engine = engine();
    for inv in [&i1, &i2, &i3] {
        let result = engine.evaluate(inv, Some(&tracker));
        assert!(result.is_compliant(), "{}: {:?}", inv.number, result.violations());
    }
    let state = tracker.get("310122393500003").unwrap();
    assert_eq!(state.last_hash, invoice_hash(&i3));
    assert_eq!(state.last_issue_date, date(2024, 5, 3));
    assert_eq!(state.anchor_pih.as_deref(), Some(invoice_hash(&i2).as_str()));
    assert_eq!(state.accepted_count, 3);
}

#[test]
fn reset_forgets_series() {
    let (i1, i2, i3) = series();
    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));
    engine.evaluate(&i2, Some(&tracker));
    tracker.reset();
    assert_eq!(tracker.series_count(), 0);

    let result = engine.evaluate(&i3, Some(&tracker));
    assert_eq!(result.violation_codes(), vec![RuleCode::PreviousInvoiceHash]);
    assert!(tracker.get("310122393500003").is_none());
}

#[test]
fn skipped_invoice_breaks_chain_without_advancing() {
    let (i1, _i2, i3) = series();
    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));

    let result = engine.evaluate(&i3, Some(&tracker));
    assert!(result.has_violation(RuleCode::PreviousInvoiceHash));
    assert_eq!(tracker.get("310122393500003").unwrap().last_hash, invoice_hash(&i1));
}

#[test]
fn first_invoice_must_not_reference_a_predecessor() {
    let tracker = ChainTracker::new();
    let inv = invoice("INV-9", 9, Some(&"ab".repeat(32)));
    let result = engine().evaluate(&inv, Some(&tracker));
    assert_eq!(result.violation_codes(), vec![RuleCode::PreviousInvoiceHash]);
    assert_eq!(tracker.series_count(), 0);
}

#[test]
fn uppercase_hash_accepted() {
    let (i1, _, _) = series();
    let i2 = invoice("INV-2", 2, Some(&invoice_hash(&i1).to_uppercase()));
    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));
    assert!(engine.evaluate(&i2, Some(&tracker)).is_compliant());
}

#[test]
fn malformed_hash_reported_once() {
    let (i1, _, _) = series();
    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));

    let bad = invoice("INV-2", 2, Some("not-a-hash"));
    let result = engine.evaluate(&bad, Some(&tracker));
    assert_eq!(result.violations().len(), 1);
    assert_eq!(result.violations()[0].rule, RuleCode::PreviousInvoiceHash);
    assert_eq!(tracker.get("310122393500003").unwrap().accepted_count, 1);
}

#[test]
fn backdated_successor_rejected() {
    let i1 = invoice("INV-1", 10, None);
    let i2 = invoice("INV-2", 9, Some(&invoice_hash(&i1)));
    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));

    let result = engine.evaluate(&i2, Some(&tracker));
    assert_eq!(result.violation_codes(), vec![RuleCode::PreviousInvoiceHash]);
    assert_eq!(result.violations()[0].field, "issue_date");
}

#[test]
fn same_day_successor_accepted() {
    let i1 = invoice("INV-1", 10, None);
    let i2 = invoice("INV-2", 10, Some(&invoice_hash(&i1)));
    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));
    assert!(engine.evaluate(&i2, Some(&tracker)).is_compliant());
}

#[test]
fn replaying_last_invoice_is_idempotent() {
    let (i1, i2, _) = series();
    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));
    let first = engine.evaluate(&i2, Some(&tracker));
    let again = engine.evaluate(&i2, Some(&tracker));

    assert!(first.same_verdict(&again));
    let state = tracker.get("310122393500003").unwrap();
    assert_eq!(state.accepted_count, 2);
    assert_eq!(state.last_hash, invoice_hash(&i2));

    // An older invoice is not a replay.
    assert!(!engine.evaluate(&i1, Some(&tracker)).is_compliant());
}

#[test]
fn rejected_invoice_leaves_series_untouched() {
    let (i1, _, _) = series();
    let mut bad = invoice("INV-2", 2, Some(&invoice_hash(&i1)));
    bad.totals.total = dec!(1);
    let next = invoice("INV-3", 3, Some(&invoice_hash(&bad)));

    let tracker = ChainTracker::new();
    let engine = engine();
    engine.evaluate(&i1, Some(&tracker));

    let rejected = engine.evaluate(&bad, Some(&tracker));
    assert_eq!(rejected.violation_codes(), vec![RuleCode::GrandTotal]);
    assert_eq!(tracker.get("310122393500003").unwrap().last_hash, invoice_hash(&i1));

    // Its successor references a hash the series never accepted.
    let orphan = engine.evaluate(&next, Some(&tracker));
    assert_eq!(orphan.violation_codes(), vec![RuleCode::PreviousInvoiceHash]);
}

#[test]
fn standalone_evaluation_treats_invoice_as_first() {
    let (i1, i2, _) = series();
    let engine = engine();
    assert!(engine.evaluate(&i1, None).is_compliant());
    assert_eq!(
        engine.evaluate(&i2, None).violation_codes(),
        vec![RuleCode::PreviousInvoiceHash]
    );
}

#[test]
fn series_are_independent() {
    let a1 = invoice("A-1", 1, None);
    let b1 = {
        let mut inv = invoice("B-1", 1, None);
        inv.series_id = "branch-b".into();
        inv
    };
    let a2 = invoice("A-2", 2, Some(&invoice_hash(&a1)));

    let tracker = ChainTracker::new();
    let engine = engine();
    for inv in [&a1, &b1, &a2] {
        assert!(engine.evaluate(inv, Some(&tracker)).is_compliant());
    }
    assert_eq!(tracker.series_count(), 2);
    assert_eq!(tracker.get("branch-b").unwrap().accepted_count, 1);
}

#[test]
fn hash_is_stable_across_decimal_scale() {
    let mut a = invoice("INV-1", 1, None);
    let mut b = a.clone();
    a.totals.total = dec!(115);
    b.totals.total = dec!(115.000);
    assert_eq!(invoice_hash(&a), invoice_hash(&b));
    assert_eq!(invoice_hash(&a).len(), 64);
}

#[test]
fn manual_advance_and_extend() {
    let tracker = ChainTracker::new();
    tracker.advance("S", "aa".repeat(32), date(2024, 1, 1));
    tracker.advance("S", "bb".repeat(32), date(2024, 1, 2));
    let state = tracker.get("S").unwrap();
    assert_eq!(state.accepted_count, 2);
    assert_eq!(state.anchor_pih, Some("aa".repeat(32)));

    let fresh = ChainState::extend(None, "cc".repeat(32), date(2024, 1, 3));
    assert_eq!(fresh.accepted_count, 1);
    assert!(fresh.anchor_pih.is_none());
}

#[test]
fn tickets_settle_in_reservation_order() {
    let tracker = Arc::new(ChainTracker::new());
    let tickets: Vec<_> = (0..6).map(|_| tracker.reserve("S")).collect();
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = tickets
        .into_iter()
        .rev()
        .map(|ticket| {
            let order = Arc::clone(&order);
            thread::spawn(move || {
                let pos = ticket.position();
                thread::sleep(Duration::from_millis(5));
                ticket.settle(|_| order.lock().unwrap().push(pos));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn dropped_ticket_does_not_block_successors() {
    let tracker = ChainTracker::new();
    let first = tracker.reserve("S");
    let second = tracker.reserve("S");
    let third = tracker.reserve("S");
    drop(second);
    first.settle(|chain| assert!(chain.is_none()));
    third.settle(|chain| *chain = Some(ChainState::extend(None, "ab".repeat(32), date(2024, 1, 1))));
    assert_eq!(tracker.series_count(), 1);
}

#[test]
fn evaluate_in_turn_matches_sequential_verdicts() {
    let (i1, i2, i3) = series();
    let tracker = ChainTracker::new();
    let engine = engine();
    let tickets: Vec<_> = (0..3).map(|_| tracker.reserve("310122393500003")).collect();

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = [i3, i2, i1]
            .into_iter()
            .zip(tickets.into_iter().rev())
            .map(|(inv, ticket)| {
                let engine = engine.clone();
                s.spawn(move || engine.evaluate_in_turn(&inv, ticket))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(results.iter().all(ValidationResult::is_compliant));
    assert_eq!(tracker.get("310122393500003").unwrap().accepted_count, 3);
}
