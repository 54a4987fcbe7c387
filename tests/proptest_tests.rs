//! Property-based tests for amounts, VAT numbers, QR payloads and summaries.
//!
//! Run with: `cargo test --test proptest_tests`

#![cfg(feature = "core")]

use chrono::NaiveDate;
use fatoora::core::*;
use fatoora::crypto::QrPayload;
use fatoora::pipeline::BatchSummary;
use fatoora::rules::{RuleCode, RuleEngine, validate_vat_number};
use proptest::prelude::*;
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

fn party(vat: &str) -> Party {
    PartyBuilder::new("Party", AddressBuilder::new("Riyadh", "12211", "SA").build())
        .vat_number(vat)
        .build()
}

fn single_line(line: LineItem) -> Invoice {
    InvoiceBuilder::new("INV-P", date(2024, 6, 1))
        .seller(party("300000000000003"))
        .buyer(party("300000000000003"))
        .add_line(line)
        .build()
        .unwrap()
}

// --- Strategies ---

fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1i64..500).prop_map(Decimal::from)
}

fn arb_price() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Characters a VAT number is likely to be mistyped with.
fn arb_vat_candidate() -> impl Strategy<Value = String> {
    prop_oneof![
        "3[0-9]{13}3",
        "[0-9]{13,17}",
        "3[0-9 a-]{13}3",
    ]
}

proptest! {
    #[test]
    fn line_total_accepted_iff_within_one_halala(
        qty in arb_quantity(),
        price in arb_price(),
        offset_mills in -30i64..=30,
    ) {
        let exact = qty * price * dec!(1.15);
        let declared = exact + Decimal::new(offset_mills, 3);
        let inv = single_line(
            LineItemBuilder::new("1", "x", qty, price).line_total(declared).build(),
        );
        let result = engine().evaluate(&inv, None);
        prop_assert_eq!(
            result.has_violation(RuleCode::LineTotal),
            offset_mills.abs() > 10
        );
    }

    #[test]
    fn builder_totals_always_satisfy_numeric_rules(
        lines in prop::collection::vec((arb_quantity(), arb_price(), prop::bool::ANY), 1..20),
    ) {
        let mut b = InvoiceBuilder::new("INV-P", date(2024, 6, 1))
            .seller(party("300000000000003"))
            .buyer(party("300000000000003"));
        for (i, (qty, price, zero_rated)) in lines.into_iter().enumerate() {
            let rate = if zero_rated { Decimal::ZERO } else { dec!(15) };
            b = b.add_line(
                LineItemBuilder::new((i + 1).to_string(), "x", qty, price).tax_rate(rate).build(),
            );
        }
        let result = engine().evaluate(&b.build().unwrap(), None);
        prop_assert!(result.is_compliant(), "{:?}", result.violations());
    }

    #[test]
    fn vat_number_shape(candidate in arb_vat_candidate()) {
        let expected = candidate.len() == 15
            && candidate.bytes().all(|b| b.is_ascii_digit())
            && candidate.starts_with('3')
            && candidate.ends_with('3');
        prop_assert_eq!(validate_vat_number(&candidate).is_ok(), expected);
    }

    #[test]
    fn qr_payload_survives_encoding(
        name in "\\PC{1,60}",
        total in arb_price(),
    ) {
        let payload = QrPayload {
            seller_name: name,
            vat_number: "300000000000003".into(),
            timestamp: "2024-06-01T10:00:00".into(),
            total: total.to_string(),
            vat_total: (total * dec!(0.15)).round_dp(2).to_string(),
        };
        let decoded = QrPayload::decode(&payload.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, payload);
    }

    #[test]
    fn summary_merge_matches_whole(
        flags in prop::collection::vec(0u8..4, 0..40),
        split in 0usize..40,
    ) {
        let engine = engine();
        let results: Vec<ValidationResult> = flags
            .iter()
            .enumerate()
            .map(|(i, flag)| {
                let mut inv = single_line(LineItemBuilder::new("1", "x", dec!(1), dec!(10)).build());
                inv.number = format!("INV-{i}");
                match flag {
                    1 => inv.totals.total = dec!(0),
                    2 => inv.seller.vat_number = Some("1".into()),
                    3 => inv.lines.clear(),
                    _ => {}
                }
                engine.evaluate(&inv, None)
            })
            .collect();

        let whole: BatchSummary = results.iter().collect();
        let split = split.min(results.len());
        let mut left: BatchSummary = results[..split].iter().collect();
        let right: BatchSummary = results[split..].iter().collect();
        let mut right_first = right.clone();
        right_first.merge(left.clone());
        left.merge(right);

        for merged in [&left, &right_first] {
            prop_assert_eq!(merged.total, whole.total);
            prop_assert_eq!(merged.compliant_count, whole.compliant_count);
            prop_assert_eq!(merged.failed_count, whole.failed_count);
            prop_assert_eq!(&merged.violations_by_rule_code, &whole.violations_by_rule_code);
            prop_assert_eq!(merged.timed_count, whole.timed_count);
            prop_assert_eq!(merged.evaluation_time_total, whole.evaluation_time_total);
            prop_assert_eq!(merged.evaluation_time_min, whole.evaluation_time_min);
            prop_assert_eq!(merged.evaluation_time_max, whole.evaluation_time_max);
        }
        prop_assert_eq!(whole.timed_count, results.len());
        prop_assert_eq!(whole.evaluation_time_min.is_some(), !results.is_empty());
        if let (Some(min), Some(mean)) = (whole.evaluation_time_min, whole.mean_evaluation_time()) {
            prop_assert!(min <= whole.evaluation_time_max);
            // Mean goes through f64 seconds; allow for rounding.
            prop_assert!(mean + std::time::Duration::from_nanos(1) >= min);
            prop_assert!(mean <= whole.evaluation_time_max + std::time::Duration::from_nanos(1));
        }
        prop_assert_eq!(whole.compliant_count, flags.iter().filter(|f| **f == 0).count());
    }
}
