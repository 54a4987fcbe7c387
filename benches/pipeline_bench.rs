use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, NaiveDate};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use fatoora::chain::invoice_hash;
use fatoora::core::*;
use fatoora::crypto;
use fatoora::pipeline::{ConcurrentPipeline, SequentialPipeline};
use fatoora::rules::RuleEngine;
use fatoora::source::SourceItem;
use fatoora::ubl;

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn config() -> ValidationConfig {
    ValidationConfig::default().reference_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
}

fn party(name: &str, vat: &str) -> Party {
    PartyBuilder::new(
        name,
        AddressBuilder::new("Riyadh", "12211", "SA")
            .street("King Fahd Road")
            .build(),
    )
    .vat_number(vat)
    .build()
}

fn seal(mut invoice: Invoice) -> Invoice {
    invoice.qr_code = Some(crypto::encode_for(&invoice).unwrap());
    invoice.signature = Some(STANDARD.encode([7u8; 64]));
    invoice
}

fn build_invoice(lines: usize) -> Invoice {
    let mut builder = InvoiceBuilder::new("BENCH-001", test_date())
        .seller(party("Benchmark Trading", "310122393500003"))
        .buyer(party("Customer Co", "300000000000003"));
    for i in 1..=lines {
        builder = builder.add_line(
            LineItemBuilder::new(i.to_string(), format!("Item {i}"), dec!(2), dec!(9.99)).build(),
        );
    }
    seal(builder.build().unwrap())
}

/// `series × per_series` chained invoices, series interleaved.
fn build_batch(series: usize, per_series: usize) -> Vec<Invoice> {
    let mut prev: Vec<Option<String>> = vec![None; series];
    let mut out = Vec::with_capacity(series * per_series);
    for n in 0..per_series {
        for (s, prev) in prev.iter_mut().enumerate() {
            let mut b = InvoiceBuilder::new(format!("S{s}-{n}"), test_date() + Duration::days(n as i64 % 150))
                .seller(party("Benchmark Trading", &format!("3{:013}3", s + 1)))
                .buyer(party("Customer Co", "300000000000003"))
                .add_line(LineItemBuilder::new("1", "Consulting", dec!(8), dec!(150)).build());
            if let Some(pih) = prev.take() {
                b = b.previous_invoice_hash(pih);
            }
            let inv = seal(b.build().unwrap());
            *prev = Some(invoice_hash(&inv));
            out.push(inv);
        }
    }
    out
}

fn items(invoices: &[Invoice]) -> Vec<SourceItem> {
    invoices.iter().cloned().map(SourceItem::from).collect()
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = RuleEngine::new(config());
    let invoice = build_invoice(10);
    c.bench_function("evaluate_10_lines", |b| {
        b.iter(|| black_box(engine.evaluate(black_box(&invoice), None)));
    });

    let big = build_invoice(1000);
    c.bench_function("evaluate_1000_lines", |b| {
        b.iter(|| black_box(engine.evaluate(black_box(&big), None)));
    });
}

fn bench_ubl(c: &mut Criterion) {
    let invoice = build_invoice(10);
    let xml = ubl::to_ubl_xml(&invoice).unwrap();
    c.bench_function("ubl_serialize", |b| {
        b.iter(|| black_box(ubl::to_ubl_xml(black_box(&invoice))));
    });
    c.bench_function("ubl_parse", |b| {
        b.iter(|| black_box(ubl::from_ubl_xml(black_box(&xml))));
    });
}

fn bench_sequential(c: &mut Criterion) {
    let invoices = build_batch(10, 100);
    c.bench_function("sequential_1000_invoices", |b| {
        b.iter(|| {
            let pipeline = SequentialPipeline::new(config());
            black_box(pipeline.run(items(&invoices), |_| {}))
        });
    });
}

fn bench_concurrent(c: &mut Criterion) {
    let invoices = build_batch(10, 100);
    let mut group = c.benchmark_group("concurrent_1000_invoices");
    for workers in [1, 4, 8] {
        group.bench_function(format!("{workers}_workers"), |b| {
            b.iter(|| {
                let pipeline = ConcurrentPipeline::new(config());
                black_box(pipeline.process(items(&invoices), workers).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_evaluate,
    bench_ubl,
    bench_sequential,
    bench_concurrent,
);
criterion_main!(benches);
