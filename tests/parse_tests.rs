#![cfg(all(feature = "xml", feature = "json"))]

use std::fs;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{NaiveDate, NaiveTime};
use fatoora::chain::invoice_hash;
use fatoora::core::*;
use fatoora::crypto;
use fatoora::json::{from_json, to_json};
use fatoora::rules::{RuleCode, RuleEngine};
use fatoora::source::{DirectorySource, parse_invoice_file};
use fatoora::ubl::{from_ubl_xml, to_ubl_xml};
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine() -> RuleEngine {
    RuleEngine::new(ValidationConfig::default().reference_date(date(2024, 12, 31)))
}

fn sample() -> Invoice {
    let seller = PartyBuilder::new(
        "Maximum Speed Tech Supply",
        AddressBuilder::new("Riyadh", "23333", "SA")
            .street("Prince Sultan")
            .building_number("2322")
            .build(),
    )
    .vat_number("399999999900003")
    .build();
    let buyer = PartyBuilder::new(
        "Fatoora Samples LTD",
        AddressBuilder::new("Dammam", "42812", "SA").build(),
    )
    .vat_number("399999999800003")
    .build();

    let mut inv = InvoiceBuilder::new("SME00062", date(2024, 9, 7))
        .issue_time(NaiveTime::from_hms_opt(12, 21, 28).unwrap())
        .seller(seller)
        .buyer(buyer)
        .add_line(LineItemBuilder::new("1", "Book", dec!(33), dec!(3.00)).build())
        .add_line(
            LineItemBuilder::new("2", "Pen", dec!(3), dec!(34.00))
                .discount(dec!(2.00))
                .build(),
        )
        .add_line(
            LineItemBuilder::new("3", "Export service", dec!(1), dec!(50))
                .tax_rate(dec!(0))
                .build(),
        )
        .build()
        .unwrap();
    inv.qr_code = Some(crypto::encode_for(&inv).unwrap());
    inv.signature = Some(STANDARD.encode([42u8; 72]));
    inv
}

fn assert_same_content(a: &Invoice, b: &Invoice) {
    assert_eq!(a.number, b.number);
    assert_eq!(a.issue_date, b.issue_date);
    assert_eq!(a.issue_time, b.issue_time);
    assert_eq!(a.type_code, b.type_code);
    assert_eq!(a.subtype, b.subtype);
    assert_eq!(a.currency_code, b.currency_code);
    assert_eq!(a.series_id, b.series_id);
    assert_eq!(a.seller, b.seller);
    assert_eq!(a.buyer, b.buyer);
    assert_eq!(a.lines, b.lines);
    assert_eq!(a.totals, b.totals);
    assert_eq!(a.previous_invoice_hash, b.previous_invoice_hash);
    assert_eq!(a.qr_code, b.qr_code);
    assert_eq!(a.signature, b.signature);
}

#[test]
fn xml_preserves_everything_the_rules_read() {
    let original = sample();
    let xml = to_ubl_xml(&original).unwrap();
    assert!(xml.contains("<cbc:ProfileID>reporting:1.0</cbc:ProfileID>"));
    assert!(xml.contains(r#"<cbc:InvoiceTypeCode name="0100000">388</cbc:InvoiceTypeCode>"#));

    let parsed = from_ubl_xml(&xml).unwrap();
    assert_same_content(&original, &parsed);
    assert_eq!(invoice_hash(&original), invoice_hash(&parsed));

    let engine = engine();
    let a = engine.evaluate(&original, None);
    let b = engine.evaluate(&parsed, None);
    assert!(a.is_compliant(), "{:?}", a.violations());
    assert!(a.same_verdict(&b));
}

#[test]
fn json_preserves_everything_the_rules_read() {
    let original = sample();
    let json = to_json(&original).unwrap();
    assert!(json.contains(r#""total": "#));
    let parsed = from_json(&json).unwrap();
    assert_same_content(&original, &parsed);
}

#[test]
fn previous_hash_travels_as_embedded_reference() {
    let mut inv = sample();
    inv.previous_invoice_hash = Some("5f".repeat(32));
    let xml = to_ubl_xml(&inv).unwrap();
    assert!(xml.contains("<cbc:ID>PIH</cbc:ID>"));
    let parsed = from_ubl_xml(&xml).unwrap();
    assert_eq!(parsed.previous_invoice_hash, Some("5f".repeat(32)));
    assert_eq!(parsed.qr_code, inv.qr_code);
}

#[test]
fn simplified_credit_note_through_xml() {
    let mut inv = sample();
    inv.type_code = InvoiceTypeCode::CreditNote;
    inv.subtype = InvoiceSubtype::Simplified;
    inv.buyer.vat_number = None;
    let parsed = from_ubl_xml(&to_ubl_xml(&inv).unwrap()).unwrap();
    assert_eq!(parsed.type_code, InvoiceTypeCode::CreditNote);
    assert_eq!(parsed.subtype, InvoiceSubtype::Simplified);
    assert!(parsed.buyer.vat_number.is_none());
}

#[test]
fn unsupported_type_code_parses_and_fails_rules() {
    let mut inv = sample();
    inv.type_code = InvoiceTypeCode::Other(380);
    let parsed = from_ubl_xml(&to_ubl_xml(&inv).unwrap()).unwrap();
    assert_eq!(parsed.type_code, InvoiceTypeCode::Other(380));
    assert_eq!(
        engine().evaluate(&parsed, None).violation_codes(),
        vec![RuleCode::InvoiceTypeCode]
    );
}

#[test]
fn malformed_vat_is_a_finding_not_a_parse_error() {
    let mut inv = sample();
    inv.buyer.vat_number = Some("39999999980000".into());
    let parsed = from_ubl_xml(&to_ubl_xml(&inv).unwrap()).unwrap();
    assert_eq!(
        engine().evaluate(&parsed, None).violation_codes(),
        vec![RuleCode::BuyerVat]
    );
}

#[test]
fn escaped_names_survive() {
    let mut inv = sample();
    inv.seller.name = "Al-Rajhi & Sons <Trading>".into();
    let parsed = from_ubl_xml(&to_ubl_xml(&inv).unwrap()).unwrap();
    assert_eq!(parsed.seller.name, "Al-Rajhi & Sons <Trading>");
}

#[test]
fn wrong_root_element_rejected() {
    let err = from_ubl_xml("<CreditNote><ID>1</ID></CreditNote>").unwrap_err();
    assert!(matches!(err, FatooraError::Parse(_)));
}

#[test]
fn invalid_json_rejected() {
    assert!(matches!(from_json("{\"number\": 1"), Err(FatooraError::Parse(_))));
}

#[test]
fn files_dispatch_on_extension() {
    let dir = tempfile::tempdir().unwrap();
    let inv = sample();
    let xml_path = dir.path().join("a.XML");
    let json_path = dir.path().join("b.json");
    let txt_path = dir.path().join("c.txt");
    fs::write(&xml_path, to_ubl_xml(&inv).unwrap()).unwrap();
    fs::write(&json_path, to_json(&inv).unwrap()).unwrap();
    fs::write(&txt_path, "SME00062").unwrap();

    assert_eq!(parse_invoice_file(&xml_path).unwrap().number, "SME00062");
    assert_eq!(parse_invoice_file(&json_path).unwrap().number, "SME00062");
    assert!(matches!(parse_invoice_file(&txt_path), Err(FatooraError::Parse(_))));
}

#[test]
fn directory_source_filters_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    let inv = sample();
    for name in ["b.xml", "a.xml", "c.json"] {
        fs::write(dir.path().join(name), to_ubl_xml(&inv).unwrap()).unwrap();
    }
    fs::create_dir(dir.path().join("nested.xml")).unwrap();

    let source = DirectorySource::open(dir.path(), "*.xml").unwrap();
    assert_eq!(source.remaining(), 2);
    let origins: Vec<String> = source.map(|item| item.origin).collect();
    assert!(origins[0].ends_with("a.xml"));
    assert!(origins[1].ends_with("b.xml"));
}
