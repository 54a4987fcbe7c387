use chrono::{NaiveDate, NaiveTime};
use quick_xml::Reader;
use quick_xml::events::Event;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::{PIH_REFERENCE_ID, QR_REFERENCE_ID};
use crate::core::*;

/// Parse a ZATCA UBL 2.1 invoice.
///
/// Elements are matched by local name, so any namespace prefixes work.
/// Missing business fields (seller VAT, PIH, totals, even the issue date)
/// are left for the rule catalogue to report; only malformed XML and
/// unreadable values (dates, numbers, the type code) are parse errors.
/// The series is the seller's VAT number.
pub fn from_ubl_xml(xml: &str) -> Result<Invoice, FatooraError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut invoice = ParsedInvoice::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                if path.is_empty() {
                    if name != "Invoice" {
                        return Err(FatooraError::Parse(format!(
                            "root element is <{name}>, expected <Invoice>"
                        )));
                    }
                    invoice.saw_root = true;
                }
                if name == "InvoiceTypeCode" {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"name" {
                            let val = attr.unescape_value().unwrap_or_default();
                            invoice.subtype_code = Some(val.into_owned());
                        }
                    }
                }
                if name == "InvoiceLine" {
                    invoice.current_line = Some(ParsedLine::default());
                }

                path.push(name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| FatooraError::Parse(format!("malformed XML text: {err}")))?;
                if !text.is_empty() {
                    invoice.handle_text(&path, &text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                if ended == "InvoiceLine" {
                    if let Some(line) = invoice.current_line.take() {
                        invoice.lines.push(line);
                    }
                }
                if ended == "AdditionalDocumentReference" {
                    invoice.current_reference = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FatooraError::Parse(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if !invoice.saw_root {
        return Err(FatooraError::Parse("document has no <Invoice> element".into()));
    }
    if let Some(open) = path.last() {
        return Err(FatooraError::Parse(format!("document ended inside <{open}>")));
    }
    invoice.into_invoice()
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ParsedInvoice {
    saw_root: bool,
    number: Option<String>,
    issue_date: Option<String>,
    issue_time: Option<String>,
    type_code: Option<String>,
    subtype_code: Option<String>,
    currency_code: Option<String>,

    current_reference: Option<String>,
    previous_invoice_hash: Option<String>,
    qr_code: Option<String>,
    signature: Option<String>,

    seller: ParsedParty,
    buyer: ParsedParty,

    tax_total: Option<String>,
    subtotal: Option<String>,
    total: Option<String>,

    lines: Vec<ParsedLine>,
    current_line: Option<ParsedLine>,
}

#[derive(Default)]
struct ParsedParty {
    name: Option<String>,
    vat_number: Option<String>,
    street: Option<String>,
    building_number: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country_code: Option<String>,
}

#[derive(Default)]
struct ParsedLine {
    id: Option<String>,
    description: Option<String>,
    quantity: Option<String>,
    unit_price: Option<String>,
    tax_rate: Option<String>,
    discounts: Vec<String>,
    line_total: Option<String>,
}

impl ParsedParty {
    fn handle_text(&mut self, leaf: &str, parent: &str, text: &str) {
        let slot = match (parent, leaf) {
            ("PartyLegalEntity", "RegistrationName") => &mut self.name,
            ("PartyTaxScheme", "CompanyID") => &mut self.vat_number,
            ("PostalAddress", "StreetName") => &mut self.street,
            ("PostalAddress", "BuildingNumber") => &mut self.building_number,
            ("PostalAddress", "CityName") => &mut self.city,
            ("PostalAddress", "PostalZone") => &mut self.postal_code,
            ("Country", "IdentificationCode") => &mut self.country_code,
            _ => return,
        };
        *slot = Some(text.to_string());
    }

    fn into_party(self) -> Party {
        let mut address = AddressBuilder::new(
            self.city.unwrap_or_default(),
            self.postal_code.unwrap_or_default(),
            self.country_code.unwrap_or_default(),
        );
        if let Some(street) = self.street {
            address = address.street(street);
        }
        if let Some(number) = self.building_number {
            address = address.building_number(number);
        }
        let mut party = PartyBuilder::new(self.name.unwrap_or_default(), address.build());
        if let Some(vat) = self.vat_number {
            party = party.vat_number(vat);
        }
        party.build()
    }
}

impl ParsedLine {
    fn handle_text(&mut self, leaf: &str, parent: &str, in_price: bool, text: &str) {
        match (parent, leaf) {
            ("InvoiceLine", "ID") => self.id = Some(text.to_string()),
            ("InvoiceLine", "InvoicedQuantity") => self.quantity = Some(text.to_string()),
            ("Item", "Name") => self.description = Some(text.to_string()),
            ("ClassifiedTaxCategory", "Percent") => self.tax_rate = Some(text.to_string()),
            ("Price", "PriceAmount") => self.unit_price = Some(text.to_string()),
            ("TaxTotal", "RoundingAmount") => self.line_total = Some(text.to_string()),
            ("AllowanceCharge", "Amount") if !in_price => self.discounts.push(text.to_string()),
            _ => {}
        }
    }

    fn into_line(self, index: usize) -> Result<LineItem, FatooraError> {
        let id = self.id.unwrap_or_else(|| (index + 1).to_string());
        let field = |value: Option<String>, element: &str| {
            value
                .ok_or_else(|| FatooraError::Parse(format!("line {id}: missing {element}")))
                .and_then(|v| parse_decimal(&v))
        };
        let quantity = field(self.quantity, "InvoicedQuantity")?;
        let unit_price = field(self.unit_price, "PriceAmount")?;

        let mut builder = LineItemBuilder::new(
            id.clone(),
            self.description.unwrap_or_default(),
            quantity,
            unit_price,
        );
        if let Some(rate) = self.tax_rate {
            builder = builder.tax_rate(parse_decimal(&rate)?);
        }
        let mut discount = Decimal::ZERO;
        for amount in &self.discounts {
            discount += parse_decimal(amount)?;
        }
        if !discount.is_zero() {
            builder = builder.discount(discount);
        }
        if let Some(total) = self.line_total {
            builder = builder.line_total(parse_decimal(&total)?);
        }
        Ok(builder.build())
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, FatooraError> {
    Decimal::from_str(s.trim())
        .map_err(|e| FatooraError::Parse(format!("invalid decimal '{s}': {e}")))
}

impl ParsedInvoice {
    fn handle_text(&mut self, path: &[String], text: &str) {
        let leaf = path.last().map(String::as_str).unwrap_or("");
        let parent = if path.len() >= 2 {
            path[path.len() - 2].as_str()
        } else {
            ""
        };
        let within = |name: &str| path.iter().any(|p| p == name);

        if within("UBLExtensions") {
            if leaf == "SignatureValue" {
                self.signature = Some(text.to_string());
            }
            return;
        }

        if within("InvoiceLine") {
            let in_price = within("Price");
            if let Some(line) = self.current_line.as_mut() {
                line.handle_text(leaf, parent, in_price, text);
            }
            return;
        }

        if within("AccountingSupplierParty") {
            self.seller.handle_text(leaf, parent, text);
            return;
        }
        if within("AccountingCustomerParty") {
            self.buyer.handle_text(leaf, parent, text);
            return;
        }

        if within("AdditionalDocumentReference") {
            match leaf {
                "ID" if parent == "AdditionalDocumentReference" => {
                    self.current_reference = Some(text.to_string());
                }
                "EmbeddedDocumentBinaryObject" => match self.current_reference.as_deref() {
                    Some(PIH_REFERENCE_ID) => self.previous_invoice_hash = Some(text.to_string()),
                    Some(QR_REFERENCE_ID) => self.qr_code = Some(text.to_string()),
                    _ => {}
                },
                _ => {}
            }
            return;
        }

        match (parent, leaf) {
            ("Invoice", "ID") => self.number = Some(text.to_string()),
            ("Invoice", "IssueDate") => self.issue_date = Some(text.to_string()),
            ("Invoice", "IssueTime") => self.issue_time = Some(text.to_string()),
            ("Invoice", "InvoiceTypeCode") => self.type_code = Some(text.to_string()),
            ("Invoice", "DocumentCurrencyCode") => self.currency_code = Some(text.to_string()),
            // Only the first document-level TaxTotal is in invoice currency.
            ("TaxTotal", "TaxAmount") if self.tax_total.is_none() => {
                self.tax_total = Some(text.to_string());
            }
            ("LegalMonetaryTotal", "TaxExclusiveAmount") => self.subtotal = Some(text.to_string()),
            ("LegalMonetaryTotal", "TaxInclusiveAmount") => self.total = Some(text.to_string()),
            _ => {}
        }
    }

    fn into_invoice(self) -> Result<Invoice, FatooraError> {
        let number = self.number.unwrap_or_default();

        let mut builder = match self.issue_date.as_deref() {
            Some(s) => {
                let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map_err(|e| FatooraError::Parse(format!("invalid issue date '{s}': {e}")))?;
                InvoiceBuilder::new(number, date)
            }
            None => InvoiceBuilder::without_issue_date(number),
        };

        if let Some(s) = self.issue_time.as_deref() {
            let time = NaiveTime::parse_from_str(s.trim().trim_end_matches('Z'), "%H:%M:%S")
                .map_err(|e| FatooraError::Parse(format!("invalid issue time '{s}': {e}")))?;
            builder = builder.issue_time(time);
        }

        let type_code: u16 = self
            .type_code
            .as_deref()
            .ok_or_else(|| FatooraError::Parse("missing InvoiceTypeCode".into()))?
            .trim()
            .parse()
            .map_err(|e| FatooraError::Parse(format!("invalid invoice type code: {e}")))?;
        builder = builder.type_code(InvoiceTypeCode::from_code(type_code));

        let subtype = self
            .subtype_code
            .as_deref()
            .and_then(InvoiceSubtype::from_transaction_code)
            .unwrap_or_default();
        builder = builder
            .subtype(subtype)
            .currency(self.currency_code.unwrap_or_default())
            .seller(self.seller.into_party())
            .buyer(self.buyer.into_party());

        for (i, line) in self.lines.into_iter().enumerate() {
            builder = builder.add_line(line.into_line(i)?);
        }

        if let Some(v) = self.subtotal.as_deref() {
            builder = builder.subtotal(parse_decimal(v)?);
        }
        if let Some(v) = self.tax_total.as_deref() {
            builder = builder.tax_total(parse_decimal(v)?);
        }
        if let Some(v) = self.total.as_deref() {
            builder = builder.total(parse_decimal(v)?);
        }
        if let Some(pih) = self.previous_invoice_hash {
            builder = builder.previous_invoice_hash(pih);
        }
        if let Some(qr) = self.qr_code {
            builder = builder.qr_code(qr);
        }
        if let Some(sig) = self.signature {
            builder = builder.signature(sig);
        }

        builder
            .build()
            .map_err(|e| FatooraError::Parse(e.to_string()))
    }
}
