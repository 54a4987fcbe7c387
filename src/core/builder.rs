use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use super::error::FatooraError;
use super::totals::{checked_sum, round_half_up};
use super::types::*;

/// Builder for constructing invoices.
///
/// Declared totals default to the values computed from the lines, and the
/// series defaults to the seller's VAT number. Building only enforces
/// structural limits; rules run in the [`RuleEngine`](crate::RuleEngine).
///
/// ```
/// use fatoora::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("INV-2024-001", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
///     .seller(PartyBuilder::new("ABC Trading", AddressBuilder::new("Riyadh", "12345", "SA").build())
///         .vat_number("310122393500003")
///         .build())
///     .buyer(PartyBuilder::new("XYZ Stores", AddressBuilder::new("Jeddah", "21442", "SA").build())
///         .vat_number("300000000000003")
///         .build())
///     .add_line(LineItemBuilder::new("1", "Laptop", dec!(2), dec!(3000)).build())
///     .build()
///     .unwrap();
///
/// assert_eq!(invoice.totals.total, dec!(6900.00));
/// ```
pub struct InvoiceBuilder {
    number: String,
    issue_date: Option<NaiveDate>,
    issue_time: Option<NaiveTime>,
    type_code: InvoiceTypeCode,
    subtype: InvoiceSubtype,
    currency_code: String,
    series_id: Option<String>,
    seller: Option<Party>,
    buyer: Option<Party>,
    lines: Vec<LineItem>,
    subtotal: Option<Decimal>,
    tax_total: Option<Decimal>,
    total: Option<Decimal>,
    previous_invoice_hash: Option<String>,
    qr_code: Option<String>,
    signature: Option<String>,
}

impl InvoiceBuilder {
    pub fn new(number: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self {
            number: number.into(),
            issue_date: Some(issue_date),
            issue_time: None,
            type_code: InvoiceTypeCode::Standard,
            subtype: InvoiceSubtype::Standard,
            currency_code: "SAR".to_string(),
            series_id: None,
            seller: None,
            buyer: None,
            lines: Vec::new(),
            subtotal: None,
            tax_total: None,
            total: None,
            previous_invoice_hash: None,
            qr_code: None,
            signature: None,
        }
    }

    /// Start without an issue date (as a parser does when the field is absent).
    pub fn without_issue_date(number: impl Into<String>) -> Self {
        Self {
            issue_date: None,
            ..Self::new(number, NaiveDate::MIN)
        }
    }

    pub fn issue_time(mut self, time: NaiveTime) -> Self {
        self.issue_time = Some(time);
        self
    }

    pub fn type_code(mut self, code: InvoiceTypeCode) -> Self {
        self.type_code = code;
        self
    }

    pub fn subtype(mut self, subtype: InvoiceSubtype) -> Self {
        self.subtype = subtype;
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    pub fn series(mut self, series_id: impl Into<String>) -> Self {
        self.series_id = Some(series_id.into());
        self
    }

    pub fn seller(mut self, party: Party) -> Self {
        self.seller = Some(party);
        self
    }

    pub fn buyer(mut self, party: Party) -> Self {
        self.buyer = Some(party);
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.lines.push(line);
        self
    }

    /// Declare the tax-exclusive amount instead of computing it.
    pub fn subtotal(mut self, amount: Decimal) -> Self {
        self.subtotal = Some(amount);
        self
    }

    /// Declare the VAT total instead of computing it.
    pub fn tax_total(mut self, amount: Decimal) -> Self {
        self.tax_total = Some(amount);
        self
    }

    /// Declare the tax-inclusive amount instead of computing it.
    pub fn total(mut self, amount: Decimal) -> Self {
        self.total = Some(amount);
        self
    }

    pub fn previous_invoice_hash(mut self, hash: impl Into<String>) -> Self {
        self.previous_invoice_hash = Some(hash.into());
        self
    }

    pub fn qr_code(mut self, qr: impl Into<String>) -> Self {
        self.qr_code = Some(qr.into());
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Build the invoice, filling undeclared totals from the lines. Fails
    /// when a line or total overflows the decimal range.
    pub fn build(self) -> Result<Invoice, FatooraError> {
        let seller = self
            .seller
            .ok_or_else(|| FatooraError::Builder("seller is required".into()))?;
        let buyer = self
            .buyer
            .ok_or_else(|| FatooraError::Builder("buyer is required".into()))?;

        // Input limits to prevent abuse
        if self.lines.len() > 10_000 {
            return Err(FatooraError::Builder(
                "invoice cannot have more than 10,000 line items".into(),
            ));
        }
        if self.number.len() > 200 {
            return Err(FatooraError::Builder(
                "invoice number cannot exceed 200 characters".into(),
            ));
        }

        let series_id = self
            .series_id
            .or_else(|| seller.vat_number.clone())
            .unwrap_or_default();

        if let Some(line) = self.lines.iter().find(|l| l.computed_total().is_none()) {
            return Err(FatooraError::Builder(format!(
                "line {}: amounts overflow the decimal range",
                line.id
            )));
        }
        let overflow = || FatooraError::Builder("document totals overflow the decimal range".into());
        let subtotal = match self.subtotal {
            Some(amount) => amount,
            None => {
                let sum = checked_sum(self.lines.iter().map(LineItem::net_amount));
                round_half_up(sum.ok_or_else(overflow)?, 2)
            }
        };
        let tax_total = match self.tax_total {
            Some(amount) => amount,
            None => {
                let sum = checked_sum(self.lines.iter().map(LineItem::tax_amount));
                round_half_up(sum.ok_or_else(overflow)?, 2)
            }
        };
        let total = match self.total {
            Some(amount) => amount,
            None => subtotal.checked_add(tax_total).ok_or_else(overflow)?,
        };

        Ok(Invoice {
            number: self.number,
            issue_date: self.issue_date,
            issue_time: self.issue_time,
            type_code: self.type_code,
            subtype: self.subtype,
            currency_code: self.currency_code,
            series_id,
            seller,
            buyer,
            lines: self.lines,
            totals: Totals {
                subtotal,
                tax_total,
                total,
            },
            previous_invoice_hash: self.previous_invoice_hash.filter(|h| !h.trim().is_empty()),
            qr_code: self.qr_code.filter(|q| !q.trim().is_empty()),
            signature: self.signature.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Builder for Party (seller/buyer).
pub struct PartyBuilder {
    name: String,
    vat_number: Option<String>,
    address: Address,
}

impl PartyBuilder {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            vat_number: None,
            address,
        }
    }

    pub fn vat_number(mut self, vat: impl Into<String>) -> Self {
        self.vat_number = Some(vat.into());
        self
    }

    pub fn build(self) -> Party {
        Party {
            name: self.name,
            vat_number: self.vat_number,
            address: self.address,
        }
    }
}

/// Builder for Address.
pub struct AddressBuilder {
    street: Option<String>,
    building_number: Option<String>,
    city: String,
    postal_code: String,
    country_code: String,
}

impl AddressBuilder {
    pub fn new(
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            street: None,
            building_number: None,
            city: city.into(),
            postal_code: postal_code.into(),
            country_code: country_code.into().to_uppercase(),
        }
    }

    pub fn street(mut self, street: impl Into<String>) -> Self {
        self.street = Some(street.into());
        self
    }

    pub fn building_number(mut self, number: impl Into<String>) -> Self {
        self.building_number = Some(number.into());
        self
    }

    pub fn build(self) -> Address {
        Address {
            street: self.street,
            building_number: self.building_number,
            city: self.city,
            postal_code: self.postal_code,
            country_code: self.country_code,
        }
    }
}

/// Builder for LineItem. The tax rate defaults to the Saudi standard 15%.
pub struct LineItemBuilder {
    id: String,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    tax_rate: Decimal,
    discount: Decimal,
    line_total: Option<Decimal>,
}

impl LineItemBuilder {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            quantity,
            unit_price,
            tax_rate: Decimal::new(15, 0),
            discount: Decimal::ZERO,
            line_total: None,
        }
    }

    pub fn tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn discount(mut self, amount: Decimal) -> Self {
        self.discount = amount;
        self
    }

    /// Declare the line total instead of computing it.
    pub fn line_total(mut self, total: Decimal) -> Self {
        self.line_total = Some(total);
        self
    }

    pub fn build(self) -> LineItem {
        let mut line = LineItem {
            id: self.id,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
            discount: self.discount,
            line_total: Decimal::ZERO,
        };
        // An overflowing line keeps a zero total; InvoiceBuilder::build rejects it.
        line.line_total = self
            .line_total
            .or_else(|| line.computed_total().map(|t| round_half_up(t, 2)))
            .unwrap_or_default();
        line
    }
}
