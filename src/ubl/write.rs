use super::xml_utils::{XmlResult, XmlWriter};
use super::{PIH_REFERENCE_ID, QR_REFERENCE_ID, ZATCA_PROFILE_ID, ubl_ns};
use crate::core::totals::format_amount;
use crate::core::*;

/// Generate ZATCA UBL 2.1 invoice XML.
///
/// The output round-trips through [`from_ubl_xml`](super::from_ubl_xml):
/// every field the rule catalogue reads is written.
pub fn to_ubl_xml(invoice: &Invoice) -> XmlResult {
    let currency = invoice.currency_code.as_str();
    let mut w = XmlWriter::new()?;

    w.start_with_attrs(
        "Invoice",
        &[
            ("xmlns", ubl_ns::INVOICE),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
            ("xmlns:ext", ubl_ns::EXT),
            ("xmlns:ds", ubl_ns::DS),
        ],
    )?;

    if let Some(sig) = &invoice.signature {
        w.start("ext:UBLExtensions")?;
        w.start("ext:UBLExtension")?;
        w.start("ext:ExtensionContent")?;
        w.start("ds:Signature")?;
        w.text("ds:SignatureValue", sig)?;
        w.end("ds:Signature")?;
        w.end("ext:ExtensionContent")?;
        w.end("ext:UBLExtension")?;
        w.end("ext:UBLExtensions")?;
    }

    w.text("cbc:ProfileID", ZATCA_PROFILE_ID)?;
    w.text("cbc:ID", &invoice.number)?;
    if let Some(date) = invoice.issue_date {
        w.text("cbc:IssueDate", &date.format("%Y-%m-%d").to_string())?;
    }
    if let Some(time) = invoice.issue_time {
        w.text("cbc:IssueTime", &time.format("%H:%M:%S").to_string())?;
    }
    w.text_with_attrs(
        "cbc:InvoiceTypeCode",
        &invoice.type_code.code().to_string(),
        &[("name", invoice.subtype.transaction_code())],
    )?;
    w.text("cbc:DocumentCurrencyCode", currency)?;
    w.text("cbc:TaxCurrencyCode", currency)?;

    if let Some(pih) = &invoice.previous_invoice_hash {
        embedded_reference(&mut w, PIH_REFERENCE_ID, pih)?;
    }
    if let Some(qr) = &invoice.qr_code {
        embedded_reference(&mut w, QR_REFERENCE_ID, qr)?;
    }

    write_party(&mut w, "cac:AccountingSupplierParty", &invoice.seller)?;
    write_party(&mut w, "cac:AccountingCustomerParty", &invoice.buyer)?;

    w.start("cac:TaxTotal")?;
    w.amount("cbc:TaxAmount", invoice.totals.tax_total, currency)?;
    w.end("cac:TaxTotal")?;

    w.start("cac:LegalMonetaryTotal")?;
    w.amount("cbc:LineExtensionAmount", invoice.totals.subtotal, currency)?;
    w.amount("cbc:TaxExclusiveAmount", invoice.totals.subtotal, currency)?;
    w.amount("cbc:TaxInclusiveAmount", invoice.totals.total, currency)?;
    w.amount("cbc:PayableAmount", invoice.totals.total, currency)?;
    w.end("cac:LegalMonetaryTotal")?;

    for line in &invoice.lines {
        let overflow = || FatooraError::Xml(format!("line {}: amounts overflow", line.id));
        let net = line.net_amount().ok_or_else(overflow)?;
        let tax = line.tax_amount().ok_or_else(overflow)?;
        w.start("cac:InvoiceLine")?;
        w.text("cbc:ID", &line.id)?;
        w.text_with_attrs(
            "cbc:InvoicedQuantity",
            &line.quantity.normalize().to_string(),
            &[("unitCode", "PCE")],
        )?;
        w.amount("cbc:LineExtensionAmount", net, currency)?;
        if !line.discount.is_zero() {
            w.start("cac:AllowanceCharge")?;
            w.text("cbc:ChargeIndicator", "false")?;
            w.amount("cbc:Amount", line.discount, currency)?;
            w.end("cac:AllowanceCharge")?;
        }
        w.start("cac:TaxTotal")?;
        w.amount("cbc:TaxAmount", tax.round_dp(2), currency)?;
        w.amount("cbc:RoundingAmount", line.line_total, currency)?;
        w.end("cac:TaxTotal")?;
        w.start("cac:Item")?;
        w.text("cbc:Name", &line.description)?;
        w.start("cac:ClassifiedTaxCategory")?;
        w.text("cbc:ID", if line.tax_rate.is_zero() { "Z" } else { "S" })?;
        w.text("cbc:Percent", &format_amount(line.tax_rate))?;
        w.start("cac:TaxScheme")?;
        w.text("cbc:ID", "VAT")?;
        w.end("cac:TaxScheme")?;
        w.end("cac:ClassifiedTaxCategory")?;
        w.end("cac:Item")?;
        w.start("cac:Price")?;
        w.amount("cbc:PriceAmount", line.unit_price, currency)?;
        w.end("cac:Price")?;
        w.end("cac:InvoiceLine")?;
    }

    w.end("Invoice")?;
    w.into_string()
}

fn embedded_reference(
    w: &mut XmlWriter,
    id: &str,
    content: &str,
) -> Result<(), FatooraError> {
    w.start("cac:AdditionalDocumentReference")?;
    w.text("cbc:ID", id)?;
    w.start("cac:Attachment")?;
    w.text_with_attrs(
        "cbc:EmbeddedDocumentBinaryObject",
        content,
        &[("mimeCode", "text/plain")],
    )?;
    w.end("cac:Attachment")?;
    w.end("cac:AdditionalDocumentReference")?;
    Ok(())
}

fn write_party(w: &mut XmlWriter, role: &str, party: &Party) -> Result<(), FatooraError> {
    let addr = &party.address;
    w.start(role)?;
    w.start("cac:Party")?;
    w.start("cac:PostalAddress")?;
    w.optional_text("cbc:StreetName", addr.street.as_deref())?;
    w.optional_text("cbc:BuildingNumber", addr.building_number.as_deref())?;
    w.text("cbc:CityName", &addr.city)?;
    w.text("cbc:PostalZone", &addr.postal_code)?;
    w.start("cac:Country")?;
    w.text("cbc:IdentificationCode", &addr.country_code)?;
    w.end("cac:Country")?;
    w.end("cac:PostalAddress")?;
    if let Some(vat) = &party.vat_number {
        w.start("cac:PartyTaxScheme")?;
        w.text("cbc:CompanyID", vat)?;
        w.start("cac:TaxScheme")?;
        w.text("cbc:ID", "VAT")?;
        w.end("cac:TaxScheme")?;
        w.end("cac:PartyTaxScheme")?;
    }
    w.start("cac:PartyLegalEntity")?;
    w.text("cbc:RegistrationName", &party.name)?;
    w.end("cac:PartyLegalEntity")?;
    w.end("cac:Party")?;
    w.end(role)?;
    Ok(())
}
