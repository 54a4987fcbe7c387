use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use std::io::Cursor;

use crate::core::FatooraError;
use crate::core::totals::format_amount;

pub type XmlResult = Result<String, FatooraError>;

fn xml_io(e: std::io::Error) -> FatooraError {
    FatooraError::Xml(format!("write error: {e}"))
}

/// Indented UBL writer with chaining element helpers.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, FatooraError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> XmlResult {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| FatooraError::Xml(format!("UTF-8 error: {e}")))
    }

    pub fn start(&mut self, name: &str) -> Result<&mut Self, FatooraError> {
        self.start_with_attrs(name, &[])
    }

    pub fn start_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FatooraError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> Result<&mut Self, FatooraError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text(&mut self, name: &str, text: &str) -> Result<&mut Self, FatooraError> {
        self.text_with_attrs(name, text, &[])
    }

    pub fn text_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FatooraError> {
        self.start_with_attrs(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end(name)
    }

    /// Amount with `currencyID`.
    pub fn amount(
        &mut self,
        name: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<&mut Self, FatooraError> {
        self.text_with_attrs(name, &format_amount(amount), &[("currencyID", currency)])
    }

    /// Write `<name>text</name>` only when `text` is present.
    pub fn optional_text(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, FatooraError> {
        match text {
            Some(t) => self.text(name, t),
            None => Ok(self),
        }
    }
}
