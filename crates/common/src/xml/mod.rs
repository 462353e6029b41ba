//! XML document writer
//!
//! Every piece of text and every attribute value that ends up in an
//! OAI-PMH or RSS document passes through [`escape`]. The [`XmlDocument`]
//! builder only accepts raw `&str` content and escapes it itself, so callers
//! have no way to append pre-formed markup.

use crate::errors::Result;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use std::borrow::Cow;

/// Escape text for embedding in XML content or attribute values.
///
/// Replaces the five predefined entities and drops code points that are
/// not legal in XML 1.0 (C0 controls other than tab, LF and CR).
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

/// Streaming XML builder with centralized escaping
pub struct XmlDocument {
    writer: Writer<Vec<u8>>,
}

impl XmlDocument {
    /// Start a new UTF-8 document with an XML declaration
    pub fn new() -> Result<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(Self { writer })
    }

    fn start<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            start.push_attribute(Attribute {
                key: QName(key.as_bytes()),
                value: Cow::Owned(escape(value).into_bytes()),
            });
        }
        start
    }

    /// Write `<name attrs>`, run `body`, then write `</name>`
    pub fn element<F>(&mut self, name: &str, attrs: &[(&str, &str)], body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.writer.write_event(Event::Start(Self::start(name, attrs)))?;
        body(self)?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Write `<name attrs>text</name>`
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.writer.write_event(Event::Start(Self::start(name, attrs)))?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(escape(text))))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Write `<name>text</name>` only when `text` is present and non-blank
    pub fn optional_text_element(&mut self, name: &str, text: Option<&str>) -> Result<()> {
        match text.map(str::trim) {
            Some(text) if !text.is_empty() => self.text_element(name, &[], text),
            _ => Ok(()),
        }
    }

    /// Write a self-closing `<name attrs/>`
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.writer.write_event(Event::Empty(Self::start(name, attrs)))?;
        Ok(())
    }

    /// Finish the document and return it as a string
    pub fn finish(self) -> Result<String> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8(bytes)?)
    }
}
