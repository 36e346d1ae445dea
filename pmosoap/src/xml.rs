//! Lecture XML permissive vers un arbre `xmltree`
//!
//! Documents are read with `quick-xml` and materialised as [`xmltree::Element`]
//! trees. Element names are kept qualified (`soap:Fault`), the same way the
//! envelope builder writes them, and prefixes are never resolved: SOAP
//! services routinely answer with undeclared prefixes.
//!
//! No DTD is loaded or validated. Only the predefined entities and character
//! references are expanded; any other entity reference is rejected, so
//! external entities can never be fetched. Nesting is capped at
//! [`MAX_DEPTH`] levels.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use xmltree::{Element, XMLNode};

/// Profondeur d'imbrication maximale acceptée, comme la limite par défaut de libxml2
pub const MAX_DEPTH: usize = 256;

/// Parses `xml` into its root element.
///
/// Errors are returned as the parser's message; callers wrap them in the
/// appropriate [`crate::SoapError`] variant.
pub fn parse_document(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(format!("{} at position {}", e, reader.error_position())),
        };

        match event {
            Event::Start(start) => {
                check_depth(stack.len() + 1)?;
                let element = open_element(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                check_depth(stack.len() + 1)?;
                let element = open_element(&reader, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "closing tag without matching opening tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                push_text(&mut stack, utf8(&text)?)?;
            }
            Event::GeneralRef(reference) => {
                let name = utf8(&reference)?;
                push_text(&mut stack, resolve_reference(name)?.into())?;
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XMLNode::CData(utf8(&cdata)?.into_owned()));
                } else {
                    return Err("CDATA section outside of the root element".to_string());
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XMLNode::Comment(utf8(&comment)?.into_owned()));
                }
            }
            Event::Eof => break,
            // Déclaration, instructions de traitement, DOCTYPE : ignorés
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!(
            "unexpected end of document: element <{}> is not closed",
            open.name
        ));
    }

    root.ok_or_else(|| "document has no root element".to_string())
}

/// Local part of a qualified XML name (`soap:Fault` → `Fault`).
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Concatenated text of an element and all its descendants.
pub fn text_content(element: &Element) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    text
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            XMLNode::Text(t) | XMLNode::CData(t) => out.push_str(t),
            XMLNode::Element(e) => collect_text(e, out),
            _ => {}
        }
    }
}

// Les arbres plus profonds feraient déborder la pile des parcours récursifs
fn check_depth(depth: usize) -> Result<(), String> {
    if depth > MAX_DEPTH {
        return Err(format!("document nested deeper than {} elements", MAX_DEPTH));
    }
    Ok(())
}

fn open_element(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Element, String> {
    let qname = start.name();
    let name = utf8(qname.as_ref())?.into_owned();
    let mut element = Element::new(&name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| format!("invalid attribute in <{}>: {}", name, e))?;
        let key = utf8(attribute.key.as_ref())?.into_owned();
        let value = attribute
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| format!("invalid value for attribute {}: {}", key, e))?
            .into_owned();
        element.attributes.insert(key, value);
    }

    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XMLNode::Element(element));
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(format!(
            "unexpected element <{}> after the root element",
            element.name
        ))
    }
}

/// Appends text to the open element, merging with a preceding text node so
/// that `a &amp; b` stays a single child.
fn push_text(stack: &mut [Element], text: Cow<'_, str>) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(XMLNode::Text(previous)) = parent.children.last_mut() {
                previous.push_str(&text);
            } else if !text.is_empty() {
                parent.children.push(XMLNode::Text(text.into_owned()));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("text content outside of the root element".to_string()),
    }
}

fn resolve_reference(name: Cow<'_, str>) -> Result<String, String> {
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => code.parse::<u32>(),
        };
        return parsed
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| format!("invalid character reference &{};", name));
    }

    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| format!("unsupported entity reference &{};", name))
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>, String> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| format!("invalid UTF-8: {}", e))
}
