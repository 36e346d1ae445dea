//! Normalisation des réponses SOAP
//!
//! Turns the raw string returned by a transport into either a
//! [`SoapResponse`] or a [`SoapError`]: transport failures, unparsable
//! bodies and SOAP faults are all reported as errors.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::errors::SoapError;
use crate::xml::{local_name, parse_document, text_content};

// Déclarations `xmlns="..."` sans préfixe ; `xmlns:foo="..."` n'est pas concerné
static DEFAULT_NAMESPACE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+xmlns\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("valid namespace regex")
});

/// Successful SOAP call: the response text and its parsed document
#[derive(Debug, Clone)]
pub struct SoapResponse {
    /// Response body, after default namespace stripping when enabled
    pub xml: String,

    /// Root element of the response
    pub document: Element,
}

/// Outcome of a SOAP call
pub type FetchResult = Result<SoapResponse, SoapError>;

/// Removes every unprefixed default namespace declaration from `xml`.
///
/// A default namespace puts every unprefixed element in that namespace, so
/// each later lookup (the fault scan included) would have to be namespace
/// qualified. Prefixed declarations are kept.
pub fn strip_default_namespaces(xml: &str) -> Cow<'_, str> {
    DEFAULT_NAMESPACE_DECLARATION.replace_all(xml, "")
}

/// Validates a raw transport response and checks it for SOAP faults.
///
/// - an empty response, or one starting with a digit (a bare HTTP status such
///   as `500 Internal Server Error`), is a [`SoapError::Transport`] carrying
///   the response verbatim. A legitimate body starting with a digit is
///   classified the same way.
/// - a body that is not well-formed XML gives [`SoapError::ResponseParse`].
/// - the first `faultstring` element whose parent's local name contains
///   `Fault` gives [`SoapError::Fault`] with its text; later faults are
///   ignored.
pub fn normalize(raw: &str, strip_default_namespace: bool) -> FetchResult {
    if raw.is_empty() || raw.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(SoapError::Transport(raw.to_string()));
    }

    let xml = if strip_default_namespace {
        strip_default_namespaces(raw).into_owned()
    } else {
        raw.to_string()
    };

    let document = parse_document(&xml).map_err(|detail| {
        debug!(error = %detail, "Response is not well-formed XML");
        SoapError::ResponseParse(detail)
    })?;

    if let Some(message) = find_fault(&document) {
        debug!(fault = %message, "SOAP fault in response");
        return Err(SoapError::Fault(message));
    }

    Ok(SoapResponse { xml, document })
}

/// Finds the first genuine fault string, in document order.
fn find_fault(element: &Element) -> Option<String> {
    for child in element.children.iter().filter_map(XMLNode::as_element) {
        if local_name(&child.name) == "faultstring" && local_name(&element.name).contains("Fault")
        {
            return Some(text_content(child));
        }
        if let Some(message) = find_fault(child) {
            return Some(message);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RESPONSE_PARSE_MESSAGE;

    #[test]
    fn test_transport_errors() {
        assert_eq!(normalize("", true).unwrap_err(), SoapError::Transport(String::new()));
        let err = normalize("500 Internal Error", false).unwrap_err();
        assert_eq!(err, SoapError::Transport("500 Internal Error".to_string()));
        assert_eq!(err.to_string(), "500 Internal Error");
    }

    #[test]
    fn test_digit_leading_xml_is_a_transport_error() {
        // Même un corps XML valide est classé ainsi dès qu'il commence par un chiffre
        assert_eq!(
            normalize("1<a/>", true).unwrap_err(),
            SoapError::Transport("1<a/>".to_string())
        );
    }

    #[test]
    fn test_deeply_nested_response_is_rejected() {
        let depth = 10_000;
        let xml = "<a>".repeat(depth) + &"</a>".repeat(depth);
        let err = normalize(&xml, true).unwrap_err();
        assert!(matches!(err, SoapError::ResponseParse(_)));
        assert_eq!(err.to_string(), RESPONSE_PARSE_MESSAGE);
    }

    #[test]
    fn test_unparsable_response() {
        let err = normalize("<not-xml", true).unwrap_err();
        assert!(matches!(err, SoapError::ResponseParse(_)));
        assert_eq!(err.to_string(), RESPONSE_PARSE_MESSAGE);
    }

    #[test]
    fn test_prefixed_fault() {
        let err = normalize(
            "<soap:Fault><faultstring>Bad input</faultstring></soap:Fault>",
            true,
        )
        .unwrap_err();
        assert_eq!(err, SoapError::Fault("Bad input".to_string()));
        assert_eq!(err.to_string(), "Bad input");
    }

    #[test]
    fn test_prefixed_faultstring() {
        let err = normalize(
            "<soap:Fault><soap:faultstring>x</soap:faultstring></soap:Fault>",
            true,
        )
        .unwrap_err();
        assert_eq!(err, SoapError::Fault("x".to_string()));
    }

    #[test]
    fn test_fault_inside_envelope() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Server was unable to process request.</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;
        let err = normalize(xml, true).unwrap_err();
        assert_eq!(
            err,
            SoapError::Fault("Server was unable to process request.".to_string())
        );
    }

    #[test]
    fn test_faultstring_outside_fault_is_data() {
        let xml = "<Result><faultstring>not a fault</faultstring></Result>";
        let response = normalize(xml, true).unwrap();
        assert_eq!(response.xml, xml);
    }

    #[test]
    fn test_first_fault_wins() {
        let xml = "<r>\
            <Data><faultstring>ignored, not in a fault</faultstring></Data>\
            <Fault><faultstring>first</faultstring></Fault>\
            <Fault><faultstring>second</faultstring></Fault>\
            </r>";
        assert_eq!(
            normalize(xml, true).unwrap_err(),
            SoapError::Fault("first".to_string())
        );
    }

    #[test]
    fn test_fault_name_match_is_case_sensitive() {
        let xml = "<fault><faultstring>lowercase wrapper</faultstring></fault>";
        assert!(normalize(xml, true).is_ok());
    }

    #[test]
    fn test_strip_default_namespace() {
        let raw = r#"<Result xmlns="http://x">ok</Result>"#;
        let response = normalize(raw, true).unwrap();
        assert_eq!(response.xml, "<Result>ok</Result>");
        assert_eq!(response.document.name, "Result");
    }

    #[test]
    fn test_keep_default_namespace_when_disabled() {
        let raw = r#"<Result xmlns="http://x">ok</Result>"#;
        let response = normalize(raw, false).unwrap();
        assert_eq!(response.xml, raw);
    }

    #[test]
    fn test_strip_keeps_prefixed_declarations() {
        let raw = r#"<s:Envelope xmlns:s="urn:s" xmlns = 'urn:d'><s:Body xmlns="urn:e"/></s:Envelope>"#;
        assert_eq!(
            strip_default_namespaces(raw),
            r#"<s:Envelope xmlns:s="urn:s"><s:Body/></s:Envelope>"#
        );
    }

    #[test]
    fn test_default_namespaced_fault_is_found_after_stripping() {
        let xml = r#"<Envelope xmlns="http://schemas.xmlsoap.org/soap/envelope/"><Body><Fault><faultstring>Denied</faultstring></Fault></Body></Envelope>"#;
        assert_eq!(
            normalize(xml, true).unwrap_err(),
            SoapError::Fault("Denied".to_string())
        );
    }
}
