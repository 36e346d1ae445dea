//! Construction des enveloppes de requête SOAP

use xmltree::{Element, XMLNode};

use crate::config::SoapVersion;
use crate::errors::SoapError;
use crate::params::{DEFAULT_VALUE_TYPE, NodeId, ParamTree};
use crate::transport::SoapDialect;

const ENVELOPE_PREFIX: &str = "soap";
const METHOD_PREFIX: &str = "m";
const SOAP_ENCODING: &str = "http://schemas.xmlsoap.org/soap/encoding/";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

fn build_soap_envelope_with_body(
    body_child: Element,
    version: SoapVersion,
) -> Result<String, SoapError> {
    // Body
    let mut body = Element::new(&format!("{ENVELOPE_PREFIX}:Body"));
    body.children.push(XMLNode::Element(body_child));

    // Envelope
    let mut envelope = Element::new(&format!("{ENVELOPE_PREFIX}:Envelope"));
    envelope.attributes.insert(
        format!("xmlns:{ENVELOPE_PREFIX}"),
        version.envelope_namespace().to_string(),
    );
    envelope
        .attributes
        .insert("xmlns:xsi".to_string(), XSI_NAMESPACE.to_string());
    envelope
        .attributes
        .insert("xmlns:xsd".to_string(), XSD_NAMESPACE.to_string());
    if version == SoapVersion::V1_1 {
        envelope.attributes.insert(
            format!("{ENVELOPE_PREFIX}:encodingStyle"),
            SOAP_ENCODING.to_string(),
        );
    }
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(false);
    envelope.write_with_config(&mut buf, config)?;

    String::from_utf8(buf).map_err(|e| SoapError::Envelope(e.to_string()))
}

/// Construit l'enveloppe d'un appel SOAP
///
/// # Arguments
///
/// * `tree` - Paramètres de l'appel
/// * `method` - Nom de la méthode (ex: "GetWeather")
/// * `namespace` - Namespace de la méthode
/// * `version` - Version SOAP de l'enveloppe
/// * `dialect` - `DotNet` : namespace par défaut sur la méthode ;
///   `Generic` : méthode préfixée
///
/// # Returns
///
/// XML SOAP sérialisé
pub fn build_envelope(
    tree: &ParamTree,
    method: &str,
    namespace: &str,
    version: SoapVersion,
    dialect: SoapDialect,
) -> Result<String, SoapError> {
    let mut method_elem = match dialect {
        SoapDialect::DotNet => {
            let mut elem = Element::new(method);
            elem.attributes
                .insert("xmlns".to_string(), namespace.to_string());
            elem
        }
        SoapDialect::Generic => {
            let mut elem = Element::new(&format!("{METHOD_PREFIX}:{method}"));
            elem.attributes
                .insert(format!("xmlns:{METHOD_PREFIX}"), namespace.to_string());
            elem
        }
    };

    for root in tree.roots() {
        method_elem
            .children
            .push(XMLNode::Element(parameter_element(tree, *root)));
    }

    build_soap_envelope_with_body(method_elem, version)
}

fn parameter_element(tree: &ParamTree, id: NodeId) -> Element {
    let node = tree.node(id);
    let mut elem = Element::new(&node.name);

    for (name, value) in &node.attributes {
        elem.attributes.insert(name.clone(), value.clone());
    }

    match &node.value {
        Some(value) => {
            elem.attributes
                .insert("xsi:type".to_string(), xsd_type(&node.value_type));
            elem.children.push(XMLNode::Text(value.clone()));
        }
        None => {
            // Les branches ne portent un type que s'il a été demandé
            if node.value_type != DEFAULT_VALUE_TYPE {
                elem.attributes
                    .insert("xsi:type".to_string(), xsd_type(&node.value_type));
            }
            for child in &node.children {
                elem.children
                    .push(XMLNode::Element(parameter_element(tree, *child)));
            }
        }
    }

    elem
}

fn xsd_type(value_type: &str) -> String {
    if value_type.contains(':') {
        value_type.to_string()
    } else {
        format!("xsd:{value_type}")
    }
}
