//! Conversion d'un fragment XML en arbre de paramètres SOAP
//!
//! A fragment such as
//!
//! ```xml
//! <city>Paris</city>
//! <period _value_type="int">7</period>
//! <options unit="celsius"><wind>1</wind><rain>0</rain></options>
//! ```
//!
//! becomes three top-level [`ParameterNode`]s. Leaves carry a value and a
//! type (`string` unless overridden by [`VALUE_TYPE_ATTRIBUTE`]); branches
//! carry ordered children. Nodes live in an arena ([`ParamTree`]) and refer
//! to each other through [`NodeId`] handles.

use std::collections::BTreeMap;

use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::errors::SoapError;
use crate::xml::parse_document;

/// Reserved attribute giving the SOAP type of a parameter.
pub const VALUE_TYPE_ATTRIBUTE: &str = "_value_type";

/// Type of a parameter without [`VALUE_TYPE_ATTRIBUTE`].
pub const DEFAULT_VALUE_TYPE: &str = "string";

// Élément synthétique englobant le fragment
const FRAGMENT_WRAPPER: &str = "pmosoap-fragment";

/// Handle of a node inside a [`ParamTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One XML element converted into a SOAP parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterNode {
    /// Nom de l'élément source (préfixe éventuel inclus)
    pub name: String,

    /// Texte de l'élément, pour les feuilles uniquement
    pub value: Option<String>,

    /// Type SOAP (`string` par défaut)
    pub value_type: String,

    /// Attributs de l'élément, hors [`VALUE_TYPE_ATTRIBUTE`]
    pub attributes: BTreeMap<String, String>,

    /// Enfants, dans l'ordre du document
    pub children: Vec<NodeId>,

    /// Branche englobante, `None` pour un paramètre de premier niveau
    pub parent: Option<NodeId>,
}

impl ParameterNode {
    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }
}

/// Arena of [`ParameterNode`]s built from one XML fragment
///
/// Built once by [`convert`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamTree {
    nodes: Vec<ParameterNode>,
    roots: Vec<NodeId>,
}

impl ParamTree {
    /// Top-level parameters, in document order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &ParameterNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&ParameterNode> {
        self.nodes.get(id.0)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &ParameterNode> + '_ {
        self.nodes[id.0].children.iter().map(|child| self.node(*child))
    }

    pub fn parent(&self, id: NodeId) -> Option<&ParameterNode> {
        self.nodes[id.0].parent.map(|parent| self.node(parent))
    }

    /// Total number of nodes, all levels included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first walk in document order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ParameterNode)> + '_ {
        let mut pending: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = pending.pop()?;
            let node = self.node(id);
            pending.extend(node.children.iter().rev().copied());
            Some((id, node))
        })
    }

    fn register(&mut self, element: &Element, parent: Option<NodeId>) -> NodeId {
        let mut value_type = DEFAULT_VALUE_TYPE.to_string();
        let mut attributes = BTreeMap::new();
        for (name, value) in element.attributes.iter() {
            if name == VALUE_TYPE_ATTRIBUTE {
                value_type = value.clone();
            } else {
                attributes.insert(name.clone(), value.clone());
            }
        }

        // Une feuille a exactement un nœud enfant, et c'est du texte
        let value = match element.children.as_slice() {
            [XMLNode::Text(text)] | [XMLNode::CData(text)] => Some(text.clone()),
            _ => None,
        };
        let is_leaf = value.is_some();

        let id = NodeId(self.nodes.len());
        self.nodes.push(ParameterNode {
            name: element.name.clone(),
            value,
            value_type,
            attributes,
            children: Vec::new(),
            parent,
        });

        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }

        if !is_leaf {
            for child in element.children.iter().filter_map(XMLNode::as_element) {
                self.register(child, Some(id));
            }
        }

        id
    }
}

/// Converts an XML fragment into a parameter tree.
///
/// The fragment does not need a single root element: it is wrapped in a
/// synthetic element before parsing and every top-level element becomes a
/// root of the tree. An empty fragment gives an empty tree.
pub fn convert(fragment: &str) -> Result<ParamTree, SoapError> {
    let wrapped = format!("<{FRAGMENT_WRAPPER}>{fragment}</{FRAGMENT_WRAPPER}>");
    let wrapper = parse_document(&wrapped).map_err(SoapError::XmlParse)?;

    let mut tree = ParamTree::default();
    for element in wrapper.children.iter().filter_map(XMLNode::as_element) {
        tree.register(element, None);
    }

    debug!(
        roots = tree.roots.len(),
        nodes = tree.nodes.len(),
        "Converted XML fragment into SOAP parameters"
    );
    Ok(tree)
}
