//! Minimal XML property list reader.
//!
//! Only the XML flavour is supported; every Apple endpoint the feed reads
//! serves XML plists. Dictionaries keep their document order.

use exn::{OptionExt, ResultExt};
use serde::Deserialize;

use crate::error::{ErrorKind, Result};

const FORMAT: &str = "plist";

#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Dict(Vec<(String, PlistValue)>),
    Array(Vec<PlistValue>),
    String(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Date(String),
    Data(String),
}
impl PlistValue {
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        match self {
            PlistValue::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) | PlistValue::Date(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> &[PlistValue] {
        match self {
            PlistValue::Array(items) => items,
            _ => &[],
        }
    }

    pub fn as_dict(&self) -> &[(String, PlistValue)] {
        match self {
            PlistValue::Dict(entries) => entries,
            _ => &[],
        }
    }

    /// Visits this value and everything nested inside it, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a PlistValue)) {
        visit(self);
        match self {
            PlistValue::Dict(entries) => entries.iter().for_each(|(_, value)| value.walk(visit)),
            PlistValue::Array(items) => items.iter().for_each(|value| value.walk(visit)),
            _ => {},
        }
    }
}

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "$value", default)]
    nodes: Vec<Node>,
}

/// Elements as they appear in the document; dictionaries are a flat run of
/// alternating keys and values until paired up.
#[derive(Deserialize)]
enum Node {
    #[serde(rename = "dict")]
    Dict {
        #[serde(rename = "$value", default)]
        children: Vec<Node>,
    },
    #[serde(rename = "array")]
    Array {
        #[serde(rename = "$value", default)]
        children: Vec<Node>,
    },
    #[serde(rename = "key")]
    Key(String),
    #[serde(rename = "string")]
    String(String),
    #[serde(rename = "integer")]
    Integer(String),
    #[serde(rename = "real")]
    Real(String),
    #[serde(rename = "date")]
    Date(String),
    #[serde(rename = "data")]
    Data(String),
    #[serde(rename = "true")]
    True,
    #[serde(rename = "false")]
    False,
}

/// Parses an XML property list document into its root value.
pub fn parse(xml: &str) -> Result<PlistValue> {
    let document: Document = quick_xml::de::from_str(xml).or_raise(|| ErrorKind::MalformedDocument(FORMAT))?;
    let root = document.nodes.into_iter().next().ok_or_raise(|| ErrorKind::MissingField("plist root"))?;
    convert(root)
}

fn convert(node: Node) -> Result<PlistValue> {
    Ok(match node {
        Node::Dict { children } => {
            let mut entries = Vec::with_capacity(children.len() / 2);
            let mut children = children.into_iter();
            while let Some(key) = children.next() {
                let Node::Key(key) = key else {
                    exn::bail!(ErrorKind::MissingField("key"));
                };
                let value = children.next().ok_or_raise(|| ErrorKind::MissingField("value"))?;
                entries.push((key, convert(value)?));
            }
            PlistValue::Dict(entries)
        },
        Node::Array { children } => PlistValue::Array(children.into_iter().map(convert).collect::<Result<_>>()?),
        Node::Key(key) => exn::bail!(ErrorKind::ParseError { field: "key", value: key }),
        Node::String(s) => PlistValue::String(s),
        Node::Integer(raw) => PlistValue::Integer(raw.trim().parse::<i64>().or_raise(|| ErrorKind::ParseError {
            field: "integer",
            value: raw.clone(),
        })?),
        Node::Real(raw) => PlistValue::Real(raw.trim().parse::<f64>().or_raise(|| ErrorKind::ParseError {
            field: "real",
            value: raw.clone(),
        })?),
        Node::Date(s) => PlistValue::Date(s),
        Node::Data(s) => PlistValue::Data(s),
        Node::True => PlistValue::Bool(true),
        Node::False => PlistValue::Bool(false),
    })
}
