//! Read-only XML trees parsed by GDAL's CPL XML parser.
//!
//! Used for the small documents the feature service returns besides GML:
//! capabilities, exception reports and the metadata table.

use std::ffi::{CStr, CString};
use std::fmt::{Debug, Display, Formatter};
use std::ptr::NonNull;
use std::str::FromStr;

use gdal_sys::{
    CPLDestroyXMLNode, CPLErrorReset, CPLGetLastErrorMsg, CPLParseXMLString, CPLSerializeXMLTree,
    CPLXMLNode, CPLXMLNodeType, VSIFree,
};

use crate::errors::{LucasError, Result};

/// An owned XML document.
pub struct XmlTree(NonNull<CPLXMLNode>);

impl XmlTree {
    /// Parses `s`, failing with [`LucasError::XmlError`] on malformed input.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    /// The document element, skipping the `<?xml ...?>` declaration and comments.
    pub fn root(&self) -> Option<XmlElement<'_>> {
        let first = unsafe { self.0.as_ref() };
        XmlElement::siblings(first).next()
    }
}

impl Drop for XmlTree {
    fn drop(&mut self) {
        unsafe { CPLDestroyXMLNode(self.0.as_ptr()) };
    }
}

impl FromStr for XmlTree {
    type Err = LucasError;

    fn from_str(s: &str) -> Result<Self> {
        let c_xml = CString::new(s)?;
        unsafe { CPLErrorReset() };
        let node = unsafe { CPLParseXMLString(c_xml.as_ptr()) };
        match NonNull::new(node) {
            Some(node) => Ok(XmlTree(node)),
            None => {
                let msg = unsafe { CStr::from_ptr(CPLGetLastErrorMsg()) }
                    .to_string_lossy()
                    .into_owned();
                Err(LucasError::XmlError(msg))
            }
        }
    }
}

impl Display for XmlTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let c_str = unsafe { CPLSerializeXMLTree(self.0.as_ptr()) };
        if c_str.is_null() {
            return Ok(());
        }
        let s = unsafe { CStr::from_ptr(c_str) }.to_string_lossy().into_owned();
        unsafe { VSIFree(c_str.cast()) };
        f.write_str(s.trim_end())
    }
}

impl Debug for XmlTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = self.to_string();
        if !f.alternate() {
            s = s.replace(['\n', '\r', '\t'], "");
        }
        f.write_str(&s)
    }
}

/// An element borrowed from an [`XmlTree`].
#[derive(Clone, Copy)]
pub struct XmlElement<'a> {
    node: &'a CPLXMLNode,
}

impl<'a> XmlElement<'a> {
    /// Element siblings starting at `first`, comments and declarations excluded.
    fn siblings(first: &'a CPLXMLNode) -> impl Iterator<Item = XmlElement<'a>> {
        Nodes { next: Some(first) }
            .filter(|n| n.eType == CPLXMLNodeType::CXT_Element)
            .map(|node| XmlElement { node })
            .filter(|e| !e.name().starts_with(['?', '!']))
    }

    fn child_nodes(&self) -> Nodes<'a> {
        Nodes {
            next: unsafe { self.node.psChild.as_ref() },
        }
    }

    /// Qualified name, e.g. `ows:Constraint`.
    pub fn name(&self) -> &'a str {
        node_value(self.node)
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> &'a str {
        local_name(self.name())
    }

    /// Attribute value by qualified or local name.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.child_nodes()
            .filter(|n| n.eType == CPLXMLNodeType::CXT_Attribute)
            .find(|n| {
                let attr = node_value(n);
                attr == name || local_name(attr) == name
            })
            .map(|n| {
                let value = unsafe { n.psChild.as_ref() };
                value.map(node_value).unwrap_or_default()
            })
    }

    /// Concatenated direct text content, trimmed.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .child_nodes()
            .filter(|n| n.eType == CPLXMLNodeType::CXT_Text)
            .map(node_value)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = XmlElement<'a>> {
        let first = unsafe { self.node.psChild.as_ref() };
        first.into_iter().flat_map(XmlElement::siblings)
    }

    /// First direct child with the given local name.
    pub fn child(&self, local: &str) -> Option<XmlElement<'a>> {
        self.children().find(|e| e.local_name() == local)
    }

    /// First descendant (depth-first, self excluded) with the given local name.
    pub fn find(&self, local: &str) -> Option<XmlElement<'a>> {
        self.descendants().find(|e| e.local_name() == local)
    }

    /// All descendants in document order, self excluded.
    pub fn descendants(&self) -> impl Iterator<Item = XmlElement<'a>> {
        let mut stack: Vec<XmlElement<'a>> = self.children().collect();
        stack.reverse();
        std::iter::from_fn(move || {
            let element = stack.pop()?;
            let mut children: Vec<XmlElement<'a>> = element.children().collect();
            children.reverse();
            stack.extend(children);
            Some(element)
        })
    }
}

impl Debug for XmlElement<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlElement")
            .field("name", &self.name())
            .finish()
    }
}

struct Nodes<'a> {
    next: Option<&'a CPLXMLNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a CPLXMLNode;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = unsafe { current.psNext.as_ref() };
        Some(current)
    }
}

fn node_value(node: &CPLXMLNode) -> &str {
    if node.pszValue.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(node.pszValue) }
        .to_str()
        .unwrap_or_default()
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
