use std::str::FromStr;

use tracing::debug;

use crate::errors;

pub fn make_text_element<T: ToString>(name: &str, v: T) -> treexml::Element {
    let mut e = treexml::Element::new(name);
    e.text = Some(v.to_string());
    e
}

pub fn make_tree_element(name: &str, children: Vec<treexml::Element>) -> treexml::Element {
    let mut e = treexml::Element::new(name);
    e.children = children;
    e
}

/// Text content of a node, falling back to CDATA. Surrounding whitespace is dropped.
pub fn node_text(node: &treexml::Element) -> &str {
    node.text
        .as_ref()
        .or_else(|| node.cdata.as_ref())
        .map(|s| s.trim())
        .unwrap_or("")
}

pub fn find_child<'a>(node: &'a treexml::Element, name: &str) -> Option<&'a treexml::Element> {
    node.children.iter().find(|c| c.name == name)
}

/// Reads `node` into `out` if the node is called `name`.
///
/// An empty node keeps the current value, so fields missing from the
/// reply stay at their zero value. Text that does not parse as `T` is
/// skipped the same way.
pub fn deserialize_node<T>(name: &str, node: &treexml::Element, out: &mut T) -> errors::Result<()>
where
    T: FromStr,
{
    if node.name != name {
        return Ok(());
    }
    let text = node_text(node);
    if text.is_empty() {
        return Ok(());
    }
    match text.parse::<T>() {
        Ok(v) => *out = v,
        Err(_) => debug!(field = name, value = text, "unparseable value, keeping default"),
    }
    Ok(())
}

/// Reads a BOINC boolean. The client writes these either as `<flag/>` or as `<flag>0|1</flag>`.
pub fn deserialize_flag(name: &str, node: &treexml::Element, out: &mut bool) -> errors::Result<()> {
    if node.name != name {
        return Ok(());
    }
    let mut v: i64 = 1;
    deserialize_node(name, node, &mut v)?;
    *out = v != 0;
    Ok(())
}
