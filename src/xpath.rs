//! Path lookups over a parsed `roxmltree` document.
//!
//! Paths are `/`-separated child element names relative to a context node, e.g.
//! `report_metadata/date_range/begin`. Element names match on local name, so a report
//! carrying a default namespace resolves the same way as an unqualified one.

use std::borrow::Cow;

use roxmltree::Node;

/// First-match lookups relative to an element
pub trait NodeExt<'a, 'input: 'a> {
    /// First element reached by `path`, depth-first in document order
    fn find(&self, path: &str) -> Option<Node<'a, 'input>>;

    /// Every element reached by `path`, in document order
    fn find_all(&self, path: &str) -> Vec<Node<'a, 'input>>;

    /// [`element_text`] of the first element reached by `path`
    ///
    /// An element that exists without text yields `Some("")`.
    fn find_text(&self, path: &str) -> Option<Cow<'a, str>>;

    fn text_or_default(&self, path: &str, default: &str) -> String {
        self.find_text(path)
            .map(Cow::into_owned)
            .unwrap_or_else(|| default.to_string())
    }

    /// Text parsed as a non-negative integer, or `default` if absent or malformed
    fn integer_or_default(&self, path: &str, default: u64) -> u64 {
        self.find_text(path)
            .and_then(|text| text.trim().parse::<u64>().ok())
            .unwrap_or(default)
    }
}

fn steps(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|step| !step.is_empty())
}

impl<'a, 'input: 'a> NodeExt<'a, 'input> for Node<'a, 'input> {
    fn find(&self, path: &str) -> Option<Node<'a, 'input>> {
        let names: Vec<&str> = steps(path).collect();
        find_first(*self, &names)
    }

    fn find_all(&self, path: &str) -> Vec<Node<'a, 'input>> {
        let mut current = vec![*self];
        for name in steps(path) {
            current = current
                .into_iter()
                .flat_map(|node| {
                    node.children()
                        .filter(move |child| child.is_element() && child.tag_name().name() == name)
                        .collect::<Vec<_>>()
                })
                .collect();
        }
        current
    }

    fn find_text(&self, path: &str) -> Option<Cow<'a, str>> {
        self.find(path).map(element_text)
    }
}

/// Text of `node` up to its first child element
///
/// Comments and processing instructions are skipped, so `<a>ac<!-- x -->me</a>` reads as
/// `acme`. Text after a child element is not included.
pub fn element_text<'a>(node: Node<'a, '_>) -> Cow<'a, str> {
    let pieces: Vec<&'a str> = node
        .children()
        .take_while(|child| !child.is_element())
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect();

    match pieces.as_slice() {
        [] => Cow::Borrowed(""),
        [single] => Cow::Borrowed(*single),
        _ => Cow::Owned(pieces.concat()),
    }
}

/// Backtracking search so `a/b` finds a `b` under the second `a` when the first has none
fn find_first<'a, 'input>(node: Node<'a, 'input>, names: &[&str]) -> Option<Node<'a, 'input>> {
    let Some((head, rest)) = names.split_first() else {
        return Some(node);
    };
    node.children()
        .filter(|child| child.is_element() && child.tag_name().name() == *head)
        .find_map(|child| find_first(child, rest))
}
