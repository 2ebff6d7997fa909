//! Arena-backed tree standing in for rendered content.
//!
//! Text nodes hold the visible characters, element nodes only group them.
//! Concatenating the text nodes of a subtree in document order yields the
//! canonical text that subtree was projected from.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag: String },
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct RenderTree {
    nodes: Vec<Node>,
}

impl RenderTree {
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element { tag: root_tag.to_owned() },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push(parent, NodeKind::Element { tag: tag.to_owned() })
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_owned()))
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The text of a text node, `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element { .. } => None,
        }
    }

    /// True if `node` is `ancestor` or lies beneath it.
    pub fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }

    /// Every node under `container` (inclusive) in document order.
    pub fn preorder(&self, container: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(container) {
            return out;
        }
        let mut stack = vec![container];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn text_nodes(&self, container: NodeId) -> Vec<NodeId> {
        self.preorder(container)
            .into_iter()
            .filter(|id| self.text(*id).is_some())
            .collect()
    }

    pub fn text_content(&self, container: NodeId) -> String {
        self.text_nodes(container)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    /// Build a presentation of `text`: one block per line, words and the
    /// whitespace between them in separate inline wrappers.
    pub fn project(text: &str) -> Self {
        let mut tree = Self::new("article");
        let root = tree.root();
        for line in text.split_inclusive('\n') {
            let block = tree.append_element(root, "p");
            let mut run = String::new();
            let mut run_is_space = None;
            for ch in line.chars() {
                let is_space = ch.is_whitespace();
                if run_is_space.is_some_and(|prev| prev != is_space) {
                    tree.append_run(block, &run, run_is_space == Some(true));
                    run.clear();
                }
                run_is_space = Some(is_space);
                run.push(ch);
            }
            if !run.is_empty() {
                tree.append_run(block, &run, run_is_space == Some(true));
            }
        }
        tree
    }

    fn append_run(&mut self, block: NodeId, run: &str, is_space: bool) {
        if is_space {
            self.append_text(block, run);
        } else {
            let span = self.append_element(block, "span");
            self.append_text(span, run);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preorder_visits_in_document_order() {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        let p = tree.append_element(root, "p");
        let a = tree.append_text(p, "a");
        let b = tree.append_text(root, "b");
        assert_eq!(tree.preorder(root), vec![root, p, a, b]);
        assert_eq!(tree.text_content(root), "ab");
    }

    #[test]
    fn projection_preserves_text() {
        let text = "fn main() {\n    println!(\"hi\");\n}\n";
        let tree = RenderTree::project(text);
        assert_eq!(tree.text_content(tree.root()), text);
        assert!(tree.text_nodes(tree.root()).len() > 3);
    }

    #[test]
    fn projection_of_empty_text_has_no_text_nodes() {
        let tree = RenderTree::project("");
        assert!(tree.text_nodes(tree.root()).is_empty());
        assert_eq!(tree.text_content(tree.root()), "");
    }

    #[test]
    fn descendant_check() {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        let inner = tree.append_element(root, "em");
        let text = tree.append_text(inner, "x");
        let sibling = tree.append_element(root, "b");
        assert!(tree.is_inclusive_descendant(text, root));
        assert!(tree.is_inclusive_descendant(inner, inner));
        assert!(!tree.is_inclusive_descendant(text, sibling));
    }
}
