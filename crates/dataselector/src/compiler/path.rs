//! Iteration paths and the aliases derived from them.

/// Position of a node in the connection tree: one sibling counter per depth.
///
/// The main node has the empty path. Paths are values; extending one never
/// changes the parent's path, so aliases stay deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IterationPath(Vec<u32>);

impl IterationPath {
    /// Path of the main node.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the `counter`-th child of this node.
    pub fn child(&self, counter: u32) -> Self {
        let mut path = self.0.clone();
        path.push(counter);
        Self(path)
    }

    /// Path of the previous node, or `None` for the main node.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Recursion depth (0 for the main node).
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Alias fragment: `main` or the counters joined by `_`.
    pub fn key(&self) -> String {
        if self.is_root() {
            return "main".to_string();
        }
        self.0
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Alias of this node's item table.
    pub fn item_alias(&self) -> String {
        format!("item_{}", self.key())
    }

    /// Alias of the link table joining this node to the previous one.
    pub fn link_alias(&self) -> String {
        format!("itemlink_{}", self.key())
    }
}
