use tracing::debug;

use crate::types::{DEFAULT_INDEX_ORDER, MIN_INDEX_ORDER, error::{DatabaseError, Result}};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct LeafNode<K, V> {
    pub entries: Vec<(K, V)>,
    /// Right sibling in key order. Non-owning; only used for scans.
    pub next: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct InternalNode<K> {
    pub keys: Vec<K>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Internal(InternalNode<K>),
}

impl<K, V> Node<K, V> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn key_count(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.entries.len(),
            Node::Internal(node) => node.keys.len(),
        }
    }
}

/// In-memory B+ tree with proactive (split-before-descend) insertion.
///
/// Nodes live in an arena owned by the tree and refer to each other by
/// `NodeId`. A node holds at most `order - 1` keys; leaves are chained in
/// ascending key order. Duplicate keys are allowed and keep insertion order.
#[derive(Debug, Clone)]
pub struct BPlusTree<K, V> {
    nodes: Vec<Node<K, V>>,
    root: NodeId,
    order: usize,
    len: usize,
}

impl<K: Ord + Clone, V: Clone> Default for BPlusTree<K, V> {
    fn default() -> Self {
        Self::build(DEFAULT_INDEX_ORDER)
    }
}

impl<K: Ord + Clone, V: Clone> BPlusTree<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(order: usize) -> Result<Self> {
        if order < MIN_INDEX_ORDER {
            return Err(DatabaseError::InvalidConfig {
                details: format!("B+ tree order must be at least {MIN_INDEX_ORDER}, got {order}"),
            });
        }
        Ok(Self::build(order))
    }

    fn build(order: usize) -> Self {
        Self {
            nodes: vec![Node::Leaf(LeafNode {
                entries: Vec::new(),
                next: None,
            })],
            root: 0,
            order,
            len: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> &Node<K, V> {
        &self.nodes[self.root]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<K, V>> {
        self.nodes.get(id)
    }

    /// Number of levels, counting the leaf level.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            current = node.children[0];
            height += 1;
        }
        height
    }

    fn is_full(&self, id: NodeId) -> bool {
        self.nodes[id].key_count() >= self.order - 1
    }

    fn child(&self, parent: NodeId, index: usize) -> NodeId {
        match &self.nodes[parent] {
            Node::Internal(node) => node.children[index],
            Node::Leaf(_) => unreachable!("leaf node {parent} has no children"),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.is_full(self.root) {
            let old_root = self.root;
            let new_root = self.nodes.len();
            self.nodes.push(Node::Internal(InternalNode {
                keys: Vec::new(),
                children: vec![old_root],
            }));
            self.root = new_root;
            self.split_child(new_root, 0);
            debug!(height = self.height(), "b+ tree root split");
        }

        let mut current = self.root;
        loop {
            let mut index = match &self.nodes[current] {
                Node::Leaf(_) => break,
                Node::Internal(node) => node.keys.partition_point(|k| *k <= key),
            };
            let child = self.child(current, index);
            if self.is_full(child) {
                self.split_child(current, index);
                if let Node::Internal(node) = &self.nodes[current] {
                    if key >= node.keys[index] {
                        index += 1;
                    }
                }
            }
            current = self.child(current, index);
        }

        if let Node::Leaf(leaf) = &mut self.nodes[current] {
            let position = leaf.entries.partition_point(|(k, _)| *k <= key);
            leaf.entries.insert(position, (key, value));
        }
        self.len += 1;
    }

    /// Split the full child at `parent.children[index]` into two siblings,
    /// promoting a separator into `parent`, which must have room for it.
    fn split_child(&mut self, parent: NodeId, index: usize) {
        let order = self.order;
        let sibling_id = self.nodes.len();
        let child_id = self.child(parent, index);

        let (separator, sibling) = match &mut self.nodes[child_id] {
            Node::Leaf(leaf) => {
                let right = leaf.entries.split_off(order / 2);
                let separator = right[0].0.clone();
                let next = leaf.next.replace(sibling_id);
                (separator, Node::Leaf(LeafNode { entries: right, next }))
            }
            Node::Internal(node) => {
                let mid = node.keys.len() / 2;
                let mut right_keys = node.keys.split_off(mid);
                let separator = right_keys.remove(0);
                let right_children = node.children.split_off(mid + 1);
                (
                    separator,
                    Node::Internal(InternalNode {
                        keys: right_keys,
                        children: right_children,
                    }),
                )
            }
        };
        debug!(
            node = child_id,
            sibling = sibling_id,
            leaf = sibling.is_leaf(),
            "b+ tree node split"
        );
        self.nodes.push(sibling);

        if let Node::Internal(node) = &mut self.nodes[parent] {
            node.keys.insert(index, separator);
            node.children.insert(index + 1, sibling_id);
        }
    }

    /// Leftmost leaf that can hold `key`. Equal separators send the search
    /// left so duplicates spilling over a split are not skipped.
    fn leaf_for(&self, key: &K) -> NodeId {
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            let index = node.keys.partition_point(|k| k < key);
            current = node.children[index];
        }
        current
    }

    fn first_leaf(&self) -> NodeId {
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            current = node.children[0];
        }
        current
    }

    pub fn locate(&self, key: &K) -> Vec<V> {
        self.locate_range(key, key)
    }

    /// Values whose keys fall within `[begin, end]`, in key order.
    pub fn locate_range(&self, begin: &K, end: &K) -> Vec<V> {
        let mut results = Vec::new();
        if begin > end {
            return results;
        }
        let mut leaf = Some(self.leaf_for(begin));
        while let Some(id) = leaf {
            let Node::Leaf(node) = &self.nodes[id] else {
                break;
            };
            for (k, v) in &node.entries {
                if k > end {
                    return results;
                }
                if k >= begin {
                    results.push(v.clone());
                }
            }
            leaf = node.next;
        }
        results
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: self,
            leaf: Some(self.first_leaf()),
            position: 0,
        }
    }

    /// Keys of each leaf, following the sibling chain from the leftmost leaf.
    pub fn leaf_keys(&self) -> Vec<Vec<K>> {
        let mut leaves = Vec::new();
        let mut leaf = Some(self.first_leaf());
        while let Some(id) = leaf {
            let Node::Leaf(node) = &self.nodes[id] else {
                break;
            };
            leaves.push(node.entries.iter().map(|(k, _)| k.clone()).collect());
            leaf = node.next;
        }
        leaves
    }
}

/// Ordered iterator over every (key, value) pair, driven by the leaf chain.
pub struct Iter<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    leaf: Option<NodeId>,
    position: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let id = self.leaf?;
            let Node::Leaf(node) = &tree.nodes[id] else {
                return None;
            };
            if let Some((k, v)) = node.entries.get(self.position) {
                self.position += 1;
                return Some((k, v));
            }
            self.leaf = node.next;
            self.position = 0;
        }
    }
}
