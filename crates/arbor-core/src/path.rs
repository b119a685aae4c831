//! Materialized ancestry paths for posts.
//!
//! Every post stores the ids of its ancestors, ending with its own id. A
//! root post's path is `[id]`; a reply's path is its parent's path with the
//! reply's id appended. Sorting one thread's posts by path yields a
//! depth-first traversal of the reply tree without any recursion at read
//! time.
//!
//! # Ordering
//!
//! Path order is lexicographic over the id sequence, with an ancestor
//! sorting before each of its descendants (a strict prefix is smaller).
//! [`TreePath::sort_key`] encodes the path as big-endian fixed-width
//! integers so plain byte comparison produces the same order; the database
//! gets it for free from `BIGINT[]` comparison. Post ids are
//! sequence-assigned and therefore positive, which keeps the big-endian
//! encoding order-preserving.

use serde::{Deserialize, Serialize};

/// Materialized ancestry path: ancestor ids ending in the post's own id.
///
/// A `TreePath` is never empty. Its derived `Ord` is lexicographic over the
/// id segments, which is exactly tree order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(Vec<i64>);

impl TreePath {
    /// Path of a root post: just the post's own id.
    pub fn root(id: i64) -> Self {
        Self(vec![id])
    }

    /// Path of a reply to the post at `self`.
    pub fn child(&self, id: i64) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(id);
        Self(segments)
    }

    /// Rebuild a path from stored segments.
    ///
    /// Returns `None` for an empty segment list, which no valid post row
    /// can produce.
    pub fn from_segments(segments: Vec<i64>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    /// The raw id segments, root first.
    pub fn segments(&self) -> &[i64] {
        &self.0
    }

    /// The post's own id (last segment).
    pub fn own_id(&self) -> i64 {
        *self.0.last().expect("TreePath is never empty")
    }

    /// The root ancestor's id (first segment).
    pub fn root_id(&self) -> i64 {
        self.0[0]
    }

    /// Number of posts on the path, including the post itself.
    ///
    /// A root post has depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &TreePath) -> bool {
        other.0.len() > self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Encode the path as big-endian fixed-width integers.
    ///
    /// Lexicographic byte comparison of two keys equals path order, so the
    /// key can stand in for the path anywhere only an ordered byte string
    /// is available.
    pub fn sort_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.0.len() * 8);
        for id in &self.0 {
            key.extend_from_slice(&id.to_be_bytes());
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path() {
        let path = TreePath::root(7);
        assert_eq!(path.segments(), &[7]);
        assert_eq!(path.own_id(), 7);
        assert_eq!(path.root_id(), 7);
        assert_eq!(path.depth(), 1);
    }

    #[test]
    fn test_child_extends_by_own_id() {
        let root = TreePath::root(1);
        let reply = root.child(4);
        let nested = reply.child(9);

        assert_eq!(reply.segments(), &[1, 4]);
        assert_eq!(nested.segments(), &[1, 4, 9]);
        assert_eq!(nested.own_id(), 9);
        assert_eq!(nested.root_id(), 1);
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn test_from_segments_rejects_empty() {
        assert!(TreePath::from_segments(vec![]).is_none());
        assert_eq!(
            TreePath::from_segments(vec![3, 8]),
            Some(TreePath::root(3).child(8))
        );
    }

    #[test]
    fn test_ancestor_is_strict_prefix() {
        let root = TreePath::root(1);
        let reply = root.child(2);
        let nested = reply.child(3);

        assert!(root.is_ancestor_of(&reply));
        assert!(root.is_ancestor_of(&nested));
        assert!(reply.is_ancestor_of(&nested));

        // Not an ancestor of itself, a sibling, or its own ancestor.
        assert!(!root.is_ancestor_of(&root));
        assert!(!reply.is_ancestor_of(&root));
        assert!(!TreePath::root(1).child(5).is_ancestor_of(&nested));
    }

    #[test]
    fn test_path_order_is_depth_first() {
        // Thread shape:
        //   1
        //   ├─ 2
        //   │  └─ 5
        //   └─ 4
        //   3
        let p1 = TreePath::root(1);
        let p2 = p1.child(2);
        let p5 = p2.child(5);
        let p4 = p1.child(4);
        let p3 = TreePath::root(3);

        let mut paths = vec![p3.clone(), p5.clone(), p1.clone(), p4.clone(), p2.clone()];
        paths.sort();

        assert_eq!(paths, vec![p1, p2, p5, p4, p3]);
    }

    #[test]
    fn test_sort_key_matches_path_order() {
        let paths = [
            TreePath::root(1),
            TreePath::root(1).child(2),
            TreePath::root(1).child(2).child(5),
            TreePath::root(1).child(4),
            TreePath::root(3),
            TreePath::root(3).child(6),
        ];

        for window in paths.windows(2) {
            assert!(window[0] < window[1]);
            assert!(window[0].sort_key() < window[1].sort_key());
        }
    }

    #[test]
    fn test_ancestor_sorts_before_descendants() {
        let parent = TreePath::root(10);
        let child = parent.child(11);
        assert!(parent < child);
        assert!(parent.sort_key() < child.sort_key());
    }

    #[test]
    fn test_serde_transparent() {
        let path = TreePath::root(1).child(2);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "[1,2]");
        let back: TreePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
