//! Tree assembly: turning path-ordered row sets into response sequences.
//!
//! Flat and tree listings come out of the store already in final order.
//! Parent-tree listings cannot: their `limit`/`since` window applies to
//! *root* posts, and a root must always travel with every one of its
//! descendants, which no single bounded SQL query expresses. The store
//! therefore fetches the windowed root ids and the member rows separately,
//! and this module stitches the two together.

use std::collections::HashMap;

use arbor_core::Post;

/// Regroup a path-ordered row set under the given roots.
///
/// `rows` holds every post whose root ancestor is in `roots`, sorted by
/// path; path order keeps each root's subtree contiguous and depth-first.
/// The output concatenates the subtrees in the order `roots` lists them,
/// which is the externally requested root order (ascending or descending).
/// Within a group the ascending path order is preserved either way.
///
/// Read-only with respect to post contents; for identical inputs the
/// output sequence is identical.
pub fn window_by_roots(roots: &[i64], rows: Vec<Post>) -> Vec<Post> {
    let total = rows.len();
    let mut groups: HashMap<i64, Vec<Post>> = HashMap::with_capacity(roots.len());
    for post in rows {
        groups.entry(post.path.root_id()).or_default().push(post);
    }

    let mut out = Vec::with_capacity(total);
    for root in roots {
        if let Some(group) = groups.remove(root) {
            debug_assert!(is_path_ordered(&group));
            out.extend(group);
        }
    }
    out
}

/// True if `posts` are in strictly ascending path order.
pub fn is_path_ordered(posts: &[Post]) -> bool {
    posts.windows(2).all(|pair| pair[0].path < pair[1].path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::TreePath;
    use chrono::{TimeZone, Utc};

    fn post(id: i64, parent: Option<&Post>) -> Post {
        let (parent_id, path) = match parent {
            Some(p) => (Some(p.id), p.path.child(id)),
            None => (None, TreePath::root(id)),
        };
        Post {
            id,
            thread_id: 1,
            forum_slug: "general".to_string(),
            author: "ada".to_string(),
            parent_id,
            message: format!("post {id}"),
            is_edited: false,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            path,
        }
    }

    /// Thread with three roots carrying 2, 3, and 0 descendants:
    ///
    ///   1            2            3
    ///   ├─ 4         ├─ 5
    ///   └─ 7         │  └─ 6
    ///                └─ 8
    fn fixture() -> Vec<Post> {
        let r1 = post(1, None);
        let r2 = post(2, None);
        let r3 = post(3, None);
        let p4 = post(4, Some(&r1));
        let p5 = post(5, Some(&r2));
        let p6 = post(6, Some(&p5));
        let p7 = post(7, Some(&r1));
        let p8 = post(8, Some(&r2));

        // Path-sorted, as the store returns them.
        let mut all = vec![r1, r2, r3, p4, p5, p6, p7, p8];
        all.sort_by(|a, b| a.path.cmp(&b.path));
        all
    }

    fn ids(posts: &[Post]) -> Vec<i64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_two_root_window_keeps_subtrees_whole() {
        // Roots 1 and 2 selected (limit 2): both subtrees, never a part of
        // one — 7 posts for root sizes 3 and 4.
        let rows: Vec<Post> = fixture()
            .into_iter()
            .filter(|p| p.path.root_id() != 3)
            .collect();
        let out = window_by_roots(&[1, 2], rows);
        assert_eq!(ids(&out), vec![1, 4, 7, 2, 5, 6, 8]);
    }

    #[test]
    fn test_window_skips_unselected_roots() {
        // Window of roots 1 and 3 only; root 2's subtree must not leak in.
        let rows: Vec<Post> = fixture()
            .into_iter()
            .filter(|p| [1, 3].contains(&p.path.root_id()))
            .collect();
        let out = window_by_roots(&[1, 3], rows);
        assert_eq!(ids(&out), vec![1, 4, 7, 3]);
    }

    #[test]
    fn test_descending_root_order_keeps_groups_ascending() {
        // Descending parent-tree: root order reverses, each subtree stays
        // in ascending depth-first order.
        let out = window_by_roots(&[3, 2, 1], fixture());
        assert_eq!(ids(&out), vec![3, 2, 5, 6, 8, 1, 4, 7]);
    }

    #[test]
    fn test_root_with_no_descendants() {
        let rows: Vec<Post> = fixture()
            .into_iter()
            .filter(|p| p.path.root_id() == 3)
            .collect();
        let out = window_by_roots(&[3], rows);
        assert_eq!(ids(&out), vec![3]);
    }

    #[test]
    fn test_empty_window() {
        assert!(window_by_roots(&[], Vec::new()).is_empty());
    }

    #[test]
    fn test_output_is_reproducible() {
        let a = window_by_roots(&[2, 1, 3], fixture());
        let b = window_by_roots(&[2, 1, 3], fixture());
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_is_path_ordered() {
        let all = fixture();
        assert!(is_path_ordered(&all));

        let mut reversed = all.clone();
        reversed.reverse();
        assert!(!is_path_ordered(&reversed));
    }
}
