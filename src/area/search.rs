//! Name lookup over an area tree.
//!
//! At every node the lookup checks the node itself, then the names of all
//! its direct children, and only then descends into the children one by one:
//!
//! ```text
//!     China                      find("A")
//!     ├── Hubei                    1. China == A ?           no
//!     │   └── A   (grandchild)     2. Hubei == A ? A == A ?  yes → direct child
//!     └── A       (direct child)
//! ```
//!
//! So a direct child always wins over a deeper namesake, and among several
//! matches the first one in that order is returned. Matching is exact.

use super::model::AreaRecord;

/// Finds the first record named `target` in the subtree rooted at `root`.
///
/// `root` itself is eligible. Returns `None` when nothing matches.
///
/// ```rust
/// use epistat::{find_area, AreaRecord};
///
/// let china = AreaRecord::new("China")
///     .with_child(AreaRecord::new("Hubei").with_child(AreaRecord::new("Wuhan")));
///
/// assert_eq!(find_area(&china, "Wuhan").map(|a| a.name.as_str()), Some("Wuhan"));
/// assert!(find_area(&china, "Atlantis").is_none());
/// ```
pub fn find_area<'a>(root: &'a AreaRecord, target: &str) -> Option<&'a AreaRecord> {
    if root.name == target {
        return Some(root);
    }
    if let Some(child) = root.children.iter().find(|child| child.name == target) {
        return Some(child);
    }
    root.children.iter().find_map(|child| find_area(child, target))
}

/// Like [`find_area`], but returns every record from `root` down to the match.
///
/// ```rust
/// use epistat::{find_area_path, AreaRecord};
///
/// let china = AreaRecord::new("China")
///     .with_child(AreaRecord::new("Hubei").with_child(AreaRecord::new("Wuhan")));
///
/// let path: Vec<&str> = find_area_path(&china, "Wuhan")
///     .unwrap()
///     .iter()
///     .map(|a| a.name.as_str())
///     .collect();
/// assert_eq!(path, ["China", "Hubei", "Wuhan"]);
/// ```
pub fn find_area_path<'a>(root: &'a AreaRecord, target: &str) -> Option<Vec<&'a AreaRecord>> {
    if root.name == target {
        return Some(vec![root]);
    }
    if let Some(child) = root.children.iter().find(|child| child.name == target) {
        return Some(vec![root, child]);
    }
    root.children.iter().find_map(|child| {
        find_area_path(child, target).map(|mut tail| {
            tail.insert(0, root);
            tail
        })
    })
}

/// Owned variant of [`find_area`]: consumes the subtree and moves the match
/// out of it, so callers that discard the tree don't pay for a clone.
pub(crate) fn take_area(root: AreaRecord, target: &str) -> Option<AreaRecord> {
    if root.name == target {
        return Some(root);
    }
    let mut children = root.children;
    if let Some(pos) = children.iter().position(|child| child.name == target) {
        return Some(children.swap_remove(pos));
    }
    children.into_iter().find_map(|child| take_area(child, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, confirmed: i64) -> AreaRecord {
        let mut record = AreaRecord::new(name);
        record.total.confirmed = confirmed;
        record
    }

    /// China
    /// ├── Hubei
    /// │   ├── Wuhan
    /// │   └── Shared (1)
    /// ├── Guangdong
    /// │   └── Shenzhen
    /// │       └── Nanshan
    /// └── Shared (2)
    fn sample() -> AreaRecord {
        AreaRecord::new("China")
            .with_child(
                AreaRecord::new("Hubei")
                    .with_child(leaf("Wuhan", 50_000))
                    .with_child(leaf("Shared", 1)),
            )
            .with_child(
                AreaRecord::new("Guangdong")
                    .with_child(AreaRecord::new("Shenzhen").with_child(leaf("Nanshan", 30))),
            )
            .with_child(leaf("Shared", 2))
    }

    #[test]
    fn test_root_is_eligible() {
        let tree = sample();
        let found = find_area(&tree, "China").unwrap();
        assert!(std::ptr::eq(found, &tree));
    }

    #[test]
    fn test_finds_at_every_depth() {
        let tree = sample();
        assert_eq!(find_area(&tree, "Hubei").unwrap().name, "Hubei");
        assert_eq!(find_area(&tree, "Wuhan").unwrap().total.confirmed, 50_000);
        assert_eq!(find_area(&tree, "Nanshan").unwrap().total.confirmed, 30);
    }

    #[test]
    fn test_absent_name() {
        let tree = sample();
        assert!(find_area(&tree, "Atlantis").is_none());
        assert!(find_area(&tree, "").is_none());
    }

    #[test]
    fn test_matching_is_exact() {
        let tree = sample();
        assert!(find_area(&tree, "wuhan").is_none());
        assert!(find_area(&tree, "Wu").is_none());
        assert!(find_area(&tree, "Wuhan ").is_none());
    }

    #[test]
    fn test_direct_child_beats_earlier_grandchild() {
        // "Shared" appears under Hubei (visited first) and as a direct child
        // of China; the direct child wins.
        let tree = sample();
        assert_eq!(find_area(&tree, "Shared").unwrap().total.confirmed, 2);
    }

    #[test]
    fn test_direct_child_beats_own_descendant() {
        let tree = AreaRecord::new("Root").with_child(leaf("A", 1).with_child(leaf("A", 2)));
        assert_eq!(find_area(&tree, "A").unwrap().total.confirmed, 1);
    }

    #[test]
    fn test_first_sibling_subtree_wins_at_same_depth() {
        let tree = AreaRecord::new("Root")
            .with_child(AreaRecord::new("X").with_child(leaf("Dup", 1)))
            .with_child(AreaRecord::new("Y").with_child(leaf("Dup", 2)));
        assert_eq!(find_area(&tree, "Dup").unwrap().total.confirmed, 1);
    }

    #[test]
    fn test_deterministic() {
        let tree = sample();
        let first = find_area(&tree, "Shared").unwrap();
        for _ in 0..10 {
            assert!(std::ptr::eq(find_area(&tree, "Shared").unwrap(), first));
        }
    }

    #[test]
    fn test_path() {
        let tree = sample();
        let names = |path: Vec<&AreaRecord>| {
            path.into_iter().map(|a| a.name.clone()).collect::<Vec<_>>()
        };

        assert_eq!(names(find_area_path(&tree, "China").unwrap()), ["China"]);
        assert_eq!(
            names(find_area_path(&tree, "Nanshan").unwrap()),
            ["China", "Guangdong", "Shenzhen", "Nanshan"]
        );
        assert_eq!(names(find_area_path(&tree, "Shared").unwrap()), ["China", "Shared"]);
        assert!(find_area_path(&tree, "Atlantis").is_none());
    }

    #[test]
    fn test_take_agrees_with_find() {
        for name in ["China", "Hubei", "Wuhan", "Nanshan", "Shared", "Atlantis"] {
            let tree = sample();
            let expected = find_area(&tree, name).cloned();
            assert_eq!(take_area(sample(), name), expected, "mismatch for {}", name);
        }
    }
}
