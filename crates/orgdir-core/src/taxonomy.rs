//! Category Tree Engine for the activity taxonomy.
//!
//! Activities form a forest of at most [`MAX_DEPTH`] levels. Every mutation
//! (insert, move, detach on delete) is validated here before anything is
//! committed, and the returned [`NodeUpdate`] list is the complete set of rows
//! a persistence backend must write to stay consistent with the tree.
//!
//! Backends load the current nodes into an [`ActivityTree`] inside the same
//! transaction (or lock) as the write, so the checks and the cascade see a
//! stable snapshot.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{DirectoryError, Result};

/// Deepest level a node may occupy. Roots are at depth 1.
pub const MAX_DEPTH: u8 = 3;

/// Longest accepted activity name, in characters.
pub const MAX_NAME_LEN: usize = 256;

/// A stored taxonomy node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub depth: u8,
}

/// A validated node that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub name: String,
    pub parent_id: Option<i64>,
    pub depth: u8,
}

/// One level of the materialized forest. Children are ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityTreeNode {
    pub id: i64,
    pub name: String,
    pub depth: u8,
    pub children: Vec<ActivityTreeNode>,
}

/// New placement of a single node produced by a move or a detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeUpdate {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub depth: u8,
}

/// In-memory adjacency index over the taxonomy.
#[derive(Debug, Clone, Default)]
pub struct ActivityTree {
    nodes: BTreeMap<i64, Activity>,
    children: BTreeMap<Option<i64>, BTreeSet<i64>>,
    /// Highest id ever indexed; survives removals so ids are never reissued.
    last_id: i64,
}

impl ActivityTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index already-stored nodes. No validation is performed; use
    /// [`ActivityTree::check_invariants`] to audit loaded data.
    #[must_use]
    pub fn from_nodes(nodes: impl IntoIterator<Item = Activity>) -> Self {
        let mut tree = Self::new();
        for node in nodes {
            tree.index(node);
        }
        tree
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Activity> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.nodes.values()
    }

    /// Direct children of `parent_id` (`None` for the roots), ordered by id.
    pub fn children_of(&self, parent_id: Option<i64>) -> impl Iterator<Item = &Activity> {
        self.children
            .get(&parent_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
    }

    /// Check that `name` can be added under `parent_id` and compute its depth.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::InvalidParameter`] for an empty or oversized name
    /// - [`DirectoryError::ParentNotFound`] if `parent_id` is unknown
    /// - [`DirectoryError::DepthExceeded`] if the parent is already at [`MAX_DEPTH`]
    /// - [`DirectoryError::DuplicateSibling`] if a sibling already uses the name
    pub fn validate_insert(&self, name: &str, parent_id: Option<i64>) -> Result<NewActivity> {
        let name = normalize_name(name)?;
        let depth = match parent_id {
            None => 1,
            Some(pid) => {
                let parent = self
                    .nodes
                    .get(&pid)
                    .ok_or(DirectoryError::ParentNotFound(pid))?;
                child_depth(parent.depth)?
            }
        };
        if self.sibling_named(parent_id, &name).is_some() {
            return Err(DirectoryError::DuplicateSibling { name, parent_id });
        }
        Ok(NewActivity {
            name,
            parent_id,
            depth,
        })
    }

    /// Record a node validated by [`ActivityTree::validate_insert`] under the
    /// id its backend assigned.
    pub fn attach(&mut self, id: i64, node: NewActivity) -> &Activity {
        self.index(Activity {
            id,
            name: node.name,
            parent_id: node.parent_id,
            depth: node.depth,
        });
        &self.nodes[&id]
    }

    /// Validate and add a node, assigning the next free id.
    ///
    /// # Errors
    ///
    /// Same as [`ActivityTree::validate_insert`].
    pub fn insert(&mut self, name: &str, parent_id: Option<i64>) -> Result<i64> {
        let node = self.validate_insert(name, parent_id)?;
        let id = self.next_id();
        self.attach(id, node);
        Ok(id)
    }

    /// The id [`ActivityTree::insert`] assigns next. Ids of removed nodes
    /// are never handed out again.
    #[must_use]
    pub fn next_id(&self) -> i64 {
        self.last_id + 1
    }

    /// Compute the writes needed to re-parent `node_id` under `new_parent_id`.
    ///
    /// The first update is always the moved node itself; it is followed by
    /// every descendant whose depth changes, in breadth-first order. Nothing
    /// is returned unless the whole cascade stays within [`MAX_DEPTH`].
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::NotFound`] if `node_id` is unknown
    /// - [`DirectoryError::SelfParent`] if `new_parent_id == node_id`
    /// - [`DirectoryError::ParentNotFound`] if the new parent is unknown
    /// - [`DirectoryError::CycleDetected`] if the new parent lies in the node's subtree
    /// - [`DirectoryError::DepthExceeded`] if the node or any descendant would pass [`MAX_DEPTH`]
    /// - [`DirectoryError::DuplicateSibling`] if the new parent already has a child with the same name
    pub fn plan_move(&self, node_id: i64, new_parent_id: Option<i64>) -> Result<Vec<NodeUpdate>> {
        let node = self.nodes.get(&node_id).ok_or(DirectoryError::NotFound {
            entity: "activity",
            id: node_id,
        })?;

        let depth = match new_parent_id {
            None => 1,
            Some(pid) if pid == node_id => return Err(DirectoryError::SelfParent(node_id)),
            Some(pid) => {
                let parent = self
                    .nodes
                    .get(&pid)
                    .ok_or(DirectoryError::ParentNotFound(pid))?;
                if self.ancestors(pid).any(|id| id == node_id) {
                    return Err(DirectoryError::CycleDetected {
                        node_id,
                        new_parent_id: pid,
                    });
                }
                child_depth(parent.depth)?
            }
        };

        if let Some(existing) = self.sibling_named(new_parent_id, &node.name) {
            if existing != node_id {
                return Err(DirectoryError::DuplicateSibling {
                    name: node.name.clone(),
                    parent_id: new_parent_id,
                });
            }
        }

        let mut updates = vec![NodeUpdate {
            id: node_id,
            parent_id: new_parent_id,
            depth,
        }];
        self.cascade(node_id, depth, &mut updates)?;
        Ok(updates)
    }

    /// Validate and apply a move. See [`ActivityTree::plan_move`].
    ///
    /// # Errors
    ///
    /// Same as [`ActivityTree::plan_move`]; the tree is unchanged on error.
    pub fn move_node(&mut self, node_id: i64, new_parent_id: Option<i64>) -> Result<Vec<NodeUpdate>> {
        let updates = self.plan_move(node_id, new_parent_id)?;
        self.apply(&updates);
        Ok(updates)
    }

    /// Compute the writes that turn every direct child of `node_id` into a
    /// root, re-deriving depths for their subtrees.
    ///
    /// `node_id` itself is expected to be deleted right after, so its own name
    /// does not count as a collision among the roots.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::NotFound`] if `node_id` is unknown
    /// - [`DirectoryError::DuplicateSibling`] if a child's name is already used by another root
    pub fn plan_detach_children(&self, node_id: i64) -> Result<Vec<NodeUpdate>> {
        if !self.contains(node_id) {
            return Err(DirectoryError::NotFound {
                entity: "activity",
                id: node_id,
            });
        }

        let mut updates = Vec::new();
        for child in self.children_of(Some(node_id)) {
            if let Some(root) = self.sibling_named(None, &child.name) {
                if root != node_id {
                    return Err(DirectoryError::DuplicateSibling {
                        name: child.name.clone(),
                        parent_id: None,
                    });
                }
            }
            updates.push(NodeUpdate {
                id: child.id,
                parent_id: None,
                depth: 1,
            });
            self.cascade(child.id, 1, &mut updates)?;
        }
        Ok(updates)
    }

    /// Validate and apply a detach. See [`ActivityTree::plan_detach_children`].
    ///
    /// # Errors
    ///
    /// Same as [`ActivityTree::plan_detach_children`].
    pub fn detach_children(&mut self, node_id: i64) -> Result<Vec<NodeUpdate>> {
        let updates = self.plan_detach_children(node_id)?;
        self.apply(&updates);
        Ok(updates)
    }

    /// Detach the children of `node_id`, then drop the node.
    ///
    /// # Errors
    ///
    /// Same as [`ActivityTree::plan_detach_children`].
    pub fn remove(&mut self, node_id: i64) -> Result<Vec<NodeUpdate>> {
        let updates = self.detach_children(node_id)?;
        if let Some(node) = self.nodes.remove(&node_id) {
            self.unlink(node.parent_id, node_id);
        }
        self.children.remove(&Some(node_id));
        Ok(updates)
    }

    /// Write a planned update list into the index.
    pub fn apply(&mut self, updates: &[NodeUpdate]) {
        for update in updates {
            let Some(node) = self.nodes.get_mut(&update.id) else {
                continue;
            };
            let old_parent = node.parent_id;
            node.parent_id = update.parent_id;
            node.depth = update.depth;
            if old_parent != update.parent_id {
                self.unlink(old_parent, update.id);
                self.children
                    .entry(update.parent_id)
                    .or_default()
                    .insert(update.id);
            }
        }
    }

    /// Ids in the subtree rooted at `node_id`. Unknown ids yield an empty set.
    #[must_use]
    pub fn subtree_ids(&self, node_id: i64, include_self: bool) -> BTreeSet<i64> {
        let mut ids = BTreeSet::new();
        if !self.contains(node_id) {
            return ids;
        }

        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            if !ids.insert(id) {
                continue;
            }
            if let Some(children) = self.children.get(&Some(id)) {
                stack.extend(children.iter().copied());
            }
        }

        if !include_self {
            ids.remove(&node_id);
        }
        ids
    }

    /// The whole taxonomy as a forest: roots ordered by id, children ordered by id.
    #[must_use]
    pub fn materialize(&self) -> Vec<ActivityTreeNode> {
        self.build_level(None, 1)
    }

    /// Audit every stored node against the taxonomy invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violation found:
    /// - [`DirectoryError::ParentNotFound`] for a dangling parent reference
    /// - [`DirectoryError::CycleDetected`] when a parent chain loops
    /// - [`DirectoryError::DepthExceeded`] for a depth outside `1..=MAX_DEPTH`
    /// - [`DirectoryError::InvalidParameter`] when a depth disagrees with its parent
    /// - [`DirectoryError::DuplicateSibling`] for a repeated name under one parent
    pub fn check_invariants(&self) -> Result<()> {
        for node in self.nodes.values() {
            if node.depth == 0 || node.depth > MAX_DEPTH {
                return Err(DirectoryError::DepthExceeded { depth: node.depth });
            }

            let expected = match node.parent_id {
                None => 1,
                Some(pid) => {
                    let parent = self
                        .nodes
                        .get(&pid)
                        .ok_or(DirectoryError::ParentNotFound(pid))?;
                    if self.ancestors(pid).any(|id| id == node.id) {
                        return Err(DirectoryError::CycleDetected {
                            node_id: node.id,
                            new_parent_id: pid,
                        });
                    }
                    parent.depth.saturating_add(1)
                }
            };
            if node.depth != expected {
                return Err(DirectoryError::invalid(format!(
                    "activity {} has depth {}, expected {expected}",
                    node.id, node.depth
                )));
            }
        }

        for (parent_id, ids) in &self.children {
            let mut names = BTreeSet::new();
            for node in ids.iter().filter_map(|id| self.nodes.get(id)) {
                if !names.insert(node.name.as_str()) {
                    return Err(DirectoryError::DuplicateSibling {
                        name: node.name.clone(),
                        parent_id: *parent_id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Parent chain of `id`, nearest first, starting with `id` itself.
    ///
    /// Stops after `len()` steps so corrupted data cannot loop forever.
    fn ancestors(&self, id: i64) -> impl Iterator<Item = i64> + '_ {
        let mut current = Some(id);
        let mut remaining = self.nodes.len() + 1;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let id = current?;
            current = self.nodes.get(&id).and_then(|node| node.parent_id);
            Some(id)
        })
    }

    /// Breadth-first depth recomputation below `root`, whose depth is `root_depth`.
    fn cascade(&self, root: i64, root_depth: u8, updates: &mut Vec<NodeUpdate>) -> Result<()> {
        let mut queue = VecDeque::from([(root, root_depth)]);
        let mut seen = BTreeSet::from([root]);
        while let Some((id, depth)) = queue.pop_front() {
            for child in self.children_of(Some(id)) {
                if !seen.insert(child.id) {
                    continue;
                }
                let depth = child_depth(depth)?;
                if child.depth != depth {
                    updates.push(NodeUpdate {
                        id: child.id,
                        parent_id: child.parent_id,
                        depth,
                    });
                }
                queue.push_back((child.id, depth));
            }
        }
        Ok(())
    }

    fn build_level(&self, parent_id: Option<i64>, level: u8) -> Vec<ActivityTreeNode> {
        // bounded by MAX_DEPTH even if stored rows are inconsistent
        if level > MAX_DEPTH {
            return Vec::new();
        }
        self.children_of(parent_id)
            .map(|node| ActivityTreeNode {
                id: node.id,
                name: node.name.clone(),
                depth: node.depth,
                children: self.build_level(Some(node.id), level + 1),
            })
            .collect()
    }

    fn sibling_named(&self, parent_id: Option<i64>, name: &str) -> Option<i64> {
        self.children_of(parent_id)
            .find(|node| node.name == name)
            .map(|node| node.id)
    }

    fn index(&mut self, node: Activity) {
        if let Some(previous) = self.nodes.get(&node.id) {
            let old_parent = previous.parent_id;
            self.unlink(old_parent, node.id);
        }
        self.children
            .entry(node.parent_id)
            .or_default()
            .insert(node.id);
        self.last_id = self.last_id.max(node.id);
        self.nodes.insert(node.id, node);
    }

    fn unlink(&mut self, parent_id: Option<i64>, id: i64) {
        if let Some(siblings) = self.children.get_mut(&parent_id) {
            siblings.remove(&id);
            if siblings.is_empty() {
                self.children.remove(&parent_id);
            }
        }
    }
}

/// Depth of a child placed under a node at `parent_depth`.
fn child_depth(parent_depth: u8) -> Result<u8> {
    if parent_depth >= MAX_DEPTH {
        return Err(DirectoryError::DepthExceeded {
            depth: parent_depth.saturating_add(1),
        });
    }
    Ok(parent_depth + 1)
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DirectoryError::invalid("activity name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DirectoryError::invalid(format!(
            "activity name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
#[path = "taxonomy_test.rs"]
mod tests;
