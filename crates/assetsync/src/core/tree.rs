//! Hierarchical asset manifest model
//!
//! An asset tree mirrors the remote directory layout: [`Group`]s are
//! directories holding an ordered list of children and [`Leaf`]s are files
//! with the content hash the manifest publishes for them.

use serde::{Deserialize, Serialize};

/// Files that exist on every mirror but are not listed in the manifest.
pub const UNLISTED_ITEMS: [&str; 2] = ["fingerprint.json", "version.number"];

/// A file entry in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    pub name: String,
    /// Lowercase hex digest published for the file, empty when unknown
    pub expected_hash: String,
}

impl Leaf {
    pub fn new<N: Into<String>, H: Into<String>>(name: N, expected_hash: H) -> Self {
        Self {
            name: name.into(),
            expected_hash: expected_hash.into(),
        }
    }

    /// Whether the manifest carries a hash to check this file against
    pub fn has_hash(&self) -> bool {
        !self.expected_hash.is_empty()
    }
}

/// A directory entry in the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub children: Vec<AssetNode>,
}

/// A node of the asset tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetNode {
    Group(Group),
    Leaf(Leaf),
}

impl AssetNode {
    pub fn name(&self) -> &str {
        match self {
            AssetNode::Group(group) => &group.name,
            AssetNode::Leaf(leaf) => &leaf.name,
        }
    }
}

impl Group {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_leaf(mut self, leaf: Leaf) -> Self {
        self.children.push(AssetNode::Leaf(leaf));
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.children.push(AssetNode::Group(group));
        self
    }

    /// Leaf children in manifest order
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.children.iter().filter_map(|child| match child {
            AssetNode::Leaf(leaf) => Some(leaf),
            AssetNode::Group(_) => None,
        })
    }

    /// Group children in manifest order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter().filter_map(|child| match child {
            AssetNode::Group(group) => Some(group),
            AssetNode::Leaf(_) => None,
        })
    }

    /// Find the child group called `name`, creating it at the end if absent
    pub fn group_mut(&mut self, name: &str) -> &mut Group {
        let index = self
            .children
            .iter()
            .position(|child| matches!(child, AssetNode::Group(g) if g.name == name));

        let index = match index {
            Some(index) => index,
            None => {
                self.children.push(AssetNode::Group(Group::new(name)));
                self.children.len() - 1
            }
        };

        match &mut self.children[index] {
            AssetNode::Group(group) => group,
            AssetNode::Leaf(_) => unreachable!("index points at a group"),
        }
    }

    /// Number of leaves in this group and all groups below it
    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                AssetNode::Leaf(_) => 1,
                AssetNode::Group(group) => group.leaf_count(),
            })
            .sum()
    }
}

/// A complete manifest tree, rooted at an unnamed group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetTree {
    root: Group,
}

impl AssetTree {
    pub fn new(root: Group) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    /// Append the well-known files that the manifest does not list to the
    /// root group. They carry no hash, so they are fetched on every run.
    pub fn add_unlisted_items(&mut self) {
        for name in UNLISTED_ITEMS {
            self.root.children.push(AssetNode::Leaf(Leaf::new(name, "")));
        }
    }

    pub fn with_unlisted_items(mut self) -> Self {
        self.add_unlisted_items();
        self
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }
}

impl From<Group> for AssetTree {
    fn from(root: Group) -> Self {
        Self::new(root)
    }
}

/// Join a POSIX relative directory and a name
pub fn join_posix(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// A bounded unit of download work: leaves of one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// POSIX path of the directory relative to the destination root
    pub dir: String,
    pub leaves: Vec<Leaf>,
}

impl Batch {
    pub fn new<D: Into<String>>(dir: D) -> Self {
        Self {
            dir: dir.into(),
            leaves: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Relative POSIX path of a leaf in this batch
    pub fn relative_path(&self, leaf: &Leaf) -> String {
        join_posix(&self.dir, &leaf.name)
    }
}
