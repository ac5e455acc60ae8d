//! # 命名空间层
//!
//! 目录树是命名的唯一事实来源。节点存放在一个 arena 中，
//! 父子关系通过 [`NodeId`] 表达；父节点独占其子节点，
//! 子节点只保留指向父节点的索引。
//!
//! 路径索引（路径 -> 节点）完全由目录树重建，只用于加速查找。

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use derive_more::{Display, From, Into};
use enumflags2::BitFlags;
use vfs::{DirEntry, DirEntryType, Error, Permission, Result};

use crate::NAME_MAX_LEN;

const SEPARATOR: char = '/';

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[display(fmt = "#{}", _0)]
#[repr(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: Self = Self(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    /// 文件节点必定绑定一个 inode，且没有子节点
    File { inode: u32 },
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    perm: BitFlags<Permission>,
}

impl Node {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn perm(&self) -> BitFlags<Permission> {
        self.perm
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    #[inline]
    pub fn inode(&self) -> Option<u32> {
        match self.kind {
            NodeKind::File { inode } => Some(inode),
            NodeKind::Directory => None,
        }
    }

    pub fn dir_entry(&self) -> DirEntry {
        DirEntry {
            inode: self.inode(),
            ty: if self.is_dir() {
                DirEntryType::Directory
            } else {
                DirEntryType::Regular
            },
            name: self.name.clone(),
        }
    }
}

/// 目录树
#[derive(Debug, Clone)]
pub struct Namespace {
    nodes: Vec<Option<Node>>,
    /// 可复用的空槽
    free: Vec<NodeId>,
    index: BTreeMap<String, NodeId>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// 只含根目录的目录树
    pub fn new() -> Self {
        let root = Node {
            name: String::new(),
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Directory,
            perm: BitFlags::all(),
        };
        let mut index = BTreeMap::new();
        index.insert(String::new(), NodeId::ROOT);

        Self {
            nodes: alloc::vec![Some(root)],
            free: Vec::new(),
            index,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)?.as_ref()
    }

    /// 存活的节点数，含根目录
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    pub fn create_directory(&mut self, name: &str, parent: NodeId) -> Result<NodeId> {
        self.insert(name, parent, NodeKind::Directory, BitFlags::all())
    }

    pub fn create_file_node(
        &mut self,
        name: &str,
        parent: NodeId,
        inode: u32,
        perm: BitFlags<Permission>,
    ) -> Result<NodeId> {
        self.insert(name, parent, NodeKind::File { inode }, perm)
    }

    /// 在父目录下按名字线性查找
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).is_some_and(|node| node.name == name))
    }

    /// 从 `from` 出发逐段解析相对路径，遇到缺失的段立即失败
    pub fn resolve_path(&self, from: NodeId, path: &str) -> Option<NodeId> {
        segments(path).try_fold(from, |node, name| self.find_child(node, name))
    }

    /// 通过路径索引查找绝对路径
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        self.index.get(&normalize(path)).copied()
    }

    /// 确认 `name` 可以作为 `parent` 的新子项
    pub fn check_insert(&self, parent: NodeId, name: &str) -> Result<()> {
        validate_name(name)?;
        let node = self.node(parent).ok_or(Error::NotFound)?;
        if !node.is_dir() {
            return Err(Error::NotADirectory);
        }
        if self.find_child(parent, name).is_some() {
            return Err(Error::AlreadyExists);
        }
        Ok(())
    }

    /// 确认 `id` 可以移动到 `parent` 下并改名为 `name`
    pub fn check_move(&self, id: NodeId, parent: NodeId, name: &str) -> Result<()> {
        if id == NodeId::ROOT {
            return Err(Error::InvalidPath);
        }
        self.node(id).ok_or(Error::NotFound)?;
        // 目录不能移动到自己的子树下
        if self.ancestors(parent).any(|ancestor| ancestor == id) {
            return Err(Error::InvalidPath);
        }
        self.check_insert(parent, name)
    }

    /// 把节点移动到 `parent` 下并改名，inode 绑定保持不变
    pub fn rename(&mut self, id: NodeId, parent: NodeId, name: &str) -> Result<()> {
        self.check_move(id, parent, name)?;

        self.detach(id);
        let node = self.node_mut(id).ok_or(Error::NotFound)?;
        node.name = String::from(name);
        node.parent = Some(parent);
        self.node_mut(parent)
            .ok_or(Error::NotFound)?
            .children
            .push(id);

        self.reindex();
        Ok(())
    }

    pub fn set_perm(&mut self, id: NodeId, perm: BitFlags<Permission>) -> Result<()> {
        self.node_mut(id).ok_or(Error::NotFound)?.perm = perm;
        Ok(())
    }

    /// 后序删除整棵子树：先子后父，`release` 在节点被释放前调用
    pub fn remove_subtree(&mut self, id: NodeId, mut release: impl FnMut(&Node)) -> Result<()> {
        if id == NodeId::ROOT {
            return Err(Error::InvalidPath);
        }
        self.node(id).ok_or(Error::NotFound)?;

        self.detach(id);
        self.release_subtree(id, &mut release);
        self.reindex();
        Ok(())
    }

    /// 子树内所有文件绑定的 inode，含 `id` 自身
    pub fn subtree_inodes(&self, id: NodeId) -> impl Iterator<Item = u32> + '_ {
        self.node(id)
            .and_then(Node::inode)
            .into_iter()
            .chain(self.walk(id).filter_map(|entry| entry.node.inode()))
    }

    /// 节点的绝对路径，根目录为 `/`
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .filter_map(|ancestor| self.node(ancestor))
            .filter(|node| node.parent.is_some())
            .map(|node| node.name.as_str())
            .collect();
        names.reverse();

        let mut path = String::new();
        for name in names {
            path.push(SEPARATOR);
            path.push_str(name);
        }
        if path.is_empty() {
            path.push(SEPARATOR);
        }
        path
    }

    /// 深度优先遍历 `id` 的全部后代，惰性、有限，可重复调用
    pub fn walk(&self, id: NodeId) -> Walk<'_> {
        let mut walk = Walk {
            namespace: self,
            stack: Vec::new(),
        };
        walk.push_children(id, 0);
        walk
    }

    /// 名字中包含 `term` 的后代
    pub fn search<'a>(&'a self, id: NodeId, term: &'a str) -> impl Iterator<Item = WalkEntry<'a>> {
        self.walk(id).filter(move |entry| entry.node.name.contains(term))
    }
}

impl Namespace {
    #[inline]
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    fn insert(
        &mut self,
        name: &str,
        parent: NodeId,
        kind: NodeKind,
        perm: BitFlags<Permission>,
    ) -> Result<NodeId> {
        self.check_insert(parent, name)?;

        let node = Node {
            name: String::from(name),
            parent: Some(parent),
            children: Vec::new(),
            kind,
            perm,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        self.node_mut(parent)
            .ok_or(Error::NotFound)?
            .children
            .push(id);

        let path = self.index_key(id);
        self.index.insert(path, id);
        Ok(id)
    }

    /// 从父节点的子项中摘除
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(Node::parent) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|&child| child != id);
        }
    }

    fn release_subtree(&mut self, id: NodeId, release: &mut impl FnMut(&Node)) {
        let children = self
            .node(id)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for child in children {
            self.release_subtree(child, release);
        }

        if let Some(node) = self.nodes[id.0].take() {
            release(&node);
            self.free.push(id);
        }
    }

    /// 自身及所有祖先，自下而上
    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(self.node(id).map(|_| id), |&id| {
            self.node(id).and_then(Node::parent)
        })
    }

    fn index_key(&self, id: NodeId) -> String {
        let path = self.path_of(id);
        String::from(path.trim_start_matches(SEPARATOR))
    }

    fn reindex(&mut self) {
        let mut index = BTreeMap::new();
        index.insert(String::new(), NodeId::ROOT);
        for entry in self.walk(NodeId::ROOT) {
            index.insert(self.index_key(entry.id), entry.id);
        }
        self.index = index;
    }
}

/// [`Namespace::walk`] 产生的项
#[derive(Debug, Clone, Copy)]
pub struct WalkEntry<'a> {
    pub id: NodeId,
    /// 相对起点的深度，直接子项为 0
    pub depth: usize,
    pub node: &'a Node,
}

pub struct Walk<'a> {
    namespace: &'a Namespace,
    stack: Vec<(NodeId, usize)>,
}

impl Walk<'_> {
    fn push_children(&mut self, id: NodeId, depth: usize) {
        if let Some(node) = self.namespace.node(id) {
            self.stack
                .extend(node.children.iter().rev().map(|&child| (child, depth)));
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = WalkEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, depth) = self.stack.pop()?;
            let Some(node) = self.namespace.node(id) else {
                continue;
            };
            self.push_children(id, depth + 1);
            return Some(WalkEntry { id, depth, node });
        }
    }
}

/// 拆出父目录路径与最后一段名字
pub fn split_path(path: &str) -> Result<(&str, &str)> {
    let path = path.trim_end_matches(SEPARATOR);
    let (parent, name) = path.rsplit_once(SEPARATOR).unwrap_or(("", path));
    validate_name(name)?;
    Ok((parent, name))
}

/// 去掉空段后以 `/` 连接，不含首尾分隔符
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    for name in segments(path) {
        if !normalized.is_empty() {
            normalized.push(SEPARATOR);
        }
        normalized.push_str(name);
    }
    normalized
}

#[inline]
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|name| !name.is_empty())
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.len() > NAME_MAX_LEN
        || name.contains(SEPARATOR)
        || name == "."
        || name == ".."
    {
        return Err(Error::InvalidPath);
    }
    Ok(())
}
