//! Scope tree shared by the analyzer and hosts that drive scopes themselves.
//!
//! Scopes, declarations and frames live in arenas owned by [`ScopeTree`]; everything else refers to
//! them by index. Ordinary identifiers and tags are separate namespaces in each scope.

use litfn_base::Span;
use litfn_syntax::ast::NodeId;
use litfn_syntax::types::{QualType, TagKind};
use litfn_syntax::TypeEnv;
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TagId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScopeKind {
    File,
    /// Parameters of a function definition or literal function.
    Parameters,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Storage {
    Automatic,
    Static,
    Thread,
    /// Functions, enumeration constants and typedef names.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclKind {
    Object,
    Function,
    EnumConstant,
    Typedef,
}

#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub ty: QualType,
    pub kind: DeclKind,
    pub storage: Storage,
    /// Enumeration constants, `constexpr` objects and `register` objects of `const` type.
    pub is_constant: bool,
    pub is_constexpr: bool,
    pub is_register: bool,
    /// Variably modified type, decided with the scope visible at the declaration.
    pub vm: bool,
    pub external_linkage: bool,
    pub scope: ScopeId,
    pub frame: FrameId,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagEntry {
    pub id: TagId,
    pub kind: TagKind,
    pub name: String,
    pub complete: bool,
    pub scope: ScopeId,
    pub frame: FrameId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub frame: FrameId,
    ordinary: FxHashMap<String, DeclId>,
    tags: FxHashMap<String, TagId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameKind {
    File,
    Function,
    Literal,
}

/// Function-like body: the file, a function definition or a literal function. Labels are owned by
/// frames, not scopes.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub parent: Option<FrameId>,
    /// Value of `__func__` inside the frame; empty for the file frame.
    pub func_name: String,
    pub labels: FxHashMap<String, Span>,
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    tags: Vec<TagEntry>,
    frames: Vec<Frame>,
    /// Tag specifiers already processed, so a specifier reached twice declares once.
    seen_tags: FxHashMap<NodeId, TagId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        let file_frame = Frame {
            kind: FrameKind::File,
            parent: None,
            func_name: String::new(),
            labels: FxHashMap::default(),
        };
        let file_scope = Scope {
            parent: None,
            kind: ScopeKind::File,
            frame: FrameId(0),
            ordinary: FxHashMap::default(),
            tags: FxHashMap::default(),
        };
        Self {
            scopes: vec![file_scope],
            decls: Vec::new(),
            tags: Vec::new(),
            frames: vec![file_frame],
            seen_tags: FxHashMap::default(),
        }
    }

    pub fn file_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn file_frame(&self) -> FrameId {
        FrameId(0)
    }

    pub fn push_frame(
        &mut self,
        kind: FrameKind,
        parent: FrameId,
        func_name: impl Into<String>,
    ) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame {
            kind,
            parent: Some(parent),
            func_name: func_name.into(),
            labels: FxHashMap::default(),
        });
        id
    }

    /// New scope nested in `parent`. A different `frame` starts a function-like body.
    pub fn push_scope(&mut self, parent: ScopeId, kind: ScopeKind, frame: FrameId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            kind,
            frame,
            ordinary: FxHashMap::default(),
            tags: FxHashMap::default(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    pub fn tag(&self, id: TagId) -> &TagEntry {
        &self.tags[id.0 as usize]
    }

    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0 as usize]
    }

    pub fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.0 as usize]
    }

    pub fn decls(&self) -> &[Declaration] {
        &self.decls
    }

    /// Declares an ordinary identifier in `decl.scope`, shadowing outer ones. The `id`, `scope`
    /// and `frame` fields of `decl` are filled in here.
    pub fn declare(&mut self, scope: ScopeId, mut decl: Declaration) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        decl.id = id;
        decl.scope = scope;
        decl.frame = self.scope(scope).frame;
        self.scopes[scope.0 as usize]
            .ordinary
            .insert(decl.name.clone(), id);
        self.decls.push(decl);
        id
    }

    pub fn declare_tag(
        &mut self,
        scope: ScopeId,
        kind: TagKind,
        name: &str,
        complete: bool,
        span: Span,
    ) -> TagId {
        let id = TagId(self.tags.len() as u32);
        let frame = self.scope(scope).frame;
        self.tags.push(TagEntry {
            id,
            kind,
            name: name.to_string(),
            complete,
            scope,
            frame,
            span,
        });
        self.scopes[scope.0 as usize]
            .tags
            .insert(name.to_string(), id);
        id
    }

    pub fn complete_tag(&mut self, id: TagId) {
        self.tags[id.0 as usize].complete = true;
    }

    /// Tag declared in exactly `scope`, without looking outward.
    pub fn local_tag(&self, scope: ScopeId, name: &str) -> Option<TagId> {
        self.scope(scope).tags.get(name).copied()
    }

    pub fn seen_tag(&self, node: NodeId) -> Option<TagId> {
        self.seen_tags.get(&node).copied()
    }

    pub fn mark_tag_seen(&mut self, node: NodeId, tag: TagId) {
        self.seen_tags.insert(node, tag);
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.ancestors(scope)
            .find_map(|id| self.scope(id).ordinary.get(name).copied())
    }

    pub fn lookup_tag(&self, scope: ScopeId, name: &str) -> Option<TagId> {
        self.ancestors(scope)
            .find_map(|id| self.scope(id).tags.get(name).copied())
    }

    /// `scope` followed by each enclosing scope up to file scope.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |id| self.scope(*id).parent)
    }

    pub fn frame_ancestors(&self, frame: FrameId) -> impl Iterator<Item = FrameId> + '_ {
        std::iter::successors(Some(frame), move |id| self.frame(*id).parent)
    }

    /// Whether `frame` is `outer` or nested inside it.
    pub fn frame_within(&self, frame: FrameId, outer: FrameId) -> bool {
        self.frame_ancestors(frame).any(|id| id == outer)
    }

    /// Ordinary names visible from `scope`, innermost first, each name once.
    pub fn visible_names(&self, scope: ScopeId) -> Vec<&str> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut names = Vec::new();
        for id in self.ancestors(scope) {
            let mut local: Vec<&str> = self
                .scope(id)
                .ordinary
                .keys()
                .map(String::as_str)
                .collect();
            local.sort_unstable();
            for name in local {
                if seen.insert(name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn view(&self, scope: ScopeId) -> ScopeView<'_> {
        ScopeView { tree: self, scope }
    }
}

/// The tree as seen from one scope; answers the classifier's questions about ordinary names.
#[derive(Clone, Copy)]
pub struct ScopeView<'a> {
    tree: &'a ScopeTree,
    scope: ScopeId,
}

impl TypeEnv for ScopeView<'_> {
    fn typedef_type(&self, name: &str) -> Option<QualType> {
        let decl = self.tree.decl(self.tree.lookup(self.scope, name)?);
        (decl.kind == DeclKind::Typedef).then(|| decl.ty.clone())
    }

    fn object_type(&self, name: &str) -> Option<QualType> {
        let decl = self.tree.decl(self.tree.lookup(self.scope, name)?);
        (decl.kind != DeclKind::Typedef).then(|| decl.ty.clone())
    }
}

/// Declaration with placeholder ids, for [`ScopeTree::declare`].
pub fn new_declaration(
    name: &str,
    ty: QualType,
    kind: DeclKind,
    storage: Storage,
    span: Span,
) -> Declaration {
    Declaration {
        id: DeclId(0),
        name: name.to_string(),
        ty,
        kind,
        storage,
        is_constant: false,
        is_constexpr: false,
        is_register: false,
        vm: false,
        external_linkage: false,
        scope: ScopeId(0),
        frame: FrameId(0),
        span,
    }
}
