use litfn_base::Span;
use litfn_syntax::types::{BasicType, CType, FunctionType, QualType, TagKind};
use litfn_syntax::TypeEnv;

use crate::scope::{new_declaration, DeclKind, FrameKind, ScopeKind, ScopeTree, Storage};

fn int() -> QualType {
    QualType::new(CType::Basic(BasicType::Int))
}

#[test]
fn lookup_walks_outward_and_inner_declarations_shadow() {
    let mut tree = ScopeTree::new();
    let file = tree.file_scope();
    let frame = tree.push_frame(FrameKind::Function, tree.file_frame(), "f");
    let params = tree.push_scope(file, ScopeKind::Parameters, frame);
    let body = tree.push_scope(params, ScopeKind::Block, frame);

    let global = tree.declare(
        file,
        new_declaration("x", int(), DeclKind::Object, Storage::Static, Span::default()),
    );
    assert_eq!(tree.lookup(body, "x"), Some(global));

    let local = tree.declare(
        body,
        new_declaration("x", int(), DeclKind::Object, Storage::Automatic, Span::default()),
    );
    assert_eq!(tree.lookup(body, "x"), Some(local));
    assert_eq!(tree.lookup(params, "x"), Some(global));
    assert_eq!(tree.decl(local).frame, frame);
    assert_eq!(tree.decl(local).scope, body);
    assert_eq!(tree.lookup(body, "y"), None);
}

#[test]
fn tags_and_ordinary_names_are_separate_namespaces() {
    let mut tree = ScopeTree::new();
    let file = tree.file_scope();
    let tag = tree.declare_tag(file, TagKind::Struct, "S", false, Span::default());
    tree.declare(
        file,
        new_declaration("S", int(), DeclKind::Object, Storage::Static, Span::default()),
    );
    assert_eq!(tree.lookup_tag(file, "S"), Some(tag));
    assert!(!tree.tag(tag).complete);
    tree.complete_tag(tag);
    assert!(tree.tag(tag).complete);
    assert_eq!(tree.view(file).object_type("S"), Some(int()));
    assert_eq!(tree.view(file).typedef_type("S"), None);
}

#[test]
fn frames_nest_and_labels_stay_with_their_frame() {
    let mut tree = ScopeTree::new();
    let function = tree.push_frame(FrameKind::Function, tree.file_frame(), "f");
    let literal = tree.push_frame(FrameKind::Literal, function, "f.literal.1");
    tree.frame_mut(function)
        .labels
        .insert("out".to_string(), Span::default());

    assert!(tree.frame_within(literal, function));
    assert!(!tree.frame_within(function, literal));
    assert!(!tree.frame(literal).labels.contains_key("out"));
    let chain: Vec<_> = tree.frame_ancestors(literal).collect();
    assert_eq!(chain, [literal, function, tree.file_frame()]);
}

#[test]
fn view_answers_typedef_questions() {
    let mut tree = ScopeTree::new();
    let file = tree.file_scope();
    let function = QualType::new(CType::Function(FunctionType {
        ret: Box::new(int()),
        params: Vec::new(),
        variadic: false,
    }));
    tree.declare(
        file,
        new_declaration("F", function.clone(), DeclKind::Typedef, Storage::None, Span::default()),
    );
    assert_eq!(tree.view(file).typedef_type("F"), Some(function));
    assert_eq!(tree.view(file).object_type("F"), None);
}

#[test]
fn visible_names_prefer_inner_scopes() {
    let mut tree = ScopeTree::new();
    let file = tree.file_scope();
    let inner = tree.push_scope(file, ScopeKind::Block, tree.file_frame());
    for (scope, name) in [(file, "b"), (file, "a"), (inner, "c"), (inner, "a")] {
        tree.declare(
            scope,
            new_declaration(name, int(), DeclKind::Object, Storage::Static, Span::default()),
        );
    }
    assert_eq!(tree.visible_names(inner), ["a", "c", "b"]);
}
