use duby_ast::arena::Arena;
use duby_ast::builder::AstBuilder;
use duby_ast::nodes::{DeclaredSignature, NodeId, NodeKind};
use duby_typer::errors::TypeCheckError;
use duby_typer::type_info::TypeInfo;
use duby_typer::typed_context::DelegationKind;

use crate::utils::{binary, find_node, infer_error, instantiate, script, try_infer};

/// ```text
/// class Point
///   def initialize(x:int, y:int); sum = x + y; end
///   def initialize(x:int); initialize(x, 0); end
/// end
/// Point.new(1)
/// ```
fn point_program() -> Arena {
    script("Points", |b, body| {
        let point = b.class_definition(body, "Point", None, |b, class| {
            Some(b.body(class, |b, members| {
                let full = b
                    .constructor(
                        members,
                        DeclaredSignature::new().param("x", "int").param("y", "int"),
                        |b, m| {
                            let args = b.required_arguments(m, &["x", "y"]);
                            let body = b.body(m, |b, body| {
                                vec![b.local_assignment(body, "sum", |b, asgn| {
                                    binary(
                                        b,
                                        asgn,
                                        "+",
                                        |b, c| b.local(c, "x"),
                                        |b, c| b.local(c, "y"),
                                    )
                                })]
                            });
                            (args, Some(body))
                        },
                    )
                    .unwrap();
                let short = b
                    .constructor(members, DeclaredSignature::new().param("x", "int"), |b, m| {
                        let args = b.required_arguments(m, &["x"]);
                        let body = b.body(m, |b, body| {
                            vec![b.functional_call(body, "initialize", |b, call| {
                                vec![b.local(call, "x"), b.fixnum(call, 0)]
                            })]
                        });
                        (args, Some(body))
                    })
                    .unwrap();
                vec![full, short]
            }))
        });
        let new = instantiate(b, body, "Point", |b, call| vec![b.fixnum(call, 1)]);
        vec![point, new]
    })
}

fn constructors(arena: &Arena) -> Vec<u32> {
    arena
        .methods()
        .into_iter()
        .filter(|(_, method)| method.is_constructor())
        .map(|(id, _)| id)
        .collect()
}

#[test]
fn test_same_class_delegation_is_resolved() -> anyhow::Result<()> {
    let arena = point_program();
    let &[full, short] = constructors(&arena).as_slice() else {
        panic!("Expected two constructors");
    };
    let ctx = try_infer(arena)?;
    let point = TypeInfo::object("Point");

    let delegation = ctx
        .constructor_delegation(short)
        .expect("the short constructor delegates");
    assert_eq!(delegation.kind, DelegationKind::This);
    assert_eq!(
        delegation.argument_types,
        vec![TypeInfo::int(), TypeInfo::int()]
    );
    let target = delegation.target.expect("delegation target is bound");
    assert_eq!(target.defining_class, point);
    assert_eq!(target.parameters, vec![TypeInfo::int(), TypeInfo::int()]);
    assert_eq!(target.return_type, TypeInfo::void());

    assert!(ctx.constructor_delegation(full).is_none());
    assert!(ctx.find_untyped_nodes().is_empty());
    Ok(())
}

#[test]
fn test_constructors_register_void_methods() -> anyhow::Result<()> {
    let ctx = try_infer(point_program())?;
    let point = TypeInfo::object("Point");
    for parameters in [vec![TypeInfo::int()], vec![TypeInfo::int(), TypeInfo::int()]] {
        let method = ctx
            .method_type(&point, "initialize", &parameters)
            .expect("constructor registered");
        assert_eq!(method.return_type, TypeInfo::void());
    }
    Ok(())
}

#[test]
fn test_new_yields_an_instance() -> anyhow::Result<()> {
    let arena = point_program();
    let new = find_node(&arena, |kind| matches!(kind, NodeKind::Call(c) if c.name == "new"));
    let ctx = try_infer(arena)?;
    assert_eq!(ctx.get_node_typeinfo(new), Some(TypeInfo::object("Point")));
    Ok(())
}

#[test]
fn test_new_requires_a_matching_constructor() {
    let arena = script("Points", |b, body| {
        let point = b.class_definition(body, "Point", None, |b, class| {
            Some(b.body(class, |b, members| {
                vec![b
                    .constructor(members, DeclaredSignature::new().param("x", "int"), |b, m| {
                        (b.required_arguments(m, &["x"]), None)
                    })
                    .unwrap()]
            }))
        });
        let new = b.at(5, 0).call(body, "new", |b, call| (b.constant(call, "Point"), vec![]));
        vec![point, new]
    });
    let error = infer_error(arena);
    assert!(
        error.to_string().contains("call to `new` at 5:0"),
        "a class with constructors gets no implicit one: {error}"
    );
}

#[test]
fn test_class_without_constructor_gets_implicit_one() -> anyhow::Result<()> {
    let arena = script("Empty", |b, body| {
        let class = b.class_definition(body, "Empty", None, |_, _| None);
        let new = instantiate(b, body, "Empty", |_, _| vec![]);
        vec![class, new]
    });
    let new = find_node(&arena, |kind| matches!(kind, NodeKind::Call(_)));
    let ctx = try_infer(arena)?;
    assert_eq!(ctx.get_node_typeinfo(new), Some(TypeInfo::object("Empty")));
    Ok(())
}

#[test]
fn test_super_delegation() -> anyhow::Result<()> {
    let arena = script("Hierarchy", |b, body| {
        let base = b.class_definition(body, "Base", None, |b, class| {
            Some(b.body(class, |b, members| {
                vec![b
                    .constructor(members, DeclaredSignature::new().param("x", "int"), |b, m| {
                        let args = b.required_arguments(m, &["x"]);
                        let body = b.body(m, |_, _| vec![]);
                        (args, Some(body))
                    })
                    .unwrap()]
            }))
        });
        let derived = b.class_definition(body, "Derived", Some("Base"), |b, class| {
            Some(b.body(class, |b, members| {
                vec![b
                    .constructor(members, DeclaredSignature::new().param("x", "int"), |b, m| {
                        let args = b.required_arguments(m, &["x"]);
                        let body = b.body(m, |b, body| {
                            vec![b.super_call(body, |b, call| vec![b.local(call, "x")])]
                        });
                        (args, Some(body))
                    })
                    .unwrap()]
            }))
        });
        vec![base, derived]
    });
    let derived_ctor = constructors(&arena)[1];
    let ctx = try_infer(arena)?;
    let delegation = ctx
        .constructor_delegation(derived_ctor)
        .expect("super delegation extracted");
    assert_eq!(delegation.kind, DelegationKind::Super);
    assert_eq!(delegation.argument_types, vec![TypeInfo::int()]);
    assert!(delegation.target.is_none(), "only same-class delegation binds a target");
    Ok(())
}

#[test]
fn test_delegation_without_matching_constructor_cannot_infer() {
    let arena = script("Points", |b, body| {
        vec![b.class_definition(body, "Point", None, |b, class| {
            Some(b.body(class, |b, members| {
                vec![b
                    .constructor(members, DeclaredSignature::new().param("x", "int"), |b, m| {
                        let args = b.required_arguments(m, &["x"]);
                        let body = b.body(m, |b, body| {
                            vec![b.functional_call(body, "initialize", |b, call| {
                                vec![b.string(call, "a"), b.string(call, "b")]
                            })]
                        });
                        (args, Some(body))
                    })
                    .unwrap()]
            }))
        })]
    });
    let error = infer_error(arena);
    let TypeCheckError::CannotInfer { unresolved } = error else {
        panic!("Expected CannotInfer");
    };
    assert!(
        unresolved
            .iter()
            .any(|node| node.description == "constructor `initialize`"),
        "unresolved: {unresolved:?}"
    );
}

/// ```text
/// class Base; def initialize(x:int); end; end
/// class Sub < Base; def initialize; <sub_body>; end; end
/// ```
fn base_and_sub<F, G>(sub_body: F, statements: G) -> Arena
where
    F: FnOnce(&mut AstBuilder<'_>, NodeId) -> Vec<NodeId>,
    G: FnOnce(&mut AstBuilder<'_>, NodeId) -> Vec<NodeId>,
{
    script("Hierarchy", |b, body| {
        let base = b.class_definition(body, "Base", None, |b, class| {
            Some(b.body(class, |b, members| {
                vec![b
                    .constructor(members, DeclaredSignature::new().param("x", "int"), |b, m| {
                        let args = b.required_arguments(m, &["x"]);
                        let body = b.body(m, |_, _| vec![]);
                        (args, Some(body))
                    })
                    .unwrap()]
            }))
        });
        let sub = b.class_definition(body, "Sub", Some("Base"), |b, class| {
            Some(b.body(class, |b, members| {
                vec![b
                    .constructor(members, DeclaredSignature::new(), |b, m| {
                        let args = b.no_arguments(m);
                        let body = b.body(m, sub_body);
                        (args, Some(body))
                    })
                    .unwrap()]
            }))
        });
        let mut all = vec![base, sub];
        all.extend(statements(b, body));
        all
    })
}

#[test]
fn test_delegation_does_not_bind_inherited_constructor() {
    let arena = base_and_sub(
        |b, body| {
            vec![b.functional_call(body, "initialize", |b, call| {
                vec![b.fixnum(call, 1)]
            })]
        },
        |_, _| vec![],
    );
    let error = infer_error(arena);
    let TypeCheckError::CannotInfer { unresolved } = error else {
        panic!("Expected CannotInfer, got {error:?}");
    };
    assert!(
        unresolved
            .iter()
            .any(|node| node.description == "constructor `initialize`"),
        "initialize(1) must name a constructor of Sub itself: {unresolved:?}"
    );
}

#[test]
fn test_constructors_are_not_inherited() {
    let arena = base_and_sub(
        |_, _| vec![],
        |b, body| vec![instantiate(b, body, "Sub", |b, call| vec![b.fixnum(call, 1)])],
    );
    let error = infer_error(arena);
    assert!(
        error.to_string().contains("call to `new`"),
        "Sub.new(1) has no Sub constructor taking int: {error}"
    );
}

#[test]
fn test_new_uses_constructor_of_instantiated_class() -> anyhow::Result<()> {
    let arena = base_and_sub(
        |_, _| vec![],
        |b, body| vec![instantiate(b, body, "Sub", |_, _| vec![])],
    );
    let new = find_node(&arena, |kind| matches!(kind, NodeKind::Call(c) if c.name == "new"));
    let ctx = try_infer(arena)?;
    assert_eq!(ctx.get_node_typeinfo(new), Some(TypeInfo::object("Sub")));
    Ok(())
}
