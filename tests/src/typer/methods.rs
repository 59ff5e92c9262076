use duby_ast::nodes::{Arguments, DeclaredSignature, NodeKind};
use duby_typer::TyperBuilder;
use duby_typer::errors::{TypeCheckError, TypeMismatchContext};
use duby_typer::type_info::TypeInfo;
use duby_typer::type_lookup::{ClassCatalog, OBJECT, STRING};
use duby_typer::typer::Typer;

use crate::utils::{
    binary, call_named, find_node, infer_error, instantiate, method_named, one_liner, script,
    try_infer,
};

fn string() -> TypeInfo {
    TypeInfo::object(STRING)
}

mod return_types {
    use super::*;

    #[test]
    fn test_declared_supertype_accepts_body() -> anyhow::Result<()> {
        let arena = script("Names", |b, body| {
            vec![one_liner(
                b,
                body,
                "name",
                DeclaredSignature::new().returns("Object"),
                &[],
                |b, body| b.string(body, "duby"),
            )]
        });
        let method = method_named(&arena, "name");
        let ctx = try_infer(arena)?;
        assert_eq!(
            ctx.get_node_typeinfo(method),
            Some(TypeInfo::object(OBJECT)),
            "the declared type wins over the body type"
        );
        Ok(())
    }

    #[test]
    fn test_incompatible_body_is_a_mismatch() {
        let arena = script("Counts", |b, body| {
            vec![one_liner(
                b,
                body,
                "count",
                DeclaredSignature::new().returns("int"),
                &[],
                |b, body| b.string(body, "many"),
            )]
        });
        let error = infer_error(arena);
        assert!(
            matches!(
                &error,
                TypeCheckError::TypeMismatch {
                    context: TypeMismatchContext::MethodReturn { method_name },
                    ..
                } if method_name == "count"
            ),
            "Expected a return mismatch, got {error:?}"
        );
        let message = error.to_string();
        assert!(message.contains("expected `int`"), "message: {message}");
        assert!(message.contains("found `java.lang.String`"), "message: {message}");
    }

    #[test]
    fn test_declared_void_discards_body_value() -> anyhow::Result<()> {
        let arena = script("Logs", |b, body| {
            vec![one_liner(
                b,
                body,
                "log",
                DeclaredSignature::new().returns("void"),
                &[],
                |b, body| b.fixnum(body, 1),
            )]
        });
        let method = method_named(&arena, "log");
        let ctx = try_infer(arena)?;
        assert_eq!(ctx.get_node_typeinfo(method), Some(TypeInfo::void()));
        Ok(())
    }

    #[test]
    fn test_return_node_takes_value_type() -> anyhow::Result<()> {
        let arena = script("Early", |b, body| {
            vec![one_liner(
                b,
                body,
                "early",
                DeclaredSignature::new().param("x", "int"),
                &["x"],
                |b, body| b.return_node(body, |b, ret| Some(b.local(ret, "x"))),
            )]
        });
        let method = method_named(&arena, "early");
        let ctx = try_infer(arena)?;
        assert_eq!(ctx.get_node_typeinfo(method), Some(TypeInfo::int()));
        Ok(())
    }
}

mod static_methods {
    use super::*;

    fn util_program(on_instance: bool) -> duby_ast::arena::Arena {
        script("Statics", |b, body| {
            let util = b.class_definition(body, "Util", None, |b, class| {
                Some(b.body(class, |b, members| {
                    vec![b.static_method(
                        members,
                        "twice",
                        DeclaredSignature::new().param("x", "int").returns("int"),
                        |b, m| {
                            let args = b.required_arguments(m, &["x"]);
                            let body = b.body(m, |b, body| {
                                vec![binary(
                                    b,
                                    body,
                                    "*",
                                    |b, c| b.local(c, "x"),
                                    |b, c| b.fixnum(c, 2),
                                )]
                            });
                            (args, Some(body))
                        },
                    )]
                }))
            });
            let call = b.call(body, "twice", |b, call| {
                let target = if on_instance {
                    instantiate(b, call, "Util", |_, _| vec![])
                } else {
                    b.constant(call, "Util")
                };
                (target, vec![b.fixnum(call, 21)])
            });
            vec![util, call]
        })
    }

    #[test]
    fn test_static_method_belongs_to_meta_type() -> anyhow::Result<()> {
        let arena = util_program(false);
        let twice = method_named(&arena, "twice");
        let call = call_named(&arena, "twice");
        let ctx = try_infer(arena)?;

        let util = TypeInfo::object("Util");
        assert_eq!(ctx.defining_class(twice), Some(util.meta()));
        assert!(
            ctx.method_type(&util.meta(), "twice", &[TypeInfo::int()]).is_some(),
            "registered on the meta type"
        );
        assert!(
            ctx.method_type(&util, "twice", &[TypeInfo::int()]).is_none(),
            "not registered on instances"
        );
        assert_eq!(ctx.get_node_typeinfo(call), Some(TypeInfo::int()));
        Ok(())
    }

    #[test]
    fn test_static_method_is_not_found_on_instances() {
        let error = infer_error(util_program(true));
        let TypeCheckError::CannotInfer { unresolved } = error else {
            panic!("Expected CannotInfer");
        };
        assert!(
            unresolved
                .iter()
                .any(|node| node.description == "call to `twice`"),
            "unresolved: {unresolved:?}"
        );
    }

    #[test]
    fn test_self_in_static_method_is_meta() -> anyhow::Result<()> {
        let arena = script("Statics", |b, body| {
            vec![b.class_definition(body, "Factory", None, |b, class| {
                Some(b.body(class, |b, members| {
                    vec![b.static_method(members, "me", DeclaredSignature::new(), |b, m| {
                        let args = b.no_arguments(m);
                        let body = b.body(m, |b, body| vec![b.self_ref(body)]);
                        (args, Some(body))
                    })]
                }))
            })]
        });
        let me = method_named(&arena, "me");
        let ctx = try_infer(arena)?;
        assert_eq!(
            ctx.get_node_typeinfo(me),
            Some(TypeInfo::object("Factory").meta())
        );
        Ok(())
    }
}

mod overloads {
    use super::*;

    fn typed_echo<'a>(
        b: &mut duby_ast::builder::AstBuilder<'a>,
        parent: u32,
        name: &str,
        params: &[(&str, &str)],
        returns: &str,
    ) -> u32 {
        let mut signature = DeclaredSignature::new().returns(returns);
        for (param, ty) in params {
            signature = signature.param(param, ty);
        }
        let names: Vec<&str> = params.iter().map(|(param, _)| *param).collect();
        b.method(parent, name, signature, |b, m| {
            let args = b.required_arguments(m, &names);
            (args, None)
        })
    }

    fn class_with<F>(build: F) -> duby_ast::arena::Arena
    where
        F: FnOnce(&mut duby_ast::builder::AstBuilder<'_>, u32) -> Vec<u32>,
    {
        script("Overloads", |b, body| {
            vec![b.interface(body, "Printer", |b, interface| {
                Some(b.body(interface, build))
            })]
        })
    }

    #[test]
    fn test_overload_selected_by_argument_type() -> anyhow::Result<()> {
        let arena = class_with(|b, members| {
            vec![
                typed_echo(b, members, "show", &[("x", "int")], "int"),
                typed_echo(b, members, "show", &[("x", "String")], "String"),
            ]
        });
        let ctx = try_infer(arena)?;
        let printer = TypeInfo::object("Printer");
        assert_eq!(ctx.method_table().overloads(&printer, "show").len(), 2);
        assert_eq!(
            ctx.method_type(&printer, "show", &[string()])
                .map(|m| m.return_type.clone()),
            Some(string())
        );
        Ok(())
    }

    #[test]
    fn test_most_specific_overload_wins() -> anyhow::Result<()> {
        let arena = class_with(|b, members| {
            vec![
                typed_echo(b, members, "pick", &[("x", "Object")], "int"),
                typed_echo(b, members, "pick", &[("x", "String")], "boolean"),
            ]
        });
        let mut typer = Typer::new(arena);
        typer.infer_types()?;
        let printer = TypeInfo::object("Printer");

        let for_null = typer.method_type(&printer, "pick", &[TypeInfo::null()])?;
        assert_eq!(
            for_null.map(|m| m.return_type),
            Some(TypeInfo::boolean()),
            "`String` is more specific than `Object` for a null argument"
        );
        let for_int_array =
            typer.method_type(&printer, "pick", &[TypeInfo::array(TypeInfo::int())])?;
        assert_eq!(for_int_array.map(|m| m.return_type), Some(TypeInfo::int()));
        Ok(())
    }

    #[test]
    fn test_ambiguous_overloads_are_an_error() -> anyhow::Result<()> {
        let arena = class_with(|b, members| {
            vec![
                typed_echo(b, members, "amb", &[("a", "Object"), ("b", "String")], "int"),
                typed_echo(b, members, "amb", &[("a", "String"), ("b", "Object")], "int"),
            ]
        });
        let mut typer = Typer::new(arena);
        typer.infer_types()?;
        let error = typer
            .method_type(&TypeInfo::object("Printer"), "amb", &[string(), string()])
            .unwrap_err();
        assert!(matches!(error, TypeCheckError::AmbiguousMethod { .. }));
        assert!(
            error
                .to_string()
                .contains("ambiguous call to `Printer.amb` with arguments (java.lang.String, java.lang.String)"),
            "message: {error}"
        );
        Ok(())
    }

    #[test]
    fn test_conflicting_return_types_are_an_error() {
        let arena = class_with(|b, members| {
            vec![
                typed_echo(b, members, "f", &[("x", "int")], "int"),
                typed_echo(b, members, "f", &[("x", "int")], "String"),
            ]
        });
        let error = infer_error(arena);
        match error {
            TypeCheckError::ConflictingMethodType {
                name,
                existing,
                found,
                ..
            } => {
                assert_eq!(name, "f");
                assert_eq!(existing, TypeInfo::int());
                assert_eq!(found, string());
            }
            other => panic!("Expected ConflictingMethodType, got {other:?}"),
        }
    }

    #[test]
    fn test_inherited_method_found_on_superclass() -> anyhow::Result<()> {
        let arena = script("Inherit", |b, body| {
            let base = b.class_definition(body, "Base", None, |b, class| {
                Some(b.body(class, |b, members| {
                    vec![one_liner(
                        b,
                        members,
                        "greet",
                        DeclaredSignature::new().returns("String"),
                        &[],
                        |b, body| b.string(body, "hi"),
                    )]
                }))
            });
            let derived = b.class_definition(body, "Derived", Some("Base"), |_, _| None);
            let call = b.call(body, "greet", |b, call| {
                (instantiate(b, call, "Derived", |_, _| vec![]), vec![])
            });
            vec![base, derived, call]
        });
        let call = call_named(&arena, "greet");
        let ctx = try_infer(arena)?;
        assert_eq!(ctx.get_node_typeinfo(call), Some(string()));
        Ok(())
    }
}

mod optional_arguments {
    use super::*;

    #[test]
    fn test_optional_arguments_register_shorter_overloads() -> anyhow::Result<()> {
        let arena = script("Greeter", |b, body| {
            let short_call = b.functional_call(body, "greet", |b, c| vec![b.string(c, "duby")]);
            let greet = b.method(
                body,
                "greet",
                DeclaredSignature::new().param("name", "String"),
                |b, m| {
                    let args = b.arguments(m, |b, args| Arguments {
                        required: vec![b.required_argument(args, "name")],
                        optional: vec![b.optional_argument(args, "punct", |b, o| {
                            b.string(o, "!")
                        })],
                        ..Arguments::default()
                    });
                    let body = b.body(m, |b, body| {
                        vec![binary(
                            b,
                            body,
                            "+",
                            |b, c| b.local(c, "name"),
                            |b, c| b.local(c, "punct"),
                        )]
                    });
                    (args, Some(body))
                },
            );
            vec![short_call, greet]
        });
        let greet = method_named(&arena, "greet");
        let short_call = call_named(&arena, "greet");
        let ctx = try_infer(arena)?;

        let class = TypeInfo::object("Greeter").meta();
        assert_eq!(ctx.method_argument_types(greet), Some(&[string(), string()][..]));
        assert!(ctx.method_type(&class, "greet", &[string()]).is_some());
        assert!(ctx.method_type(&class, "greet", &[string(), string()]).is_some());
        assert_eq!(
            ctx.get_node_typeinfo(short_call),
            Some(string()),
            "a call may leave trailing optional arguments out"
        );
        Ok(())
    }

    #[test]
    fn test_default_value_must_match_declared_type() {
        let arena = script("Pads", |b, body| {
            vec![b.method(
                body,
                "pad",
                DeclaredSignature::new().param("width", "int"),
                |b, m| {
                    let args = b.arguments(m, |b, args| Arguments {
                        optional: vec![b.optional_argument(args, "width", |b, o| {
                            b.string(o, "wide")
                        })],
                        ..Arguments::default()
                    });
                    (args, None)
                },
            )]
        });
        let error = infer_error(arena);
        assert!(
            matches!(
                &error,
                TypeCheckError::TypeMismatch {
                    context: TypeMismatchContext::DefaultValue { argument_name },
                    ..
                } if argument_name == "width"
            ),
            "Expected a default value mismatch, got {error:?}"
        );
    }

    #[test]
    fn test_rest_argument_takes_declared_array_type() -> anyhow::Result<()> {
        let arena = script("Rest", |b, body| {
            vec![b.method(
                body,
                "all",
                DeclaredSignature::new().param("items", "String[]"),
                |b, m| {
                    let args = b.arguments(m, |b, args| Arguments {
                        rest: Some(b.rest_argument(args, "items")),
                        ..Arguments::default()
                    });
                    let body = b.body(m, |b, body| vec![b.local(body, "items")]);
                    (args, Some(body))
                },
            )]
        });
        let method = method_named(&arena, "all");
        let rest = find_node(&arena, |kind| matches!(kind, NodeKind::RestArgument(_)));
        let ctx = try_infer(arena)?;
        let strings = TypeInfo::array(string());
        assert_eq!(ctx.get_node_typeinfo(rest), Some(strings.clone()));
        assert_eq!(ctx.get_node_typeinfo(method), Some(strings));
        Ok(())
    }

    /// ```text
    /// def pick(first:int, second:int = 1, *more:int[]); first; end
    /// pick(1); pick(1, 2); pick(1, 2, 3, 4)
    /// ```
    #[test]
    fn test_optional_arguments_before_rest_argument() -> anyhow::Result<()> {
        let mut calls = Vec::new();
        let arena = script("Picks", |b, body| {
            let pick = b.method(
                body,
                "pick",
                DeclaredSignature::new()
                    .param("first", "int")
                    .param("second", "int")
                    .param("more", "int[]"),
                |b, m| {
                    let args = b.arguments(m, |b, args| Arguments {
                        required: vec![b.required_argument(args, "first")],
                        optional: vec![b.optional_argument(args, "second", |b, o| {
                            b.fixnum(o, 1)
                        })],
                        rest: Some(b.rest_argument(args, "more")),
                        ..Arguments::default()
                    });
                    let body = b.body(m, |b, body| vec![b.local(body, "first")]);
                    (args, Some(body))
                },
            );
            let mut statements = vec![pick];
            for count in [1, 2, 4] {
                let call = b.functional_call(body, "pick", |b, c| {
                    (1..=count).map(|value| b.fixnum(c, value)).collect()
                });
                calls.push(call);
                statements.push(call);
            }
            statements
        });
        let ctx = try_infer(arena)?;

        let class = TypeInfo::object("Picks").meta();
        let ints = TypeInfo::array(TypeInfo::int());
        assert!(
            ctx.method_type(&class, "pick", &[TypeInfo::int(), ints.clone()])
                .is_some(),
            "leaving the optional argument out keeps the rest array"
        );
        assert!(
            ctx.method_type(&class, "pick", &[TypeInfo::int(), TypeInfo::int(), ints])
                .is_some()
        );
        for call in calls {
            assert_eq!(
                ctx.get_node_typeinfo(call),
                Some(TypeInfo::int()),
                "call {call} should resolve"
            );
        }
        Ok(())
    }
}

mod declarations {
    use super::*;

    #[test]
    fn test_unknown_declared_type() {
        let arena = script("Unknown", |b, body| {
            vec![one_liner(
                b,
                body,
                "frob",
                DeclaredSignature::new().param("x", "Frobnicator"),
                &["x"],
                |b, body| b.local(body, "x"),
            )]
        });
        let error = infer_error(arena);
        assert!(
            matches!(&error, TypeCheckError::UnknownType { name, .. } if name == "Frobnicator"),
            "Expected UnknownType, got {error:?}"
        );
        assert!(error.to_string().contains("unknown type `Frobnicator`"));
    }

    #[test]
    fn test_declared_method_is_callable_before_its_definition() -> anyhow::Result<()> {
        let arena = script("Forward", |b, body| {
            let call = b.functional_call(body, "twice", |b, c| vec![b.fixnum(c, 2)]);
            let twice = one_liner(
                b,
                body,
                "twice",
                DeclaredSignature::new().param("x", "int").returns("int"),
                &["x"],
                |b, body| binary(b, body, "*", |b, c| b.local(c, "x"), |b, c| b.fixnum(c, 2)),
            );
            vec![call, twice]
        });
        let call = call_named(&arena, "twice");
        let mut typer = Typer::new(arena);
        typer.infer_types()?;
        assert_eq!(typer.passes(), 0, "no pass needed after the first traversal");
        assert_eq!(
            typer.context().get_node_typeinfo(call),
            Some(TypeInfo::int())
        );
        Ok(())
    }

    #[test]
    fn test_forward_reference_to_class() -> anyhow::Result<()> {
        let arena = script("Forward", |b, body| {
            let make = one_liner(
                b,
                body,
                "make",
                DeclaredSignature::new().returns("Widget"),
                &[],
                |b, body| instantiate(b, body, "Widget", |_, _| vec![]),
            );
            let widget = b.class_definition(body, "Widget", None, |_, _| None);
            vec![make, widget]
        });
        let make = method_named(&arena, "make");
        let ctx = try_infer(arena)?;
        assert_eq!(ctx.get_node_typeinfo(make), Some(TypeInfo::object("Widget")));
        Ok(())
    }
}

mod library {
    use super::*;

    #[test]
    fn test_methods_from_the_class_catalog() -> anyhow::Result<()> {
        let list = TypeInfo::object("java.util.ArrayList");
        let math = TypeInfo::object("java.lang.Math");
        let catalog = ClassCatalog::new()
            .with_class("java.util.ArrayList", Some(OBJECT))
            .with_method(&list, "size", vec![], TypeInfo::int())
            .with_class("java.lang.Math", Some(OBJECT))
            .with_method(&math.meta(), "abs", vec![TypeInfo::int()], TypeInfo::int());
        let arena = script("Library", |b, body| {
            vec![
                b.call(body, "size", |b, call| {
                    (instantiate(b, call, "java.util.ArrayList", |_, _| vec![]), vec![])
                }),
                b.call(body, "abs", |b, call| {
                    (b.constant(call, "java.lang.Math"), vec![b.fixnum(call, -3)])
                }),
            ]
        });
        let size = call_named(&arena, "size");
        let abs = call_named(&arena, "abs");
        let ctx = TyperBuilder::new()
            .with_lookup(Box::new(catalog))
            .build_typed_context(arena)?
            .typed_context();
        assert_eq!(ctx.get_node_typeinfo(size), Some(TypeInfo::int()));
        assert_eq!(ctx.get_node_typeinfo(abs), Some(TypeInfo::int()));
        Ok(())
    }

    #[test]
    fn test_string_concatenation() -> anyhow::Result<()> {
        let arena = script("Concat", |b, body| {
            vec![binary(
                b,
                body,
                "+",
                |b, c| b.string(c, "n = "),
                |b, c| b.fixnum(c, 1),
            )]
        });
        let call = call_named(&arena, "+");
        let ctx = try_infer(arena)?;
        assert_eq!(ctx.get_node_typeinfo(call), Some(string()));
        Ok(())
    }

    #[test]
    fn test_numeric_promotion() -> anyhow::Result<()> {
        let arena = script("Numbers", |b, body| {
            vec![binary(
                b,
                body,
                "*",
                |b, c| b.fixnum(c, 2),
                |b, c| b.float(c, 1.5),
            )]
        });
        let call = call_named(&arena, "*");
        let ctx = try_infer(arena)?;
        assert_eq!(
            ctx.get_node_typeinfo(call).map(|ty| ty.to_string()),
            Some("double".to_string())
        );
        Ok(())
    }
}
