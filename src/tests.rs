//! End-to-end tests: registration through execution, error modes,
//! plugins, and clone isolation.

use crate::engine::{Engine, ErrorMode};
use crate::errors::{EngineError, EngineResult};
use crate::output::OutputFormat;
use crate::types::TypeDef;
use crate::value::Value;

/// Engine with a structural "to equal" and the scaffolding the
/// error-mode scenarios build on.
fn base_engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .add_assertion(&["to equal"], |ctx| {
            let expected = ctx.arg(0).cloned().unwrap_or(Value::Null);
            if ctx.engine().equal(ctx.subject(), &expected)? {
                Ok(())
            } else {
                ctx.fail("mismatch", &[])
            }
        })
        .unwrap();
    engine
}

fn failure_message(result: EngineResult<()>) -> String {
    match result {
        Err(EngineError::Failure(failure)) => failure.message().to_string(),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_error_mode_nested_shows_both_messages() {
    let mut engine = base_engine();
    engine
        .add_assertion(&["to be foo"], |ctx| {
            ctx.set_error_mode(ErrorMode::Nested);
            let subject = ctx.subject().clone();
            ctx.expect(subject, "to equal", &[Value::from("foo")])
        })
        .unwrap();

    let message = failure_message(engine.expect("bar", "to be foo", &[]));
    insta::assert_snapshot!(message, @r###"
    expected bar to be foo
      expected bar to equal foo
    "###);
}

#[test]
fn test_error_mode_default_shows_outer_message_only() {
    let mut engine = base_engine();
    engine
        .add_assertion(&["to be foo"], |ctx| {
            ctx.set_error_mode(ErrorMode::Default);
            let subject = ctx.subject().clone();
            ctx.expect(subject, "to equal", &[Value::from("foo")])
        })
        .unwrap();

    let message = failure_message(engine.expect("bar", "to be foo", &[]));
    assert_eq!(message, "expected bar to be foo");
}

#[test]
fn test_error_mode_bubble_shows_inner_message_verbatim() {
    let mut engine = base_engine();
    engine
        .add_assertion(&["to be foo"], |ctx| {
            ctx.set_error_mode(ErrorMode::Bubble);
            let subject = ctx.subject().clone();
            ctx.expect(subject, "to equal", &[Value::from("foo")])
        })
        .unwrap();

    let message = failure_message(engine.expect("bar", "to be foo", &[]));
    assert_eq!(message, "expected bar to equal foo");
}

#[test]
fn test_error_modes_compose_across_levels() {
    let mut engine = base_engine();
    engine
        .add_assertion(&["to be foo"], |ctx| {
            ctx.set_error_mode(ErrorMode::Nested);
            let subject = ctx.subject().clone();
            ctx.expect(subject, "to equal", &[Value::from("foo")])
        })
        .unwrap();
    engine
        .add_assertion(&["to contain foo"], |ctx| {
            ctx.set_error_mode(ErrorMode::Nested);
            let subject = ctx.subject().clone();
            ctx.expect(subject, "to be foo", &[])
        })
        .unwrap();

    let message = failure_message(engine.expect("bar", "to contain foo", &[]));
    insta::assert_snapshot!(message, @r###"
    expected bar to contain foo
      expected bar to be foo
        expected bar to equal foo
    "###);
}

#[test]
fn test_suggestions_on_unknown_phrase() {
    let engine = base_engine();
    let err = engine.expect("x", "to eqal", &[]).unwrap_err();
    match err {
        EngineError::UnknownAssertion { suggestions, .. } => {
            assert_eq!(suggestions[0], "to equal");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_plugin_installation() {
    let mut engine = Engine::new();
    engine
        .install_plugin(|engine| {
            engine.add_assertion(&["to be ok"], |ctx| {
                if matches!(ctx.subject(), Value::Bool(true)) {
                    Ok(())
                } else {
                    ctx.fail("not ok", &[])
                }
            })?;
            engine.add_type(TypeDef::new("boolean").identify(|v| v.is_bool()))?;
            Ok(())
        })
        .unwrap();

    engine.expect(true, "to be ok", &[]).unwrap();
    assert!(engine.expect(false, "to be ok", &[]).is_err());
    assert!(engine.get_type("boolean").is_some());
}

#[test]
fn test_clone_isolation() {
    let original = base_engine();
    let mut cloned = original.clone();
    cloned
        .add_assertion(&["to be cloned"], |_| Ok(()))
        .unwrap();
    cloned
        .add_type(TypeDef::new("extra").identify(|v| v.is_null()))
        .unwrap();

    // The clone sees everything; the original is untouched.
    cloned.expect(1, "to be cloned", &[]).unwrap();
    cloned.expect(1, "to equal", &[Value::from(1)]).unwrap();
    assert!(matches!(
        original.expect(1, "to be cloned", &[]),
        Err(EngineError::UnknownAssertion { .. })
    ));
    assert!(original.get_type("extra").is_none());
    assert!(cloned.get_type("extra").is_some());
}

#[test]
fn test_clone_keeps_existing_registrations() {
    let original = base_engine();
    let cloned = original.clone();
    cloned.expect(7, "to equal", &[Value::from(7)]).unwrap();
}

#[test]
fn test_type_dispatch_prefers_later_derived_type() {
    let mut engine = base_engine();
    engine
        .add_type(
            TypeDef::new("number")
                .identify(|v| v.is_number())
                .inspect(|out, v, _, _| out.text(format!("number({})", v.raw_text()))),
        )
        .unwrap();
    engine
        .add_type(
            TypeDef::new("integer")
                .base("number")
                .identify(|v| matches!(v, Value::Number(n) if n.fract() == 0.0)),
        )
        .unwrap();

    // The derived type matches first and inherits the base inspection.
    let message = failure_message(engine.expect(4, "to equal", &[Value::from(5)]));
    assert_eq!(message, "expected number(4) to equal number(5)");

    let resolved = engine.get_type("integer").unwrap();
    assert!(resolved.identifies(&Value::from(4)));
    assert!(!resolved.identifies(&Value::from(0.5)));
}

#[test]
fn test_registered_equality_drives_assertions() {
    let mut engine = base_engine();
    // Case-insensitive text equality.
    engine
        .add_type(
            TypeDef::new("text")
                .identify(|v| v.is_text())
                .equal(|a, b, _| {
                    Ok(matches!(
                        (a, b),
                        (Value::Text(x), Value::Text(y)) if x.eq_ignore_ascii_case(y)
                    ))
                }),
        )
        .unwrap();

    engine.expect("Foo", "to equal", &[Value::from("foo")]).unwrap();
    assert!(engine.expect("Foo", "to equal", &[Value::from("bar")]).is_err());
}

#[test]
fn test_sanitize_through_engine() {
    let engine = Engine::new();
    let value = Value::record(vec![
        ("b".to_string(), Value::from(1)),
        ("a".to_string(), Value::sequence(vec![Value::from(true)])),
    ]);
    assert_eq!(
        serde_json::to_string(&engine.sanitize(&value)).unwrap(),
        r#"{"a":[true],"b":1}"#
    );
}

#[test]
fn test_inspect_through_engine() {
    let engine = Engine::new();
    let value = Value::sequence(vec![Value::from(1), Value::from("two")]);
    let rendered = engine
        .inspect(&value, None)
        .render(engine.output_format());
    assert_eq!(rendered, "[1, two]");
}

#[test]
fn test_output_format_setting_round_trips() {
    let mut engine = Engine::new();
    assert_eq!(engine.output_format(), OutputFormat::Text);
    engine.set_output_format("ansi".parse().unwrap());
    assert_eq!(engine.output_format(), OutputFormat::Ansi);
}

#[test]
fn test_display_listing_survives_flag_expansion() {
    let mut engine = Engine::new();
    engine
        .add_assertion(&["to [not] be ok"], |_| Ok(()))
        .unwrap();
    insta::assert_snapshot!(engine.to_string(), @r###"
    to be ok
    to not be ok
    "###);
}

#[test]
fn test_handler_flags_follow_matched_phrase() {
    let mut engine = Engine::new();
    engine
        .add_assertion(&["to [not] be empty"], |ctx| {
            let empty = match ctx.subject() {
                Value::Text(s) => s.is_empty(),
                Value::Sequence(items) => items.borrow().is_empty(),
                _ => false,
            };
            if empty != ctx.flag("not") {
                Ok(())
            } else {
                ctx.fail("emptiness mismatch", &[])
            }
        })
        .unwrap();

    engine.expect("", "to be empty", &[]).unwrap();
    engine.expect("x", "to not be empty", &[]).unwrap();
    assert!(engine.expect("x", "to be empty", &[]).is_err());
}
