//! End-to-end instrumentation behavior through the script host.

use std::sync::{Arc, Mutex};

use waypoint_engine::{
    EngineError, FuncCallback, Identifier, Instrumenter, Value,
};
use waypoint_script::{ScriptError, ScriptHost};

fn host_with(source: &str, first_line: u32) -> (Instrumenter, ScriptHost) {
    static TRACING: std::sync::Once = std::sync::Once::new();
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });

    let instr = Instrumenter::new();
    let mut host = ScriptHost::new(&instr);
    host.load(source, first_line).unwrap();
    (instr, host)
}

#[test]
fn injected_assignment_changes_the_return_value() {
    let (instr, host) = host_with("fn f(x):\n    return x", 1);

    host.when("f").unwrap().at("return x").run("x = 1").unwrap();
    assert_eq!(host.call("f", &[Value::Int(2)]).unwrap(), Value::Int(1));

    instr.clear_all();
    assert_eq!(host.call("f", &[Value::Int(2)]).unwrap(), Value::Int(2));
}

#[test]
fn independent_handlers_compose() {
    let (instr, host) = host_with("fn add(x, y):\n    return x + y", 1);

    let first = host.when("add").unwrap().at(2_u32).run("x = 1").unwrap();
    host.when("add").unwrap().at(2_u32).run("y = 2").unwrap();

    let zeros = [Value::Int(0), Value::Int(0)];
    assert_eq!(host.call("add", &zeros).unwrap(), Value::Int(3));

    first[0].remove();
    assert_eq!(host.call("add", &zeros).unwrap(), Value::Int(2));

    instr.clear_all();
    assert_eq!(host.call("add", &zeros).unwrap(), Value::Int(0));
}

#[test]
fn condition_gates_firing_on_live_locals() {
    let (_instr, host) = host_with("fn f(x):\n    return x", 1);

    host.when("f")
        .unwrap()
        .at("return x")
        .condition_str("x == 0")
        .unwrap()
        .run("x = 100")
        .unwrap();

    assert_eq!(host.call("f", &[Value::Int(0)]).unwrap(), Value::Int(100));
    assert_eq!(host.call("f", &[Value::Int(5)]).unwrap(), Value::Int(5));
}

#[test]
fn offsets_count_from_the_header_past_decorators() {
    let source = "\
@traced
fn g(x):
    x = x * 2
    return x";
    let (_instr, host) = host_with(source, 10);

    // Header is line 11, so "+1" is the first body line.
    host.when("g").unwrap().at("+1").run("x = 5").unwrap();
    assert_eq!(host.call("g", &[Value::Int(1)]).unwrap(), Value::Int(10));
}

#[test]
fn identifier_tuples_intersect() {
    let source = "\
fn g(x):
    x = x * 2
    return x";
    let (_instr, host) = host_with(source, 1);

    host.when("g")
        .unwrap()
        .at_all([Identifier::Offset(1), Identifier::parse("x =")])
        .run("x = 7")
        .unwrap();
    assert_eq!(host.call("g", &[Value::Int(0)]).unwrap(), Value::Int(14));

    let err = host
        .when("g")
        .unwrap()
        .at_all([Identifier::Line(3), Identifier::parse("x = x")])
        .run("pass")
        .unwrap_err();
    assert!(matches!(err, EngineError::NoMatch { .. }));
}

#[test]
fn bare_registration_fires_on_every_line_in_order() {
    let source = "\
fn seq():
    a = 1
    b = 2
    c = 3
    return a";
    let (_instr, host) = host_with(source, 1);

    let visited = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&visited);
    host.when("seq")
        .unwrap()
        .call(FuncCallback::new(["_frame"], move |args| {
            let frame = args[0].frame().unwrap();
            sink.lock().unwrap().push(frame.line());
            Ok(None)
        }))
        .unwrap();

    host.call("seq", &[]).unwrap();
    assert_eq!(*visited.lock().unwrap(), [2, 3, 4, 5]);
}

#[test]
fn start_and_return_each_fire_once_per_call() {
    let (_instr, host) = host_with("fn f(x):\n    x = x + 1\n    return x", 1);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    host.when("f")
        .unwrap()
        .at("<start>")
        .call(FuncCallback::new(Vec::<&str>::new(), move |_| {
            sink.lock().unwrap().push("start");
            Ok(None)
        }))
        .unwrap();
    let sink = Arc::clone(&events);
    host.when("f")
        .unwrap()
        .at("<return>")
        .call(FuncCallback::new(Vec::<&str>::new(), move |_| {
            sink.lock().unwrap().push("return");
            Ok(None)
        }))
        .unwrap();

    host.call("f", &[Value::Int(0)]).unwrap();
    host.call("f", &[Value::Int(0)]).unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        ["start", "return", "start", "return"]
    );
}

#[test]
fn mixed_symbolic_and_line_identifiers_register_one_handler_each() {
    let (_instr, host) = host_with("fn f(x):\n    return x", 1);

    let handlers = host
        .when("f")
        .unwrap()
        .at("<start>")
        .at("<return>")
        .at("return x")
        .run("x = 1")
        .unwrap();
    assert_eq!(handlers.len(), 3);
}

#[test]
fn return_callbacks_observe_but_cannot_alter_the_value() {
    let (_instr, host) = host_with("fn f(x):\n    return x", 1);

    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    host.when("f")
        .unwrap()
        .at("<return>")
        .call(FuncCallback::new(["_retval"], move |args| {
            *sink.lock().unwrap() = args[0].value().cloned();
            Ok(None)
        }))
        .unwrap();
    // Mutating the local after the value is computed changes nothing.
    host.when("f")
        .unwrap()
        .at("<return>")
        .run("x = 99")
        .unwrap();

    assert_eq!(host.call("f", &[Value::Int(7)]).unwrap(), Value::Int(7));
    assert_eq!(*seen.lock().unwrap(), Some(Value::Int(7)));
}

#[test]
fn retval_outside_a_return_trigger_fails_at_fire_time() {
    let (_instr, host) = host_with("fn f(x):\n    return x", 1);

    host.when("f")
        .unwrap()
        .at("return x")
        .call(FuncCallback::new(["_retval"], |_| Ok(None)))
        .unwrap();

    let err = host.call("f", &[Value::Int(1)]).unwrap_err();
    assert_eq!(
        err,
        ScriptError::Engine(EngineError::RetvalOutsideReturn)
    );
}

#[test]
fn handler_lifecycle_controls_firing() {
    let (_instr, host) = host_with("fn f(x):\n    return x", 1);

    let handlers = host.when("f").unwrap().at("return x").run("x = 1").unwrap();
    let handler = &handlers[0];
    assert_eq!(host.call("f", &[Value::Int(5)]).unwrap(), Value::Int(1));

    handler.disable().unwrap();
    assert_eq!(host.call("f", &[Value::Int(5)]).unwrap(), Value::Int(5));

    handler.enable().unwrap();
    assert_eq!(host.call("f", &[Value::Int(5)]).unwrap(), Value::Int(1));

    handler.remove();
    assert_eq!(host.call("f", &[Value::Int(5)]).unwrap(), Value::Int(5));
    assert_eq!(handler.enable(), Err(EngineError::HandlerRemoved));
}

#[test]
fn goto_skips_the_intermediate_lines() {
    let source = "\
fn g(x):
    x = x + 1
    x = x + 10
    return x";
    let (_instr, host) = host_with(source, 1);

    host.when("g").unwrap().at(2_u32).goto("return x").unwrap();
    assert_eq!(host.call("g", &[Value::Int(5)]).unwrap(), Value::Int(5));
}

#[test]
fn registration_against_changed_source_is_rejected() {
    let (_instr, host) = host_with("fn f(x):\n    return x", 1);
    let hash = host.unit("f").unwrap().source_hash().unwrap();

    assert!(host
        .when("f")
        .unwrap()
        .at("return x")
        .verify_source(hash)
        .run("x = 1")
        .is_ok());

    let err = host
        .when("f")
        .unwrap()
        .at("return x")
        .verify_source("deadbeef")
        .run("x = 1")
        .unwrap_err();
    assert!(matches!(err, EngineError::StaleSource { .. }));
}

#[test]
fn unresolved_text_identifier_fails_registration() {
    let (_instr, host) = host_with("fn f(x):\n    return x", 1);
    let err = host
        .when("f")
        .unwrap()
        .at("y = 0")
        .run("x = 1")
        .unwrap_err();
    assert!(matches!(err, EngineError::NoMatch { .. }));
}

#[test]
fn pattern_identifiers_match_anchored() {
    let source = "\
fn g(x):
    x = x + 1
    y = x + 2
    return y";
    let (_instr, host) = host_with(source, 1);

    // "= x \+" occurs inside lines 2 and 3 but never at the start.
    let err = host
        .when("g")
        .unwrap()
        .at(regex::Regex::new(r"= x \+").unwrap())
        .run("pass")
        .unwrap_err();
    assert!(matches!(err, EngineError::NoMatch { .. }));

    host.when("g")
        .unwrap()
        .at(regex::Regex::new(r"x = x \+ \d").unwrap())
        .run("x = 40")
        .unwrap();
    assert_eq!(host.call("g", &[Value::Int(0)]).unwrap(), Value::Int(43));
}

#[test]
fn registration_races_with_execution() {
    let (instr, host) = host_with("fn f(x):\n    return x", 1);
    let host = Arc::new(host);

    let runner = {
        let host = Arc::clone(&host);
        std::thread::spawn(move || {
            for _ in 0..200 {
                let out = host.call("f", &[Value::Int(2)]).unwrap();
                assert!(out == Value::Int(2) || out == Value::Int(1));
            }
        })
    };
    for _ in 0..50 {
        let handlers = host.when("f").unwrap().at("return x").run("x = 1").unwrap();
        for handler in handlers {
            handler.remove();
        }
    }
    runner.join().unwrap();
    instr.clear_all();
}
