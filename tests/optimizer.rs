//! Integration tests for local slot coalescing.
//!
//! Every scenario builds a method body with the assembler, runs the optimizer
//! through the public API, and checks the resulting slot assignment against
//! the liveness of the original body.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use slotopt::prelude::*;

/// Asserts that no two slots sharing a new slot were ever alive together.
fn assert_no_conflicts(original: &Liveness, map: &VariableMap) {
    for offset in 0..original.code_length() {
        for (table, what) in [
            (original.alive_before(offset), "before"),
            (original.alive_after(offset), "after"),
        ] {
            let Some(alive) = table else { continue };
            let slots: Vec<u16> = alive.iter().map(|slot| slot as u16).collect();
            for (i, &a) in slots.iter().enumerate() {
                for &b in &slots[i + 1..] {
                    assert_ne!(
                        map.get(a),
                        map.get(b),
                        "slots {a} and {b} are both alive {what} offset {offset} but share v{}",
                        map.get(a)
                    );
                }
            }
        }
    }
}

/// Optimizes `body` and checks the result against the original liveness.
fn optimize_checked(optimizer: &VariableOptimizer, body: &mut MethodBody) -> Result<VariableMap> {
    let liveness = LivenessAnalyzer::analyze(body)?;
    let map = optimizer.compute_variable_map(body, &liveness)?;
    assert_no_conflicts(&liveness, &map);

    let changed = optimizer.optimize(body)?;
    assert_eq!(changed, !map.is_identity());
    Ok(map)
}

/// `void f(int p) { int a = 1; use(a); int b = 2; use(b + p); }`
fn temporaries() -> Result<MethodBody> {
    let mut asm = MethodAssembler::new_instance("f", "(I)V");
    asm.label("start")?
        .iconst(1)?
        .istore(2)?
        .iload(2)?
        .invoke(1)?
        .iconst(2)?
        .istore(3)?
        .iload(3)?
        .iload(1)?
        .add(ValueKind::Int)?
        .invoke(1)?
        .return_void()?
        .label("end")?;
    asm.local_variable("this", "LFoo;", 0, "start", "end")
        .local_variable("p", "I", 1, "start", "end")
        .local_variable("a", "I", 2, "start", "end")
        .local_variable("b", "I", 3, "start", "end")
        .local_variable_type("b", "TT;", 3, "start", "end");
    asm.finish()
}

/// `static void f() { int x = 1; use(x); int y = 2; use(y); }`
fn disjoint_pair(name: &str) -> Result<MethodBody> {
    let mut asm = MethodAssembler::new_static(name, "()V");
    asm.iconst(1)?
        .istore(0)?
        .iload(0)?
        .pop()?
        .iconst(2)?
        .istore(1)?
        .iload(1)?
        .pop()?
        .return_void()?;
    asm.finish()
}

#[test]
fn test_disjoint_temporaries_share_a_slot() -> Result<()> {
    let mut body = temporaries()?;
    assert_eq!(body.max_locals, 4);

    let map = optimize_checked(&VariableOptimizer::new(), &mut body)?;
    assert_eq!(map.as_slice(), &[0, 1, 2, 2]);
    assert_eq!(body.max_locals, 3);

    // istore_3 / iload_3 now address slot 2.
    assert_eq!(body.instructions[5].local_slot(), Some(2));
    assert_eq!(body.instructions[6].local_slot(), Some(2));
    // The parameter load is untouched.
    assert_eq!(body.instructions[7].local_slot(), Some(1));
    Ok(())
}

#[test]
fn test_debug_tables_are_remapped_and_trimmed() -> Result<()> {
    let mut body = temporaries()?;
    VariableOptimizer::new().optimize(&mut body)?;

    let entries: Vec<(&str, u16, u32, u32)> = body
        .local_variables
        .iter()
        .map(|v| (v.name.as_str(), v.slot, v.start, v.end()))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("this", 0, 0, 15),
            ("p", 1, 0, 15),
            ("a", 2, 2, 3),
            ("b", 2, 8, 9),
        ]
    );

    assert_eq!(body.local_variable_types.len(), 1);
    assert_eq!(body.local_variable_types[0].slot, 2);
    assert_eq!(body.local_variable_types[0].start, 8);
    body.validate()?;
    Ok(())
}

#[test]
fn test_untrimmed_debug_tables_keep_their_ranges() -> Result<()> {
    let mut body = temporaries()?;
    let optimizer =
        VariableOptimizer::with_config(OptimizerConfig::new().with_local_variable_trimming(false));
    assert!(optimizer.optimize(&mut body)?);

    let b = &body.local_variables[3];
    assert_eq!((b.slot, b.start, b.end()), (2, 0, 15));
    Ok(())
}

#[test]
fn test_trimmed_entries_never_overlap_in_a_slot() -> Result<()> {
    // static void f() { int a = 1; use(a); int b = 2; use(b); a = 3; use(a); }
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.label("start")?
        .iconst(1)?
        .istore(0)?
        .iload(0)?
        .pop()?
        .iconst(2)?
        .istore(1)?
        .iload(1)?
        .pop()?
        .iconst(3)?
        .istore(0)?
        .iload(0)?
        .pop()?
        .return_void()?
        .label("end")?;
    asm.local_variable("a", "I", 0, "start", "end")
        .local_variable("b", "I", 1, "start", "end");
    let mut body = asm.finish()?;

    let map = optimize_checked(&VariableOptimizer::new(), &mut body)?;
    assert_eq!(map.as_slice(), &[0, 0]);
    assert_eq!(body.max_locals, 1);

    let entries: Vec<(&str, u16, u32, u32)> = body
        .local_variables
        .iter()
        .map(|v| (v.name.as_str(), v.slot, v.start, v.end()))
        .collect();
    assert_eq!(
        entries,
        vec![("a", 0, 2, 3), ("a", 0, 10, 11), ("b", 0, 6, 7)]
    );

    for (i, x) in body.local_variables.iter().enumerate() {
        for y in &body.local_variables[i + 1..] {
            assert!(
                x.slot != y.slot || x.end() <= y.start || y.end() <= x.start,
                "{} [{}, {}) and {} [{}, {}) share slot {}",
                x.name,
                x.start,
                x.end(),
                y.name,
                y.start,
                y.end(),
                x.slot
            );
        }
    }
    body.validate()?;
    Ok(())
}

#[test]
fn test_parameters_never_move() -> Result<()> {
    // static void f(int a, long b, int c) { int t = 1; use(t); }
    let mut asm = MethodAssembler::new_static("f", "(IJI)V");
    asm.iconst(1)?
        .istore(4)?
        .iload(4)?
        .pop()?
        .return_void()?;
    let mut body = asm.finish()?;
    assert_eq!(body.parameter_size()?, 4);

    let map = optimize_checked(&VariableOptimizer::new(), &mut body)?;
    assert_eq!(map.as_slice(), &[0, 1, 2, 3, 0]);
    // The frame still holds every parameter.
    assert_eq!(body.max_locals, 4);
    Ok(())
}

#[test]
fn test_idempotent() -> Result<()> {
    let optimizer = VariableOptimizer::new();
    for mut body in [temporaries()?, disjoint_pair("g")?] {
        assert!(optimizer.optimize(&mut body)?);
        let once = body.clone();
        assert!(!optimizer.optimize(&mut body)?);
        assert_eq!(body, once);
    }
    Ok(())
}

#[test]
fn test_trivial_methods_are_untouched() -> Result<()> {
    let optimizer = VariableOptimizer::new();

    let mut asm = MethodAssembler::new_static("empty", "()V");
    asm.return_void()?;
    let mut empty = asm.finish()?;

    let mut asm = MethodAssembler::new_instance("identity", "(I)I");
    asm.iload(1)?.return_value(ValueKind::Int)?;
    let mut params_only = asm.finish()?;

    // static int f() { int a = 1; int b = 2; return a + b; }
    let mut asm = MethodAssembler::new_static("overlap", "()I");
    asm.iconst(1)?
        .istore(0)?
        .iconst(2)?
        .istore(1)?
        .iload(0)?
        .iload(1)?
        .add(ValueKind::Int)?
        .return_value(ValueKind::Int)?;
    let mut overlapping = asm.finish()?;

    for body in [&mut empty, &mut params_only, &mut overlapping] {
        let copy = body.clone();
        assert!(!optimizer.optimize(body)?);
        assert_eq!(*body, copy);
    }
    Ok(())
}

#[test]
fn test_loop_carried_variable_stays_alive() -> Result<()> {
    // static void f() {
    //     for (int i = 0; i < 10; i++) { int t = 1; use(t); }
    // }
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.iconst(0)?
        .istore(0)?
        .label("loop")?
        .iload(0)?
        .iconst(10)?
        .if_icmpge("end")?
        .iinc(0, 1)?
        .iconst(1)?
        .istore(1)?
        .iload(1)?
        .pop()?
        .goto("loop")?
        .label("end")?
        .return_void()?;
    let mut body = asm.finish()?;

    let liveness = LivenessAnalyzer::analyze(&body)?;
    // i is only read again through the back edge.
    assert!(liveness.is_alive_after(8, 0));
    assert!(liveness.is_alive_before(15, 0));
    assert!(liveness.is_alive_after(12, 0));
    assert!(liveness.is_alive_after(12, 1));

    assert!(!VariableOptimizer::new().optimize(&mut body)?);
    Ok(())
}

#[test]
fn test_handler_keeps_variable_alive() -> Result<()> {
    // static void f() {
    //     int x = 1;
    //     try { call(); int y = 2; use(y); } catch (Exception e) { use(x); }
    // }
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.iconst(1)?
        .istore(0)?
        .label("try")?
        .invoke(1)?
        .iconst(2)?
        .istore(1)?
        .iload(1)?
        .pop()?
        .label("end_try")?
        .return_void()?
        .label("catch")?
        .pop()?
        .iload(0)?
        .pop()?
        .return_void()?;
    asm.try_catch("try", "end_try", "catch", Some("java/lang/Exception"));
    let mut body = asm.finish()?;

    let liveness = LivenessAnalyzer::analyze(&body)?;
    assert!(liveness.is_alive_after(6, 0));
    assert!(liveness.is_alive_before(7, 0));
    assert!(!liveness.is_alive_before(9, 0));

    // Without the handler, y could take over x's slot.
    assert!(!VariableOptimizer::new().optimize(&mut body)?);

    body.exception_handlers.clear();
    assert!(VariableOptimizer::new().optimize(&mut body)?);
    Ok(())
}

#[test]
fn test_dead_store_still_conflicts() -> Result<()> {
    // static void f() { int a = 1; int b = 2; use(a); }   // b is never read
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.iconst(1)?
        .istore(0)?
        .iconst(2)?
        .istore(1)?
        .iload(0)?
        .pop()?
        .return_void()?;
    let mut body = asm.finish()?;

    let liveness = LivenessAnalyzer::analyze(&body)?;
    assert!(liveness.is_alive_after(3, 1));
    assert!(!liveness.is_alive_before(4, 1));

    // Sharing slot 0 would let the store of b clobber a.
    assert!(!VariableOptimizer::new().optimize(&mut body)?);
    Ok(())
}

#[test]
fn test_wide_values_are_never_merged() -> Result<()> {
    let optimizer = VariableOptimizer::new();

    // static void f() { long v = call(); use(v); int t = 1; use(t); }
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.invoke(1)?
        .lstore(0)?
        .lload(0)?
        .stack(StackOp::Pop2)?
        .iconst(1)?
        .istore(2)?
        .iload(2)?
        .pop()?
        .return_void()?;
    let mut into_wide = asm.finish()?;
    assert!(!optimizer.optimize(&mut into_wide)?);

    // static void f() { int t = 1; use(t); double v = call(); use(v); }
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.iconst(1)?
        .istore(0)?
        .iload(0)?
        .pop()?
        .invoke(1)?
        .dstore(1)?
        .dload(1)?
        .stack(StackOp::Pop2)?
        .return_void()?;
    let mut from_wide = asm.finish()?;
    let liveness = LivenessAnalyzer::analyze(&from_wide)?;
    assert!(liveness.is_ever_category2(1));
    assert!(!optimizer.optimize(&mut from_wide)?);
    Ok(())
}

/// `<name>()V` calling `super.<init>()` and then using one temporary.
fn constructor_like(name: &str) -> Result<MethodBody> {
    let mut asm = MethodAssembler::new_instance(name, "()V");
    asm.aload(0)?
        .invoke(1)?
        .iconst(1)?
        .istore(1)?
        .iload(1)?
        .pop()?
        .return_void()?;
    asm.finish()
}

#[test]
fn test_initializer_keeps_receiver_slot() -> Result<()> {
    let mut body = constructor_like("<init>")?;
    let optimizer = VariableOptimizer::with_config(OptimizerConfig::aggressive());
    assert!(!optimizer.optimize(&mut body)?);
    assert_eq!(body.max_locals, 2);
    Ok(())
}

#[test]
fn test_receiver_reuse_only_when_allowed() -> Result<()> {
    let mut body = constructor_like("run")?;
    assert!(!VariableOptimizer::new().optimize(&mut body)?);

    let optimizer =
        VariableOptimizer::with_config(OptimizerConfig::new().with_receiver_slot_reuse(true));
    let map = optimize_checked(&optimizer, &mut body)?;
    assert_eq!(map.as_slice(), &[0, 0]);
    assert_eq!(body.max_locals, 1);
    Ok(())
}

#[test]
fn test_listener_called_once_per_changed_method() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let listener: Arc<dyn MethodListener> =
        Arc::new(move |_: &MethodBody, map: &VariableMap| {
            assert!(!map.is_identity());
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let optimizer = VariableOptimizer::new().with_listener(listener);

    let mut asm = MethodAssembler::new_static("noop", "()V");
    asm.return_void()?;
    let mut bodies = vec![disjoint_pair("a")?, asm.finish()?, temporaries()?];

    let summary = optimizer.optimize_all(&mut bodies)?;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(summary.methods, 3);
    assert_eq!(summary.changed, 2);

    // A second pass finds nothing to do and stays quiet.
    optimizer.optimize_all(&mut bodies)?;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn test_remap_log_records_events() -> Result<()> {
    let log = Arc::new(RemapLog::new());
    let optimizer = VariableOptimizer::new().with_listener(log.clone());

    let mut body = temporaries()?;
    optimizer.optimize(&mut body)?;

    let events: Vec<_> = log.iter().cloned().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].method, "f(I)V");
    assert_eq!(events[0].slots_before, 4);
    assert_eq!(events[0].slots_after, 3);
    assert_eq!(events[0].remapped, 1);
    assert_eq!(
        log.summary(),
        "1 method(s) remapped, 1 slot(s) moved, 1 slot(s) saved"
    );
    Ok(())
}

#[test]
fn test_batch_matches_sequential() -> Result<()> {
    let mut parallel = Vec::new();
    for index in 0..32 {
        parallel.push(if index % 2 == 0 {
            temporaries()?
        } else {
            disjoint_pair(&format!("m{index}"))?
        });
    }
    let mut sequential = parallel.clone();

    let optimizer = VariableOptimizer::new();
    let summary = optimizer.optimize_all(&mut parallel)?;

    let mut expected = OptimizationSummary::default();
    for body in &mut sequential {
        let before = body.max_locals;
        let changed = optimizer.optimize(body)?;
        expected = expected.merge(OptimizationSummary {
            methods: 1,
            changed: usize::from(changed),
            slots_saved: usize::from(before - body.max_locals),
        });
    }

    assert_eq!(parallel, sequential);
    assert_eq!(summary, expected);
    assert_eq!(summary.slots_saved, 32);
    Ok(())
}

#[test]
fn test_batch_reports_first_error() -> Result<()> {
    let broken = MethodBody::new("broken", "()V", AccessFlags::STATIC, 0, Vec::new());
    let mut bodies = vec![disjoint_pair("a")?, broken.clone(), disjoint_pair("b")?];

    let result = VariableOptimizer::new().optimize_all(&mut bodies);
    assert!(matches!(result, Err(Error::Empty)));

    // The failing body is untouched, the others were still optimized.
    assert_eq!(bodies[1], broken);
    assert_eq!(bodies[0].max_locals, 1);
    assert_eq!(bodies[2].max_locals, 1);
    Ok(())
}

#[test]
fn test_max_variables_bounds_the_scan() -> Result<()> {
    let mut body = disjoint_pair("f")?;
    let optimizer = VariableOptimizer::with_config(OptimizerConfig::new().with_max_variables(1));
    assert!(!optimizer.optimize(&mut body)?);
    assert_eq!(body.max_locals, 2);
    Ok(())
}
