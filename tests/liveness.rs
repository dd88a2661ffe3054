//! Integration tests for the instruction graph and the liveness solver.

use slotopt::{
    analysis::EdgeKind,
    prelude::*,
    utils::graph::{NodeId, Predecessors},
};

#[test]
fn test_subroutine_keeps_caller_variables_alive() -> Result<()> {
    // static void f() { int x = 1; jsr sub; use(x); return; sub: astore_1; int t = 2; use(t); ret 1 }
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.iconst(1)?
        .istore(0)?
        .jsr("sub")?
        .iload(0)?
        .pop()?
        .return_void()?
        .label("sub")?
        .astore(1)?
        .iconst(2)?
        .istore(2)?
        .iload(2)?
        .pop()?
        .ret(1)?;
    let mut body = asm.finish()?;
    assert_eq!(body.code_length(), 15);

    let graph = InstructionGraph::build(&body)?;
    let call = graph.edges(NodeId::new(2));
    assert_eq!(call.len(), 1);
    assert_eq!(call[0].target(), NodeId::new(6));
    assert_eq!(call[0].kind(), &EdgeKind::SubroutineCall);

    let ret = graph.edges(NodeId::new(11));
    assert_eq!(ret.len(), 1);
    assert_eq!(ret[0].target(), NodeId::new(3));
    assert_eq!(ret[0].kind(), &EdgeKind::SubroutineReturn);
    assert!(graph.predecessors(NodeId::new(3)).any(|p| p == NodeId::new(11)));

    let liveness = LivenessAnalyzer::analyze(&body)?;
    // x survives the whole subroutine, and so does the return address.
    assert!(liveness.is_alive_before(11, 0));
    assert!(liveness.is_alive_after(2, 0));
    assert!(liveness.is_alive_before(11, 1));
    assert!(liveness.is_alive_before(13, 1));
    assert!(!liveness.is_alive_after(13, 1));

    // t overlaps both x and the return address.
    assert!(!VariableOptimizer::new().optimize(&mut body)?);
    Ok(())
}

#[test]
fn test_switch_targets() -> Result<()> {
    // static int f(int k) {
    //     int r;
    //     switch (k) { case 1: r = 1; break; case 2: r = 2; break; default: r = 0; }
    //     return r;
    // }
    let mut asm = MethodAssembler::new_static("f", "(I)I");
    asm.iload(0)?
        .lookupswitch("default", &[(1, "one"), (2, "two")])?
        .label("one")?
        .iconst(1)?
        .istore(1)?
        .goto("join")?
        .label("two")?
        .iconst(2)?
        .istore(1)?
        .goto("join")?
        .label("default")?
        .iconst(0)?
        .istore(1)?
        .label("join")?
        .iload(1)?
        .return_value(ValueKind::Int)?;
    let mut body = asm.finish()?;

    // Two padding bytes align the switch operands.
    assert_eq!(body.instructions[1].size, 27);
    assert_eq!(body.code_length(), 42);

    let graph = InstructionGraph::build(&body)?;
    let kinds: Vec<_> = graph
        .edges(NodeId::new(1))
        .iter()
        .map(|edge| edge.kind().clone())
        .collect();
    assert_eq!(kinds.len(), 3);
    assert!(kinds.contains(&EdgeKind::Switch { case_value: None }));
    assert!(kinds.contains(&EdgeKind::Switch {
        case_value: Some(2)
    }));

    let liveness = LivenessAnalyzer::analyze(&body)?;
    assert!(liveness.is_alive_before(0, 0));
    assert!(!liveness.is_alive_after(0, 0));
    assert!(!liveness.is_alive_before(1, 1));
    for store in [29, 34, 39] {
        assert!(liveness.is_alive_after(store, 1));
    }

    // k is dead once the switch has read it, so r can take over its slot.
    assert!(VariableOptimizer::new().optimize(&mut body)?);
    assert_eq!(body.max_locals, 1);
    assert_eq!(body.code_length(), 42);
    Ok(())
}

#[test]
fn test_unreachable_code_is_analyzed() -> Result<()> {
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.goto("end")?
        .iconst(1)?
        .istore(0)?
        .iload(0)?
        .pop()?
        .label("end")?
        .return_void()?;
    let body = asm.finish()?;

    let liveness = LivenessAnalyzer::analyze(&body)?;
    assert!(liveness.is_alive_after(4, 0));
    assert!(liveness.is_alive_before(5, 0));
    assert!(!liveness.is_alive_before(0, 0));
    Ok(())
}

#[test]
fn test_category2_facts() -> Result<()> {
    let mut asm = MethodAssembler::new_static("f", "(J)J");
    asm.lload(0)?.return_value(ValueKind::Long)?;
    let body = asm.finish()?;

    let liveness = LivenessAnalyzer::analyze(&body)?;
    assert!(liveness.is_category2(0, 0));
    assert!(!liveness.is_category2(0, 1));
    assert!(liveness.is_alive_before(0, 0));
    assert!(liveness.is_alive_before(0, 1));
    assert!(!liveness.is_alive_after(0, 0));
    assert!(liveness.iterations() >= body.instructions.len());
    Ok(())
}

#[test]
fn test_offsets_inside_instructions_carry_no_facts() -> Result<()> {
    let mut asm = MethodAssembler::new_static("f", "()V");
    asm.iconst(100)?
        .istore(0)?
        .iload(0)?
        .invoke(1)?
        .return_void()?;
    let body = asm.finish()?;

    let liveness = LivenessAnalyzer::analyze(&body)?;
    // bipush 100 spans offsets 0 and 1.
    assert!(liveness.is_alive_before(3, 0));
    assert!(!liveness.is_alive_before(1, 0));
    // Past the end of the code.
    assert!(!liveness.is_alive_before(100, 0));
    Ok(())
}

#[test]
fn test_invalid_body_is_rejected() {
    let body = MethodBody::new(
        "f",
        "()V",
        AccessFlags::STATIC,
        1,
        vec![Instruction::new(0, Operation::Goto { target: 7 })],
    );
    assert!(matches!(
        LivenessAnalyzer::analyze(&body),
        Err(Error::InvalidBranchTarget {
            offset: 0,
            target: 7
        })
    ));
}
