//! `loop condition { body } each { step }`.

use sylect_ast::LoopStmt;
use sylect_core::Result;

use super::{StmtCompiler, flow_error};

impl<'a, 'ctx> StmtCompiler<'a, 'ctx> {
    /// The condition is re-tested at the top of every iteration; `continue`
    /// lands on the `each` block when there is one.
    pub(super) fn compile_loop(&mut self, loop_stmt: &LoopStmt) -> Result<()> {
        let flow = |err| flow_error(err, "loop", loop_stmt.span);

        self.emitter.begin_loop(loop_stmt.each.is_some());
        self.expr_compiler().compile_condition(&loop_stmt.condition)?;
        self.emitter.emit_loop_exit().map_err(flow)?;

        self.compile_block(&loop_stmt.body)?;
        if let Some(each) = &loop_stmt.each {
            self.emitter.enter_each().map_err(flow)?;
            self.compile_block(each)?;
        }

        self.emitter.end_loop().map_err(flow)
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::test_support::Fixture;
    use crate::stmt::test_support::compile_stmts;
    use sylect_ast::{Expr, Stmt};
    use sylect_classfile::{Insn, Opcode};
    use sylect_core::{Span, TypeMeta};

    fn jump_target(insn: &Insn) -> sylect_classfile::Label {
        match insn {
            Insn::Jump(_, label) => *label,
            other => panic!("expected a jump, got {other:?}"),
        }
    }

    #[test]
    fn loop_layout_without_each() {
        let fixture = Fixture::new();
        let mut scope = fixture.scope(true, &[("i", TypeMeta::integer())]);
        let stmt = Stmt::loop_while(Expr::name("i"), [Stmt::Continue(Span::default())], None);
        let insns = compile_stmts(&fixture, &mut scope, &[stmt]).unwrap();

        let Insn::Mark(start) = insns[0] else {
            panic!("loop must open with its start label");
        };
        assert!(matches!(insns[2], Insn::Jump(Opcode::Ifeq, _)));
        let end = jump_target(&insns[2]);
        // continue without an each block goes straight back to the test
        assert_eq!(insns[3], Insn::Jump(Opcode::Goto, start));
        assert_eq!(insns[4], Insn::Jump(Opcode::Goto, start));
        assert_eq!(insns[5], Insn::Mark(end));
    }

    #[test]
    fn continue_runs_each_block() {
        let fixture = Fixture::new();
        let mut scope = fixture.scope(true, &[("i", TypeMeta::integer())]);
        let stmt = Stmt::loop_while(
            Expr::name("i"),
            [Stmt::Continue(Span::default()), Stmt::Break(Span::default())],
            Some(vec![Stmt::assign("i", Expr::lit("0"))]),
        );
        let insns = compile_stmts(&fixture, &mut scope, &[stmt]).unwrap();

        let end = jump_target(&insns[2]);
        let each = jump_target(&insns[3]);
        assert_eq!(insns[4], Insn::Jump(Opcode::Goto, end));
        assert_eq!(insns[5], Insn::Mark(each));
        assert_eq!(insns[6], Insn::Int(0));
        assert_eq!(insns.last(), Some(&Insn::Mark(end)));
    }

    #[test]
    fn break_targets_innermost_loop() {
        let fixture = Fixture::new();
        let mut scope = fixture.scope(true, &[("i", TypeMeta::integer())]);
        let inner = Stmt::loop_while(Expr::name("i"), [Stmt::Break(Span::default())], None);
        let outer = Stmt::loop_while(Expr::name("i"), [inner], None);
        let insns = compile_stmts(&fixture, &mut scope, &[outer]).unwrap();

        let outer_end = jump_target(&insns[2]);
        let inner_end = jump_target(&insns[5]);
        assert_ne!(outer_end, inner_end);
        assert_eq!(insns[6], Insn::Jump(Opcode::Goto, inner_end));
    }

    #[test]
    fn break_inside_if_inside_loop() {
        let fixture = Fixture::new();
        let mut scope = fixture.scope(true, &[("i", TypeMeta::integer())]);
        let body = Stmt::if_then(Expr::name("i"), [Stmt::Break(Span::default())], None);
        let stmt = Stmt::loop_while(Expr::lit("1"), [body], None);
        let insns = compile_stmts(&fixture, &mut scope, &[stmt]).unwrap();

        let end = jump_target(&insns[2]);
        assert_eq!(insns[5], Insn::Jump(Opcode::Goto, end));
    }
}
