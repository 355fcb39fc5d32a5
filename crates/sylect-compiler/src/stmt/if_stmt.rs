//! `if`/`else`.

use sylect_ast::IfStmt;
use sylect_core::Result;

use super::{StmtCompiler, flow_error};

impl<'a, 'ctx> StmtCompiler<'a, 'ctx> {
    /// ```text
    ///     [condition]
    ///     ifeq ELSE        (END without an else branch)
    ///     [then]
    ///     goto END
    /// ELSE:
    ///     [else]
    /// END:
    /// ```
    pub(super) fn compile_if(&mut self, if_stmt: &IfStmt) -> Result<()> {
        self.expr_compiler().compile_condition(&if_stmt.condition)?;
        self.emitter.begin_conditional(if_stmt.else_branch.is_some());

        self.compile_block(&if_stmt.then_branch)?;
        if let Some(else_branch) = &if_stmt.else_branch {
            self.emitter
                .enter_else()
                .map_err(|err| flow_error(err, "else", if_stmt.span))?;
            self.compile_block(else_branch)?;
        }

        self.emitter
            .end_conditional()
            .map_err(|err| flow_error(err, "if", if_stmt.span))
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::test_support::Fixture;
    use crate::stmt::test_support::compile_stmts;
    use sylect_ast::{Expr, Stmt};
    use sylect_classfile::{Insn, Opcode, VarKind};
    use sylect_core::{CompileError, TypeMeta};

    #[test]
    fn if_without_else_jumps_to_end() {
        let fixture = Fixture::new();
        let mut scope = fixture.scope(true, &[("i", TypeMeta::integer())]);
        let stmt = Stmt::if_then(Expr::name("i"), [Stmt::assign("i", Expr::lit("0"))], None);
        let insns = compile_stmts(&fixture, &mut scope, &[stmt]).unwrap();

        let Insn::Jump(Opcode::Ifeq, end) = insns[1] else {
            panic!("expected ifeq, got {:?}", insns[1]);
        };
        assert_eq!(insns[2..4], [Insn::Int(0), Insn::Store(VarKind::Int, 0)]);
        assert_eq!(insns[4], Insn::Mark(end));
        assert_eq!(insns.len(), 5);
    }

    #[test]
    fn if_else_layout() {
        let fixture = Fixture::new();
        let mut scope = fixture.scope(true, &[("i", TypeMeta::integer())]);
        let stmt = Stmt::if_then(
            Expr::name("i"),
            [Stmt::assign("i", Expr::lit("1"))],
            Some(vec![Stmt::assign("i", Expr::lit("2"))]),
        );
        let insns = compile_stmts(&fixture, &mut scope, &[stmt]).unwrap();

        let Insn::Jump(Opcode::Ifeq, else_label) = insns[1] else {
            panic!("expected ifeq");
        };
        let Insn::Jump(Opcode::Goto, end) = insns[4] else {
            panic!("expected goto");
        };
        assert_eq!(insns[5], Insn::Mark(else_label));
        assert_eq!(insns[6], Insn::Int(2));
        assert_eq!(insns.last(), Some(&Insn::Mark(end)));
    }

    #[test]
    fn condition_must_be_int() {
        let fixture = Fixture::new();
        let mut scope = fixture.scope(true, &[("s", TypeMeta::string())]);
        let stmt = Stmt::if_then(Expr::name("s"), [], None);
        let err = compile_stmts(&fixture, &mut scope, &[stmt]).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
    }
}
