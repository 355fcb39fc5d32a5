use sylect_ast::Block;
use sylect_core::Result;

use super::StmtCompiler;

impl<'a, 'ctx> StmtCompiler<'a, 'ctx> {
    /// Compile each statement in order. Declarations stay visible after the
    /// block ends.
    pub fn compile_block(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.stmts {
            self.compile(stmt)?;
        }
        Ok(())
    }
}
