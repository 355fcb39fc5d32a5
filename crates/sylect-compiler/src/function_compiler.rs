//! Compilation of one method body.
//!
//! [`FunctionCompiler`] owns the per-method state (a [`MethodScope`] and a
//! [`BytecodeEmitter`]) and drives it through:
//!
//! ```text
//! new ──► prologue ──► body statements ──► epilogue ──► finish
//!         (ctors)                          return / missing-return guard
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut compiler = FunctionCompiler::new(&ctx, &method, span)?;
//! compiler.compile_body(&body)?;
//! let body = compiler.finish()?;
//! ```

use sylect_ast::{Block, ChainLink, Operand, Stmt};
use sylect_classfile::{CodeBuilder, Opcode};
use sylect_core::{CompileError, LocalMeta, MethodMeta, Result, Span, names};
use tracing::debug;

use crate::context::CompilationContext;
use crate::emit::BytecodeEmitter;
use crate::scope::MethodScope;
use crate::stmt::StmtCompiler;

/// Code and local variable table of a compiled method.
#[derive(Debug)]
pub struct MethodBody {
    pub code: CodeBuilder,
    /// Every local, for the LocalVariableTable.
    pub locals: Vec<LocalMeta>,
}

pub struct FunctionCompiler<'a, 'ctx> {
    ctx: &'a CompilationContext<'ctx>,
    scope: MethodScope,
    emitter: BytecodeEmitter,
    span: Span,
}

impl<'a, 'ctx> FunctionCompiler<'a, 'ctx> {
    /// Open the scope of `method`, declaring `this` and the parameters.
    pub fn new(ctx: &'a CompilationContext<'ctx>, method: &MethodMeta, span: Span) -> Result<Self> {
        Ok(Self {
            ctx,
            scope: MethodScope::new(ctx.class(), method, span)?,
            emitter: BytecodeEmitter::new(),
            span,
        })
    }

    /// Compile a whole method: prologue, body and epilogue.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(
        ctx: &'a CompilationContext<'ctx>,
        method: &MethodMeta,
        body: &Block,
        span: Span,
    ) -> Result<MethodBody> {
        debug!(class = %ctx.class().name, method = %method.name, "compiling method");
        let mut compiler = Self::new(ctx, method, span)?;
        compiler.compile_body(body)?;
        compiler.finish()
    }

    /// Compile the body statements, preceded by the implicit superclass
    /// constructor call where one is needed.
    pub fn compile_body(&mut self, body: &Block) -> Result<()> {
        if self.scope.is_constructor() && !starts_with_constructor_call(body) {
            self.emit_super_init()?;
        }

        let mut stmts = StmtCompiler::new(self.ctx, &mut self.scope, &mut self.emitter);
        stmts.compile_block(body)
    }

    /// `aload_0; invokespecial base.<init>()V`
    fn emit_super_init(&mut self) -> Result<()> {
        let class = self.ctx.class();
        let Some(base_name) = class.base_class_name.as_deref() else {
            return Err(CompileError::invalid_access(
                format!("{} has no superclass to initialize", class.name),
                self.span,
            ));
        };
        let base = self.ctx.resolve_class(base_name, self.span)?;
        let init = base
            .method(names::INIT, &[])
            .ok_or_else(|| CompileError::UnknownMethod {
                name: names::INIT.to_string(),
                params: String::new(),
                owner: base.name.clone(),
                span: self.span,
            })?;

        self.emitter.emit_this();
        self.emitter.emit_invoke(
            Opcode::Invokespecial,
            &base.name,
            names::INIT,
            &init.descriptor(),
            false,
        );
        Ok(())
    }

    /// Add the fall-through epilogue and close the code buffer.
    pub fn finish(mut self) -> Result<MethodBody> {
        let return_type = self.scope.return_type().clone();
        if return_type.is_void() {
            self.emitter.emit_return(&return_type);
        } else {
            self.emitter.emit_missing_return();
        }

        let code = self
            .emitter
            .finish()
            .map_err(|err| CompileError::InvalidControlFlow {
                message: err.to_string(),
                span: self.span,
            })?;
        Ok(MethodBody {
            code,
            locals: self.scope.locals().to_vec(),
        })
    }
}

/// Whether the first statement is `constructor(...)` or
/// `super.constructor(...)`.
fn starts_with_constructor_call(body: &Block) -> bool {
    let Some(Stmt::Expr(expr)) = body.stmts.first() else {
        return false;
    };
    let Some(math) = expr.as_math() else {
        return false;
    };
    if !math.rest.is_empty() || !math.first.unary.is_empty() {
        return false;
    }
    let Operand::Chain(chain) = &math.first.operand else {
        return false;
    };
    match chain.links.as_slice() {
        [ChainLink::Call(call)] | [ChainLink::Super(_), ChainLink::Call(call)] => {
            call.name.name == names::CONSTRUCTOR_KEYWORD
        }
        _ => false,
    }
}
