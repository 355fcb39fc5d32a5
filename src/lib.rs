//! Sylect: a compiler from Sylect/Forward syntax trees to JVM class files.
//!
//! ```ignore
//! use sylect::prelude::*;
//!
//! let compiler = Compiler::new(CompilerOptions::default());
//! let class = compiler.compile(&program)?;
//! class.write_to(Path::new("target/classes"))?;
//! ```
//!
//! A [`Compiler`] owns one [`ClassTable`]: every class it registers stays
//! visible to later compilations, so units compiled one at a time may refer
//! to classes compiled earlier. [`Compiler::compile_all`] registers a whole
//! batch first, which lets units refer to each other in any order.

use sylect_ast::Program;
use sylect_compiler::{
    BatchError, CompilationPass, CompiledClass, CompilerOptions, RegistrationPass,
};
use sylect_core::Result;
use sylect_registry::{ClassProvider, ClassTable, JdkClasses};
use tracing::debug;

pub use sylect_ast as ast;
pub use sylect_classfile as classfile;
pub use sylect_compiler as compiler;
pub use sylect_core as model;
pub use sylect_registry as registry;

pub mod prelude {
    pub use sylect_ast::{ClassDef, Expr, FieldDef, MethodDef, Program, Stmt};
    pub use sylect_compiler::{BatchError, CompiledClass, CompilerOptions};
    pub use sylect_core::{CompileError, Dialect, TargetVersion};
    pub use sylect_registry::{
        ClassProvider, ClasspathProvider, DirectoryClassProvider, JarClassProvider, JdkClasses,
    };

    pub use crate::Compiler;
}

pub struct Compiler {
    table: ClassTable,
    options: CompilerOptions,
}

impl Compiler {
    /// A compiler that sees the built-in JDK model as its host classes.
    pub fn new(options: CompilerOptions) -> Self {
        Self::with_provider(JdkClasses, options)
    }

    pub fn with_provider(provider: impl ClassProvider + 'static, options: CompilerOptions) -> Self {
        let table = ClassTable::new(provider).with_max_depth(options.max_hierarchy_depth);
        Self { table, options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn table(&self) -> &ClassTable {
        &self.table
    }

    /// Compile one unit.
    ///
    /// The class stays registered only if the whole unit compiles, so a
    /// corrected unit can be compiled again on the same compiler.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, program: &Program) -> Result<CompiledClass> {
        let registered = RegistrationPass::new(&self.table, &self.options).run(program)?;
        match CompilationPass::new(&self.table, &self.options).run(program, &registered) {
            Ok(compiled) => {
                debug!(class = %compiled.name, "unit compiled");
                Ok(compiled)
            }
            Err(err) => {
                self.table.unregister_source(&registered.class);
                Err(err)
            }
        }
    }

    /// Compile many units in parallel; see [`sylect_compiler::batch`].
    pub fn compile_all(
        &self,
        programs: &[Program],
    ) -> std::result::Result<Vec<CompiledClass>, BatchError> {
        sylect_compiler::compile_batch(&self.table, &self.options, programs)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}
