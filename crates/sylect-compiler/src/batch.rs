//! Parallel two-pass compilation of many units.
//!
//! ```text
//!            ┌─ worker ─ pass 1 (units 0..k)   ─┐
//! units ─────┼─ worker ─ pass 1 (units k..2k)  ─┼── join ── any failure? ── BatchError
//!            └─ worker ─ pass 1 (...)          ─┘              │
//!                                                              ▼
//!            ┌─ worker ─ pass 2 ─┐
//!            ├─ worker ─ pass 2 ─┼── join ── Vec<CompiledClass> (input order)
//!            └─ worker ─ pass 2 ─┘
//! ```
//!
//! Workers are scoped threads over contiguous chunks; the join of all
//! workers is the barrier between the passes. A panicking worker is
//! re-raised on the calling thread.

use std::panic;
use std::thread;

use sylect_ast::Program;
use sylect_core::CompileError;
use sylect_registry::ClassTable;
use thiserror::Error;
use tracing::{debug, info};

use crate::options::CompilerOptions;
use crate::passes::{CompilationPass, CompiledClass, RegistrationOutput, RegistrationPass};

/// Why one unit of a batch failed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    /// Position of the unit in the batch.
    pub unit: usize,
    pub class_name: String,
    pub error: CompileError,
}

/// Every unit that failed in the pass that stopped the batch.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} of the batch's units failed to compile", failures.len())]
pub struct BatchError {
    pub failures: Vec<UnitFailure>,
}

/// Register every unit, then compile every unit.
///
/// Nothing is returned unless all units succeed; the output follows the
/// input order. A failed batch withdraws the registrations it made, so the
/// corrected units can be compiled against the same table.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_batch(
    table: &ClassTable,
    options: &CompilerOptions,
    programs: &[Program],
) -> Result<Vec<CompiledClass>, BatchError> {
    let workers = options.workers.max(1);
    info!(units = programs.len(), workers, "compiling batch");

    let registration = RegistrationPass::new(table, options);
    let results = run_parallel(programs, workers, |_, program| registration.run(program));
    if results.iter().any(Result::is_err) {
        unregister(table, results.iter().flatten());
    }
    let registered = collect(programs, results)?;
    debug!("registration complete");

    let compilation = CompilationPass::new(table, options);
    let compiled = collect(
        programs,
        run_parallel(programs, workers, |index, program| {
            compilation.run(program, &registered[index])
        }),
    );
    if compiled.is_err() {
        unregister(table, &registered);
    }
    compiled
}

fn unregister<'a>(table: &ClassTable, units: impl IntoIterator<Item = &'a RegistrationOutput>) {
    for unit in units {
        table.unregister_source(&unit.class);
    }
}

fn collect<T>(
    programs: &[Program],
    results: Vec<Result<T, CompileError>>,
) -> Result<Vec<T>, BatchError> {
    let mut done = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (unit, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => done.push(value),
            Err(error) => failures.push(UnitFailure {
                unit,
                class_name: programs[unit].class.name.name.clone(),
                error,
            }),
        }
    }
    if failures.is_empty() {
        Ok(done)
    } else {
        Err(BatchError { failures })
    }
}

/// Apply `f` to every item on up to `workers` scoped threads, keeping the
/// input order in the output.
fn run_parallel<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let chunk_size = items.len().div_ceil(workers.max(1));
    if chunk_size == items.len() {
        return items.iter().enumerate().map(|(i, item)| f(i, item)).collect();
    }

    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .enumerate()
            .map(|(chunk_index, chunk)| {
                scope.spawn(move || {
                    let base = chunk_index * chunk_size;
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(offset, item)| f(base + offset, item))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut out = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(results) => out.extend(results),
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylect_ast::{ClassDef, Expr, FieldDef, MethodDef, Stmt};
    use sylect_registry::JdkClasses;

    fn options(workers: usize) -> CompilerOptions {
        CompilerOptions::default().with_workers(workers)
    }

    /// `demo/Unit<i>` whose `next()` returns an instance of the following unit.
    fn chain_of_units(count: usize) -> Vec<Program> {
        (0..count)
            .map(|i| {
                let next = format!("demo/Unit{}", (i + 1) % count);
                let next_method = MethodDef::new("next", next.as_str())
                    .body([Stmt::ret(Expr::call(&next, []))]);
                Program::new(ClassDef::new(format!("demo/Unit{i}").as_str()).method(next_method))
            })
            .collect()
    }

    #[test]
    fn parallel_map_keeps_order() {
        let items: Vec<usize> = (0..37).collect();
        for workers in [1, 2, 4, 64] {
            let out = run_parallel(&items, workers, |index, item| {
                assert_eq!(index, *item);
                item * 2
            });
            assert_eq!(out, items.iter().map(|i| i * 2).collect::<Vec<_>>());
        }
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn worker_panics_propagate() {
        let items: Vec<usize> = (0..8).collect();
        run_parallel(&items, 4, |_, item| {
            if *item == 5 {
                panic!("boom");
            }
            *item
        });
    }

    #[test]
    fn units_see_each_other_in_any_order() {
        let programs = chain_of_units(6);
        for workers in [1, 3] {
            let table = ClassTable::new(JdkClasses);
            let compiled = compile_batch(&table, &options(workers), &programs).unwrap();
            let names: Vec<_> = compiled.iter().map(|c| c.name.as_str()).collect();
            let expected: Vec<_> = (0..6).map(|i| format!("demo/Unit{i}")).collect();
            assert_eq!(names, expected);
        }
    }

    #[test]
    fn registration_failures_stop_the_batch() {
        let mut programs = chain_of_units(3);
        programs.push(Program::new(
            ClassDef::new("demo/Bad").field(FieldDef::new("v", "void")),
        ));
        programs.push(Program::new(ClassDef::new("demo/Unit0")));

        let table = ClassTable::new(JdkClasses);
        let err = compile_batch(&table, &options(2), &programs).unwrap_err();
        let failed: Vec<_> = err.failures.iter().map(|f| f.unit).collect();
        assert!(failed.contains(&3));
        assert!(
            err.failures
                .iter()
                .any(|f| matches!(f.error, CompileError::DuplicateClass { .. }))
        );
        assert_eq!(table.source_count(), 0);
    }

    #[test]
    fn cyclic_supertypes_fail_in_pass_two() {
        let programs = vec![
            Program::new(ClassDef::new("demo/A").extends("demo/B")),
            Program::new(ClassDef::new("demo/B").extends("demo/A")),
        ];
        let table = ClassTable::new(JdkClasses);
        let err = compile_batch(&table, &options(2), &programs).unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert!(
            err.failures
                .iter()
                .all(|f| matches!(f.error, CompileError::MalformedHierarchy { .. }))
        );
    }

    #[test]
    fn body_failures_are_reported_per_unit() {
        let mut programs = chain_of_units(2);
        programs.push(Program::new(ClassDef::new("demo/Broken").method(
            MethodDef::new("f", "int").body([Stmt::ret(Expr::lit("1.5"))]),
        )));

        let table = ClassTable::new(JdkClasses);
        let err = compile_batch(&table, &options(2), &programs).unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].unit, 2);
        assert_eq!(err.failures[0].class_name, "demo/Broken");
        assert!(matches!(err.failures[0].error, CompileError::TypeMismatch { .. }));
        assert_eq!(table.source_count(), 0);

        // the corrected batch compiles against the same table
        programs[2] = Program::new(ClassDef::new("demo/Broken").method(
            MethodDef::new("f", "int").body([Stmt::ret(Expr::lit("1"))]),
        ));
        let compiled = compile_batch(&table, &options(2), &programs).unwrap();
        assert_eq!(compiled.len(), 3);
    }

    #[test]
    fn empty_batch() {
        let table = ClassTable::new(JdkClasses);
        assert!(compile_batch(&table, &options(4), &[]).unwrap().is_empty());
    }
}
