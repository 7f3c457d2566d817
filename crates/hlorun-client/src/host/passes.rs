//! Optimization passes run by the host compiler.
//!
//! Passes rewrite a [`Computation`] in place. They run only when the
//! build options ask for more than backend lowering
//! (`run_backend_only == false`), and never change what the computation
//! computes: an executable built with or without them returns the same
//! results.

use super::evaluator;
use crate::Result;
use hlorun_core::{Computation, Opcode};

/// A rewrite over a whole computation.
///
/// # Return Value
///
/// `run()` returns `Ok(true)` if the pass changed the computation and
/// `Ok(false)` otherwise.
pub(crate) trait Pass: Send + Sync {
    /// Pass name, used for logging.
    fn name(&self) -> &str;

    fn run(&self, computation: &mut Computation) -> Result<bool>;
}

/// The passes run by a full (non backend-only) compile, in order.
pub(crate) fn default_pipeline() -> Vec<Box<dyn Pass>> {
    vec![Box::new(ConstantFolding)]
}

/// Run `passes` in order, then re-validate the result.
///
/// Returns the names of the passes that changed the computation.
pub(crate) fn run_pipeline(
    computation: &mut Computation,
    passes: &[Box<dyn Pass>],
) -> Result<Vec<String>> {
    let mut changed_by = Vec::new();
    for pass in passes {
        let _span = tracing::debug_span!("pass", name = pass.name()).entered();
        if pass.run(computation)? {
            tracing::debug!(
                instructions = computation.instructions.len(),
                "pass changed computation"
            );
            changed_by.push(pass.name().to_string());
        }
    }
    computation.validate()?;
    Ok(changed_by)
}

/// Replaces elementwise instructions whose operands are all constants with
/// the constant they evaluate to.
///
/// Instructions that fail to evaluate (integer division by zero) are left
/// alone so the fault is reported when the executable runs.
pub(crate) struct ConstantFolding;

impl Pass for ConstantFolding {
    fn name(&self) -> &str {
        "constant_folding"
    }

    fn run(&self, computation: &mut Computation) -> Result<bool> {
        let mut changed = false;

        for index in 0..computation.instructions.len() {
            let inst = &computation.instructions[index];
            if !matches!(inst.opcode, Opcode::Unary(_) | Opcode::Binary(_)) {
                continue;
            }

            let operands: Option<Vec<_>> = inst
                .operands
                .iter()
                .map(|id| match &computation.instructions[id.0].opcode {
                    Opcode::Constant(literal) => Some(literal),
                    _ => None,
                })
                .collect();
            let Some(operands) = operands else {
                continue;
            };

            match evaluator::apply(&inst.opcode, &operands) {
                Ok(folded) => {
                    let inst = &mut computation.instructions[index];
                    inst.opcode = Opcode::Constant(folded);
                    inst.operands.clear();
                    changed = true;
                }
                Err(error) => {
                    tracing::debug!(%error, instruction = index, "leaving instruction unfolded");
                }
            }
        }

        Ok(changed)
    }
}
