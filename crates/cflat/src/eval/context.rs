//! Shared mutable state threaded through a single evaluation, plus the
//! call-stack bookkeeping the execution hook observes.
//!
//! Grounded on the teacher's `Vm` (`vm/mod.rs`), which also threads one
//! mutable struct through its fetch-decode-execute loop; the AST-walking
//! evaluator here plays the same role for statement/expression dispatch
//! that `Vm::run` plays for opcode dispatch.

use crate::diagnostics::Diagnostic;
use crate::ident::{Identifier, IdentifierTable};
use crate::symbols::NamespaceArena;
use crate::types::{BuiltinTypes, TypeArena};
use crate::value::EnvironmentStack;

#[derive(Debug, Clone)]
pub struct CallFrame {
    pub function_name: Identifier,
    pub line: u32,
}

/// How a statement wants control flow to unwind: ordinary execution
/// (`None`), or one of `break`/`continue`/`return`, propagated up through
/// `execute_statement`/`execute_block` until something handles it.
pub enum JumpSignal {
    None,
    Break,
    Continue,
    Return,
}

pub type ExecutionHook = Box<dyn FnMut(&[CallFrame])>;

pub struct EnvironmentState {
    pub identifiers: IdentifierTable,
    pub types: TypeArena,
    pub builtins: BuiltinTypes,
    pub namespaces: NamespaceArena,
    pub stack: EnvironmentStack,
    pub call_stack: Vec<CallFrame>,
    pub error: Option<Diagnostic>,
    pub execution_hook: Option<ExecutionHook>,
    pub program_name: String,
    pub max_call_depth: usize,
    pub hook_inside_library_calls: bool,
    /// Every source string `Environment::load` has successfully compiled,
    /// in load order. Replayed by `reset_statics` to rebuild script-seeded
    /// globals after they are cleared.
    pub loaded_programs: Vec<String>,
}

impl EnvironmentState {
    /// Records `diagnostic` unless an error is already sticky — first
    /// error wins, matching `Diagnostics::first_error_wins` (SPEC_FULL.md
    /// §3.1).
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if self.error.is_none() {
            tracing::warn!(message = %diagnostic, "cflat error reported");
            self.error = Some(diagnostic);
        }
    }
}

/// The evaluator's working context for a single statement/expression tree
/// walk: a mutable borrow of the environment's shared state plus the
/// purely-local bookkeeping (current scope depth, active namespace) that
/// does not need to outlive one `load`/`call` invocation.
pub struct EvalContext<'a> {
    pub state: &'a mut EnvironmentState,
    pub scope_level: u32,
    pub namespace_stack: Vec<crate::symbols::NamespaceId>,
    pub locals: crate::symbols::InstancesHolder,
    pub return_slot: Option<crate::value::Value>,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub fn new(state: &'a mut EnvironmentState) -> Self {
        let global = state.namespaces.global();
        Self {
            state,
            scope_level: 0,
            namespace_stack: vec![global],
            locals: crate::symbols::InstancesHolder::default(),
            return_slot: None,
        }
    }

    #[must_use]
    pub fn current_namespace(&self) -> crate::symbols::NamespaceId {
        *self.namespace_stack.last().unwrap_or(&self.state.namespaces.global())
    }

    pub fn fire_execution_hook(&mut self) {
        if let Some(mut hook) = self.state.execution_hook.take() {
            hook(&self.state.call_stack);
            self.state.execution_hook = Some(hook);
        }
    }
}
