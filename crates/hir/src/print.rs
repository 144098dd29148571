//! Rendering of lowered functions.
//!
//! The printed block order is fully determined by the function: blocks are
//! grouped by strongly-connected component, the components are laid out in
//! a topological order of the condensation, and the entry block's component
//! comes first. Loop bodies therefore stay contiguous and a function prints
//! identically on every run.

use std::fmt::{self, Display, Write};

use clift_graph::{AdjacencyList, AdjacencyMatrix, Graph};
use itertools::Itertools;

use crate::{
    block::BasicBlock,
    function::Function,
    id::{BlockId, FuncId, OpId, VarId},
    module::Module,
    operation::{Note, OpKind},
};

/// Renders single operations. Implementing this changes how operation lines
/// look without touching the block layout around them.
pub trait OpPrinter {
    /// Writes the operation `op` of `func`, without indentation or a
    /// trailing newline.
    ///
    /// # Errors
    ///
    /// - [`fmt::Error`] if the underlying writer fails.
    fn print_op(
        &self,
        w: &mut dyn Write,
        module: &Module,
        func: &Function,
        op: OpId,
    ) -> fmt::Result;
}

/// The stock operation renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultOpPrinter;

impl OpPrinter for DefaultOpPrinter {
    fn print_op(
        &self,
        w: &mut dyn Write,
        module: &Module,
        func: &Function,
        op: OpId,
    ) -> fmt::Result {
        let operation = func.op(op);

        if !operation.results.is_empty() {
            let results = operation
                .results
                .iter()
                .map(|result| {
                    let var = func.var(*result);
                    format!("%{}: {}", var.name, module.types.display(var.ty))
                })
                .join(", ");
            write!(w, "{results} = ")?;
        }

        match &operation.kind {
            OpKind::Alloca { allocated, count } => {
                write!(w, "alloca {}", module.types.display(*allocated))?;
                if *count != 1 {
                    write!(w, " x {count}")?;
                }
            }
            OpKind::Arith(kind) => {
                write!(w, "{} {}", kind.name(), arg_list(func, &operation.args))?;
            }
            OpKind::Bitcast => write!(w, "bitcast {}", arg_list(func, &operation.args))?,
            OpKind::FuncCall { callee } => {
                let name = &module.func(*callee).name;
                write!(w, "call @{name}({})", arg_list(func, &operation.args))?;
            }
            OpKind::Gep { .. } => {
                let (base, indices) = operation
                    .args
                    .split_first()
                    .expect("internal consistency error: address computation without a base");
                write!(w, "gep {}, [{}]", var_ref(func, *base), arg_list(func, indices))?;
            }
            OpKind::Load => write!(w, "load {}", arg_list(func, &operation.args))?,
            OpKind::Phi { incoming } => {
                let merged = operation
                    .args
                    .iter()
                    .zip(incoming)
                    .map(|(arg, block)| {
                        format!("[{}, {}]", var_ref(func, *arg), func.block(*block).name)
                    })
                    .join(", ");
                write!(w, "phi {merged}")?;
            }
            OpKind::PktDecap => write!(w, "pkt.decap {}", arg_list(func, &operation.args))?,
            OpKind::PktEncap => write!(w, "pkt.encap {}", arg_list(func, &operation.args))?,
            OpKind::PktHdrLoad => {
                write!(w, "pkt.hdr.load {}", arg_list(func, &operation.args))?;
            }
            OpKind::PktHdrStore => {
                write!(w, "pkt.hdr.store {}", arg_list(func, &operation.args))?;
            }
            OpKind::Select => write!(w, "select {}", arg_list(func, &operation.args))?,
            OpKind::Store => write!(w, "store {}", arg_list(func, &operation.args))?,
            OpKind::StructGet { indices } => {
                let fields = indices.iter().join(", ");
                write!(w, "struct.get {}, [{fields}]", arg_list(func, &operation.args))?;
            }
            OpKind::StructSet { indices } => {
                let fields = indices.iter().join(", ");
                write!(w, "struct.set {}, [{fields}]", arg_list(func, &operation.args))?;
            }
            OpKind::Unreachable => write!(w, "unreachable")?,
        }

        match &operation.note {
            Some(Note::PktField { header, field }) => write!(w, " [{header}.{field}]"),
            Some(Note::StateRef { slot }) => write!(w, " [state {slot}]"),
            Some(Note::CallInfo { .. }) | None => Ok(()),
        }
    }
}

/// A [`Display`] adapter rendering one function of a module.
pub struct FunctionPrinter<'a> {
    module:  &'a Module,
    func:    FuncId,
    printer: &'a dyn OpPrinter,
}

impl<'a> FunctionPrinter<'a> {
    /// Creates a printer for `func` using the stock operation renderer.
    #[must_use]
    pub fn new(module: &'a Module, func: FuncId) -> Self {
        Self {
            module,
            func,
            printer: &DefaultOpPrinter,
        }
    }

    /// Creates a printer for `func` rendering operations with `printer`.
    #[must_use]
    pub fn with_printer(module: &'a Module, func: FuncId, printer: &'a dyn OpPrinter) -> Self {
        Self {
            module,
            func,
            printer,
        }
    }
}

impl Display for FunctionPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.module.func(self.func);
        write_signature(f, self.module, func)?;
        if func.is_declaration() {
            return writeln!(f, ";");
        }

        writeln!(f, " {{")?;
        for block in block_order(func) {
            write_block(f, self.module, func, self.printer, block)?;
        }
        writeln!(f, "}}")
    }
}

fn write_signature(w: &mut dyn Write, module: &Module, func: &Function) -> fmt::Result {
    if func.is_built_in {
        write!(w, "builtin ")?;
    }
    let params = if func.params.is_empty() {
        func.arg_types
            .iter()
            .map(|ty| module.types.display(*ty))
            .join(", ")
    } else {
        func.params
            .iter()
            .map(|param| {
                let var = func.var(*param);
                format!("%{}: {}", var.name, module.types.display(var.ty))
            })
            .join(", ")
    };
    let ret = module.types.display(func.ret_type);
    write!(w, "func @{}({params}) -> {ret}", func.name)
}

fn write_block(
    w: &mut dyn Write,
    module: &Module,
    func: &Function,
    printer: &dyn OpPrinter,
    id: BlockId,
) -> fmt::Result {
    let block = func.block(id);
    writeln!(w, "{}:", block.name)?;
    for op in &block.ops {
        write!(w, "  ")?;
        printer.print_op(w, module, func, *op)?;
        writeln!(w)?;
    }
    write_terminator(w, func, block)
}

fn write_terminator(w: &mut dyn Write, func: &Function, block: &BasicBlock) -> fmt::Result {
    if block.is_err {
        return writeln!(w, "  error!");
    }
    if block.is_return {
        return match block.ret_val {
            Some(value) => writeln!(w, "  return {}", var_ref(func, value)),
            None => writeln!(w, "  return"),
        };
    }

    let Some(next) = block.default_next else {
        panic!(
            "internal consistency error: block `{}` has no terminator",
            block.name
        );
    };
    let mut edges: Vec<String> = block
        .branches
        .iter()
        .map(|branch| {
            format!(
                "({}, {})",
                var_ref(func, branch.cond),
                func.block(branch.target).name
            )
        })
        .collect();
    edges.push(func.block(next).name.clone());
    writeln!(w, "  br {}", edges.join(", "))
}

/// Renders a reference to `var`: constants by value, undefined values as
/// `undef`, everything else by sigiled name.
fn var_ref(func: &Function, var: VarId) -> String {
    let var = func.var(var);
    if var.is_undef {
        "undef".into()
    } else if var.is_const() {
        var.name.clone()
    } else {
        format!("%{}", var.name)
    }
}

fn arg_list(func: &Function, args: &[VarId]) -> String {
    args.iter().map(|arg| var_ref(func, *arg)).join(", ")
}

/// Computes the block layout for `func`.
///
/// # Panics
///
/// - If the function has no entry block.
/// - If the computed layout does not cover every block of the function.
fn block_order(func: &Function) -> Vec<BlockId> {
    let entry = func
        .entry_block
        .expect("internal consistency error: printing a function without an entry block");

    let mut cfg: Graph<BlockId, AdjacencyList<()>> =
        Graph::from_vertices(func.blocks().map(|(id, _)| id).collect());
    for (id, block) in func.blocks() {
        for successor in block.successors() {
            cfg.set_edge(id.index(), successor.index(), ());
        }
    }

    let components = cfg.strongly_connected_components();
    let mut component_of = vec![0; cfg.n_vertices()];
    for (index, component) in components.iter().enumerate() {
        for &vertex in component {
            component_of[vertex] = index;
        }
    }

    let mut condensation: Graph<usize, AdjacencyMatrix<()>> =
        Graph::from_vertices((0..components.len()).collect());
    for (src, dst, _) in cfg.edges() {
        let (from, to) = (component_of[src], component_of[dst]);
        if from != to {
            condensation.set_edge(from, to, ());
        }
    }

    let mut order = condensation
        .topological_sort()
        .expect("internal consistency error: the condensation contains a cycle");

    // The entry component never has incoming edges, so moving it to the
    // front keeps the order topological.
    let entry_component = component_of[entry.index()];
    order.sort_by_key(|component| *component != entry_component);

    let ordered: Vec<BlockId> = order
        .iter()
        .flat_map(|component| components[*component].iter().copied())
        .map(BlockId::from_index)
        .collect();
    assert!(
        ordered.len() == cfg.n_vertices(),
        "internal consistency error: the block layout for `{}` lost blocks",
        func.name
    );
    ordered
}
