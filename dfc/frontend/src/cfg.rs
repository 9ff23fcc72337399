//! Control-flow queries over the blocks of a [Function].
use crate::ssa::{Function, InstKind, InstrRef, Operand};
use crate::types::Type;
use dfc_utils::{DfcResult, Error};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

impl Function {
    /// Position of the block called `name`.
    pub fn block_index(&self, name: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.name == name)
    }

    /// Successor blocks of block `b` in terminator order. Targets that do not
    /// name a block of this function are reported as malformed input.
    pub fn successors(&self, b: usize) -> DfcResult<Vec<usize>> {
        let Some(term) = self.blocks[b].terminator() else {
            return Err(Error::malformed(format!(
                "block `{}' has no terminator",
                self.blocks[b].name
            ))
            .with_loc(&self.name));
        };
        term.op
            .targets()
            .into_iter()
            .map(|target| {
                self.block_index(target).ok_or_else(|| {
                    Error::undefined(target).with_loc(format!(
                        "{}: branch in `{}'",
                        self.name, self.blocks[b].name
                    ))
                })
            })
            .collect()
    }

    /// Predecessor blocks of block `b`, in block order.
    pub fn predecessors(&self, b: usize) -> DfcResult<Vec<usize>> {
        let mut preds = vec![];
        for p in 0..self.blocks.len() {
            if self.successors(p)?.contains(&b) {
                preds.push(p);
            }
        }
        Ok(preds)
    }

    /// The control-flow graph. Node weights are block positions and node
    /// `i` of the graph is block `i`.
    pub fn cfg(&self) -> DfcResult<DiGraph<usize, ()>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        for b in 0..self.blocks.len() {
            graph.add_node(b);
        }
        for b in 0..self.blocks.len() {
            for s in self.successors(b)? {
                graph.update_edge(NodeIndex::new(b), NodeIndex::new(s), ());
            }
        }
        Ok(graph)
    }

    /// Blocks in a topological order of the control-flow graph. Fails with a
    /// loop error if the graph has a back edge.
    pub fn block_order(&self) -> DfcResult<Vec<usize>> {
        let graph = self.cfg()?;
        toposort(&graph, None)
            .map(|order| order.into_iter().map(|n| graph[n]).collect())
            .map_err(|cycle| {
                let block = &self.blocks[graph[cycle.node_id()]].name;
                Error::loop_detected(block.as_str()).with_loc(&self.name)
            })
    }

    /// Map from every value defined by an instruction to its position.
    pub fn definitions(&self) -> HashMap<&str, InstrRef> {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(b, block)| {
                block.instrs.iter().enumerate().filter_map(move |(i, inst)| {
                    inst.result.as_deref().map(|r| (r, InstrRef::new(b, i)))
                })
            })
            .collect()
    }

    /// The instruction at `at`.
    pub fn instr(&self, at: InstrRef) -> &crate::ssa::Instruction {
        &self.blocks[at.block].instrs[at.instr]
    }

    /// Type of an operand: a literal's own type, an argument's declared type
    /// or the result type of its defining instruction.
    pub fn type_of(&self, operand: &Operand) -> Option<Type> {
        match operand {
            Operand::Const(c) => Some(c.ty().clone()),
            Operand::Value(name) => self
                .args
                .iter()
                .find(|a| &a.name == name)
                .map(|a| a.ty.clone())
                .or_else(|| {
                    self.blocks
                        .iter()
                        .flat_map(|b| b.instrs.iter())
                        .find(|i| i.result.as_deref() == Some(name.as_str()))
                        .map(|i| i.ty.clone())
                }),
        }
    }

    /// Every type mentioned by the signature and the instructions.
    pub fn mentioned_types(&self) -> impl Iterator<Item = &Type> {
        let operand_types =
            self.blocks.iter().flat_map(|b| b.instrs.iter()).flat_map(|i| {
                std::iter::once(&i.ty).chain(
                    i.op.operands().into_iter().filter_map(|o| {
                        o.as_const().map(|c| c.ty())
                    }),
                )
            });
        self.args.iter().map(|a| &a.ty).chain(operand_types)
    }

    /// Is `name` the result of a PHI instruction?
    pub fn is_phi(&self, name: &str) -> bool {
        self.definitions()
            .get(name)
            .is_some_and(|at| matches!(self.instr(*at).op, InstKind::Phi { .. }))
    }
}
