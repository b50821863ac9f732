//! Finds properly constrained blocks: `n` equations sharing exactly `n` unknowns.
use crate::parsing::equation::Equation;
use std::collections::{BTreeSet, HashMap};

/// Candidate block, grown one equation at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// indices into the equation pool
    pub equations: Vec<usize>,
    /// sorted unknowns of the block
    pub unknowns: Vec<String>,
}

pub struct BlockMgr<'a> {
    pool: Vec<(usize, BTreeSet<String>)>,
    ctx: &'a HashMap<String, f64>,
}

impl<'a> BlockMgr<'a> {
    pub fn new(ctx: &'a HashMap<String, f64>) -> BlockMgr<'a> {
        BlockMgr { pool: Vec::new(), ctx }
    }

    /// Registers equation `index`; equations without unknowns are ignored.
    pub fn add_item(&mut self, index: usize, equation: &Equation) {
        let unknowns: BTreeSet<String> = equation.unknowns(self.ctx).into_iter().collect();
        if !unknowns.is_empty() {
            self.pool.push((index, unknowns));
        }
    }

    /// Grows a block from `seed`, always adding the equation that introduces the fewest new
    /// unknowns while the block has no more equations than unknowns.
    fn grow(&self, seed: usize) -> Option<Block> {
        let mut members = vec![seed];
        let mut unknowns = self.pool[seed].1.clone();
        loop {
            if members.len() == unknowns.len() {
                return Some(Block {
                    equations: members.iter().map(|&m| self.pool[m].0).collect(),
                    unknowns: unknowns.into_iter().collect(),
                });
            }
            let next = self
                .pool
                .iter()
                .enumerate()
                .filter(|(i, _)| !members.contains(i))
                .map(|(i, (_, uks))| (i, uks.difference(&unknowns).count()))
                .filter(|(_, new)| members.len() + 1 <= unknowns.len() + new)
                .min_by_key(|(_, new)| *new)?;
            unknowns.extend(self.pool[next.0].1.iter().cloned());
            members.push(next.0);
        }
    }

    /// First constrained block found, trying seeds in pool order; smaller blocks win.
    pub fn constrained(&self) -> Option<Block> {
        (0..self.pool.len())
            .filter_map(|seed| self.grow(seed))
            .min_by_key(|block| block.equations.len())
    }
}
