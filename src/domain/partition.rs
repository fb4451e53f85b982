// ============================================================
// Layer 3 — Layer Partition
// ============================================================
// The hierarchical encoder covers `num_layer` unit layers as
//
//   [ group 0 | group 1 | ... | group num_sub-1 ] [ flat tail ]
//     num_unit  num_unit        num_unit          the remainder
//
// Both model construction and weight transplant from a flat base
// encoder derive their slice boundaries from this one type, so the
// two can never disagree about which layer lands where.
//
// Example: num_layer=6, num_sub=2, num_unit=2
//   groups = [0..2, 2..4], tail = 4..6

use anyhow::{ensure, Result};
use std::ops::Range;

/// Positional split of an ordered layer list into Layer-Groups and a Flat stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPartition {
    num_layer: usize,
    num_sub:   usize,
    num_unit:  usize,
}

impl LayerPartition {
    pub fn new(num_layer: usize, num_sub: usize, num_unit: usize) -> Self {
        Self { num_layer, num_sub, num_unit }
    }

    /// Check the depth contract `num_layer >= num_sub * num_unit`.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_sub > 0, "num_sub must be at least 1");
        ensure!(self.num_unit > 0, "num_unit must be at least 1");
        ensure!(
            self.grouped() <= self.num_layer,
            "num_sub * num_unit = {} exceeds num_layer = {}",
            self.grouped(),
            self.num_layer,
        );
        Ok(())
    }

    /// Number of unit layers living inside the Composite Layer.
    pub fn grouped(&self) -> usize {
        self.num_sub * self.num_unit
    }

    /// Number of unit layers in the trailing Flat stack.
    pub fn tail_len(&self) -> usize {
        self.num_layer.saturating_sub(self.grouped())
    }

    pub fn num_layer(&self) -> usize {
        self.num_layer
    }

    pub fn num_sub(&self) -> usize {
        self.num_sub
    }

    pub fn num_unit(&self) -> usize {
        self.num_unit
    }

    /// Index range of Layer-Group `g` in the flat layer list.
    pub fn group(&self, g: usize) -> Range<usize> {
        g * self.num_unit..(g + 1) * self.num_unit
    }

    pub fn groups(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.num_sub).map(move |g| self.group(g))
    }

    pub fn tail(&self) -> Range<usize> {
        self.grouped().min(self.num_layer)..self.num_layer
    }

    /// Consume an ordered list of exactly `num_layer` items and return
    /// `(groups, tail)`, each keeping the original order.
    pub fn split<T>(&self, items: Vec<T>) -> Result<(Vec<Vec<T>>, Vec<T>)> {
        self.validate()?;
        ensure!(
            items.len() == self.num_layer,
            "expected {} layers to partition, got {}",
            self.num_layer,
            items.len(),
        );

        let mut rest   = items.into_iter();
        let groups     = (0..self.num_sub)
            .map(|_| rest.by_ref().take(self.num_unit).collect::<Vec<_>>())
            .collect();
        let tail: Vec<T> = rest.collect();

        Ok((groups, tail))
    }
}

impl std::fmt::Display for LayerPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let groups: Vec<String> = self
            .groups()
            .map(|r| format!("{}..{}", r.start, r.end))
            .collect();
        let tail = self.tail();
        write!(f, "groups=[{}] tail={}..{}", groups.join(", "), tail.start, tail.end)
    }
}
