// ============================================================
// Layer 5 — Layer Hierarchy
// ============================================================
// Two-level aggregation of unit layers:
//
//   EncoderLayer (Composite Layer)
//     ├── EncoderLayerBase (Layer-Group 0) ── unit, unit, ... ─► combiner
//     ├── EncoderLayerBase (Layer-Group 1) ── unit, unit, ... ─► combiner
//     └── ...                                                   ─► combiner
//   EncoderLayerStack (Flat stack) ── unit, unit, ...  (no aggregation)
//
// A Layer-Group has the same contract as a unit layer, so the
// Composite Layer runs the very same `aggregate` routine over
// groups that a group runs over its units.

use burn::prelude::*;

use crate::domain::mode::RunMode;
use crate::ml::combiner::{ResidueCombiner, ResidueCombinerConfig};
use crate::ml::traits::{Combine, UnitLayer};
use crate::ml::unit::{EncoderLayerUnit, EncoderLayerUnitConfig};

/// Run `units` in sequence, hand every intermediate output (in
/// execution order) to `combiner`, and return its result.
pub fn aggregate<B, L, C>(
    units:    &[L],
    combiner: &C,
    input:    Tensor<B, 3>,
    mask:     Option<&Tensor<B, 2, Bool>>,
    mode:     RunMode,
) -> Tensor<B, 3>
where
    B: Backend,
    L: UnitLayer<B>,
    C: Combine<B>,
{
    let mut out  = input;
    let mut outs = Vec::with_capacity(units.len());
    for unit in units {
        out = unit.forward(out, mask, mode);
        outs.push(out.clone());
    }
    combiner.combine(outs, mode)
}

/// Run `units` in sequence and return only the last output.
pub fn chain<B, L>(
    units: &[L],
    input: Tensor<B, 3>,
    mask:  Option<&Tensor<B, 2, Bool>>,
    mode:  RunMode,
) -> Tensor<B, 3>
where
    B: Backend,
    L: UnitLayer<B>,
{
    units
        .iter()
        .fold(input, |out, unit| unit.forward(out, mask, mode))
}

// ─── EncoderLayerBase (Layer-Group) ───────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderLayerBase<B: Backend> {
    pub nets:     Vec<EncoderLayerUnit<B>>,
    pub combiner: ResidueCombiner<B>,
}

impl<B: Backend> EncoderLayerBase<B> {
    /// `num_unit` fresh unit layers plus a combiner of matching arity.
    pub fn new(unit: &EncoderLayerUnitConfig, num_unit: usize, device: &B::Device) -> Self {
        let nets = (0..num_unit).map(|_| unit.init(device)).collect();
        Self::from_units(nets, unit, device)
    }

    /// Wrap existing unit layers (e.g. transplanted ones) in a group.
    pub fn from_units(
        nets:   Vec<EncoderLayerUnit<B>>,
        unit:   &EncoderLayerUnitConfig,
        device: &B::Device,
    ) -> Self {
        let combiner = ResidueCombinerConfig::new(unit.isize, nets.len())
            .with_hsize(unit.fhsize)
            .init(device);
        Self { nets, combiner }
    }
}

impl<B: Backend> UnitLayer<B> for EncoderLayerBase<B> {
    fn forward(
        &self,
        input: Tensor<B, 3>,
        mask:  Option<&Tensor<B, 2, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, 3> {
        aggregate(&self.nets, &self.combiner, input, mask, mode)
    }
}

// ─── EncoderLayerStack (Flat stack) ───────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderLayerStack<B: Backend> {
    pub nets: Vec<EncoderLayerUnit<B>>,
}

impl<B: Backend> EncoderLayerStack<B> {
    pub fn new(unit: &EncoderLayerUnitConfig, num_unit: usize, device: &B::Device) -> Self {
        Self { nets: (0..num_unit).map(|_| unit.init(device)).collect() }
    }
}

impl<B: Backend> UnitLayer<B> for EncoderLayerStack<B> {
    fn forward(
        &self,
        input: Tensor<B, 3>,
        mask:  Option<&Tensor<B, 2, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, 3> {
        chain(&self.nets, input, mask, mode)
    }
}

// ─── EncoderLayer (Composite Layer) ───────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub nets:     Vec<EncoderLayerBase<B>>,
    pub combiner: ResidueCombiner<B>,
}

impl<B: Backend> EncoderLayer<B> {
    /// `num_sub` Layer-Groups of `num_unit` unit layers each.
    pub fn new(
        unit:     &EncoderLayerUnitConfig,
        num_sub:  usize,
        num_unit: usize,
        device:   &B::Device,
    ) -> Self {
        let nets = (0..num_sub)
            .map(|_| EncoderLayerBase::new(unit, num_unit, device))
            .collect();
        Self::from_groups(nets, unit, device)
    }

    pub fn from_groups(
        nets:   Vec<EncoderLayerBase<B>>,
        unit:   &EncoderLayerUnitConfig,
        device: &B::Device,
    ) -> Self {
        let combiner = ResidueCombinerConfig::new(unit.isize, nets.len())
            .with_hsize(unit.fhsize)
            .init(device);
        Self { nets, combiner }
    }

    /// Total number of unit layers across all groups.
    pub fn num_units(&self) -> usize {
        self.nets.iter().map(|group| group.nets.len()).sum()
    }
}

impl<B: Backend> UnitLayer<B> for EncoderLayer<B> {
    fn forward(
        &self,
        input: Tensor<B, 3>,
        mask:  Option<&Tensor<B, 2, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, 3> {
        aggregate(&self.nets, &self.combiner, input, mask, mode)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::domain::partition::LayerPartition;

    type B = NdArray;

    // Ignores its input and emits a constant; counts its invocations.
    struct ConstLayer {
        value: f32,
        calls: Rc<Cell<usize>>,
    }

    impl UnitLayer<B> for ConstLayer {
        fn forward(&self, input: Tensor<B, 3>, _: Option<&Tensor<B, 2, Bool>>, _: RunMode) -> Tensor<B, 3> {
            self.calls.set(self.calls.get() + 1);
            input.zeros_like().add_scalar(self.value)
        }
    }

    // Records the first element of every input it receives, returns the last input.
    #[derive(Default)]
    struct RecordingCombiner {
        seen: RefCell<Vec<Vec<f32>>>,
    }

    impl Combine<B> for RecordingCombiner {
        fn combine(&self, inputs: Vec<Tensor<B, 3>>, _: RunMode) -> Tensor<B, 3> {
            let firsts = inputs
                .iter()
                .map(|t| t.clone().into_data().to_vec::<f32>().unwrap()[0])
                .collect();
            self.seen.borrow_mut().push(firsts);
            inputs.last().unwrap().clone()
        }
    }

    // A stub Layer-Group: same routine as EncoderLayerBase, stub parts.
    struct StubGroup {
        units:    Vec<ConstLayer>,
        combiner: RecordingCombiner,
    }

    impl UnitLayer<B> for StubGroup {
        fn forward(&self, input: Tensor<B, 3>, mask: Option<&Tensor<B, 2, Bool>>, mode: RunMode) -> Tensor<B, 3> {
            aggregate(&self.units, &self.combiner, input, mask, mode)
        }
    }

    fn layers(values: &[f32], calls: &Rc<Cell<usize>>) -> Vec<ConstLayer> {
        values
            .iter()
            .map(|&value| ConstLayer { value, calls: calls.clone() })
            .collect()
    }

    #[test]
    fn test_group_hands_every_output_in_execution_order() {
        let device   = Default::default();
        let calls    = Rc::new(Cell::new(0));
        let combiner = RecordingCombiner::default();
        let input    = Tensor::<B, 3>::zeros([1, 2, 3], &device);

        let _ = aggregate(&layers(&[1.0, 2.0, 3.0], &calls), &combiner, input.clone(), None, RunMode::Eval);
        let _ = aggregate(&layers(&[3.0, 1.0, 2.0], &calls), &combiner, input, None, RunMode::Eval);

        let seen = combiner.seen.borrow();
        assert_eq!(seen[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(seen[1], vec![3.0, 1.0, 2.0]);
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn test_chain_returns_last_output_only() {
        let device = Default::default();
        let calls  = Rc::new(Cell::new(0));
        let out    = chain(&layers(&[4.0, 5.0], &calls), Tensor::<B, 3>::zeros([1, 1, 1], &device), None, RunMode::Eval);
        assert_eq!(out.into_data().to_vec::<f32>().unwrap(), vec![5.0]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_hierarchy_traverses_every_unit_once() {
        // num_layer=6, num_sub=2, num_unit=2 → 4 grouped units + 2 in the flat stack
        let device    = Default::default();
        let partition = LayerPartition::new(6, 2, 2);
        let calls     = Rc::new(Cell::new(0));
        let values: Vec<f32> = (0..6).map(|i| i as f32).collect();

        let (groups, tail) = partition.split(layers(&values, &calls)).unwrap();
        let groups: Vec<StubGroup> = groups
            .into_iter()
            .map(|units| StubGroup { units, combiner: RecordingCombiner::default() })
            .collect();
        let composite = RecordingCombiner::default();

        let input = Tensor::<B, 3>::zeros([1, 2, 3], &device);
        let out   = aggregate(&groups, &composite, input, None, RunMode::Eval);
        let out   = chain(&tail, out, None, RunMode::Eval);

        assert_eq!(calls.get(), 6);
        assert_eq!(composite.seen.borrow()[0], vec![1.0, 3.0]);
        assert_eq!(out.into_data().to_vec::<f32>().unwrap()[0], 5.0);
    }

    // Replays one Layer-Group by hand: units in order, then its combiner.
    fn replay_group(group: &EncoderLayerBase<B>, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut out  = input;
        let mut outs = Vec::new();
        for unit in &group.nets {
            out = unit.forward(out, None, RunMode::Eval);
            outs.push(out.clone());
        }
        group.combiner.combine(outs, RunMode::Eval)
    }

    #[test]
    fn test_real_hierarchy_matches_unit_by_unit_replay() {
        // num_layer=6, num_sub=2, num_unit=2 → 4 grouped units + 2 in the flat stack
        let device    = Default::default();
        let unit      = EncoderLayerUnitConfig::new(8).with_num_head(2).with_fhsize(Some(16));
        let composite = EncoderLayer::<B>::new(&unit, 2, 2, &device);
        let stack     = EncoderLayerStack::<B>::new(&unit, 2, &device);
        assert_eq!(composite.num_units() + stack.nets.len(), 6);

        let x      = Tensor::<B, 3>::random([2, 4, 8], Distribution::Normal(0.0, 1.0), &device);
        let actual = stack.forward(composite.forward(x.clone(), None, RunMode::Eval), None, RunMode::Eval);

        let g0       = replay_group(&composite.nets[0], x);
        let g1       = replay_group(&composite.nets[1], g0.clone());
        let mut out  = composite.combiner.combine(vec![g0, g1], RunMode::Eval);
        for unit in &stack.nets {
            out = unit.forward(out, None, RunMode::Eval);
        }

        let err: f32 = (actual - out).abs().max().into_scalar().elem();
        assert!(err < 1e-5, "{err}");
    }

    #[test]
    fn test_composite_layer_shapes_and_counts() {
        let device = Default::default();
        let unit   = EncoderLayerUnitConfig::new(8).with_num_head(2).with_fhsize(Some(16));
        let layer  = EncoderLayer::<B>::new(&unit, 2, 3, &device);

        assert_eq!(layer.nets.len(), 2);
        assert_eq!(layer.num_units(), 6);
        assert_eq!(layer.combiner.num_inputs(), 2);
        assert_eq!(layer.nets[0].combiner.num_inputs(), 3);

        let x = Tensor::<B, 3>::random([2, 5, 8], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(layer.forward(x.clone(), None, RunMode::Eval).dims(), [2, 5, 8]);

        let stack = EncoderLayerStack::<B>::new(&unit, 2, &device);
        assert_eq!(stack.forward(x, None, RunMode::Train).dims(), [2, 5, 8]);
    }
}
