//! Property-based tests for the frame adapter.
//!
//! Checks slice counts and ordering for arbitrary block geometries, and that
//! zero-copy slices keep aliasing the host's memory across repeated ticks.

use proptest::prelude::*;
use worklet_core::{
    Bus, FrameLayout, ParamSet, Processor, SharedChannel, for_each_local_slice, shared_slices,
};

/// Records the first sample of every input slice it sees.
struct FirstSample(Vec<f32>);

impl Processor for FirstSample {
    fn process(&mut self, inputs: &[Bus<'_>], outputs: &mut [Bus<'_>], _params: &ParamSet) {
        self.0.push(inputs[0][0].get(0));
        for (out, inp) in outputs[0].iter_mut().zip(inputs[0].iter()) {
            for i in 0..inp.len() {
                out.set(i, inp.get(i) + 1.0);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// For every evenly dividing geometry, num_slices = outer / quantum and the
    /// slices tile the block exactly.
    #[test]
    fn even_geometry_tiles_block(quantum in 1usize..=256, slices in 1usize..=16) {
        let outer = quantum * slices;
        let layout = FrameLayout::new(quantum, outer).unwrap();
        prop_assert_eq!(layout.num_slices(), outer / quantum);
        prop_assert_eq!(layout.remainder(), 0);

        let mut next = 0;
        for range in layout.ranges() {
            prop_assert_eq!(range.start, next);
            prop_assert_eq!(range.len(), quantum);
            next = range.end;
        }
        prop_assert_eq!(next, outer);
    }

    /// Any geometry: floor division, remainder strictly below the quantum.
    #[test]
    fn remainder_below_quantum(quantum in 1usize..=512, outer in 0usize..=4096) {
        let layout = FrameLayout::new(quantum, outer).unwrap();
        prop_assert_eq!(layout.num_slices(), outer / quantum);
        prop_assert!(layout.remainder() < quantum);
        prop_assert_eq!(layout.covered_len() + layout.remainder(), outer);
    }

    /// Copy transport: a processor sees slices in ascending order, one call per
    /// slice, and writes in place.
    #[test]
    fn local_slices_run_in_ascending_order(quantum in 1usize..=64, slices in 1usize..=8) {
        let outer = quantum * slices;
        let layout = FrameLayout::new(quantum, outer).unwrap();
        let ramp: Vec<f32> = (0..outer).map(|i| i as f32).collect();
        let mut buffers = vec![ramp.clone(), vec![0.0; outer]];
        let mut proc = FirstSample(Vec::new());

        let visited = for_each_local_slice(&layout, &mut buffers, 1, |_, slice| {
            proc.process(&slice.inputs, &mut slice.outputs, ParamSet::empty());
        }).unwrap();

        prop_assert_eq!(visited, slices);
        let expected: Vec<f32> = (0..slices).map(|i| (i * quantum) as f32).collect();
        prop_assert_eq!(proc.0, expected);
        let shifted: Vec<f32> = ramp.iter().map(|s| s + 1.0).collect();
        prop_assert_eq!(&buffers[1], &shifted);
    }

    /// Zero-copy transport: the same precomputed slices keep aliasing the
    /// host's channels across many ticks.
    #[test]
    fn shared_slices_stay_aliased(quantum in 1usize..=32, slices in 1usize..=4, ticks in 1usize..=8) {
        let outer = quantum * slices;
        let layout = FrameLayout::new(quantum, outer).unwrap();
        let host_in = SharedChannel::new(outer);
        let host_out = SharedChannel::new(outer);
        let mut prepared =
            shared_slices(&layout, &[vec![host_in.clone()]], &[vec![host_out.clone()]]).unwrap();
        let mut proc = FirstSample(Vec::new());

        for tick in 0..ticks {
            host_in.fill(tick as f32);
            for slice in &mut prepared {
                proc.process(&slice.inputs, &mut slice.outputs, ParamSet::empty());
            }
            prop_assert!(host_out.to_vec().iter().all(|&s| s == tick as f32 + 1.0));
            for slice in &prepared {
                let window = slice.outputs[0][0].as_shared().unwrap();
                prop_assert!(window.channel().ptr_eq(&host_out));
            }
        }
    }
}
