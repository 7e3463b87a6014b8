//! Frame adapter: reconcile the outer block with a processor's render quantum.
//!
//! The host delivers one *outer block* per tick (its negotiated buffer size).
//! A processor consumes a fixed *render quantum* per `process` call, which may
//! be smaller. The adapter cuts the outer block into `num_slices` consecutive
//! quantum-sized sub-blocks and presents each one as a [`Slice`]:
//!
//! ```text
//! outer block   |<------------------- 128 ------------------->|
//! slices        |<-- 32 -->|<-- 32 -->|<-- 32 -->|<-- 32 -->|
//!                 slice 0    slice 1    slice 2    slice 3
//! ```
//!
//! # Transports
//!
//! - **Zero-copy**: [`shared_slices`] builds every slice once, at construction
//!   time, as windows into [`SharedChannel`]s. The same slices are reused on
//!   every tick; the tick path allocates nothing.
//! - **Copy**: [`for_each_local_slice`] partitions a flat list of transferred
//!   buffers into inputs and outputs and hands out freshly borrowed windows for
//!   each slice, one slice at a time.
//!
//! # Remainders
//!
//! `num_slices` is `outer_block / render_quantum`, rounded down. Trailing
//! samples that do not fill a whole quantum are left untouched under
//! [`RemainderPolicy::Truncate`], or rejected under [`RemainderPolicy::Reject`].

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buffer::{Bus, ChannelView, SharedChannel};

/// Errors raised while laying out slices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceError {
    /// The render quantum was zero.
    #[error("render quantum must be non-zero (outer block {outer_block})")]
    ZeroRenderQuantum {
        /// Requested outer block length.
        outer_block: usize,
    },

    /// The outer block is not a multiple of the render quantum.
    #[error(
        "outer block {outer_block} is not a multiple of render quantum {render_quantum} ({remainder} samples left over)"
    )]
    Remainder {
        /// Requested outer block length.
        outer_block: usize,
        /// Requested render quantum.
        render_quantum: usize,
        /// Samples that would not be processed.
        remainder: usize,
    },

    /// A channel cannot hold every slice.
    #[error("channel holds {len} samples but {required} are required")]
    ChannelTooShort {
        /// Channel length in samples.
        len: usize,
        /// Samples covered by all slices.
        required: usize,
    },
}

/// What to do when the outer block is not a multiple of the render quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Process the whole slices and leave trailing samples untouched.
    #[default]
    Truncate,
    /// Refuse the layout.
    Reject,
}

/// Slice geometry for one processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    render_quantum: usize,
    outer_block: usize,
    num_slices: usize,
}

impl FrameLayout {
    /// Compute the layout, truncating any remainder.
    pub fn new(render_quantum: usize, outer_block: usize) -> Result<Self, SliceError> {
        if render_quantum == 0 {
            return Err(SliceError::ZeroRenderQuantum { outer_block });
        }
        Ok(Self {
            render_quantum,
            outer_block,
            num_slices: outer_block / render_quantum,
        })
    }

    /// Compute the layout and apply `policy` to any remainder.
    pub fn with_policy(
        render_quantum: usize,
        outer_block: usize,
        policy: RemainderPolicy,
    ) -> Result<Self, SliceError> {
        let layout = Self::new(render_quantum, outer_block)?;
        let remainder = layout.remainder();
        if remainder != 0 && policy == RemainderPolicy::Reject {
            return Err(SliceError::Remainder {
                outer_block,
                render_quantum,
                remainder,
            });
        }
        Ok(layout)
    }

    /// Samples per `process` call.
    pub fn render_quantum(&self) -> usize {
        self.render_quantum
    }

    /// Samples per tick.
    pub fn outer_block(&self) -> usize {
        self.outer_block
    }

    /// Number of slices per tick.
    pub fn num_slices(&self) -> usize {
        self.num_slices
    }

    /// Samples covered by all slices (`num_slices * render_quantum`).
    pub fn covered_len(&self) -> usize {
        self.num_slices * self.render_quantum
    }

    /// Trailing samples that no slice covers.
    pub fn remainder(&self) -> usize {
        self.outer_block - self.covered_len()
    }

    /// Sample range of slice `index`.
    #[inline]
    pub fn slice_range(&self, index: usize) -> Range<usize> {
        let start = index * self.render_quantum;
        start..start + self.render_quantum
    }

    /// Sample ranges of every slice, in order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.num_slices).map(|i| self.slice_range(i))
    }

    fn check_len(&self, len: usize) -> Result<(), SliceError> {
        let required = self.covered_len();
        if len < required {
            return Err(SliceError::ChannelTooShort { len, required });
        }
        Ok(())
    }
}

/// One render-quantum-sized sub-block: an input and an output bus list.
#[derive(Debug, Default)]
pub struct Slice<'a> {
    /// Input buses.
    pub inputs: Vec<Bus<'a>>,
    /// Output buses.
    pub outputs: Vec<Bus<'a>>,
}

fn shared_bus_set(buses: &[Vec<SharedChannel>], range: &Range<usize>) -> Vec<Bus<'static>> {
    buses
        .iter()
        .map(|bus| {
            bus.iter()
                .filter_map(|ch| ch.window(range.clone()).map(ChannelView::Shared))
                .collect()
        })
        .collect()
}

/// Precompute zero-copy slices over shared input and output buses.
///
/// `inputs[b][c]` is channel `c` of input bus `b`; likewise for `outputs`.
/// Every channel must hold at least [`FrameLayout::covered_len`] samples.
pub fn shared_slices(
    layout: &FrameLayout,
    inputs: &[Vec<SharedChannel>],
    outputs: &[Vec<SharedChannel>],
) -> Result<Vec<Slice<'static>>, SliceError> {
    for ch in inputs.iter().chain(outputs).flatten() {
        layout.check_len(ch.len())?;
    }

    Ok(layout
        .ranges()
        .map(|range| Slice {
            inputs: shared_bus_set(inputs, &range),
            outputs: shared_bus_set(outputs, &range),
        })
        .collect())
}

/// Walk the slices of a flat transferred buffer list, in order.
///
/// The first `input_channels` buffers (clamped to the list length) form the
/// single input bus, the rest form the single output bus. `f` receives the
/// slice index and a slice whose views borrow the buffers, so anything written
/// to an output view lands in `buffers` in place.
///
/// Returns the number of slices visited. Fails without visiting any slice if a
/// buffer is shorter than [`FrameLayout::covered_len`].
pub fn for_each_local_slice<F>(
    layout: &FrameLayout,
    buffers: &mut [Vec<f32>],
    input_channels: usize,
    mut f: F,
) -> Result<usize, SliceError>
where
    F: FnMut(usize, &mut Slice<'_>),
{
    for buf in buffers.iter() {
        layout.check_len(buf.len())?;
    }

    let split = input_channels.min(buffers.len());
    let (ins, outs) = buffers.split_at_mut(split);

    for (index, range) in layout.ranges().enumerate() {
        let in_bus: Bus<'_> = ins
            .iter_mut()
            .map(|b| ChannelView::Local(&mut b[range.clone()]))
            .collect();
        let out_bus: Bus<'_> = outs
            .iter_mut()
            .map(|b| ChannelView::Local(&mut b[range.clone()]))
            .collect();
        let mut slice = Slice {
            inputs: vec![in_bus],
            outputs: vec![out_bus],
        };
        f(index, &mut slice);
    }

    Ok(layout.num_slices())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_division() {
        let layout = FrameLayout::new(32, 128).unwrap();
        assert_eq!(layout.num_slices(), 4);
        assert_eq!(layout.remainder(), 0);
        assert_eq!(layout.slice_range(3), 96..128);
    }

    #[test]
    fn remainder_is_truncated() {
        let layout = FrameLayout::new(48, 128).unwrap();
        assert_eq!(layout.num_slices(), 2);
        assert_eq!(layout.covered_len(), 96);
        assert_eq!(layout.remainder(), 32);
    }

    #[test]
    fn quantum_larger_than_block_yields_no_slices() {
        let layout = FrameLayout::new(256, 128).unwrap();
        assert_eq!(layout.num_slices(), 0);
        assert_eq!(layout.ranges().count(), 0);
    }

    #[test]
    fn zero_quantum_is_rejected() {
        assert_eq!(
            FrameLayout::new(0, 128),
            Err(SliceError::ZeroRenderQuantum { outer_block: 128 })
        );
    }

    #[test]
    fn reject_policy_refuses_remainder() {
        let err = FrameLayout::with_policy(48, 128, RemainderPolicy::Reject).unwrap_err();
        assert!(matches!(err, SliceError::Remainder { remainder: 32, .. }));
        assert!(FrameLayout::with_policy(32, 128, RemainderPolicy::Reject).is_ok());
        assert!(FrameLayout::with_policy(48, 128, RemainderPolicy::Truncate).is_ok());
    }

    #[test]
    fn shared_slices_alias_the_right_windows() {
        let layout = FrameLayout::new(4, 8).unwrap();
        let input = SharedChannel::from_samples(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let output = SharedChannel::new(8);
        let slices =
            shared_slices(&layout, &[vec![input.clone()]], &[vec![output.clone()]]).unwrap();

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[1].inputs[0][0].get(0), 4.0);
        let window = slices[1].outputs[0][0].as_shared().unwrap();
        assert!(window.channel().ptr_eq(&output));
        assert_eq!(window.start(), 4);
    }

    #[test]
    fn shared_slices_reject_short_channels() {
        let layout = FrameLayout::new(4, 8).unwrap();
        let err = shared_slices(&layout, &[vec![SharedChannel::new(6)]], &[]).unwrap_err();
        assert_eq!(err, SliceError::ChannelTooShort { len: 6, required: 8 });
    }

    #[test]
    fn local_slices_partition_inputs_and_outputs() {
        let layout = FrameLayout::new(2, 4).unwrap();
        let mut buffers = vec![vec![1.0, 2.0, 3.0, 4.0], vec![0.0; 4], vec![0.0; 4]];

        let visited = for_each_local_slice(&layout, &mut buffers, 1, |_, slice| {
            assert_eq!(slice.inputs[0].len(), 1);
            assert_eq!(slice.outputs[0].len(), 2);
            let first = slice.inputs[0][0].get(0);
            for out in &mut slice.outputs[0] {
                out.fill(first);
            }
        })
        .unwrap();

        assert_eq!(visited, 2);
        assert_eq!(buffers[1], vec![1.0, 1.0, 3.0, 3.0]);
        assert_eq!(buffers[2], vec![1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn local_slices_clamp_input_count() {
        let layout = FrameLayout::new(2, 2).unwrap();
        let mut buffers = vec![vec![0.0; 2]];
        for_each_local_slice(&layout, &mut buffers, 5, |_, slice| {
            assert_eq!(slice.inputs[0].len(), 1);
            assert!(slice.outputs[0].is_empty());
        })
        .unwrap();
    }

    #[test]
    fn local_slices_visit_in_order() {
        let layout = FrameLayout::new(8, 64).unwrap();
        let mut buffers = vec![vec![0.0; 64]];
        let mut seen = Vec::new();
        for_each_local_slice(&layout, &mut buffers, 0, |i, _| seen.push(i)).unwrap();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }
}
