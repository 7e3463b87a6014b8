//! Sample memory and channel views.
//!
//! Two kinds of sample storage reach a processor:
//!
//! - [`SharedChannel`]: one channel of memory shared between the host and the
//!   processing thread. Cloning a `SharedChannel` aliases the same samples.
//!   Samples are stored as `f32` bit patterns in `AtomicU32` cells (the same
//!   bit-cast trick as an atomic parameter), so both sides can touch the
//!   memory without locks or `unsafe`. Access is partitioned in time by the
//!   tick protocol: the host writes inputs before it posts a tick and reads
//!   outputs after the tick has run. The channel send/receive pair provides the
//!   ordering, so cell accesses use `Relaxed`.
//! - Plain `Vec<f32>` buffers moved in and out of the processing thread by the
//!   copy transport.
//!
//! A [`ChannelView`] is a fixed-length window over either kind. Processors only
//! ever see views, never the storage behind them.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// One channel of shared sample memory.
#[derive(Clone)]
pub struct SharedChannel {
    samples: Arc<[AtomicU32]>,
}

impl SharedChannel {
    /// Allocate a zeroed channel of `len` samples.
    pub fn new(len: usize) -> Self {
        Self {
            samples: (0..len).map(|_| AtomicU32::new(0.0_f32.to_bits())).collect(),
        }
    }

    /// Allocate a channel holding a copy of `samples`.
    pub fn from_samples(samples: &[f32]) -> Self {
        Self {
            samples: samples.iter().map(|s| AtomicU32::new(s.to_bits())).collect(),
        }
    }

    /// Number of samples in the channel.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the channel holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Read the sample at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        f32::from_bits(self.samples[index].load(Ordering::Relaxed))
    }

    /// Write the sample at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn set(&self, index: usize, value: f32) {
        self.samples[index].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Copy `dst.len()` samples starting at `offset` into `dst`.
    pub fn read_into(&self, offset: usize, dst: &mut [f32]) {
        for (i, out) in dst.iter_mut().enumerate() {
            *out = self.get(offset + i);
        }
    }

    /// Copy `src` into the channel starting at `offset`.
    pub fn write_from(&self, offset: usize, src: &[f32]) {
        for (i, &s) in src.iter().enumerate() {
            self.set(offset + i, s);
        }
    }

    /// Set every sample to `value`.
    pub fn fill(&self, value: f32) {
        for cell in self.samples.iter() {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// Snapshot the channel into a new vector.
    pub fn to_vec(&self) -> Vec<f32> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Returns true if both handles alias the same memory.
    pub fn ptr_eq(&self, other: &SharedChannel) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }

    /// Window of `range` over this channel, or `None` if it does not fit.
    pub fn window(&self, range: Range<usize>) -> Option<SharedWindow> {
        if range.start > range.end || range.end > self.len() {
            return None;
        }
        Some(SharedWindow {
            channel: self.clone(),
            start: range.start,
            len: range.end - range.start,
        })
    }
}

impl fmt::Debug for SharedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedChannel")
            .field("len", &self.len())
            .finish()
    }
}

/// A fixed window of consecutive samples inside a [`SharedChannel`].
#[derive(Clone, Debug)]
pub struct SharedWindow {
    channel: SharedChannel,
    start: usize,
    len: usize,
}

impl SharedWindow {
    /// Offset of the window's first sample in the channel.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of samples in the window.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The channel this window aliases.
    pub fn channel(&self) -> &SharedChannel {
        &self.channel
    }

    #[inline]
    fn get(&self, index: usize) -> f32 {
        debug_assert!(index < self.len, "window index {index} out of {}", self.len);
        self.channel.get(self.start + index)
    }

    #[inline]
    fn set(&self, index: usize, value: f32) {
        debug_assert!(index < self.len, "window index {index} out of {}", self.len);
        self.channel.set(self.start + index, value);
    }
}

/// A fixed-length run of samples handed to [`Processor::process`](crate::Processor::process).
pub enum ChannelView<'a> {
    /// Alias into shared memory (zero-copy transport).
    Shared(SharedWindow),
    /// Borrowed sub-slice of a transferred buffer (copy transport).
    Local(&'a mut [f32]),
}

impl ChannelView<'_> {
    /// Number of samples in the view.
    pub fn len(&self) -> usize {
        match self {
            ChannelView::Shared(w) => w.len(),
            ChannelView::Local(s) => s.len(),
        }
    }

    /// Returns true if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the sample at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        match self {
            ChannelView::Shared(w) => w.get(index),
            ChannelView::Local(s) => s[index],
        }
    }

    /// Write the sample at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) {
        match self {
            ChannelView::Shared(w) => w.set(index, value),
            ChannelView::Local(s) => s[index] = value,
        }
    }

    /// Copy the view into `dst` (up to the shorter of the two lengths).
    pub fn read_into(&self, dst: &mut [f32]) {
        match self {
            ChannelView::Shared(w) => {
                let n = dst.len().min(w.len());
                w.channel.read_into(w.start, &mut dst[..n]);
            }
            ChannelView::Local(s) => {
                let n = dst.len().min(s.len());
                dst[..n].copy_from_slice(&s[..n]);
            }
        }
    }

    /// Overwrite the view from `src` (up to the shorter of the two lengths).
    pub fn write_from(&mut self, src: &[f32]) {
        match self {
            ChannelView::Shared(w) => {
                let n = src.len().min(w.len());
                w.channel.write_from(w.start, &src[..n]);
            }
            ChannelView::Local(s) => {
                let n = src.len().min(s.len());
                s[..n].copy_from_slice(&src[..n]);
            }
        }
    }

    /// Set every sample in the view to `value`.
    pub fn fill(&mut self, value: f32) {
        match self {
            ChannelView::Shared(w) => {
                for i in 0..w.len() {
                    w.set(i, value);
                }
            }
            ChannelView::Local(s) => s.fill(value),
        }
    }

    /// Iterate over the samples in the view.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// The shared window behind this view, if it is a zero-copy view.
    pub fn as_shared(&self) -> Option<&SharedWindow> {
        match self {
            ChannelView::Shared(w) => Some(w),
            ChannelView::Local(_) => None,
        }
    }
}

impl fmt::Debug for ChannelView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelView::Shared(w) => f
                .debug_struct("Shared")
                .field("start", &w.start())
                .field("len", &w.len())
                .finish(),
            ChannelView::Local(s) => f.debug_struct("Local").field("len", &s.len()).finish(),
        }
    }
}

/// One bus: an ordered list of channel views.
pub type Bus<'a> = Vec<ChannelView<'a>>;
