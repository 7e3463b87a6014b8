//! Worklet Core - processing capability and block slicing
//!
//! This crate holds the pieces of the worklet runtime that do not depend on
//! threads or message routing: what a processor is, how sample memory is
//! shared with the host, and how an outer block is cut into render-quantum
//! slices.
//!
//! # Core Abstractions
//!
//! ## Processing
//!
//! - [`Processor`] - The single capability every module instance provides
//! - [`ProcessorOptions`] / [`ProcessorInit`] - What a constructor receives
//! - [`BusArity`] / [`BusLayout`] - Construction-time capability check
//! - [`ParamSet`] - Per-slice parameter values (always empty from the dispatcher)
//!
//! ## Sample Memory
//!
//! - [`SharedChannel`] - Lock-free shared channel memory for zero-copy transport
//! - [`ChannelView`] - Fixed-length window handed to processors
//!
//! ## Frame Adapter
//!
//! - [`FrameLayout`] - `num_slices` / render quantum geometry
//! - [`shared_slices`] - Precomputed zero-copy slices
//! - [`for_each_local_slice`] - Per-tick slices over transferred buffers
//!
//! ## Metadata and Messaging
//!
//! - [`ParameterDescriptor`] - Published with every registration
//! - [`MessagePort`] - Per-instance channel, opaque to the runtime
//!
//! # Example
//!
//! ```rust
//! use worklet_core::{FrameLayout, SharedChannel, shared_slices};
//!
//! let layout = FrameLayout::new(32, 128).unwrap();
//! let input = SharedChannel::new(128);
//! let output = SharedChannel::new(128);
//!
//! let slices = shared_slices(&layout, &[vec![input]], &[vec![output.clone()]]).unwrap();
//! assert_eq!(slices.len(), 4);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: the zero-copy tick path allocates nothing
//! - **No `unsafe`**: shared memory is atomic cells, not raw pointers
//! - **Ordered**: slices are always visited in ascending index order

pub mod buffer;
pub mod param_info;
pub mod port;
pub mod processor;
pub mod slice;

pub use buffer::{Bus, ChannelView, SharedChannel, SharedWindow};
pub use param_info::{AutomationRate, ParameterDescriptor};
pub use port::MessagePort;
pub use processor::{
    BusArity, BusLayout, ConstructError, ParamSet, Processor, ProcessorInit, ProcessorOptions,
};
pub use slice::{
    FrameLayout, RemainderPolicy, Slice, SliceError, for_each_local_slice, shared_slices,
};
