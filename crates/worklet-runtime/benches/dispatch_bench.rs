//! Criterion benchmarks for the tick path
//!
//! Run with: cargo bench -p worklet-runtime
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use worklet_core::{FrameLayout, MessagePort, ProcessorInit, ProcessorOptions, shared_slices};
use worklet_registry::{ConstructedProcessor, Gain};
use worklet_runtime::{Dispatcher, NodeId, ProcessorId, TickResult, Transport};

const OUTER_BLOCK: usize = 1024;
const QUANTA: &[usize] = &[32, 64, 128, 256];
const CHANNELS: usize = 2;

fn gain(options: ProcessorOptions) -> ConstructedProcessor {
    let (_host, port) = MessagePort::pair();
    let input_channel_count = options.input_channels();
    ConstructedProcessor {
        processor: Box::new(Gain::new(ProcessorInit {
            options,
            sample_rate: 48000.0,
            port,
        })),
        input_channel_count,
    }
}

fn bench_zero_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("ZeroCopyTick");

    for &quantum in QUANTA {
        let layout = FrameLayout::new(quantum, OUTER_BLOCK).unwrap();
        let audio = worklet_runtime::AudioBuses::io_pair(CHANNELS, OUTER_BLOCK);
        let slices = shared_slices(&layout, &audio.input, &audio.output).unwrap();

        let mut dispatcher = Dispatcher::new();
        let id = dispatcher.insert(
            "Gain",
            NodeId(1),
            gain(ProcessorOptions::new(quantum, OUTER_BLOCK)),
            layout,
            Transport::SharedMemory { slices },
        );

        group.bench_with_input(BenchmarkId::new("quantum", quantum), &quantum, |b, _| {
            b.iter(|| black_box(dispatcher.process_tick(black_box(id), None)));
        });
    }

    group.finish();
}

fn bench_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("CopyTick");

    for &quantum in QUANTA {
        let layout = FrameLayout::new(quantum, OUTER_BLOCK).unwrap();
        let mut dispatcher = Dispatcher::new();
        let id = dispatcher.insert(
            "Gain",
            NodeId(1),
            gain(ProcessorOptions::new(quantum, OUTER_BLOCK).with_input_channels(CHANNELS)),
            layout,
            Transport::Copy,
        );

        group.bench_with_input(BenchmarkId::new("quantum", quantum), &quantum, |b, _| {
            let mut buf = Some(vec![vec![0.25; OUTER_BLOCK]; CHANNELS * 2]);
            b.iter(|| {
                if let TickResult::Returned { buf: back, .. } =
                    dispatcher.process_tick(black_box(id), buf.take())
                {
                    buf = Some(back);
                }
            });
        });
    }

    group.finish();
}

fn bench_dropped(c: &mut Criterion) {
    let mut dispatcher = Dispatcher::new();
    c.bench_function("DroppedTick", |b| {
        b.iter(|| black_box(dispatcher.process_tick(black_box(ProcessorId(999)), None)));
    });
}

criterion_group!(benches, bench_zero_copy, bench_copy, bench_dropped);
criterion_main!(benches);
