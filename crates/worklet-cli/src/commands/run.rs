//! Session runner: play the host side of the protocol against a real
//! processing thread.

use std::f32::consts::TAU;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, ValueEnum};
use worklet_config::{RuntimeConfig, SessionConfig, TransportMode};
use worklet_core::{ProcessorOptions, SharedChannel};
use worklet_registry::ModuleLibrary;
use worklet_runtime::{
    AudioBuses, ControlHandle, ControlMessage, CreateProcessorArgs, Event, LifecycleState, NodeId,
    ProcessingThread, ProcessorId,
};

use super::common::peak;

/// How long to wait for the processing thread to answer a fence.
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Node id used for the single simulated node.
const NODE: NodeId = NodeId(1);

#[derive(Clone, Copy, ValueEnum)]
enum TransportArg {
    /// Shared memory, no buffers cross the channel
    Shared,
    /// Buffers are moved to the processing thread and back every tick
    Copy,
}

impl From<TransportArg> for TransportMode {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Shared => TransportMode::Shared,
            TransportArg::Copy => TransportMode::Copy,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Module script to import
    #[arg(long)]
    script: Option<String>,

    /// Module to instantiate
    #[arg(short, long)]
    module: Option<String>,

    /// Render quantum in samples
    #[arg(short, long)]
    quantum: Option<usize>,

    /// Outer block length in samples
    #[arg(short, long)]
    block: Option<usize>,

    /// Channels per bus
    #[arg(long)]
    channels: Option<usize>,

    /// Sample transport
    #[arg(short, long, value_enum)]
    transport: Option<TransportArg>,

    /// Number of ticks to run
    #[arg(short = 'n', long)]
    ticks: Option<usize>,

    /// Initial gain, passed as processorOptions.gain
    #[arg(long)]
    gain: Option<f32>,

    /// Test tone frequency in Hz
    #[arg(long, default_value = "440")]
    frequency: f32,

    /// Print every event from the processing thread as JSON
    #[arg(long)]
    events: bool,
}

impl RunArgs {
    fn apply(&self, session: &mut SessionConfig) {
        if let Some(script) = &self.script {
            session.script.clone_from(script);
        }
        if let Some(module) = &self.module {
            session.module.clone_from(module);
        }
        if let Some(q) = self.quantum {
            session.render_quantum = q;
        }
        if let Some(b) = self.block {
            session.outer_block = b;
        }
        if let Some(c) = self.channels {
            session.channels = c;
        }
        if let Some(t) = self.transport {
            session.transport = t.into();
        }
        if let Some(n) = self.ticks {
            session.ticks = n;
        }
    }
}

/// Test tone for one tick, continuous across ticks.
fn tone(tick: usize, len: usize, frequency: f32, sample_rate: f32) -> Vec<f32> {
    let start = tick * len;
    (0..len)
        .map(|i| 0.5 * (TAU * frequency * (start + i) as f32 / sample_rate).sin())
        .collect()
}

struct Host {
    control: ControlHandle,
    print_events: bool,
    next_token: u64,
}

impl Host {
    fn post(&self, message: ControlMessage) -> anyhow::Result<()> {
        Ok(self.control.post(message)?)
    }

    /// Wait until everything posted so far is handled; returns the events.
    fn sync(&mut self) -> anyhow::Result<Vec<Event>> {
        let token = self.next_token;
        self.next_token += 1;
        let events = self.control.sync(token, SYNC_TIMEOUT)?;
        if self.print_events {
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
        }
        Ok(events)
    }
}

pub fn run(args: RunArgs, mut config: RuntimeConfig) -> anyhow::Result<()> {
    args.apply(&mut config.session);
    config.validate()?;
    let session = config.session.clone();

    let (control, thread) = ProcessingThread::spawn(&config, ModuleLibrary::builtin())
        .context("starting processing thread")?;
    let mut host = Host {
        control,
        print_events: args.events,
        next_token: 0,
    };

    host.post(ControlMessage::Init {
        sample_rate: config.sample_rate,
        origin: config.origin.clone(),
    })?;
    host.post(ControlMessage::Import {
        url: session.script.clone(),
    })?;

    let mut options = ProcessorOptions::new(session.render_quantum, session.outer_block)
        .with_input_channels(session.channels);
    if let Some(gain) = args.gain {
        options = options.with_processor_options(serde_json::json!({ "gain": gain }));
    }

    let shared = session
        .transport
        .is_shared()
        .then(|| AudioBuses::io_pair(session.channels, session.outer_block));
    let create = match &shared {
        Some(audio) => CreateProcessorArgs::shared(&session.module, NODE, options, audio.clone()),
        None => CreateProcessorArgs::copy(&session.module, NODE, options),
    };
    host.post(ControlMessage::create(create))?;

    let id = host
        .sync()?
        .iter()
        .find_map(|event| match event {
            Event::State {
                node: Some(NODE),
                processor: Some(id),
                state: LifecycleState::Running,
            } => Some(*id),
            _ => None,
        });
    let Some(id) = id else {
        bail!(
            "'{}' from '{}' did not start (see log for the reason)",
            session.module,
            session.script
        );
    };

    let num_slices = session.outer_block / session.render_quantum;
    println!(
        "{} ({:?}): {} x {} samples per {}-sample tick, {} channel(s)",
        session.module,
        session.transport,
        num_slices,
        session.render_quantum,
        session.outer_block,
        session.channels
    );

    for tick in 0..session.ticks {
        let input = tone(tick, session.outer_block, args.frequency, config.sample_rate);
        let out_peak = match &shared {
            Some(audio) => tick_shared(&mut host, id, audio, &input)?,
            None => tick_copy(&mut host, id, session.channels, &input)?,
        };
        println!(
            "tick {tick:>4}: in {:.3}  out {:.3}",
            peak(input.iter().copied()),
            out_peak
        );
    }

    drop(host);
    let handled = thread.join()?;
    tracing::info!("session finished after {handled} messages");
    Ok(())
}

fn tick_shared(
    host: &mut Host,
    id: ProcessorId,
    audio: &AudioBuses,
    input: &[f32],
) -> anyhow::Result<f32> {
    for channel in audio.input.iter().flatten() {
        channel.write_from(0, input);
    }
    host.post(ControlMessage::Process {
        processor: id,
        buf: None,
    })?;
    host.sync()?;
    Ok(peak(
        audio
            .output
            .iter()
            .flatten()
            .flat_map(SharedChannel::to_vec),
    ))
}

fn tick_copy(
    host: &mut Host,
    id: ProcessorId,
    channels: usize,
    input: &[f32],
) -> anyhow::Result<f32> {
    let mut buf = vec![input.to_vec(); channels];
    buf.extend((0..channels).map(|_| vec![0.0; input.len()]));
    host.post(ControlMessage::Process {
        processor: id,
        buf: Some(buf),
    })?;

    let events = host.sync()?;
    let returned = events.into_iter().find_map(|event| match event {
        Event::Process { buf, node } if node == NODE => Some(buf),
        _ => None,
    });
    let Some(buf) = returned else {
        bail!("tick dropped: no buffers came back");
    };
    Ok(peak(buf.into_iter().skip(channels).flatten()))
}
