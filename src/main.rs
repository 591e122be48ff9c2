//! xdna-prof: counter and trace configuration for AMD XDNA AI Engine arrays
//!
//! Drives the configuration engine against the in-memory register model:
//! metric settings are parsed from the config file, encoded into the wire
//! request, configured, polled and released, with a summary of every step.

use xdna_prof::config::Config;
use xdna_prof::device::{ModuleKind, RegisterModel, TileLoc, TileSpec};
use xdna_prof::metrics::{CoreSet, InterfaceSet};
use xdna_prof::profile::ProfileTile;
use xdna_prof::session::DeviceSession;
use xdna_prof::settings;
use xdna_prof::trace::{CoreTraceSet, TraceParams, TraceTile};
use xdna_prof::wire;

/// Columns of the demo partition.
const DEMO_COLUMNS: [u8; 4] = [0, 1, 2, 3];

/// AIE rows per column in the demo partition.
const DEMO_AIE_ROWS: u8 = 2;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let config = Config::get();
    let gen = config.generation();
    let row_offset = gen.row_offset();

    println!("xdna-prof: {:?} partition, {} columns x {} AIE rows", gen, DEMO_COLUMNS.len(), DEMO_AIE_ROWS);
    println!();

    let mut device = DeviceSession::new(gen, Box::new(RegisterModel::new()));

    run_profile(&mut device, config, row_offset)?;
    run_trace(&mut device, config, row_offset)?;

    Ok(())
}

/// AIE tile positions of the demo partition, in configuration order.
fn aie_grid(row_offset: u8) -> Vec<TileLoc> {
    let mut grid = Vec::new();
    for &col in &DEMO_COLUMNS {
        for row in 0..DEMO_AIE_ROWS {
            grid.push(TileLoc::new(col, row_offset + row));
        }
    }
    grid
}

/// Full profiling cycle: configure, report, poll once, release.
fn run_profile(
    device: &mut DeviceSession,
    config: &Config,
    row_offset: u8,
) -> anyhow::Result<()> {
    println!("Profiling");
    println!("=========");

    let grid = aie_grid(row_offset);

    // Core counters from the tile metric settings
    let entries = settings::settings_entries(&config.profile_metrics());
    let mut tile_map = settings::parse_tile_metrics(&entries, row_offset, &grid);
    settings::normalize_sets(&mut tile_map, CoreSet::HeatMap.name(), |n| {
        CoreSet::from_name(n).is_some()
    });

    // Interface counters from the column settings
    let entries = settings::settings_entries(&config.interface_metrics());
    let mut interface_map = settings::parse_interface_metrics(&entries, &DEMO_COLUMNS);
    settings::normalize_sets(&mut interface_map, InterfaceSet::InputThroughputs.name(), |n| {
        InterfaceSet::from_name(n).is_some()
    });

    let mut tiles = Vec::new();
    for (loc, binding) in &tile_map {
        let Some(set) = CoreSet::from_name(&binding.set) else {
            continue;
        };
        let mut tile =
            ProfileTile::new(TileSpec::new(loc.col, loc.row), ModuleKind::Core, set.to_wire());
        tile.channel0 = binding.channel0;
        tile.channel1 = binding.channel1;
        tiles.push(tile);
    }
    for (loc, binding) in &interface_map {
        let Some(set) = InterfaceSet::from_name(&binding.set) else {
            continue;
        };
        let mut tile =
            ProfileTile::new(TileSpec::new(loc.col, 0), ModuleKind::Shim, set.to_wire());
        tile.channel0 = binding.channel0;
        tiles.push(tile);
    }
    if tiles.is_empty() {
        println!("No tiles selected by the metric settings, skipping");
        println!();
        return Ok(());
    }

    // Configure from the encoded request, exactly as a host would send it
    let mut request = vec![0u8; wire::profile_input_size(tiles.len())];
    wire::encode_profile_input(&tiles, row_offset, &mut request)?;
    println!("Request: {} tiles, {} bytes", tiles.len(), request.len());

    let profile = device.configure_profile(&request)?;
    device.messages().emit();

    println!();
    println!("Configured {} counters:", profile.records().len());
    println!("   id  tile    ctr  module     start  end  payload");
    for rec in profile.records() {
        let module = ModuleKind::from_wire_index(rec.module).map(|k| k.name()).unwrap_or("?");
        println!(
            "  {:>3}  ({},{})  {:>3}  {:<9}  {:>5}  {:>3}  0x{:X}",
            rec.counter_id, rec.col, rec.row, rec.counter_num, module, rec.start_event,
            rec.end_event, rec.payload
        );
    }

    let mut configuration = vec![0u8; profile.configuration_size()];
    let written = profile.write_configuration(&mut configuration)?;
    println!("Configuration block: {} bytes", written);

    // One poll pass; the register model reads back reset state
    let mut poll_out = vec![0u8; profile.poll_size()];
    profile.poll(device, &mut poll_out)?;
    let samples = wire::decode_profile_output(&poll_out)?;
    println!();
    println!("Polled {} counters:", samples.len());
    for sample in &samples {
        println!(
            "  {:>3}  ({},{})  value {:>10}  timer {:>10}",
            sample.counter_id, sample.col, sample.row, sample.counter_value, sample.timer_value
        );
    }

    profile.release(device);
    println!("Counters released");
    println!();
    Ok(())
}

/// Full trace cycle: configure, report, flush, release.
fn run_trace(device: &mut DeviceSession, config: &Config, row_offset: u8) -> anyhow::Result<()> {
    println!("Trace");
    println!("=====");

    let grid = aie_grid(row_offset);
    let entries = settings::settings_entries(&config.trace_metrics());
    let mut trace_map = settings::parse_tile_metrics(&entries, row_offset, &grid);
    settings::normalize_sets(&mut trace_map, CoreTraceSet::Functions.name(), |n| {
        CoreTraceSet::from_name(n).is_some()
    });

    let mut tiles = Vec::new();
    for (loc, binding) in &trace_map {
        let Some(set) = CoreTraceSet::from_name(&binding.set) else {
            continue;
        };
        let mut tile = TraceTile::new(TileSpec::new(loc.col, loc.row), set.to_wire());
        tile.channel0 = binding.channel0;
        tile.channel1 = binding.channel1;
        tiles.push(tile);
    }
    if tiles.is_empty() {
        println!("No tiles selected by the metric settings, skipping");
        return Ok(());
    }

    let params = trace_params(config);
    let mut request = vec![0u8; wire::trace_input_size(tiles.len())];
    wire::encode_trace_input(&tiles, &params, row_offset, device.generation().to_wire(), &mut request)?;
    println!("Request: {} tiles, {} bytes", tiles.len(), request.len());

    let mut trace = device.configure_trace(&request)?;
    device.messages().emit();

    println!();
    println!("Configured trace on {} tiles:", trace.records().len());
    for rec in trace.records() {
        let core_events = rec.core.traced_events.iter().filter(|&&e| e != 0).count();
        let memory_events = rec.memory.traced_events.iter().filter(|&&e| e != 0).count();
        println!(
            "  ({},{})  set {}  {} core + {} memory events  start {}  stop {}",
            rec.col, rec.row, rec.metric_id, core_events, memory_events, rec.core.start_event,
            rec.core.stop_event
        );
    }

    let mut configuration = vec![0u8; trace.configuration_size()];
    let written = trace.write_configuration(&mut configuration)?;
    println!("Configuration block: {} bytes", written);

    // Diagnostics travel back in the fixed message block
    let mut messages = vec![0u8; wire::MESSAGE_BLOCK_SIZE];
    device.write_messages(&mut messages)?;
    println!("Message block: {} entries", device.messages().len());

    trace.flush(device)?;
    println!("Flush events fired");

    trace.release(device);
    println!("Trace resources released");
    Ok(())
}

/// Trace start control from the config knobs. User control wins over an
/// iteration count, which wins over a plain delay.
fn trace_params(config: &Config) -> TraceParams {
    let mut params =
        TraceParams { counter_scheme: config.counter_scheme(), ..Default::default() };
    if config.user_control.unwrap_or(false) {
        params.use_user_control = true;
    } else if let Some(iterations) = config.trace_iterations {
        params.use_graph_iterator = true;
        params.iteration_count = iterations;
    } else if let Some(start) = &config.trace_start {
        let cycles = settings::parse_start_cycles(start, config.clock_freq_mhz());
        if cycles > 0 {
            params.use_delay = true;
            params.delay_cycles = cycles;
            params.use_one_delay_counter = cycles <= u32::MAX as u64;
        }
    }
    params
}
