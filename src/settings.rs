//! Metric specification strings.
//!
//! Runtime settings name tiles and metric sets in text form. Tile-based
//! entries come in three shapes, later shapes overriding earlier ones
//! per tile:
//!
//! ```text
//! all:<set>[:<ch0>[:<ch1>]]
//! {c0,r0}:{c1,r1}:<set>[:<ch0>[:<ch1>]]
//! {c,r}:<set>[:<ch0>[:<ch1>]]
//! ```
//!
//! Interface tiles use column forms instead: `all`, `<min>:<max>` or
//! `<col>`, each followed by the set name and an optional channel. Rows
//! in tile atoms are relative to the module's first row; malformed or
//! inactive positions are skipped with a warning, never an error.

use crate::device::TileLoc;
use log::warn;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Metric set bound to one tile, with optional channel selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricBinding {
    pub set: String,
    pub channel0: Option<u8>,
    pub channel1: Option<u8>,
}

impl MetricBinding {
    fn named(set: &str) -> Self {
        Self { set: set.to_string(), channel0: None, channel1: None }
    }
}

/// Per-tile metric bindings in configuration order.
pub type MetricMap = BTreeMap<TileLoc, MetricBinding>;

/// Compiled regex patterns for settings parsing.
struct Patterns {
    /// Matches a start time with an optional unit suffix: `20us`
    start_time: Regex,
    /// Matches a tile position: `{1,3}`
    tile_atom: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    start_time: Regex::new(r"^\s*(\d+\.?\d*)\s*(s|ms|us|ns|)\s*$").unwrap(),
    tile_atom: Regex::new(r"^\{(\d+),(\d+)\}$").unwrap(),
});

/// Split a settings string into entries: spaces stripped, `;` separated,
/// empty entries dropped.
pub fn settings_entries(text: &str) -> Vec<String> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    stripped.split(';').filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Parse tile-based metric entries for AIE or mem tiles.
///
/// `base_row` turns relative rows into absolute ones; positions outside
/// `valid` are skipped. Single-tile entries override ranges, ranges
/// override `all`.
pub fn parse_tile_metrics(entries: &[String], base_row: u8, valid: &[TileLoc]) -> MetricMap {
    let mut map = MetricMap::new();
    let split: Vec<Vec<&str>> = entries.iter().map(|e| e.split(':').collect()).collect();

    for parts in &split {
        if parts[0] != "all" || parts.len() < 2 {
            continue;
        }
        for &loc in valid {
            map.insert(loc, MetricBinding::named(parts[1]));
        }
        if parts.len() > 2 {
            apply_channels(&mut map, valid.iter().copied(), parts[2], parts[parts.len() - 1]);
        }
    }

    for parts in &split {
        if parts[0] == "all" || parts.len() < 3 {
            continue;
        }
        // Both leading atoms must be positions, else this is the single
        // form handled below.
        let Some((max_col, max_row)) = tile_atom(parts[1]) else {
            continue;
        };
        let Some((min_col, min_row)) = tile_atom(parts[0]) else {
            warn!("tile range specification {:?} is not valid, skipped", parts.join(":"));
            continue;
        };
        if min_col > max_col || min_row > max_row {
            warn!("tile range specification {:?} is not valid, skipped", parts.join(":"));
            continue;
        }
        let mut covered = Vec::new();
        for col in min_col..=max_col {
            for row in min_row..=max_row {
                let loc = TileLoc::new(col, row + base_row);
                if !valid.contains(&loc) {
                    warn!("specified tile {loc} is not active, skipped");
                    continue;
                }
                map.insert(loc, MetricBinding::named(parts[2]));
                covered.push(loc);
            }
        }
        if parts.len() > 3 {
            apply_channels(&mut map, covered.into_iter(), parts[3], parts[parts.len() - 1]);
        }
    }

    for parts in &split {
        if parts[0] == "all" || parts.len() < 2 || tile_atom(parts[1]).is_some() {
            continue;
        }
        let Some((col, row)) = tile_atom(parts[0]) else {
            warn!("tile specification {:?} is not valid, skipped", parts.join(":"));
            continue;
        };
        let loc = TileLoc::new(col, row + base_row);
        if !valid.contains(&loc) {
            warn!("specified tile {loc} is not active, skipped");
            continue;
        }
        map.insert(loc, MetricBinding::named(parts[1]));
        if parts.len() > 2 {
            apply_channels(&mut map, std::iter::once(loc), parts[2], parts[parts.len() - 1]);
        }
    }

    map
}

/// Parse column-based metric entries for interface tiles. The optional
/// trailing channel selects the monitored DMA channel.
pub fn parse_interface_metrics(entries: &[String], columns: &[u8]) -> MetricMap {
    let mut map = MetricMap::new();
    let split: Vec<Vec<&str>> = entries.iter().map(|e| e.split(':').collect()).collect();

    for parts in &split {
        if parts[0] != "all" || parts.len() < 2 {
            continue;
        }
        let channel = parts.get(2).and_then(|c| c.parse().ok());
        for &col in columns {
            let mut binding = MetricBinding::named(parts[1]);
            binding.channel0 = channel;
            map.insert(TileLoc::new(col, 0), binding);
        }
    }

    for parts in &split {
        if parts[0] == "all" || parts.len() < 3 {
            continue;
        }
        // Both leading atoms must be columns, else this is the single
        // form handled below.
        let Ok(max_col) = parts[1].parse::<u8>() else {
            continue;
        };
        let Ok(min_col) = parts[0].parse::<u8>() else {
            warn!("minimum column in {:?} is not an integer, skipped", parts.join(":"));
            continue;
        };
        let channel = parts.get(3).and_then(|c| c.parse().ok());
        for col in min_col..=max_col {
            if !columns.contains(&col) {
                warn!("specified column {col} is not active, skipped");
                continue;
            }
            let mut binding = MetricBinding::named(parts[2]);
            binding.channel0 = channel;
            map.insert(TileLoc::new(col, 0), binding);
        }
    }

    for parts in &split {
        if parts[0] == "all" || parts.len() < 2 {
            continue;
        }
        let Ok(col) = parts[0].parse::<u8>() else {
            warn!("column specification {:?} is not valid, skipped", parts.join(":"));
            continue;
        };
        if parts[1].parse::<u8>().is_ok() {
            continue;
        }
        if !columns.contains(&col) {
            warn!("specified column {col} is not active, skipped");
            continue;
        }
        let channel = parts.get(2).and_then(|c| c.parse().ok());
        let mut binding = MetricBinding::named(parts[1]);
        binding.channel0 = channel;
        map.insert(TileLoc::new(col, 0), binding);
    }

    map
}

/// Drop `off` tiles and replace unknown set names with the default.
pub fn normalize_sets(map: &mut MetricMap, default_set: &str, known: impl Fn(&str) -> bool) {
    map.retain(|_, binding| !binding.set.is_empty() && binding.set != "off");
    let mut warned = false;
    for binding in map.values_mut() {
        if known(&binding.set) {
            continue;
        }
        if !warned {
            warn!("unable to find metric set {}, using default of {default_set}", binding.set);
            warned = true;
        }
        binding.set = default_set.to_string();
    }
}

/// Trace start time in clock cycles.
///
/// Accepts a bare cycle count or a time with an `s`/`ms`/`us`/`ns`
/// suffix scaled by the array clock. Anything unparseable becomes 0
/// with a warning.
pub fn parse_start_cycles(text: &str, freq_mhz: f64) -> u64 {
    let lowered = text.to_lowercase();
    let cycles_per_sec = freq_mhz * 1e6;
    let parsed = PATTERNS.start_time.captures(&lowered).and_then(|caps| {
        let value: f64 = caps[1].parse().ok()?;
        let cycles = match &caps[2] {
            "s" => value * cycles_per_sec,
            "ms" => value * cycles_per_sec / 1e3,
            "us" => value * cycles_per_sec / 1e6,
            "ns" => value * cycles_per_sec / 1e9,
            _ => value,
        };
        Some(cycles as u64)
    });
    match parsed {
        Some(cycles) => cycles,
        None => {
            warn!("unable to parse trace start time {text:?}, starting at 0 cycles");
            0
        }
    }
}

/// Channel numbers from the entry tail. A single trailing number is
/// passed as both, so it selects both channels.
fn apply_channels(
    map: &mut MetricMap,
    tiles: impl Iterator<Item = TileLoc>,
    first: &str,
    last: &str,
) {
    let (Ok(ch0), Ok(ch1)) = (first.parse::<u8>(), last.parse::<u8>()) else {
        warn!("channel specifications {first:?}/{last:?} are not valid, ignored");
        return;
    };
    for loc in tiles {
        if let Some(binding) = map.get_mut(&loc) {
            binding.channel0 = Some(ch0);
            binding.channel1 = Some(ch1);
        }
    }
}

/// `{col,row}` atom.
fn tile_atom(text: &str) -> Option<(u8, u8)> {
    let caps = PATTERNS.tile_atom.captures(text)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}
