use cpusim::*;
use clap::Parser;
use log::*;
use serde_json::json;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One of: mux, counter, bus, bridge, hier
    #[arg(long, default_value = "counter")]
    demo: String,

    /// Clock edges to run after the initial settle.
    #[arg(long, default_value_t = 0)]
    steps: u64,

    /// Track which signals were causally used.
    #[arg(long, default_value_t = false)]
    usage: bool,

    /// Print the runtime state as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Cap the clock frequency.
    #[arg(long)]
    hz: Option<f64>,

    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug)?;

    let Some(schematic) = demo::schematic(&args.demo) else {
        anyhow::bail!("Unknown demo {}. Try one of: {}", args.demo, demo::NAMES.join(", "));
    };
    let library = demo::library();
    let mut sim = Sim::new(&library, &schematic).with_usage_tracking(args.usage);
    if let Some(hz) = args.hz {
        sim = sim.cap_clock_freq(hz);
    }

    for diagnostic in sim.diagnostics() {
        eprintln!("{diagnostic}");
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_running = running.clone();
    ctrlc::set_handler(move || handler_running.store(false, Ordering::SeqCst))?;

    for _ in 0..args.steps {
        if !running.load(Ordering::SeqCst) || sim.halted() {
            break;
        }
        sim.step();
    }
    if let Some(reason) = sim.halt_reason() {
        println!("Halted: {reason}");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot(&sim))?);
    } else {
        print_nets(&sim);
    }
    info!("{} clocks at {:.2} clocks per second", sim.clock_ticks(), sim.clocks_per_second());
    Ok(())
}

fn snapshot(sim: &Sim) -> serde_json::Value {
    let system = sim.system();

    let comps: Vec<serde_json::Value> = system
        .comps
        .iter()
        .enumerate()
        .map(|(comp_idx, comp)| {
            let ports: serde_json::Map<String, serde_json::Value> = comp
                .port_ids
                .iter()
                .filter_map(|port_id| {
                    let state = sim.port_state(comp_idx, port_id)?;
                    let port = json!({
                        "value": state.value,
                        "enabled": state.io_enabled,
                        "dir": state.io_dir.to_string(),
                        "used": state.used,
                        "resolved": state.resolved,
                    });
                    Some((port_id.clone(), port))
                })
                .collect();
            json!({
                "path": system.comp_path(comp_idx).to_string(),
                "def": comp.def_id,
                "valid": comp.valid,
                "ports": ports,
            })
        })
        .collect();

    let nets: Vec<serde_json::Value> = (0..system.nets.len())
        .filter_map(|net_idx| {
            let state = sim.net_state(net_idx)?;
            Some(json!({
                "path": system.net_path(net_idx).to_string(),
                "value": state.value,
                "width": state.width,
                "tristate": state.tristate,
                "enabled": state.enabled_count,
            }))
        })
        .collect();

    json!({
        "clock": sim.clock_ticks(),
        "halted": sim.halted(),
        "haltReason": sim.halt_reason(),
        "comps": comps,
        "nets": nets,
    })
}

fn print_nets(sim: &Sim) {
    let system = sim.system();
    for net_idx in 0..system.nets.len() {
        let Some(state) = sim.net_state(net_idx) else {
            continue;
        };
        let note = match (state.tristate, state.enabled_count) {
            (true, 0) => " (floating)",
            (true, 1) => "",
            (true, _) => " (conflict)",
            (false, _) => "",
        };
        println!("{:<24} {:>#6x}{note}", system.net_path(net_idx).to_string(), state.value);
    }
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    use chrono::{DateTime, Utc};

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let level = std::env::var("LEVEL").unwrap_or_default();

    if debug || level == "DEBUG" {
        dispatch = dispatch.level(log::LevelFilter::Debug);
    } else {
        dispatch = dispatch.level(log::LevelFilter::Info);
    }

    dispatch.apply().map_err(|err| anyhow::anyhow!("{err}"))?;
    Ok(())
}
