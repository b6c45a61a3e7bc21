use std::fs;
use std::path::{Path, PathBuf};

use danmaku_core::{PlayerPosition, ThreadMode, TickContext, TickId};
use danmaku_sim::{BulletView, PatternLibrary, SimulationDriver, TickReport};
use serde::Serialize;
use serde_json::json;

use crate::cli::config::{load_config, RunConfig};
use crate::cli::diag::{build_diag, JsonlSink};

const DEFAULT_TICKS: u64 = 600;
const DEFAULT_DT: f64 = 1.0 / 60.0;

pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub patterns: Vec<PathBuf>,
    pub seed: Option<u64>,
    pub ticks: Option<u64>,
    pub dt: Option<f64>,
    pub threads: Option<usize>,
    pub diag_jsonl: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub quiet: bool,
}

/// Effective settings after config and flags are merged.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub config: RunConfig,
    pub seed: u64,
    pub ticks: u64,
    pub dt: f64,
    pub thread_mode: ThreadMode,
    pub player: PlayerPosition,
}

pub fn plan(options: &RunOptions) -> Result<RunPlan, String> {
    let mut config = match options.config.as_deref() {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };
    config.patterns.extend(options.patterns.iter().cloned());

    let seed = match (options.seed, config.seed.as_ref()) {
        (Some(seed), _) => seed,
        (None, Some(seed)) => seed.resolve().map_err(|e| format!("E_CLI_BAD_SEED {}", e))?,
        (None, None) => 0,
    };
    let ticks = options.ticks.or(config.ticks).unwrap_or(DEFAULT_TICKS);
    let dt = options.dt.or(config.dt).unwrap_or(DEFAULT_DT);
    if !(dt.is_finite() && dt > 0.0) {
        return Err(format!("E_CLI_DT dt must be a positive number, got {}", dt));
    }
    let threads = options.threads.or(config.threads).unwrap_or(1);
    let player = config
        .player
        .map(|p| p.position())
        .unwrap_or_default();
    Ok(RunPlan {
        config,
        seed,
        ticks,
        dt,
        thread_mode: ThreadMode::from_threads(threads),
        player,
    })
}

#[derive(Serialize)]
struct BulletOut<'a> {
    id: u64,
    pattern: &'a str,
    x: f64,
    y: f64,
    texture: &'a str,
    texture_handle: String,
    damage: i64,
}

impl<'a> From<&'a BulletView> for BulletOut<'a> {
    fn from(view: &'a BulletView) -> Self {
        Self {
            id: view.id.raw(),
            pattern: &view.pattern,
            x: view.x,
            y: view.y,
            texture: &view.texture,
            texture_handle: view.texture_handle.to_hex(),
            damage: view.damage,
        }
    }
}

pub fn run(options: RunOptions) -> Result<(), String> {
    let plan = plan(&options)?;
    let mut sink = JsonlSink::open(options.diag_jsonl.as_deref())?;
    sink.event(json!({
        "level": "info",
        "event": "run_config",
        "tick": 0,
        "seq": 0,
        "seed": format!("0x{:x}", plan.seed),
        "ticks": plan.ticks,
        "dt": plan.dt,
        "threads": format!("{:?}", plan.thread_mode.resolve()),
        "pattern_files": plan.config.patterns.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
    }));

    let library = load_library(&plan.config.patterns, &mut sink)?;
    sink.event(json!({
        "level": "info",
        "event": "library",
        "tick": 0,
        "seq": 0,
        "patterns": library.names(),
    }));
    check_references(&plan.config, &library)?;

    let mut driver = SimulationDriver::new(plan.thread_mode.clone())?;
    let mut last: Option<TickReport> = None;
    for tick in 1..=plan.ticks {
        schedule(&plan.config, &library, &driver, tick)?;
        let ctx = TickContext::new(tick, plan.dt)
            .with_player(plan.player)
            .with_seed(plan.seed);
        let report = driver.tick(&ctx, &mut sink);
        if !options.quiet {
            println!(
                "tick={} live={} realized={} deleted={} faults={} hash={}",
                report.tick,
                report.live_count,
                report.realized.len(),
                report.deleted.len(),
                report.faults.len(),
                report.state_hash.to_hex()
            );
        }
        last = Some(report);
    }

    let final_hash = driver.state_hash().to_hex();
    println!("final_hash={} live={} faults={}", final_hash, driver.live_count(), sink.fault_count());
    if let Some(out) = options.out.as_deref() {
        write_out(out, &plan, &driver, last.as_ref())?;
    }
    sink.finish()
}

/// Bundled patterns plus `files`. Bad definitions become load faults on
/// `sink`; only unreadable files stop the run.
fn load_library(files: &[PathBuf], sink: &mut JsonlSink) -> Result<PatternLibrary, String> {
    let mut library = PatternLibrary::builtin().map_err(|e| e.to_string())?;
    for path in files {
        let text = fs::read_to_string(path).map_err(|e| format!("E_PATTERN_READ {} ({})", path.display(), e))?;
        library
            .load_json_str(&text, &mut *sink)
            .map_err(|e| format!("{} file={}", e, path.display()))?;
    }
    Ok(library)
}

/// Queues this tick's configured spawns and volleys.
fn schedule(config: &RunConfig, library: &PatternLibrary, driver: &SimulationDriver, tick: TickId) -> Result<(), String> {
    for spawn in config.spawns.iter().filter(|s| s.at_tick == tick) {
        let bullet = library
            .instantiate(&spawn.pattern, &spawn.overrides())
            .map_err(|e| build_diag(e.code(), &format!("spawn pattern={} {}", spawn.pattern, e), None))?;
        driver.spawn(bullet);
    }
    for volley in config.volleys.iter().filter(|v| v.fires_at(tick)) {
        let pattern = library.get(&volley.pattern).ok_or_else(|| {
            let err = library.missing(&volley.pattern);
            build_diag(
                err.code(),
                &format!("volley {}", err),
                Some("volleys take compiled patterns".to_string()),
            )
        })?;
        driver
            .spawn_volley(pattern, (volley.origin[0], volley.origin[1]), &volley.shape.to_shape())
            .map_err(|e| build_diag(e.code(), &format!("volley pattern={} {}", volley.pattern, e), None))?;
    }
    Ok(())
}

fn check_references(config: &RunConfig, library: &PatternLibrary) -> Result<(), String> {
    let names = config
        .spawns
        .iter()
        .map(|s| s.pattern.as_str())
        .chain(config.volleys.iter().map(|v| v.pattern.as_str()));
    for name in names {
        if !library.contains(name) {
            let err = library.missing(name);
            return Err(build_diag(
                err.code(),
                name,
                Some(format!("known: {}", library.names().join(","))),
            ));
        }
    }
    Ok(())
}

fn write_out(path: &Path, plan: &RunPlan, driver: &SimulationDriver, last: Option<&TickReport>) -> Result<(), String> {
    let views = driver.views();
    let bullets: Vec<BulletOut<'_>> = views.iter().map(BulletOut::from).collect();
    let doc = json!({
        "seed": format!("0x{:x}", plan.seed),
        "ticks": plan.ticks,
        "dt": plan.dt,
        "final_hash": driver.state_hash().to_hex(),
        "last_tick": last.map(|r| r.tick),
        "live": bullets,
    });
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| format!("E_OUT_WRITE {}", e))?;
        }
    }
    let text = serde_json::to_string_pretty(&doc).map_err(|e| format!("E_OUT_WRITE {}", e))?;
    fs::write(path, text + "\n").map_err(|e| format!("E_OUT_WRITE {} ({})", path.display(), e))
}
