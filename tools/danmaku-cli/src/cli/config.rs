use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use danmaku_core::{PlayerPosition, TickId, Value};
use danmaku_lang::LiteralDef;
use danmaku_sim::VolleyShape;
use serde::Deserialize;

/// JSON run description. Every field has a default so a config can be as
/// small as `{}`; command line flags override what is here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Pattern files, relative to the config file.
    #[serde(default)]
    pub patterns: Vec<PathBuf>,
    #[serde(default)]
    pub seed: Option<SeedDef>,
    #[serde(default)]
    pub dt: Option<f64>,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub player: Option<PlayerDef>,
    #[serde(default)]
    pub spawns: Vec<SpawnDef>,
    #[serde(default)]
    pub volleys: Vec<VolleyDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SeedDef {
    Number(u64),
    Text(String),
}

impl SeedDef {
    pub fn resolve(&self) -> Result<u64, String> {
        match self {
            SeedDef::Number(n) => Ok(*n),
            SeedDef::Text(text) => parse_seed(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerDef {
    pub x: f64,
    pub y: f64,
}

impl PlayerDef {
    pub fn position(&self) -> PlayerPosition {
        PlayerPosition::at(self.x, self.y)
    }
}

/// One bullet of `pattern` queued before tick `at_tick`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnDef {
    pub pattern: String,
    #[serde(default = "first_tick")]
    pub at_tick: TickId,
    #[serde(default)]
    pub set: BTreeMap<String, LiteralDef>,
}

impl SpawnDef {
    pub fn overrides(&self) -> Vec<(&str, Value)> {
        self.set
            .iter()
            .map(|(name, literal)| (name.as_str(), literal.to_value()))
            .collect()
    }
}

/// A batch of one compiled pattern queued before tick `at_tick`, repeated
/// every `every` ticks when set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolleyDef {
    pub pattern: String,
    #[serde(default = "first_tick")]
    pub at_tick: TickId,
    #[serde(default)]
    pub every: Option<TickId>,
    #[serde(default)]
    pub origin: [f64; 2],
    pub shape: ShapeDef,
}

impl VolleyDef {
    pub fn fires_at(&self, tick: TickId) -> bool {
        match self.every {
            Some(every) if every > 0 => tick >= self.at_tick && (tick - self.at_tick) % every == 0,
            _ => tick == self.at_tick,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ShapeDef {
    Ring {
        count: usize,
        #[serde(default)]
        offset: f64,
    },
    Fan {
        count: usize,
        center: f64,
        spread: f64,
    },
    Spiral {
        count: usize,
        #[serde(default)]
        start: f64,
        step: f64,
    },
}

impl ShapeDef {
    pub fn to_shape(&self) -> VolleyShape {
        match *self {
            ShapeDef::Ring { count, offset } => VolleyShape::Ring { count, offset },
            ShapeDef::Fan {
                count,
                center,
                spread,
            } => VolleyShape::Fan {
                count,
                center,
                spread,
            },
            ShapeDef::Spiral { count, start, step } => VolleyShape::Spiral { count, start, step },
        }
    }
}

fn first_tick() -> TickId {
    1
}

pub fn load_config(path: &Path) -> Result<RunConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("E_CONFIG_READ {} ({})", path.display(), e))?;
    let mut config: RunConfig =
        serde_json::from_str(&text).map_err(|e| format!("E_CONFIG_JSON {} ({})", path.display(), e))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    config.patterns = config
        .patterns
        .iter()
        .map(|p| if p.is_absolute() { p.clone() } else { base.join(p) })
        .collect();
    Ok(config)
}

/// Decimal or `0x` hex.
pub fn parse_seed(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if let Some(hex) = trimmed.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        trimmed.parse::<u64>().map_err(|e| e.to_string())
    }
}
