use std::fs;
use std::path::Path;

use danmaku_lang::{Pattern, PatternError};

use crate::cli::diag::build_diag;

pub struct CheckArgs {
    pub verbose: bool,
}

/// Per-pattern outcome of one file.
pub struct CheckReport {
    pub ok: Vec<String>,
    pub errors: Vec<String>,
}

/// Loads and validates every pattern in `file`. A bad pattern is reported on
/// its own line and does not hide the others.
pub fn run(file: &Path, args: &CheckArgs) -> Result<CheckReport, String> {
    let source = fs::read_to_string(file).map_err(|e| format!("E_PATTERN_READ {} ({})", file.display(), e))?;
    let batch = Pattern::load_json_str(&source).map_err(|e| diag(file, &e))?;
    Ok(CheckReport {
        ok: batch.loaded.iter().map(|p| summary(p, args.verbose)).collect(),
        errors: batch.rejected.iter().map(|e| diag(file, e)).collect(),
    })
}

fn diag(file: &Path, err: &PatternError) -> String {
    let hint = match &err.pattern {
        Some(name) => format!("pattern={} field={}", name, err.field),
        None => format!("field={}", err.field),
    };
    build_diag(err.code(), &format!("{} {}", file.display(), err), Some(hint))
}

fn summary(pattern: &Pattern, verbose: bool) -> String {
    let program = pattern.program();
    let mut line = format!(
        "ok {} vars={} on_spawn={} update={} damage={} fingerprint={}",
        pattern.name(),
        pattern.frame().len(),
        program.on_spawn.len(),
        program.assignments.len(),
        pattern.damage(),
        &program.fingerprint()[..16]
    );
    if verbose {
        for assignment in program.on_spawn.iter() {
            line.push_str(&format!("\n  spawn  {} = {}", assignment.target, assignment.expr));
        }
        for assignment in program.assignments.iter() {
            line.push_str(&format!("\n  update {} = {}", assignment.target, assignment.expr));
        }
        line.push_str(&format!("\n  delete {}", program.delete));
    }
    line
}
