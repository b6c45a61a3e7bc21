use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use danmaku_core::{Signal, SignalSink};
use serde_json::{json, Value as JsonValue};

pub fn build_diag(code: &str, detail: &str, hint: Option<String>) -> String {
    let mut out = format!("{} {}", code, detail);
    if let Some(h) = hint {
        if !h.is_empty() {
            out.push_str(&format!(" hint={}", h));
        }
    }
    out
}

pub fn signal_json(signal: &Signal, seq: u64) -> JsonValue {
    match signal {
        Signal::Fault(record) => json!({
            "level": "error",
            "event": signal.name(),
            "tick": record.tick_id,
            "seq": seq,
            "stage": record.stage.name(),
            "pattern": record.pattern,
            "instance": record.instance.map(|id| id.raw()),
            "code": record.code,
            "message": record.message,
        }),
        Signal::PoolMiss { tick_id, id } => json!({
            "level": "warn",
            "event": signal.name(),
            "tick": tick_id,
            "seq": seq,
            "instance": id.raw(),
            "code": "E_POOL_NOT_LIVE",
        }),
        Signal::Diag { tick_id, detail, .. } => json!({
            "level": "info",
            "event": signal.name(),
            "tick": tick_id,
            "seq": seq,
            "detail": detail,
        }),
    }
}

/// Writes one JSON object per signal. Faults are echoed to stderr as
/// `E_CODE detail` lines whether or not a file is attached.
pub struct JsonlSink {
    out: Option<BufWriter<File>>,
    seq: u64,
    fault_count: u64,
    write_error: Option<String>,
}

impl JsonlSink {
    pub fn open(path: Option<&Path>) -> Result<Self, String> {
        let out = match path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent).map_err(|e| format!("E_DIAG_WRITE {}", e))?;
                    }
                }
                let file = File::create(path).map_err(|e| format!("E_DIAG_WRITE {} ({})", path.display(), e))?;
                Some(BufWriter::new(file))
            }
            None => None,
        };
        Ok(Self {
            out,
            seq: 0,
            fault_count: 0,
            write_error: None,
        })
    }

    /// Free-form event outside the tick loop, e.g. the run config.
    pub fn event(&mut self, value: JsonValue) {
        self.write_line(&value);
    }

    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    pub fn finish(mut self) -> Result<(), String> {
        if let Some(out) = self.out.as_mut() {
            if let Err(err) = out.flush() {
                self.write_error.get_or_insert_with(|| err.to_string());
            }
        }
        match self.write_error {
            Some(err) => Err(format!("E_DIAG_WRITE {}", err)),
            None => Ok(()),
        }
    }

    fn write_line(&mut self, value: &JsonValue) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        if self.write_error.is_some() {
            return;
        }
        if let Err(err) = writeln!(out, "{}", value) {
            self.write_error = Some(err.to_string());
        }
    }
}

impl SignalSink for JsonlSink {
    fn emit(&mut self, signal: Signal) {
        self.seq += 1;
        if let Signal::Fault(record) = &signal {
            self.fault_count += 1;
            let detail = match record.instance {
                Some(id) => format!("tick={} pattern={} instance={} {}", record.tick_id, record.pattern, id, record.message),
                None => format!("tick={} pattern={} {}", record.tick_id, record.pattern, record.message),
            };
            eprintln!("{}", build_diag(record.code, &detail, None));
        }
        let value = signal_json(&signal, self.seq);
        self.write_line(&value);
    }
}
