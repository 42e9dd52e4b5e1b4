//! In-memory compiler for orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use crossbeam::channel::{self, Receiver, Sender};

use super::{
    Chunk, CompileError, Compiler, CompilerFailure, EntrySet, ModuleGraph, ModuleInfo, Stats,
    TargetConfig,
};
use crate::core::Target;

/// Returns chunks whose hashes come from a per-(target, entry) table.
///
/// Entries without a scripted hash get `"h0"`. Errors are attached to the
/// named root entry through a child module so attribution walks the issuer.
#[derive(Default)]
pub struct ScriptedCompiler {
    hashes: Mutex<FxHashMap<(Target, String), String>>,
    errors: Mutex<FxHashMap<(Target, String), String>>,
    fatal: Mutex<FxHashMap<Target, String>>,
    calls: [AtomicUsize; 3],
    seen: Mutex<Vec<(Target, Vec<String>)>>,
    gate: Mutex<Option<Receiver<()>>>,
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hash(&self, target: Target, entry: &str, hash: &str) {
        self.hashes
            .lock()
            .insert((target, entry.to_string()), hash.to_string());
    }

    pub fn set_error(&self, target: Target, entry: &str, message: &str) {
        self.errors
            .lock()
            .insert((target, entry.to_string()), message.to_string());
    }

    pub fn clear_error(&self, target: Target, entry: &str) {
        self.errors.lock().remove(&(target, entry.to_string()));
    }

    pub fn set_fatal(&self, target: Target, message: Option<&str>) {
        let mut fatal = self.fatal.lock();
        match message {
            Some(m) => fatal.insert(target, m.to_string()),
            None => fatal.remove(&target),
        };
    }

    /// Block compile calls until the returned sender is dropped.
    pub fn hold(&self) -> Sender<()> {
        let (tx, rx) = channel::bounded(0);
        *self.gate.lock() = Some(rx);
        tx
    }

    pub fn calls(&self, target: Target) -> usize {
        self.calls[target as usize].load(Ordering::SeqCst)
    }

    /// How many calls for `target` included `entry`.
    pub fn participations(&self, target: Target, entry: &str) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|(t, names)| *t == target && names.iter().any(|n| n == entry))
            .count()
    }
}

impl Compiler for ScriptedCompiler {
    fn compile(&self, target: &TargetConfig, entries: &EntrySet) -> Result<Stats, CompilerFailure> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            while gate.recv().is_ok() {}
        }

        let t = target.target;
        self.calls[t as usize].fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .push((t, entries.names().map(String::from).collect()));

        if let Some(message) = self.fatal.lock().get(&t) {
            return Err(CompilerFailure::Config(message.clone()));
        }

        let hashes = self.hashes.lock();
        let errors = self.errors.lock();
        let mut stats = Stats {
            hash: format!("pass-{}", self.calls(t)),
            ..Default::default()
        };
        let mut modules = ModuleGraph::new();

        for name in entries.names() {
            modules.insert(
                name,
                ModuleInfo {
                    name: name.to_string(),
                    issuer: None,
                },
            );
            let key = (t, name.to_string());
            if let Some(message) = errors.get(&key) {
                let child = format!("{name}/component.js");
                modules.insert(
                    child.clone(),
                    ModuleInfo {
                        name: child.clone(),
                        issuer: Some(name.to_string()),
                    },
                );
                stats.errors.push(CompileError::not_found(child, message.clone()));
            }
            stats.chunks.push(Chunk {
                name: name.to_string(),
                hash: hashes.get(&key).cloned().unwrap_or_else(|| "h0".to_string()),
            });
        }
        stats.modules = modules;
        Ok(stats)
    }
}
