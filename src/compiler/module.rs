//! Built-in module compiler.
//!
//! Concatenates each entry with every module reachable through relative
//! `import` / `export .. from` / `require()` specifiers. Bare specifiers
//! (`react`) are treated as externals. The client target drops server
//! data-fetching exports so that editing them only changes server hashes.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

use super::{
    Chunk, CompileError, Compiler, CompilerFailure, EntryRequest, EntrySet, ModuleGraph,
    ModuleInfo, Stats, TargetConfig,
};
use crate::core::Target;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:\bimport\s*(?:[\w*{}\s,$]+?\s*from\s*)?|\bexport\s*[\w*{}\s,$]*?\s*from\s*|\brequire\s*\(\s*|\bimport\s*\(\s*)['"]([^'"\n]+)['"]"#,
    )
    .expect("valid regex")
});

static SERVER_ONLY_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"export\s+(?:async\s+)?function\s+(?:getServerSideProps|getStaticProps|getStaticPaths)\b",
    )
    .expect("valid regex")
});

/// Length of the hex hash kept for chunks.
const HASH_LEN: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleCompiler;

impl Compiler for ModuleCompiler {
    fn compile(&self, target: &TargetConfig, entries: &EntrySet) -> Result<Stats, CompilerFailure> {
        if target.extensions.is_empty() {
            return Err(CompilerFailure::Config("no page extensions configured".into()));
        }
        fs::create_dir_all(&target.output_dir)
            .map_err(|e| CompilerFailure::Io(target.output_dir.clone(), e))?;

        let mut stats = Stats::default();
        let mut pass = blake3::Hasher::new();

        for (name, request) in entries.iter() {
            let code = Bundle::new(target, &mut stats.modules, &mut stats.errors).build(name, request);
            let hash = short_hash(code.as_bytes());

            let path = target.chunk_path(name);
            write_chunk(&path, &code)?;

            pass.update(hash.as_bytes());
            stats.chunks.push(Chunk {
                name: name.to_string(),
                hash,
            });
        }

        stats.hash = pass.finalize().to_hex()[..HASH_LEN].to_string();
        Ok(stats)
    }
}

fn short_hash(bytes: &[u8]) -> String {
    hex::encode(&blake3::hash(bytes).as_bytes()[..HASH_LEN / 2])
}

fn write_chunk(path: &Path, code: &str) -> Result<(), CompilerFailure> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CompilerFailure::Io(parent.to_path_buf(), e))?;
    }
    fs::write(path, code).map_err(|e| CompilerFailure::Io(path.to_path_buf(), e))
}

/// One entry's worth of modules.
struct Bundle<'a> {
    target: &'a TargetConfig,
    graph: &'a mut ModuleGraph,
    errors: &'a mut Vec<CompileError>,
    seen: FxHashSet<String>,
    out: String,
}

impl<'a> Bundle<'a> {
    fn new(
        target: &'a TargetConfig,
        graph: &'a mut ModuleGraph,
        errors: &'a mut Vec<CompileError>,
    ) -> Self {
        Self {
            target,
            graph,
            errors,
            seen: FxHashSet::default(),
            out: String::new(),
        }
    }

    fn build(mut self, name: &str, request: &EntryRequest) -> String {
        // Root module id is the entry name; issuer walks end here.
        self.graph.insert(
            name,
            ModuleInfo {
                name: name.to_string(),
                issuer: None,
            },
        );
        self.out
            .push_str(&format!("// {} chunk {name}\n", self.target.target));

        let root = match request {
            EntryRequest::File(path) => match fs::read_to_string(path) {
                Ok(source) => Some((path.parent().map(Path::to_path_buf), source)),
                Err(e) => {
                    self.errors.push(CompileError::build(
                        Some(name.to_string()),
                        format!("Module build failed: cannot read `{}`: {e}", path.display()),
                    ));
                    None
                }
            },
            EntryRequest::Builtin(source) => Some((None, (*source).to_string())),
        };

        let mut queue = Vec::new();
        if let Some((dir, source)) = root {
            queue.push((name.to_string(), dir, source));
        }

        while let Some((id, dir, source)) = queue.pop() {
            let source = self.transform(&source);
            self.out.push_str(&format!("/* {id} */\n"));

            for specifier in relative_imports(&source) {
                let resolved = dir
                    .as_deref()
                    .and_then(|d| resolve_import(d, specifier, &self.target.extensions));
                let Some(path) = resolved else {
                    let dir = dir.as_deref().map(Path::display);
                    self.errors.push(CompileError::not_found(
                        id.clone(),
                        format!(
                            "Module not found: Can't resolve '{specifier}' in '{}'",
                            dir.map(|d| d.to_string()).unwrap_or_default()
                        ),
                    ));
                    self.out
                        .push_str(&format!("throw new Error(\"Cannot find module '{specifier}'\");\n"));
                    continue;
                };

                let child = path.to_string_lossy().into_owned();
                if !self.seen.insert(child.clone()) {
                    continue;
                }
                self.graph.insert(
                    child.clone(),
                    ModuleInfo {
                        name: child.clone(),
                        issuer: Some(id.clone()),
                    },
                );
                match fs::read_to_string(&path) {
                    Ok(child_source) => {
                        queue.push((child, path.parent().map(Path::to_path_buf), child_source))
                    }
                    Err(e) => self.errors.push(CompileError::build(
                        Some(child),
                        format!("Module build failed: cannot read `{}`: {e}", path.display()),
                    )),
                }
            }

            self.out.push_str(&source);
            if !source.ends_with('\n') {
                self.out.push('\n');
            }
        }

        self.out
    }

    fn transform<'s>(&self, source: &'s str) -> Cow<'s, str> {
        match self.target.target {
            Target::Client => strip_server_exports(source),
            Target::Server | Target::Edge => Cow::Borrowed(source),
        }
    }
}

/// Relative specifiers in source order.
fn relative_imports(source: &str) -> Vec<&str> {
    IMPORT
        .captures_iter(source)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| s.starts_with("./") || s.starts_with("../"))
        .collect()
}

/// Resolve `specifier` against `dir`: exact file, then `specifier.<ext>`, then `specifier/index.<ext>`.
fn resolve_import(dir: &Path, specifier: &str, extensions: &[String]) -> Option<PathBuf> {
    let base = dir.join(specifier);
    if base.is_file() {
        return Some(base);
    }
    extensions
        .iter()
        .map(|ext| {
            let mut path = base.clone().into_os_string();
            path.push(".");
            path.push(ext);
            PathBuf::from(path)
        })
        .chain(extensions.iter().map(|ext| base.join(format!("index.{ext}"))))
        .find(|p| p.is_file())
}

/// Remove `getServerSideProps` / `getStaticProps` / `getStaticPaths` bodies.
fn strip_server_exports(source: &str) -> Cow<'_, str> {
    if !SERVER_ONLY_EXPORT.is_match(source) {
        return Cow::Borrowed(source);
    }

    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(m) = SERVER_ONLY_EXPORT.find(rest) {
        out.push_str(&rest[..m.start()]);
        match matching_brace_end(&rest[m.end()..]) {
            Some(end) => rest = &rest[m.end() + end..],
            None => {
                rest = &rest[m.start()..];
                break;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Byte offset just past the brace closing the first `{` in `s`.
fn matching_brace_end(s: &str) -> Option<usize> {
    let open = s.find('{')?;
    let mut depth = 0usize;
    for (i, ch) in s[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
