//! Result shape of a successful compile.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Output of one compile call for one target.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Hash over every chunk hash of the pass.
    pub hash: String,
    pub chunks: Vec<Chunk>,
    pub modules: ModuleGraph,
    pub errors: Vec<CompileError>,
    pub warnings: Vec<String>,
}

impl Stats {
    /// Named-chunk lookup.
    pub fn chunk(&self, name: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.name == name)
    }
}

/// One emitted chunk, named after its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    pub hash: String,
}

/// A module in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Entry name for root modules, source path otherwise.
    pub name: String,
    /// Id of the module that first imported this one. `None` for roots.
    pub issuer: Option<String>,
}

/// Module id → module info.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: FxHashMap<String, ModuleInfo>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module. The first issuer wins.
    pub fn insert(&mut self, id: impl Into<String>, info: ModuleInfo) -> bool {
        let id = id.into();
        if self.modules.contains_key(&id) {
            return false;
        }
        self.modules.insert(id, info);
        true
    }

    pub fn get(&self, id: &str) -> Option<&ModuleInfo> {
        self.modules.get(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompileErrorKind {
    ModuleNotFound,
    ModuleBuild,
}

/// A module-level compile error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    /// Id of the failing module, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl CompileError {
    pub fn not_found(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::ModuleNotFound,
            message: message.into(),
            module: Some(module.into()),
        }
    }

    pub fn build(module: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::ModuleBuild,
            message: message.into(),
            module,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_graph_first_issuer_wins() {
        let mut graph = ModuleGraph::new();
        assert!(graph.insert(
            "/p/lib.js",
            ModuleInfo { name: "/p/lib.js".into(), issuer: Some("/p/a.js".into()) }
        ));
        assert!(!graph.insert(
            "/p/lib.js",
            ModuleInfo { name: "/p/lib.js".into(), issuer: Some("/p/b.js".into()) }
        ));
        assert_eq!(graph.get("/p/lib.js").unwrap().issuer.as_deref(), Some("/p/a.js"));
    }

    #[test]
    fn test_named_chunk_lookup() {
        let stats = Stats {
            chunks: vec![Chunk { name: "pages/_document".into(), hash: "abc".into() }],
            ..Default::default()
        };
        assert_eq!(stats.chunk("pages/_document").map(|c| c.hash.as_str()), Some("abc"));
        assert!(stats.chunk("pages/about").is_none());
    }

    #[test]
    fn test_compile_error_json() {
        let err = CompileError::not_found("/p/a.js", "Module not found");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"kind":"moduleNotFound","message":"Module not found","module":"/p/a.js"}"#);
    }
}
