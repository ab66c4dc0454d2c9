use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a manifest or resolving its derived paths.
///
/// Shape errors (`InvalidBlueprintManifest`, `MissingRuntimeOptions`,
/// `LuaPathNotFound`) require editing the manifest. `NotLoaded` is a call
/// ordering bug.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest {path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },

    #[error("Manifest is not valid YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),

    #[error("Not a blueprint manifest: {}", describe_spec(.found.as_deref()))]
    InvalidBlueprintManifest { found: Option<String> },

    #[error("Manifest does not match the {spec} schema: {source}")]
    Malformed {
        spec: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Manifest has no runtime.options block")]
    MissingRuntimeOptions,

    #[error("Manifest does not specify a Lua file or directory")]
    LuaPathNotFound,

    #[error("Invalid Lua path in manifest: {path}")]
    InvalidLuaPath { path: String },

    #[error("Manifest path has no file name: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Manifest not loaded")]
    NotLoaded,
}

fn describe_spec(found: Option<&str>) -> String {
    match found {
        Some(spec) => format!("unsupported blueprint_spec {spec:?}"),
        None => "missing blueprint_spec".into(),
    }
}
