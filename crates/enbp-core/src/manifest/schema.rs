// ── Blueprint manifest schemas ──
//
// Two versions are recognized, distinguished by the `blueprint_spec` field.
// Each keeps the firmware entry path in a different place; `ManifestContent`
// hides that behind `lua_path()` / `rockspec()` / `display_name()`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::error::ManifestError;

const SPEC_FIELD: &str = "blueprint_spec";

/// Recognized `blueprint_spec` values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
pub enum BlueprintSpec {
    #[serde(rename = "device/1.0")]
    #[strum(serialize = "device/1.0")]
    V1,
    #[serde(rename = "device/3.0")]
    #[strum(serialize = "device/3.0")]
    V3,
}

impl BlueprintSpec {
    /// Classify arbitrary parsed YAML. `None` means "not a manifest".
    pub fn detect(value: &Value) -> Option<Self> {
        value.get(SPEC_FIELD)?.as_str()?.parse().ok()
    }
}

/// `true` if the value carries a recognized `blueprint_spec`.
pub fn is_manifest(value: &Value) -> bool {
    BlueprintSpec::detect(value).is_some()
}

pub fn is_v1(value: &Value) -> bool {
    BlueprintSpec::detect(value) == Some(BlueprintSpec::V1)
}

pub fn is_v3(value: &Value) -> bool {
    BlueprintSpec::detect(value) == Some(BlueprintSpec::V3)
}

// ── V1 ───────────────────────────────────────────────────────────────

/// `device/1.0` manifest. The firmware lives under a communication module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct V1Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_module: Option<CommunicationModule>,
    /// Multi-module form; only the first entry is consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_modules: Option<IndexMap<String, CommunicationModule>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationModule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lua_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lua: Option<LuaOptions>,
}

/// Shared by V1 `communication_module.lua` and V3 `runtime.options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LuaOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rockspec: Option<String>,
}

impl V1Content {
    /// `communication_module`, or the first `communication_modules` entry
    /// when the singular block is absent.
    fn module(&self) -> Option<&CommunicationModule> {
        self.communication_module.as_ref().or_else(|| {
            self.communication_modules
                .as_ref()
                .and_then(|modules| modules.values().next())
        })
    }

    fn lua_path(&self) -> Result<&str, ManifestError> {
        let module = self.module().ok_or(ManifestError::LuaPathNotFound)?;
        non_empty(module.lua_file.as_deref())
            .or_else(|| {
                let lua = module.lua.as_ref()?;
                non_empty(lua.file.as_deref()).or_else(|| non_empty(lua.dir.as_deref()))
            })
            .ok_or(ManifestError::LuaPathNotFound)
    }

    fn rockspec(&self) -> Option<&str> {
        non_empty(self.module()?.lua.as_ref()?.rockspec.as_deref())
    }
}

// ── V3 ───────────────────────────────────────────────────────────────

/// `device/3.0` manifest. The firmware lives under `runtime.options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct V3Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<LuaOptions>,
}

impl V3Content {
    fn options(&self) -> Result<&LuaOptions, ManifestError> {
        self.runtime
            .as_ref()
            .and_then(|r| r.options.as_ref())
            .ok_or(ManifestError::MissingRuntimeOptions)
    }

    fn lua_path(&self) -> Result<&str, ManifestError> {
        let options = self.options()?;
        non_empty(options.file.as_deref())
            .or_else(|| non_empty(options.dir.as_deref()))
            .ok_or(ManifestError::LuaPathNotFound)
    }

    fn rockspec(&self) -> Option<&str> {
        non_empty(self.options().ok()?.rockspec.as_deref())
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────

/// Parsed manifest content, one variant per schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestContent {
    V1(V1Content),
    V3(V3Content),
}

impl ManifestContent {
    /// Validate the discriminant and decode the version-specific shape.
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        let Some(spec) = BlueprintSpec::detect(&value) else {
            let found = value
                .get(SPEC_FIELD)
                .map(|v| v.as_str().map_or_else(|| format!("{v:?}"), str::to_owned));
            return Err(ManifestError::InvalidBlueprintManifest { found });
        };

        let malformed = |source: serde_yaml::Error| ManifestError::Malformed {
            spec: spec.into(),
            source,
        };

        match spec {
            BlueprintSpec::V1 => serde_yaml::from_value(value).map(Self::V1).map_err(malformed),
            BlueprintSpec::V3 => serde_yaml::from_value(value).map(Self::V3).map_err(malformed),
        }
    }

    pub fn spec(&self) -> BlueprintSpec {
        match self {
            Self::V1(_) => BlueprintSpec::V1,
            Self::V3(_) => BlueprintSpec::V3,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::V1(c) => c.display_name.as_deref(),
            Self::V3(c) => c.display_name.as_deref(),
        }
    }

    /// Firmware entry path. A single file always wins over a directory.
    pub fn lua_path(&self) -> Result<&str, ManifestError> {
        match self {
            Self::V1(c) => c.lua_path(),
            Self::V3(c) => c.lua_path(),
        }
    }

    /// Optional LuaRocks spec filename.
    pub fn rockspec(&self) -> Option<&str> {
        match self {
            Self::V1(c) => c.rockspec(),
            Self::V3(c) => c.rockspec(),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> Result<ManifestContent, ManifestError> {
        ManifestContent::from_value(serde_yaml::from_str(yaml).unwrap())
    }

    // ── Discriminant ─────────────────────────────────────────────────

    #[test]
    fn missing_spec_is_not_a_manifest() {
        let err = parse("display_name: x").unwrap_err();
        assert!(matches!(
            err,
            ManifestError::InvalidBlueprintManifest { found: None }
        ));
    }

    #[test]
    fn unknown_spec_is_reported() {
        let err = parse("blueprint_spec: device/2.0").unwrap_err();
        match err {
            ManifestError::InvalidBlueprintManifest { found } => {
                assert_eq!(found.as_deref(), Some("device/2.0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn classify_helpers() {
        let v1: Value = serde_yaml::from_str("blueprint_spec: device/1.0").unwrap();
        let v3: Value = serde_yaml::from_str("blueprint_spec: device/3.0").unwrap();
        let other: Value = serde_yaml::from_str("- a\n- b").unwrap();

        assert!(is_manifest(&v1) && is_v1(&v1) && !is_v3(&v1));
        assert!(is_manifest(&v3) && is_v3(&v3) && !is_v1(&v3));
        assert!(!is_manifest(&other));
        assert_eq!(BlueprintSpec::V3.to_string(), "device/3.0");
    }

    // ── V1 precedence ────────────────────────────────────────────────

    #[test]
    fn v1_lua_file_wins_over_everything() {
        let c = parse(
            "blueprint_spec: device/1.0
communication_module:
  lua_file: main.lua
  lua:
    file: other.lua
    dir: src
",
        )
        .unwrap();
        assert_eq!(c.lua_path().unwrap(), "main.lua");
    }

    #[test]
    fn v1_lua_file_over_dir() {
        let c = parse(
            "blueprint_spec: device/1.0
communication_module:
  lua:
    file: firmware.lua
    dir: src
",
        )
        .unwrap();
        assert_eq!(c.lua_path().unwrap(), "firmware.lua");
    }

    #[test]
    fn v1_dir_alone() {
        let c = parse(
            "blueprint_spec: device/1.0
communication_module:
  lua:
    dir: src
    rockspec: deps.rockspec
",
        )
        .unwrap();
        assert_eq!(c.lua_path().unwrap(), "src");
        assert_eq!(c.rockspec(), Some("deps.rockspec"));
    }

    #[test]
    fn v1_falls_back_to_first_module() {
        let c = parse(
            "blueprint_spec: device/1.0
display_name: Multi
communication_modules:
  first:
    lua:
      dir: first
  second:
    lua_file: second.lua
",
        )
        .unwrap();
        assert_eq!(c.lua_path().unwrap(), "first");
        assert_eq!(c.display_name(), Some("Multi"));
    }

    #[test]
    fn v1_singular_module_shadows_plural() {
        let c = parse(
            "blueprint_spec: device/1.0
communication_module:
  lua: {}
communication_modules:
  first:
    lua_file: first.lua
",
        )
        .unwrap();
        assert!(matches!(c.lua_path(), Err(ManifestError::LuaPathNotFound)));
    }

    #[test]
    fn v1_without_path_fails() {
        let c = parse("blueprint_spec: device/1.0\ncommunication_module: {}").unwrap();
        assert!(matches!(c.lua_path(), Err(ManifestError::LuaPathNotFound)));
        assert_eq!(c.rockspec(), None);
    }

    // ── V3 precedence ────────────────────────────────────────────────

    #[test]
    fn v3_file_over_dir() {
        let c = parse(
            "blueprint_spec: device/3.0
runtime:
  type: lua
  options:
    file: main.lua
    dir: src
",
        )
        .unwrap();
        assert_eq!(c.spec(), BlueprintSpec::V3);
        assert_eq!(c.lua_path().unwrap(), "main.lua");
    }

    #[test]
    fn v3_missing_options_is_shape_error() {
        let c = parse("blueprint_spec: device/3.0\nruntime:\n  type: lua").unwrap();
        assert!(matches!(
            c.lua_path(),
            Err(ManifestError::MissingRuntimeOptions)
        ));
    }

    #[test]
    fn v3_empty_options_is_path_error() {
        let c = parse("blueprint_spec: device/3.0\nruntime:\n  options: {}").unwrap();
        assert!(matches!(c.lua_path(), Err(ManifestError::LuaPathNotFound)));
    }

    #[test]
    fn v3_wrong_field_type_is_malformed() {
        let err = parse("blueprint_spec: device/3.0\nruntime:\n  options:\n    file: [1, 2]")
            .unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { spec: "device/3.0", .. }));
    }
}
