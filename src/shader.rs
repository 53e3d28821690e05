//! Loading and checking the WGSL shader programs.
//!
//! Each stage lives in its own file under the shader directory. A file is
//! read whole, parsed and validated with naga, and checked for the entry
//! point its stage needs before any GPU object is created from it, so a
//! broken shader is reported with the compiler's own diagnostic at startup.
//! The slots a shader declares are checked against the [`BindingLayout`]
//! the pipelines are built with, so a layout that drifts from the WGSL
//! fails as a link error instead of a device validation panic.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use tracing::debug;

use crate::binding::BindingLayout;
use crate::error::ShaderError;
use crate::gpu::GpuContext;

/// The three programs the application runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Compute,
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub fn entry_point(&self) -> &'static str {
        match self {
            ShaderKind::Compute => "main",
            ShaderKind::Vertex => "vs_main",
            ShaderKind::Fragment => "fs_main",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ShaderKind::Compute => "particles.wgsl",
            ShaderKind::Vertex => "vert.wgsl",
            ShaderKind::Fragment => "frag.wgsl",
        }
    }

    pub fn stage(&self) -> naga::ShaderStage {
        match self {
            ShaderKind::Compute => naga::ShaderStage::Compute,
            ShaderKind::Vertex => naga::ShaderStage::Vertex,
            ShaderKind::Fragment => naga::ShaderStage::Fragment,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ShaderKind::Compute => "compute",
            ShaderKind::Vertex => "vertex",
            ShaderKind::Fragment => "fragment",
        }
    }
}

/// A shader that parsed, validated and exposes its entry point.
#[derive(Debug)]
pub struct LoadedShader {
    pub kind: ShaderKind,
    pub path: PathBuf,
    pub source: String,
    pub module: naga::Module,
}

impl LoadedShader {
    /// Workgroup size of the entry point, if it is a compute shader.
    pub fn workgroup_size(&self) -> Option<[u32; 3]> {
        self.entry()
            .filter(|ep| ep.stage == naga::ShaderStage::Compute)
            .map(|ep| ep.workgroup_size)
    }

    /// Every `(group, binding)` pair declared by a global resource.
    pub fn resource_bindings(&self) -> BTreeSet<(u32, u32)> {
        self.module
            .global_variables
            .iter()
            .filter_map(|(_, var)| var.binding.as_ref())
            .map(|b| (b.group, b.binding))
            .collect()
    }

    /// `@location` inputs of the entry point, including struct members.
    pub fn input_locations(&self) -> BTreeSet<u32> {
        let mut locations = BTreeSet::new();
        let Some(entry) = self.entry() else {
            return locations;
        };
        for arg in &entry.function.arguments {
            match &arg.binding {
                Some(naga::Binding::Location { location, .. }) => {
                    locations.insert(*location);
                }
                Some(naga::Binding::BuiltIn(_)) => {}
                None => {
                    if let naga::TypeInner::Struct { members, .. } = &self.module.types[arg.ty].inner {
                        for member in members {
                            if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                                locations.insert(*location);
                            }
                        }
                    }
                }
            }
        }
        locations
    }

    /// Check the declared slots against the ones the pipeline will bind.
    pub fn check_layout(&self, layout: &BindingLayout) -> Result<(), ShaderError> {
        let group = |slots: &[u32]| slots.iter().map(|&s| (0u32, s)).collect::<BTreeSet<_>>();
        let resources = match self.kind {
            ShaderKind::Compute => group(&[layout.positions, layout.velocities, layout.particle_data]),
            ShaderKind::Vertex => group(&[layout.camera]),
            ShaderKind::Fragment => BTreeSet::new(),
        };
        let declared = self.resource_bindings();
        if declared != resources {
            return Err(self.mismatch(
                "bindings",
                declared.iter().map(|(g, b)| format!("@group({}) @binding({})", g, b)),
                resources.iter().map(|(g, b)| format!("@group({}) @binding({})", g, b)),
            ));
        }

        if self.kind == ShaderKind::Vertex {
            let declared = self.input_locations();
            let expected = BTreeSet::from([layout.position_attribute]);
            if declared != expected {
                return Err(self.mismatch(
                    "vertex inputs",
                    declared.iter().map(|l| format!("@location({})", l)),
                    expected.iter().map(|l| format!("@location({})", l)),
                ));
            }
        }
        Ok(())
    }

    fn mismatch(
        &self,
        what: &str,
        declared: impl Iterator<Item = String>,
        expected: impl Iterator<Item = String>,
    ) -> ShaderError {
        ShaderError::Link {
            program: self.kind.label().to_string(),
            log: format!(
                "{} declares {} [{}] but the pipeline binds [{}]",
                self.path.display(),
                what,
                declared.collect::<Vec<_>>().join(", "),
                expected.collect::<Vec<_>>().join(", ")
            ),
        }
    }

    fn entry(&self) -> Option<&naga::EntryPoint> {
        let name = self.kind.entry_point();
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.name == name && ep.stage == self.kind.stage())
    }

    /// Create the wgpu module. Errors the device raises while doing so are
    /// reported against this shader's path.
    pub fn create_module(&self, ctx: &GpuContext) -> Result<wgpu::ShaderModule, ShaderError> {
        let (module, error) = ctx.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(self.kind.file_name()),
                source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
            })
        });
        match error {
            Some(e) => Err(ShaderError::Compile {
                path: self.path.clone(),
                log: e.to_string(),
            }),
            None => Ok(module),
        }
    }
}

/// Read and check the shader at `path`.
pub fn load_shader(path: &Path, kind: ShaderKind) -> Result<LoadedShader, ShaderError> {
    let source = fs::read_to_string(path).map_err(|source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded {} shader from {}", kind.label(), path.display());
    compile(source, path, kind)
}

/// Parse, validate and link-check `source`. `path` is only used in diagnostics.
pub fn compile(source: String, path: &Path, kind: ShaderKind) -> Result<LoadedShader, ShaderError> {
    let module = wgsl::parse_str(&source).map_err(|e| ShaderError::Compile {
        path: path.to_path_buf(),
        log: e.emit_to_string(&source),
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    if let Err(e) = validator.validate(&module) {
        return Err(ShaderError::Compile {
            path: path.to_path_buf(),
            log: e.emit_to_string(&source),
        });
    }

    let shader = LoadedShader {
        kind,
        path: path.to_path_buf(),
        source,
        module,
    };
    if shader.entry().is_none() {
        return Err(ShaderError::Link {
            program: kind.label().to_string(),
            log: format!(
                "{} has no @{} entry point named `{}`",
                path.display(),
                kind.label(),
                kind.entry_point()
            ),
        });
    }
    Ok(shader)
}

/// The compute, vertex and fragment programs, loaded from one directory.
#[derive(Debug)]
pub struct ShaderSet {
    pub compute: LoadedShader,
    pub vertex: LoadedShader,
    pub fragment: LoadedShader,
}

impl ShaderSet {
    pub fn load(dir: &Path) -> Result<Self, ShaderError> {
        let load = |kind: ShaderKind| load_shader(&dir.join(kind.file_name()), kind);
        Ok(Self {
            compute: load(ShaderKind::Compute)?,
            vertex: load(ShaderKind::Vertex)?,
            fragment: load(ShaderKind::Fragment)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_shader(name: &str, source: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "particles-shader-{}-{}.wgsl",
            std::process::id(),
            name
        ));
        fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("particles-shader-does-not-exist.wgsl");
        assert!(matches!(
            load_shader(&path, ShaderKind::Compute),
            Err(ShaderError::Io { .. })
        ));
    }

    #[test]
    fn test_syntax_error_reports_diagnostic() {
        let path = temp_shader("syntax", "@compute @workgroup_size(1) fn main( {");
        let err = load_shader(&path, ShaderKind::Compute).unwrap_err();
        let _ = fs::remove_file(&path);

        match err {
            ShaderError::Compile { log, .. } => assert!(!log.is_empty()),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_type_error_fails_validation() {
        let path = temp_shader(
            "types",
            "@compute @workgroup_size(1) fn main() { let x: f32 = 1u; }",
        );
        let err = load_shader(&path, ShaderKind::Compute);
        let _ = fs::remove_file(&path);
        assert!(matches!(err, Err(ShaderError::Compile { .. })));
    }

    #[test]
    fn test_missing_entry_point_is_link_error() {
        let path = temp_shader("entry", "@compute @workgroup_size(64) fn step() {}");
        let err = load_shader(&path, ShaderKind::Compute);
        let _ = fs::remove_file(&path);
        assert!(matches!(err, Err(ShaderError::Link { .. })));
    }

    #[test]
    fn test_wrong_stage_is_link_error() {
        let source = "@fragment fn vs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = compile(source.to_string(), Path::new("inline.wgsl"), ShaderKind::Vertex);
        assert!(matches!(err, Err(ShaderError::Link { .. })));
    }

    fn shipped() -> ShaderSet {
        ShaderSet::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders")).unwrap()
    }

    #[test]
    fn test_shipped_shaders_match_default_layout() {
        let shaders = shipped();
        let layout = BindingLayout::default();

        assert_eq!(
            shaders.compute.resource_bindings(),
            BTreeSet::from([(0, 0), (0, 1), (0, 2)])
        );
        assert_eq!(shaders.vertex.input_locations(), BTreeSet::from([0]));
        assert!(shaders.compute.check_layout(&layout).is_ok());
        assert!(shaders.vertex.check_layout(&layout).is_ok());
        assert!(shaders.fragment.check_layout(&layout).is_ok());
    }

    #[test]
    fn test_shifted_storage_slot_is_link_error() {
        let layout = BindingLayout {
            positions: 4,
            ..Default::default()
        };
        assert!(layout.validate().is_ok());

        match shipped().compute.check_layout(&layout) {
            Err(ShaderError::Link { program, log }) => {
                assert_eq!(program, "compute");
                assert!(log.contains("@binding(4)"), "{}", log);
            }
            other => panic!("expected link error, got {:?}", other),
        }
    }

    #[test]
    fn test_shifted_vertex_inputs_are_link_errors() {
        let shaders = shipped();

        let moved_attribute = BindingLayout {
            position_attribute: 3,
            ..Default::default()
        };
        assert!(matches!(
            shaders.vertex.check_layout(&moved_attribute),
            Err(ShaderError::Link { .. })
        ));

        let moved_camera = BindingLayout {
            camera: 1,
            ..Default::default()
        };
        assert!(matches!(
            shaders.vertex.check_layout(&moved_camera),
            Err(ShaderError::Link { .. })
        ));
        // the fragment stage binds nothing, so the camera slot is irrelevant to it
        assert!(shaders.fragment.check_layout(&moved_camera).is_ok());
    }

    #[test]
    fn test_workgroup_size() {
        let shader = compile(
            "@compute @workgroup_size(64) fn main() {}".to_string(),
            Path::new("inline.wgsl"),
            ShaderKind::Compute,
        )
        .unwrap();
        assert_eq!(shader.workgroup_size(), Some([64, 1, 1]));
    }
}
