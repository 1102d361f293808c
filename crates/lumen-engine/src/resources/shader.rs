use std::path::Path;

use anyhow::{Context, Result};

/// Reads WGSL source text from `path`.
///
/// The text is passed to wgpu unchanged; compilation errors are reported by
/// the device's error handler when the module is created.
pub fn load_shader_source(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("could not read shader file {}", path.display()))?;
    log::debug!("loaded shader {} ({} bytes)", path.display(), source.len());
    Ok(source)
}

/// Creates a shader module from WGSL `source`.
pub fn create_shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn source_is_returned_verbatim() {
        let text = "@compute @workgroup_size(1)\nfn main() {}\r\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        assert_eq!(load_shader_source(file.path()).unwrap(), text);
    }

    #[test]
    fn missing_shader_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_shader_source(dir.path().join("nope.wgsl")).unwrap_err();

        assert!(format!("{err:#}").contains("nope.wgsl"));
    }
}
