use std::fmt;

/// Position of a resource in the creation chain.
///
/// Ordering follows dependency: a resource may only depend on resources of an
/// earlier (or equal) stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Stage {
    Instance,
    Surface,
    Adapter,
    Device,
    Queue,
    Shader,
    BindGroupLayout,
    PipelineLayout,
    Pipeline,
    Buffer,
    BindGroup,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Surface => "surface",
            Self::Adapter => "adapter",
            Self::Device => "device",
            Self::Queue => "queue",
            Self::Shader => "shader module",
            Self::BindGroupLayout => "bind group layout",
            Self::PipelineLayout => "pipeline layout",
            Self::Pipeline => "pipeline",
            Self::Buffer => "buffer",
            Self::BindGroup => "bind group",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
