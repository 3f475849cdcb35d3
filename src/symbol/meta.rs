#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderModel {
    VertexShader,
    TessellationControlShader,
    TessellationEvaluationShader,
    GeometryShader,
    FragmentShader,
    ComputeShader,
}
impl ShaderModel {
    /// Whether inputs of this stage are per-vertex arrays of a whole primitive.
    #[inline(always)]
    pub const fn has_multi_vertex_inputs(self) -> bool {
        matches!(self, Self::GeometryShader)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableMode {
    Auto,
    Uniform,
    ShaderIn,
    ShaderOut,
    FunctionIn,
    FunctionOut,
    FunctionInOut,
    ConstIn,
    SystemValue,
    Temporary,
}
impl VariableMode {
    /// Parameter modes that receive the caller's value on entry.
    #[inline(always)]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::FunctionIn | Self::FunctionInOut | Self::ConstIn)
    }

    /// Parameter modes that hand a value back to the caller on return.
    #[inline(always)]
    pub const fn accepts_output(self) -> bool {
        matches!(self, Self::FunctionOut | Self::FunctionInOut)
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Auto => "",
            Self::Uniform => "uniform ",
            Self::ShaderIn | Self::FunctionIn => "in ",
            Self::ShaderOut | Self::FunctionOut => "out ",
            Self::FunctionInOut => "inout ",
            Self::ConstIn => "const in ",
            Self::SystemValue => "sysval ",
            Self::Temporary => "temporary ",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precision {
    Undefined,
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interpolation {
    None,
    Smooth,
    Flat,
    NoPerspective,
}

bitflags::bitflags! {
    #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct VariableQualifiers : u32 {
        const NONE = 0x00;
        const INVARIANT = 0x01;
        const CENTROID = 0x02;
        const SAMPLE = 0x04;
        const PATCH = 0x08;
        const READ_ONLY = 0x10;
        const PRECISE = 0x20;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolAttribute {
    pub mode: VariableMode,
    pub precision: Precision,
    pub interpolation: Interpolation,
    pub qualifiers: VariableQualifiers,
    pub location: Option<u32>,
    /// Highest constant index any access to this variable is known to use.
    pub max_array_access: u32,
}
impl Default for SymbolAttribute {
    fn default() -> Self {
        Self {
            mode: VariableMode::Auto,
            precision: Precision::Undefined,
            interpolation: Interpolation::None,
            qualifiers: VariableQualifiers::NONE,
            location: None,
            max_array_access: 0,
        }
    }
}
impl SymbolAttribute {
    #[inline]
    pub fn with_mode(mode: VariableMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}
