#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicScalarType {
    Unit,
    Bool,
    UInt,
    SInt,
    Float,
}
impl IntrinsicScalarType {
    #[inline(always)]
    pub const fn of_vector(self, count: u8) -> Option<IntrinsicType> {
        match (self, count) {
            (Self::Unit, 0) => Some(IntrinsicType::Unit),
            (Self::Bool, 1) => Some(IntrinsicType::Bool),
            (Self::UInt, 1) => Some(IntrinsicType::UInt),
            (Self::SInt, 1) => Some(IntrinsicType::SInt),
            (Self::Float, 1) => Some(IntrinsicType::Float),
            (Self::UInt, 2) => Some(IntrinsicType::UInt2),
            (Self::SInt, 2) => Some(IntrinsicType::SInt2),
            (Self::Float, 2) => Some(IntrinsicType::Float2),
            (Self::UInt, 3) => Some(IntrinsicType::UInt3),
            (Self::SInt, 3) => Some(IntrinsicType::SInt3),
            (Self::Float, 3) => Some(IntrinsicType::Float3),
            (Self::UInt, 4) => Some(IntrinsicType::UInt4),
            (Self::SInt, 4) => Some(IntrinsicType::SInt4),
            (Self::Float, 4) => Some(IntrinsicType::Float4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicType {
    Unit,
    Bool,
    UInt,
    UInt2,
    UInt3,
    UInt4,
    SInt,
    SInt2,
    SInt3,
    SInt4,
    Float,
    Float2,
    Float3,
    Float4,
}
impl IntrinsicType {
    pub const fn scalar_type(&self) -> IntrinsicScalarType {
        match self {
            Self::Unit => IntrinsicScalarType::Unit,
            Self::Bool => IntrinsicScalarType::Bool,
            Self::UInt | Self::UInt2 | Self::UInt3 | Self::UInt4 => IntrinsicScalarType::UInt,
            Self::SInt | Self::SInt2 | Self::SInt3 | Self::SInt4 => IntrinsicScalarType::SInt,
            Self::Float | Self::Float2 | Self::Float3 | Self::Float4 => IntrinsicScalarType::Float,
        }
    }

    pub const fn vector_elements(&self) -> u8 {
        match self {
            Self::Unit => 0,
            Self::Bool | Self::UInt | Self::SInt | Self::Float => 1,
            Self::UInt2 | Self::SInt2 | Self::Float2 => 2,
            Self::UInt3 | Self::SInt3 | Self::Float3 => 3,
            Self::UInt4 | Self::SInt4 | Self::Float4 => 4,
        }
    }

    #[inline(always)]
    pub const fn is_vector(&self) -> bool {
        self.vector_elements() > 1
    }

    /// The scalar type of a single component, as an intrinsic type.
    pub const fn component_type(&self) -> Self {
        match self.scalar_type() {
            IntrinsicScalarType::Unit => Self::Unit,
            IntrinsicScalarType::Bool => Self::Bool,
            IntrinsicScalarType::UInt => Self::UInt,
            IntrinsicScalarType::SInt => Self::SInt,
            IntrinsicScalarType::Float => Self::Float,
        }
    }

    pub const fn glsl_name(&self) -> &'static str {
        match self {
            Self::Unit => "void",
            Self::Bool => "bool",
            Self::UInt => "uint",
            Self::UInt2 => "uvec2",
            Self::UInt3 => "uvec3",
            Self::UInt4 => "uvec4",
            Self::SInt => "int",
            Self::SInt2 => "ivec2",
            Self::SInt3 => "ivec3",
            Self::SInt4 => "ivec4",
            Self::Float => "float",
            Self::Float2 => "vec2",
            Self::Float3 => "vec3",
            Self::Float4 => "vec4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConcreteType {
    Intrinsic(IntrinsicType),
    Array(Box<ConcreteType>, usize),
}
impl ConcreteType {
    #[inline]
    pub fn array_of(element: impl Into<ConcreteType>, length: usize) -> Self {
        Self::Array(Box::new(element.into()), length)
    }

    #[inline(always)]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_, _))
    }

    #[inline]
    pub fn element_type(&self) -> Option<&ConcreteType> {
        match self {
            Self::Array(e, _) => Some(e),
            Self::Intrinsic(_) => None,
        }
    }

    #[inline]
    pub const fn array_size(&self) -> Option<usize> {
        match self {
            &Self::Array(_, n) => Some(n),
            Self::Intrinsic(_) => None,
        }
    }

    #[inline]
    pub const fn as_intrinsic(&self) -> Option<IntrinsicType> {
        match self {
            &Self::Intrinsic(it) => Some(it),
            Self::Array(_, _) => None,
        }
    }

    #[inline]
    pub fn is_intrinsic(&self, ty: IntrinsicType) -> bool {
        self.as_intrinsic() == Some(ty)
    }

    /// Type produced by indexing a value of this type: the element of an array or
    /// the component of a vector.
    pub fn indexed_type(&self) -> Option<ConcreteType> {
        match self {
            Self::Array(e, _) => Some((**e).clone()),
            Self::Intrinsic(it) if it.is_vector() => Some(it.component_type().into()),
            Self::Intrinsic(_) => None,
        }
    }
}
impl From<IntrinsicType> for ConcreteType {
    #[inline(always)]
    fn from(value: IntrinsicType) -> Self {
        Self::Intrinsic(value)
    }
}
impl core::fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intrinsic(it) => f.write_str(it.glsl_name()),
            Self::Array(e, n) => write!(f, "(array {e} {n})"),
        }
    }
}
