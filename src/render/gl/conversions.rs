//=========================================================================
// Engine → GL Translation
//=========================================================================
//
// Total, exhaustive matches from engine enums to GL enumerants. Adding an
// enumerator without a case here fails to compile.
//
// `CullFace::None` has no GL constant (culling is disabled instead) and
// translates to `None`.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::constants::*;
use crate::render::layout::ElementType;
use crate::render::material::{BlendEquation, BlendFactor, CullFace, DepthCompare};
use crate::render::topology::{FillMode, PrimitiveTopology};

//=== IntoGl ==============================================================

/// Converts an engine value into its GL representation.
pub trait IntoGl<T> {
    fn into_gl(self) -> T;
}

//--- Primitive assembly --------------------------------------------------

impl IntoGl<GLenum> for PrimitiveTopology {
    fn into_gl(self) -> GLenum {
        match self {
            Self::Points => POINTS,
            Self::Lines => LINES,
            Self::LineStrip => LINE_STRIP,
            Self::LinesAdjacency => LINES_ADJACENCY,
            Self::LineStripAdjacency => LINE_STRIP_ADJACENCY,
            Self::Triangles => TRIANGLES,
            Self::TriangleStrip => TRIANGLE_STRIP,
            Self::TrianglesAdjacency => TRIANGLES_ADJACENCY,
            Self::TriangleStripAdjacency => TRIANGLE_STRIP_ADJACENCY,
        }
    }
}

impl IntoGl<GLenum> for FillMode {
    fn into_gl(self) -> GLenum {
        match self {
            Self::Solid => FILL,
            Self::Wireframe => LINE,
        }
    }
}

//--- Material state ------------------------------------------------------

impl IntoGl<GLenum> for BlendEquation {
    fn into_gl(self) -> GLenum {
        match self {
            Self::Add => FUNC_ADD,
            Self::Subtract => FUNC_SUBTRACT,
            Self::ReverseSubtract => FUNC_REVERSE_SUBTRACT,
            Self::Min => MIN,
            Self::Max => MAX,
        }
    }
}

impl IntoGl<GLenum> for BlendFactor {
    fn into_gl(self) -> GLenum {
        match self {
            Self::Zero => ZERO,
            Self::One => ONE,
            Self::SourceColor => SRC_COLOR,
            Self::InverseSourceColor => ONE_MINUS_SRC_COLOR,
            Self::SourceAlpha => SRC_ALPHA,
            Self::InverseSourceAlpha => ONE_MINUS_SRC_ALPHA,
            Self::DestinationColor => DST_COLOR,
            Self::InverseDestinationColor => ONE_MINUS_DST_COLOR,
            Self::DestinationAlpha => DST_ALPHA,
            Self::InverseDestinationAlpha => ONE_MINUS_DST_ALPHA,
            Self::ConstantColor => CONSTANT_COLOR,
            Self::InverseConstantColor => ONE_MINUS_CONSTANT_COLOR,
        }
    }
}

impl IntoGl<GLenum> for DepthCompare {
    fn into_gl(self) -> GLenum {
        match self {
            Self::Never => NEVER,
            Self::Less => LESS,
            Self::Equal => EQUAL,
            Self::LessEqual => LEQUAL,
            Self::Greater => GREATER,
            Self::NotEqual => NOTEQUAL,
            Self::GreaterEqual => GEQUAL,
            Self::Always => ALWAYS,
        }
    }
}

impl IntoGl<Option<GLenum>> for CullFace {
    fn into_gl(self) -> Option<GLenum> {
        match self {
            Self::None => None,
            Self::Front => Some(FRONT),
            Self::Back => Some(BACK),
        }
    }
}

//--- Vertex data ---------------------------------------------------------

impl IntoGl<GLenum> for ElementType {
    fn into_gl(self) -> GLenum {
        match self {
            Self::Float => FLOAT,
            Self::UnsignedByte => UNSIGNED_BYTE,
            Self::Short => SHORT,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
