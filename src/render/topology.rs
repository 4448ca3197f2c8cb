//=========================================================================
// Primitive Topology / Fill Mode
//=========================================================================

/// How an index stream is assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineStrip,
    LinesAdjacency,
    LineStripAdjacency,
    Triangles,
    TriangleStrip,
    TrianglesAdjacency,
    TriangleStripAdjacency,
}

impl PrimitiveTopology {
    pub const ALL: [PrimitiveTopology; 9] = [
        Self::Points,
        Self::Lines,
        Self::LineStrip,
        Self::LinesAdjacency,
        Self::LineStripAdjacency,
        Self::Triangles,
        Self::TriangleStrip,
        Self::TrianglesAdjacency,
        Self::TriangleStripAdjacency,
    ];

    /// Index counts for this topology must be a multiple of this value.
    pub const fn index_multiple(self) -> usize {
        match self {
            Self::Triangles => 3,
            Self::LinesAdjacency => 2,
            _ => 1,
        }
    }
}

/// Rasterization of polygon interiors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

impl FillMode {
    pub const ALL: [FillMode; 2] = [Self::Solid, Self::Wireframe];
}

//=========================================================================
// Unit Tests
//=========================================================================
