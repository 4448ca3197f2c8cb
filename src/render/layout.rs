//=========================================================================
// Vertex Layout Descriptor
//=========================================================================
//
// Declares which attributes an interleaved vertex carries, where each one
// sits inside the vertex, and the stride between vertices.
//
// Attribute table (fixed; slots are the shader attribute locations):
//
//   attribute    slot  element          normalized  max components
//   positions     0    f32              no          4
//   colors        1    u8               yes         4
//   uvs           2    f32              no          3
//   normals       3    i16              yes         4
//   tangents      4    i16              yes         4
//   bitangents    5    i16              yes         4
//
// Invariant for every present attribute:
//   offset < stride  and  offset + components * element_size <= stride
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

//=== ElementType =========================================================

/// Scalar type of one attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float,
    UnsignedByte,
    Short,
}

impl ElementType {
    pub const ALL: [ElementType; 3] = [Self::Float, Self::UnsignedByte, Self::Short];

    /// Size in bytes.
    pub const fn size(self) -> u32 {
        match self {
            Self::Float => 4,
            Self::UnsignedByte => 1,
            Self::Short => 2,
        }
    }
}

//=== VertexAttribute =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Positions,
    Colors,
    Uvs,
    Normals,
    Tangents,
    Bitangents,
}

impl VertexAttribute {
    /// Every attribute, in slot order.
    pub const ALL: [VertexAttribute; 6] = [
        Self::Positions,
        Self::Colors,
        Self::Uvs,
        Self::Normals,
        Self::Tangents,
        Self::Bitangents,
    ];

    pub const fn slot(self) -> u32 {
        match self {
            Self::Positions => 0,
            Self::Colors => 1,
            Self::Uvs => 2,
            Self::Normals => 3,
            Self::Tangents => 4,
            Self::Bitangents => 5,
        }
    }

    pub const fn max_components(self) -> u8 {
        match self {
            Self::Uvs => 3,
            _ => 4,
        }
    }

    pub const fn element_type(self) -> ElementType {
        match self {
            Self::Positions | Self::Uvs => ElementType::Float,
            Self::Colors => ElementType::UnsignedByte,
            Self::Normals | Self::Tangents | Self::Bitangents => ElementType::Short,
        }
    }

    /// Whether integer components are mapped to [0, 1] / [-1, 1].
    pub const fn normalized(self) -> bool {
        !matches!(self, Self::Positions | Self::Uvs)
    }

    const fn index(self) -> usize {
        self.slot() as usize
    }
}

impl fmt::Display for VertexAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Positions => "positions",
            Self::Colors => "colors",
            Self::Uvs => "uvs",
            Self::Normals => "normals",
            Self::Tangents => "tangents",
            Self::Bitangents => "bitangents",
        };
        f.write_str(name)
    }
}

//=== LayoutError =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    ZeroStride,

    ComponentCount {
        attribute: VertexAttribute,
        components: u8,
        max: u8,
    },

    /// The attribute's bytes do not fit inside one vertex.
    OutOfBounds {
        attribute: VertexAttribute,
        offset: u32,
        end: u32,
        stride: u32,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroStride => write!(f, "Vertex stride must be positive"),
            Self::ComponentCount { attribute, components, max } => write!(
                f,
                "{} has {} components; expected 1..={}",
                attribute, components, max
            ),
            Self::OutOfBounds { attribute, offset, end, stride } => write!(
                f,
                "{} spans bytes {}..{} but the stride is {}",
                attribute, offset, end, stride
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

//=== AttributeLayout =====================================================

/// Placement of one present attribute inside a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub components: u8,
    pub offset: u32,
}

//=== VertexLayout ========================================================

/// Validated description of an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: [Option<AttributeLayout>; 6],
    stride: u32,
}

impl VertexLayout {
    /// Starts an explicit layout with the given stride in bytes.
    pub fn builder(stride: u32) -> VertexLayoutBuilder {
        VertexLayoutBuilder {
            stride,
            attributes: [None; 6],
        }
    }

    /// Packs the requested attributes in slot order.
    ///
    /// Each attribute starts on a 4-byte boundary and the stride is
    /// rounded up to a multiple of 4, so short and byte attributes get
    /// trailing padding.
    pub fn interleaved(counts: AttributeCounts) -> Result<Self, LayoutError> {
        let mut builder = Self::builder(0);
        let mut offset = 0u32;

        for attribute in VertexAttribute::ALL {
            let components = counts.get(attribute);
            if components == 0 {
                continue;
            }
            builder = builder.attribute(attribute, components, offset);
            offset = align4(offset + u32::from(components) * attribute.element_type().size());
        }

        builder.stride = offset;
        builder.build()
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn attribute(&self, attribute: VertexAttribute) -> Option<AttributeLayout> {
        self.attributes[attribute.index()]
    }

    pub fn has(&self, attribute: VertexAttribute) -> bool {
        self.attribute(attribute).is_some()
    }

    /// Present attributes, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexAttribute, AttributeLayout)> + '_ {
        VertexAttribute::ALL
            .into_iter()
            .filter_map(move |a| self.attribute(a).map(|layout| (a, layout)))
    }
}

//=== AttributeCounts =====================================================

/// Component counts for `VertexLayout::interleaved`; 0 means absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeCounts {
    pub positions: u8,
    pub colors: u8,
    pub uvs: u8,
    pub normals: u8,
    pub tangents: u8,
    pub bitangents: u8,
}

impl AttributeCounts {
    fn get(&self, attribute: VertexAttribute) -> u8 {
        match attribute {
            VertexAttribute::Positions => self.positions,
            VertexAttribute::Colors => self.colors,
            VertexAttribute::Uvs => self.uvs,
            VertexAttribute::Normals => self.normals,
            VertexAttribute::Tangents => self.tangents,
            VertexAttribute::Bitangents => self.bitangents,
        }
    }
}

//=== VertexLayoutBuilder =================================================

#[derive(Debug, Clone)]
pub struct VertexLayoutBuilder {
    stride: u32,
    attributes: [Option<AttributeLayout>; 6],
}

impl VertexLayoutBuilder {
    /// Declares an attribute; a second declaration replaces the first.
    pub fn attribute(mut self, attribute: VertexAttribute, components: u8, offset: u32) -> Self {
        self.attributes[attribute.index()] = Some(AttributeLayout { components, offset });
        self
    }

    pub fn positions(self, components: u8, offset: u32) -> Self {
        self.attribute(VertexAttribute::Positions, components, offset)
    }

    pub fn colors(self, components: u8, offset: u32) -> Self {
        self.attribute(VertexAttribute::Colors, components, offset)
    }

    pub fn uvs(self, components: u8, offset: u32) -> Self {
        self.attribute(VertexAttribute::Uvs, components, offset)
    }

    pub fn normals(self, components: u8, offset: u32) -> Self {
        self.attribute(VertexAttribute::Normals, components, offset)
    }

    pub fn tangents(self, components: u8, offset: u32) -> Self {
        self.attribute(VertexAttribute::Tangents, components, offset)
    }

    pub fn bitangents(self, components: u8, offset: u32) -> Self {
        self.attribute(VertexAttribute::Bitangents, components, offset)
    }

    pub fn build(self) -> Result<VertexLayout, LayoutError> {
        if self.stride == 0 {
            return Err(LayoutError::ZeroStride);
        }

        for attribute in VertexAttribute::ALL {
            let Some(layout) = self.attributes[attribute.index()] else {
                continue;
            };

            let max = attribute.max_components();
            if layout.components == 0 || layout.components > max {
                return Err(LayoutError::ComponentCount {
                    attribute,
                    components: layout.components,
                    max,
                });
            }

            let end = u64::from(layout.offset)
                + u64::from(layout.components) * u64::from(attribute.element_type().size());
            if layout.offset >= self.stride || end > u64::from(self.stride) {
                return Err(LayoutError::OutOfBounds {
                    attribute,
                    offset: layout.offset,
                    end: u32::try_from(end).unwrap_or(u32::MAX),
                    stride: self.stride,
                });
            }
        }

        Ok(VertexLayout {
            attributes: self.attributes,
            stride: self.stride,
        })
    }
}

fn align4(value: u32) -> u32 {
    (value + 3) & !3
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_layout_round_trips_placements() {
        let layout = VertexLayout::builder(32)
            .positions(3, 0)
            .uvs(2, 12)
            .normals(3, 20)
            .build()
            .expect("valid layout");

        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.attribute(VertexAttribute::Uvs), Some(AttributeLayout { components: 2, offset: 12 }));
        assert!(!layout.has(VertexAttribute::Colors));
        let present: Vec<_> = layout.iter().map(|(a, _)| a).collect();
        assert_eq!(present, vec![VertexAttribute::Positions, VertexAttribute::Uvs, VertexAttribute::Normals]);
    }

    #[test]
    fn zero_stride_is_rejected() {
        assert_eq!(VertexLayout::builder(0).build(), Err(LayoutError::ZeroStride));
    }

    #[test]
    fn component_limits_are_enforced() {
        let err = VertexLayout::builder(64).uvs(4, 0).build().unwrap_err();
        assert_eq!(
            err,
            LayoutError::ComponentCount { attribute: VertexAttribute::Uvs, components: 4, max: 3 }
        );

        assert!(VertexLayout::builder(64).positions(0, 0).build().is_err());
        assert!(VertexLayout::builder(64).colors(4, 0).build().is_ok());
    }

    #[test]
    fn attribute_must_fit_inside_stride() {
        // 3 floats at 8 end at 20 > 16.
        let err = VertexLayout::builder(16).positions(3, 8).build().unwrap_err();
        assert_eq!(
            err,
            LayoutError::OutOfBounds { attribute: VertexAttribute::Positions, offset: 8, end: 20, stride: 16 }
        );

        // Offset equal to stride is out even for a zero-width view.
        assert!(VertexLayout::builder(16).colors(1, 16).build().is_err());

        // Exact fit is fine.
        assert!(VertexLayout::builder(16).positions(4, 0).build().is_ok());
    }

    #[test]
    fn interleaved_packs_in_slot_order_with_padding() {
        let layout = VertexLayout::interleaved(AttributeCounts {
            positions: 3,
            colors: 3,
            normals: 3,
            ..Default::default()
        })
        .expect("valid layout");

        // positions 0..12, colors 12..15 -> 16, normals 16..22 -> 24
        assert_eq!(layout.attribute(VertexAttribute::Positions).map(|a| a.offset), Some(0));
        assert_eq!(layout.attribute(VertexAttribute::Colors).map(|a| a.offset), Some(12));
        assert_eq!(layout.attribute(VertexAttribute::Normals).map(|a| a.offset), Some(16));
        assert_eq!(layout.stride(), 24);
    }

    #[test]
    fn interleaved_without_attributes_fails() {
        assert_eq!(VertexLayout::interleaved(AttributeCounts::default()), Err(LayoutError::ZeroStride));
    }

    #[test]
    fn attribute_table_matches_backend_expectations() {
        assert_eq!(VertexAttribute::ALL.map(VertexAttribute::slot), [0, 1, 2, 3, 4, 5]);
        assert_eq!(VertexAttribute::Colors.element_type(), ElementType::UnsignedByte);
        assert!(VertexAttribute::Colors.normalized());
        assert!(!VertexAttribute::Positions.normalized());
        assert_eq!(VertexAttribute::Tangents.element_type(), ElementType::Short);
        assert_eq!(ElementType::Short.size(), 2);
    }
}
