//=========================================================================
// Material State
//
// Engine-level descriptions of the fixed-function state a material
// selects. Applying them is the renderer's job; `render::gl` translates
// them into backend constants.
//
//=========================================================================

//=== Blending ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendEquation {
    pub const ALL: [BlendEquation; 5] = [
        Self::Add,
        Self::Subtract,
        Self::ReverseSubtract,
        Self::Min,
        Self::Max,
    ];
}

/// Weight applied to the source or destination color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    InverseSourceColor,
    SourceAlpha,
    InverseSourceAlpha,
    DestinationColor,
    InverseDestinationColor,
    DestinationAlpha,
    InverseDestinationAlpha,
    ConstantColor,
    InverseConstantColor,
}

impl BlendFactor {
    pub const ALL: [BlendFactor; 12] = [
        Self::Zero,
        Self::One,
        Self::SourceColor,
        Self::InverseSourceColor,
        Self::SourceAlpha,
        Self::InverseSourceAlpha,
        Self::DestinationColor,
        Self::InverseDestinationColor,
        Self::DestinationAlpha,
        Self::InverseDestinationAlpha,
        Self::ConstantColor,
        Self::InverseConstantColor,
    ];
}

//=== Depth / Culling =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthCompare {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl DepthCompare {
    pub const ALL: [DepthCompare; 8] = [
        Self::Never,
        Self::Less,
        Self::Equal,
        Self::LessEqual,
        Self::Greater,
        Self::NotEqual,
        Self::GreaterEqual,
        Self::Always,
    ];
}

/// Which faces are discarded. `None` disables culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    #[default]
    None,
    Front,
    Back,
}

impl CullFace {
    pub const ALL: [CullFace; 3] = [Self::None, Self::Front, Self::Back];
}
