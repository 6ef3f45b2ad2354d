use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetItem {
    Node,
    Material,
}

impl fmt::Display for AssetItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetItem::Node => f.write_str("node"),
            AssetItem::Material => f.write_str("material"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfiguratorError {
    /// The loaded asset no longer has a node or material the configurator relies on.
    #[error("asset shape mismatch: {kind} '{name}' not found")]
    AssetShapeMismatch { kind: AssetItem, name: String },
    /// A frame arrived before the wheel assemblies were built.
    #[error("wheel assemblies are not ready yet")]
    NotReady,
}

impl ConfiguratorError {
    pub fn missing_node(name: impl Into<String>) -> Self {
        Self::AssetShapeMismatch {
            kind: AssetItem::Node,
            name: name.into(),
        }
    }

    pub fn missing_material(name: impl Into<String>) -> Self {
        Self::AssetShapeMismatch {
            kind: AssetItem::Material,
            name: name.into(),
        }
    }
}
