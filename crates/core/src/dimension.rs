//! Classification axes tested at partition nodes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Custom attribute slot (the remote exposes five: INDEX0..INDEX4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AttributeIndex(u8);

impl AttributeIndex {
    /// Highest slot accepted by the remote
    pub const MAX: u8 = 4;

    /// First slot, conventionally holding the ad group label
    pub const ZERO: Self = Self(0);

    /// Create an index, rejecting slots the remote does not know about
    pub fn new(index: u8) -> Option<Self> {
        (index <= Self::MAX).then_some(Self(index))
    }

    /// Numeric slot
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for AttributeIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "custom attribute index {} out of range (0..={})",
                value,
                Self::MAX
            )
        })
    }
}

impl From<AttributeIndex> for u8 {
    fn from(index: AttributeIndex) -> Self {
        index.0
    }
}

impl fmt::Display for AttributeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INDEX{}", self.0)
    }
}

/// The dimension tested at a node
///
/// `value: None` is the OTHERS catch-all of that dimension. It is never
/// equal to any concrete value, so there is no separate "is others" flag
/// that could drift out of sync with the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dimension {
    /// Only carried by the tree root
    Root,
    /// Merchant custom attribute (custom label) at a given slot
    CustomAttribute {
        index: AttributeIndex,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// Merchant item id
    ItemId {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl Dimension {
    /// Concrete custom attribute value
    pub fn custom_attribute(index: AttributeIndex, value: impl Into<String>) -> Self {
        Dimension::CustomAttribute {
            index,
            value: Some(value.into()),
        }
    }

    /// Custom attribute catch-all
    pub fn custom_attribute_others(index: AttributeIndex) -> Self {
        Dimension::CustomAttribute { index, value: None }
    }

    /// Concrete item id
    pub fn item_id(value: impl Into<String>) -> Self {
        Dimension::ItemId {
            value: Some(value.into()),
        }
    }

    /// Item id catch-all
    pub fn item_id_others() -> Self {
        Dimension::ItemId { value: None }
    }

    /// The dimension type, ignoring the value
    pub fn kind(&self) -> DimensionKind {
        match self {
            Dimension::Root => DimensionKind::Root,
            Dimension::CustomAttribute { index, .. } => DimensionKind::CustomAttribute(*index),
            Dimension::ItemId { .. } => DimensionKind::ItemId,
        }
    }

    /// Concrete value, `None` for OTHERS and for the root
    pub fn value(&self) -> Option<&str> {
        match self {
            Dimension::Root => None,
            Dimension::CustomAttribute { value, .. } | Dimension::ItemId { value } => {
                value.as_deref()
            }
        }
    }

    /// Whether this is the catch-all of a non-root dimension
    pub fn is_others(&self) -> bool {
        !self.is_root() && self.value().is_none()
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Dimension::Root)
    }

    pub fn is_item_id(&self) -> bool {
        matches!(self, Dimension::ItemId { .. })
    }

    /// The catch-all sharing this dimension's type
    pub fn others(&self) -> Self {
        match self {
            Dimension::Root => Dimension::Root,
            Dimension::CustomAttribute { index, .. } => Dimension::custom_attribute_others(*index),
            Dimension::ItemId { .. } => Dimension::item_id_others(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Root => write!(f, "ROOT"),
            Dimension::CustomAttribute { index, value } => write!(
                f,
                "Custom Attr {}: {}",
                index.get(),
                value.as_deref().unwrap_or("OTHERS")
            ),
            Dimension::ItemId { value } => {
                write!(f, "Item ID: {}", value.as_deref().unwrap_or("OTHERS"))
            }
        }
    }
}

/// Dimension type compared by the sibling homogeneity rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Root,
    CustomAttribute(AttributeIndex),
    ItemId,
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionKind::Root => write!(f, "root"),
            DimensionKind::CustomAttribute(index) => write!(f, "custom attribute {}", index),
            DimensionKind::ItemId => write!(f, "item id"),
        }
    }
}
