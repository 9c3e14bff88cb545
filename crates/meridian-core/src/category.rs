//! Channel categories and the mapping modes that group them.
//!
//! Categories are a closed enumeration: twelve principal channels plus
//! the eight extraordinary vessels. Each [`MappingMode`] selects an
//! independent subset, and mappings in different modes never share
//! state even when they share a category (e.g. `REN`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One channel label.
///
/// Declaration order is the fixed enumeration order used by the
/// auto-mapper and by serialized mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Lung channel of hand taiyin.
    #[serde(rename = "LU")]
    Lung,
    /// Large intestine channel of hand yangming.
    #[serde(rename = "LI")]
    LargeIntestine,
    /// Stomach channel of foot yangming.
    #[serde(rename = "ST")]
    Stomach,
    /// Spleen channel of foot taiyin.
    #[serde(rename = "SP")]
    Spleen,
    /// Heart channel of hand shaoyin.
    #[serde(rename = "HT")]
    Heart,
    /// Small intestine channel of hand taiyang.
    #[serde(rename = "SI")]
    SmallIntestine,
    /// Bladder channel of foot taiyang.
    #[serde(rename = "BL")]
    Bladder,
    /// Kidney channel of foot shaoyin.
    #[serde(rename = "KI")]
    Kidney,
    /// Pericardium channel of hand jueyin.
    #[serde(rename = "PC")]
    Pericardium,
    /// San jiao channel of hand shaoyang.
    #[serde(rename = "SJ")]
    SanJiao,
    /// Gallbladder channel of foot shaoyang.
    #[serde(rename = "GB")]
    Gallbladder,
    /// Liver channel of foot jueyin.
    #[serde(rename = "LR")]
    Liver,
    /// Conception vessel.
    #[serde(rename = "REN")]
    Ren,
    /// Governing vessel.
    #[serde(rename = "DU")]
    Du,
    /// Penetrating vessel.
    #[serde(rename = "CHONG")]
    Chong,
    /// Belt vessel.
    #[serde(rename = "DAI")]
    Dai,
    /// Yin heel vessel.
    #[serde(rename = "YINQIAO")]
    YinQiao,
    /// Yang heel vessel.
    #[serde(rename = "YANGQIAO")]
    YangQiao,
    /// Yin linking vessel.
    #[serde(rename = "YINWEI")]
    YinWei,
    /// Yang linking vessel.
    #[serde(rename = "YANGWEI")]
    YangWei,
}

impl Category {
    /// Every category in enumeration order.
    pub const ALL: [Self; 20] = [
        Self::Lung,
        Self::LargeIntestine,
        Self::Stomach,
        Self::Spleen,
        Self::Heart,
        Self::SmallIntestine,
        Self::Bladder,
        Self::Kidney,
        Self::Pericardium,
        Self::SanJiao,
        Self::Gallbladder,
        Self::Liver,
        Self::Ren,
        Self::Du,
        Self::Chong,
        Self::Dai,
        Self::YinQiao,
        Self::YangQiao,
        Self::YinWei,
        Self::YangWei,
    ];

    /// The short code used in persisted mappings.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Lung => "LU",
            Self::LargeIntestine => "LI",
            Self::Stomach => "ST",
            Self::Spleen => "SP",
            Self::Heart => "HT",
            Self::SmallIntestine => "SI",
            Self::Bladder => "BL",
            Self::Kidney => "KI",
            Self::Pericardium => "PC",
            Self::SanJiao => "SJ",
            Self::Gallbladder => "GB",
            Self::Liver => "LR",
            Self::Ren => "REN",
            Self::Du => "DU",
            Self::Chong => "CHONG",
            Self::Dai => "DAI",
            Self::YinQiao => "YINQIAO",
            Self::YangQiao => "YANGQIAO",
            Self::YinWei => "YINWEI",
            Self::YangWei => "YANGWEI",
        }
    }

    /// Look up a category by code, ignoring ASCII case.
    ///
    /// # Examples
    ///
    /// ```
    /// use meridian_core::Category;
    ///
    /// assert_eq!(Category::from_code("lu"), Some(Category::Lung));
    /// assert_eq!(Category::from_code("XX"), None);
    /// ```
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Returned when parsing an unrecognized category code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category code: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// An independent mapping space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// The twelve principal channels.
    #[default]
    Principal,
    /// The two midline vessels (conception and governing).
    Governing,
    /// The eight extraordinary vessels.
    Extraordinary,
}

const PRINCIPAL: [Category; 12] = [
    Category::Lung,
    Category::LargeIntestine,
    Category::Stomach,
    Category::Spleen,
    Category::Heart,
    Category::SmallIntestine,
    Category::Bladder,
    Category::Kidney,
    Category::Pericardium,
    Category::SanJiao,
    Category::Gallbladder,
    Category::Liver,
];

const GOVERNING: [Category; 2] = [Category::Ren, Category::Du];

const EXTRAORDINARY: [Category; 8] = [
    Category::Ren,
    Category::Du,
    Category::Chong,
    Category::Dai,
    Category::YinQiao,
    Category::YangQiao,
    Category::YinWei,
    Category::YangWei,
];

impl MappingMode {
    /// Every mode.
    pub const ALL: [Self; 3] = [Self::Principal, Self::Governing, Self::Extraordinary];

    /// Categories of this mode in enumeration order.
    #[must_use]
    pub const fn categories(self) -> &'static [Category] {
        match self {
            Self::Principal => &PRINCIPAL,
            Self::Governing => &GOVERNING,
            Self::Extraordinary => &EXTRAORDINARY,
        }
    }

    /// Returns `true` if `category` belongs to this mode.
    #[must_use]
    pub fn contains(self, category: Category) -> bool {
        self.categories().contains(&category)
    }

    /// Only principal-channel diagrams are color-coded one color per
    /// channel, so only they support the auto-mapper.
    #[must_use]
    pub const fn supports_auto_map(self) -> bool {
        matches!(self, Self::Principal)
    }

    /// Stable lowercase name used in storage keys and blobs.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Governing => "governing",
            Self::Extraordinary => "extraordinary",
        }
    }
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when parsing an unrecognized mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mapping mode: {0:?}")]
pub struct UnknownMode(pub String);

impl FromStr for MappingMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}
