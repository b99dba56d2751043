//! Property keys and values accepted by the property setter
//!
//! Keys are parsed from their wire names (`DIMENSION_X`,
//! `RackLevel_1_PalletLength0`, ...) and print back to the same string.

use std::fmt;
use std::str::FromStr;

use crate::layout::error::LayoutError;
use crate::layout::types::Point;

/// Per-level rack property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelKey {
    PalletLength(usize),
    PalletWidth(usize),
    PalletHeight(usize),
    PalletLoad(usize),
    PalletConfiguration(usize),
    PalletsCount,
    Accessories,
}

/// A settable property of a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    TopLeftX,
    TopLeftY,
    TopLeftPoint,
    CenterPoint,
    BotRightPoint,
    DimensionX,
    DimensionY,
    DimensionZ,
    Name,
    Text,
    FillColor,
    ShutterSwingDoor,
    RackColumn,
    RackBracing,
    RackUnderpassAvailable,
    RackUnderpass,
    RackMaterialOnGround,
    RackShowPallet,
    RackLevelsTheSame,
    RackLevelsCount,
    RackLevel(usize, LevelKey),
}

const PLAIN_KEYS: &[(&str, PropertyKey)] = &[
    ("TOP_LEFT_X", PropertyKey::TopLeftX),
    ("TOP_LEFT_Y", PropertyKey::TopLeftY),
    ("TOP_LEFT_POINT", PropertyKey::TopLeftPoint),
    ("CENTER_POINT", PropertyKey::CenterPoint),
    ("BOT_RIGHT_POINT", PropertyKey::BotRightPoint),
    ("DIMENSION_X", PropertyKey::DimensionX),
    ("DIMENSION_Y", PropertyKey::DimensionY),
    ("DIMENSION_Z", PropertyKey::DimensionZ),
    ("NAME", PropertyKey::Name),
    ("TEXT", PropertyKey::Text),
    ("FILL_COLOR", PropertyKey::FillColor),
    ("SHUTTER_SWING_DOOR", PropertyKey::ShutterSwingDoor),
    ("RACK_COLUMN", PropertyKey::RackColumn),
    ("RACK_BRACING", PropertyKey::RackBracing),
    ("RACK_UNDERPASS_AVAILABLE", PropertyKey::RackUnderpassAvailable),
    ("RACK_UNDERPASS", PropertyKey::RackUnderpass),
    ("RACK_MATERIAL_ON_GROUND", PropertyKey::RackMaterialOnGround),
    ("RACK_SHOW_PALLET", PropertyKey::RackShowPallet),
    ("RACK_LEVELS_THE_SAME", PropertyKey::RackLevelsTheSame),
    ("RACK_LEVELS_COUNT", PropertyKey::RackLevelsCount),
];

const LEVEL_PREFIX: &str = "RackLevel_";

const PALLET_FIELDS: &[(&str, fn(usize) -> LevelKey)] = &[
    ("PalletLength", LevelKey::PalletLength),
    ("PalletWidth", LevelKey::PalletWidth),
    ("PalletHeight", LevelKey::PalletHeight),
    ("PalletLoad", LevelKey::PalletLoad),
    ("PalletConfiguration", LevelKey::PalletConfiguration),
];

impl PropertyKey {
    /// Changing this key may change the rack footprint or height
    pub fn affects_size(&self) -> bool {
        match self {
            PropertyKey::DimensionX
            | PropertyKey::DimensionY
            | PropertyKey::TopLeftPoint
            | PropertyKey::BotRightPoint
            | PropertyKey::RackColumn
            | PropertyKey::RackBracing
            | PropertyKey::RackUnderpassAvailable
            | PropertyKey::RackUnderpass
            | PropertyKey::RackMaterialOnGround
            | PropertyKey::RackLevelsTheSame
            | PropertyKey::RackLevelsCount => true,
            PropertyKey::RackLevel(_, level) => !matches!(level, LevelKey::Accessories),
            _ => false,
        }
    }

    /// Key only applies to racks
    pub fn is_rack_key(&self) -> bool {
        matches!(
            self,
            PropertyKey::RackColumn
                | PropertyKey::RackBracing
                | PropertyKey::RackUnderpassAvailable
                | PropertyKey::RackUnderpass
                | PropertyKey::RackMaterialOnGround
                | PropertyKey::RackShowPallet
                | PropertyKey::RackLevelsTheSame
                | PropertyKey::RackLevelsCount
                | PropertyKey::RackLevel(..)
        )
    }
}

fn parse_level_key(rest: &str) -> Option<PropertyKey> {
    let (index, field) = rest.split_once('_')?;
    let index: usize = index.parse().ok()?;
    let level = match field {
        "PalletsCount" => LevelKey::PalletsCount,
        "Accessories" => LevelKey::Accessories,
        _ => PALLET_FIELDS.iter().find_map(|(prefix, make)| {
            let pallet = field.strip_prefix(*prefix)?;
            if pallet.is_empty() || !pallet.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            pallet.parse().ok().map(make)
        })?,
    };
    Some(PropertyKey::RackLevel(index, level))
}

impl FromStr for PropertyKey {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || LayoutError::UnknownProperty { key: s.to_string() };
        if let Some((_, key)) = PLAIN_KEYS.iter().find(|(name, _)| *name == s) {
            return Ok(*key);
        }
        s.strip_prefix(LEVEL_PREFIX)
            .and_then(parse_level_key)
            .ok_or_else(unknown)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let PropertyKey::RackLevel(index, level) = self {
            write!(f, "{}{}_", LEVEL_PREFIX, index)?;
            return match level {
                LevelKey::PalletLength(p) => write!(f, "PalletLength{}", p),
                LevelKey::PalletWidth(p) => write!(f, "PalletWidth{}", p),
                LevelKey::PalletHeight(p) => write!(f, "PalletHeight{}", p),
                LevelKey::PalletLoad(p) => write!(f, "PalletLoad{}", p),
                LevelKey::PalletConfiguration(p) => write!(f, "PalletConfiguration{}", p),
                LevelKey::PalletsCount => write!(f, "PalletsCount"),
                LevelKey::Accessories => write!(f, "Accessories"),
            };
        }
        let name = PLAIN_KEYS
            .iter()
            .find(|(_, key)| key == self)
            .map(|(name, _)| *name)
            .unwrap_or("?");
        write!(f, "{}", name)
    }
}

/// A property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    Point(Point),
}

impl Value {
    fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "a number",
            Value::Bool(_) => "a boolean",
            Value::Text(_) => "text",
            Value::Point(_) => "a point",
        }
    }

    fn mismatch(&self, key: &str, expected: &str) -> LayoutError {
        LayoutError::invalid(key, format!("expected {}, got {}", expected, self.kind_name()))
    }

    pub fn as_number(&self, key: &str) -> Result<f64, LayoutError> {
        match self {
            Value::Number(n) if n.is_finite() => Ok(*n),
            Value::Number(n) => Err(LayoutError::invalid(key, format!("{} is not finite", n))),
            _ => Err(self.mismatch(key, "a number")),
        }
    }

    /// A non-negative whole number
    pub fn as_count(&self, key: &str) -> Result<usize, LayoutError> {
        let n = self.as_number(key)?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(LayoutError::invalid(key, format!("{} is not a count", n)));
        }
        Ok(n as usize)
    }

    pub fn as_bool(&self, key: &str) -> Result<bool, LayoutError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(key, "a boolean")),
        }
    }

    pub fn as_text(&self, key: &str) -> Result<&str, LayoutError> {
        match self {
            Value::Text(s) => Ok(s),
            _ => Err(self.mismatch(key, "text")),
        }
    }

    pub fn as_point(&self, key: &str) -> Result<Point, LayoutError> {
        match self {
            Value::Point(p) if p.x.is_finite() && p.y.is_finite() => Ok(*p),
            Value::Point(p) => Err(LayoutError::invalid(key, format!("{} is not finite", p))),
            _ => Err(self.mismatch(key, "a point")),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Point> for Value {
    fn from(p: Point) -> Self {
        Value::Point(p)
    }
}
