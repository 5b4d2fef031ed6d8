// ── Account domain type ──
//
// Profile and unit preferences of the logged-in member. Unknown enum
// codes fall back to the app defaults with a warning instead of failing.

use petlibro_api::Region;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};
use tracing::warn;

use crate::decode::reader::{Field, PayloadReader};
use crate::error::DecodeError;

/// Measurement units the app lets members choose per quantity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UnitType {
    Cups,
    Ounces,
    Grams,
    Milliliters,
    Kilograms,
    Pounds,
}

impl UnitType {
    pub fn code(self) -> u8 {
        match self {
            Self::Cups => 1,
            Self::Ounces => 2,
            Self::Grams => 3,
            Self::Milliliters => 4,
            Self::Kilograms => 5,
            Self::Pounds => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Cups),
            2 => Some(Self::Ounces),
            3 => Some(Self::Grams),
            4 => Some(Self::Milliliters),
            5 => Some(Self::Kilograms),
            6 => Some(Self::Pounds),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Cups => "cup",
            Self::Ounces => "oz",
            Self::Grams => "g",
            Self::Milliliters => "mL",
            Self::Kilograms => "kg",
            Self::Pounds => "lb",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Gender {
    #[default]
    None,
    Male,
    Female,
}

impl Gender {
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Male => 1,
            Self::Female => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Male),
            2 => Some(Self::Female),
            _ => None,
        }
    }
}

/// Unit defaults used when the account reports an unknown code.
pub const DEFAULT_FEED_UNIT: UnitType = UnitType::Cups;
pub const DEFAULT_WATER_UNIT: UnitType = UnitType::Ounces;
pub const DEFAULT_WEIGHT_UNIT: UnitType = UnitType::Pounds;

const ID: Field = Field::new("id", &["memberId"]);
const EMAIL: Field = Field::new("email", &[]);
const NICKNAME: Field = Field::new("nickname", &["nickName"]);
const GENDER: Field = Field::new("gender", &[]);
const TIME_ZONE: Field = Field::new("time_zone", &["timezone", "timeZone"]);
const LANGUAGE: Field = Field::new("language", &[]);
const TIER: Field = Field::new("subscription_tier", &["memberLevel", "vipLevel"]);
const FEED_UNIT: Field = Field::new("feed_unit_type", &["feedUnitType"]);
const WATER_UNIT: Field = Field::new("water_unit_type", &["waterUnitType"]);
const WEIGHT_UNIT: Field = Field::new("weight_unit_type", &["weightUnitType"]);

/// The PETLIBRO member the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<String>,
    pub email: String,
    pub nickname: Option<String>,
    pub region: Region,
    pub subscription_tier: Option<String>,
    pub time_zone: Option<String>,
    pub language: Option<String>,
    pub gender: Gender,
    pub feed_unit: UnitType,
    pub water_unit: UnitType,
    pub weight_unit: UnitType,
}

impl Account {
    /// Decode `member_info` data. `login_email` fills in when the payload
    /// omits the address.
    pub fn from_member_info(
        data: &Value,
        region: Region,
        login_email: &str,
    ) -> Result<Self, DecodeError> {
        let r = PayloadReader::new(data)?;

        Ok(Self {
            id: r.text_or_number(&ID)?,
            email: r.string(&EMAIL)?.unwrap_or_else(|| login_email.to_owned()),
            nickname: r.string(&NICKNAME)?,
            region,
            subscription_tier: r.text_or_number(&TIER)?,
            time_zone: r.string(&TIME_ZONE)?,
            language: r.string(&LANGUAGE)?,
            gender: code_or_default(r.i64(&GENDER)?, Gender::from_code, Gender::None, "gender"),
            feed_unit: code_or_default(
                r.i64(&FEED_UNIT)?,
                UnitType::from_code,
                DEFAULT_FEED_UNIT,
                "feedUnitType",
            ),
            water_unit: code_or_default(
                r.i64(&WATER_UNIT)?,
                UnitType::from_code,
                DEFAULT_WATER_UNIT,
                "waterUnitType",
            ),
            weight_unit: code_or_default(
                r.i64(&WEIGHT_UNIT)?,
                UnitType::from_code,
                DEFAULT_WEIGHT_UNIT,
                "weightUnitType",
            ),
        })
    }
}

fn code_or_default<T: Copy>(
    code: Option<i64>,
    parse: fn(i64) -> Option<T>,
    default: T,
    field: &str,
) -> T {
    match code {
        None => default,
        Some(code) => parse(code).unwrap_or_else(|| {
            warn!(field, code, "unknown account code, using default");
            default
        }),
    }
}

/// Requested account changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub nickname: Option<String>,
    pub gender: Option<Gender>,
    pub feed_unit: Option<UnitType>,
    pub water_unit: Option<UnitType>,
    pub weight_unit: Option<UnitType>,
}

impl AccountUpdate {
    /// Split into the profile payload and the unit-settings payload,
    /// keeping only values that differ from `current`.
    pub fn diff(&self, current: &Account) -> (Map<String, Value>, Map<String, Value>) {
        let mut info = Map::new();
        let mut setting = Map::new();

        if let Some(nickname) = &self.nickname {
            if current.nickname.as_ref() != Some(nickname) {
                info.insert("nickname".into(), Value::from(nickname.as_str()));
            }
        }
        if let Some(gender) = self.gender {
            if gender != current.gender {
                info.insert("gender".into(), Value::from(gender.code()));
            }
        }
        for (key, wanted, have) in [
            ("feedUnitType", self.feed_unit, current.feed_unit),
            ("waterUnitType", self.water_unit, current.water_unit),
            ("weightUnitType", self.weight_unit, current.weight_unit),
        ] {
            if let Some(unit) = wanted.filter(|unit| *unit != have) {
                setting.insert(key.into(), Value::from(unit.code()));
            }
        }

        (info, setting)
    }
}
