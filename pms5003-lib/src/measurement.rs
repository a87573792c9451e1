use serde::Serialize;
use std::fmt;
use strum_macros::Display;

use crate::constants::MEASUREMENT_FIELDS;

/// Concentration unit of the six PM fields
pub const UNIT_CONCENTRATION: &str = "ug/m^3";

/// Unit of the six particle-count bins
pub const UNIT_COUNT: &str = "1/0.1L";

/// One of the twelve quantities reported in a frame, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Field {
    #[strum(to_string = "PM1.0")]
    Pm1_0,
    #[strum(to_string = "PM2.5")]
    Pm2_5,
    #[strum(to_string = "PM10")]
    Pm10,
    #[strum(to_string = "PM1.0 in atmos env")]
    Pm1_0Atmos,
    #[strum(to_string = "PM2.5 in atmos env")]
    Pm2_5Atmos,
    #[strum(to_string = "PM10 in atmos env")]
    Pm10Atmos,
    #[strum(to_string = "0.3um")]
    Count0_3um,
    #[strum(to_string = "0.5um")]
    Count0_5um,
    #[strum(to_string = "1.0um")]
    Count1_0um,
    #[strum(to_string = "2.5um")]
    Count2_5um,
    #[strum(to_string = "5.0um")]
    Count5_0um,
    #[strum(to_string = "10um")]
    Count10um,
}

impl Field {
    /// All fields in wire order
    pub const ALL: [Field; MEASUREMENT_FIELDS] = [
        Field::Pm1_0,
        Field::Pm2_5,
        Field::Pm10,
        Field::Pm1_0Atmos,
        Field::Pm2_5Atmos,
        Field::Pm10Atmos,
        Field::Count0_3um,
        Field::Count0_5um,
        Field::Count1_0um,
        Field::Count2_5um,
        Field::Count5_0um,
        Field::Count10um,
    ];

    /// Position of the field among the measurement words of the frame body
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn unit(self) -> &'static str {
        if self.index() < 6 { UNIT_CONCENTRATION } else { UNIT_COUNT }
    }
}

/// A validated reading: the twelve measurement words of a frame whose
/// checksum matched.
///
/// Only the frame decoder constructs these, so a `Measurement` in hand
/// always came from a checksum-verified frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Measurement {
    /// PM1.0, standard particle (CF=1), µg/m³
    #[serde(rename = "pm1.0")]
    pm1_0: u16,
    /// PM2.5, standard particle (CF=1), µg/m³
    #[serde(rename = "pm2.5")]
    pm2_5: u16,
    /// PM10, standard particle (CF=1), µg/m³
    #[serde(rename = "pm10")]
    pm10: u16,
    /// PM1.0 under atmospheric environment, µg/m³
    #[serde(rename = "pm1.0atmos")]
    pm1_0_atmos: u16,
    /// PM2.5 under atmospheric environment, µg/m³
    #[serde(rename = "pm2.5atmos")]
    pm2_5_atmos: u16,
    /// PM10 under atmospheric environment, µg/m³
    #[serde(rename = "pm10atmos")]
    pm10_atmos: u16,
    // Particle counts beyond the given diameter, per 0.1 L of air
    #[serde(rename = "dia0.3um")]
    count_0_3um: u16,
    #[serde(rename = "dia0.5um")]
    count_0_5um: u16,
    #[serde(rename = "dia1.0um")]
    count_1_0um: u16,
    #[serde(rename = "dia2.5um")]
    count_2_5um: u16,
    #[serde(rename = "dia5.0um")]
    count_5_0um: u16,
    #[serde(rename = "dia10.0um")]
    count_10um: u16,
}

impl Measurement {
    pub(crate) fn from_words(words: [u16; MEASUREMENT_FIELDS]) -> Self {
        let [
            pm1_0,
            pm2_5,
            pm10,
            pm1_0_atmos,
            pm2_5_atmos,
            pm10_atmos,
            count_0_3um,
            count_0_5um,
            count_1_0um,
            count_2_5um,
            count_5_0um,
            count_10um,
        ] = words;
        Self {
            pm1_0,
            pm2_5,
            pm10,
            pm1_0_atmos,
            pm2_5_atmos,
            pm10_atmos,
            count_0_3um,
            count_0_5um,
            count_1_0um,
            count_2_5um,
            count_5_0um,
            count_10um,
        }
    }

    /// The twelve values in wire order
    pub fn words(&self) -> [u16; MEASUREMENT_FIELDS] {
        [
            self.pm1_0,
            self.pm2_5,
            self.pm10,
            self.pm1_0_atmos,
            self.pm2_5_atmos,
            self.pm10_atmos,
            self.count_0_3um,
            self.count_0_5um,
            self.count_1_0um,
            self.count_2_5um,
            self.count_5_0um,
            self.count_10um,
        ]
    }

    pub fn get(&self, field: Field) -> u16 {
        self.words()[field.index()]
    }

    pub fn pm1_0(&self) -> u16 {
        self.pm1_0
    }

    pub fn pm2_5(&self) -> u16 {
        self.pm2_5
    }

    pub fn pm10(&self) -> u16 {
        self.pm10
    }

    pub fn pm1_0_atmos(&self) -> u16 {
        self.pm1_0_atmos
    }

    pub fn pm2_5_atmos(&self) -> u16 {
        self.pm2_5_atmos
    }

    pub fn pm10_atmos(&self) -> u16 {
        self.pm10_atmos
    }

    pub fn count_0_3um(&self) -> u16 {
        self.count_0_3um
    }

    pub fn count_0_5um(&self) -> u16 {
        self.count_0_5um
    }

    pub fn count_1_0um(&self) -> u16 {
        self.count_1_0um
    }

    pub fn count_2_5um(&self) -> u16 {
        self.count_2_5um
    }

    pub fn count_5_0um(&self) -> u16 {
        self.count_5_0um
    }

    pub fn count_10um(&self) -> u16 {
        self.count_10um
    }

    /// `(label, value, unit)` rows in wire order, for tabular output
    pub fn rows(&self) -> impl Iterator<Item = (Field, u16, &'static str)> + '_ {
        Field::ALL.into_iter().map(move |f| (f, self.get(f), f.unit()))
    }

    /// Pretty-printed JSON object keyed by the short field names
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PM1.0: {} {u}, PM2.5: {} {u}, PM10: {} {u} (atmos {}/{}/{})",
            self.pm1_0,
            self.pm2_5,
            self.pm10,
            self.pm1_0_atmos,
            self.pm2_5_atmos,
            self.pm10_atmos,
            u = UNIT_CONCENTRATION
        )
    }
}
