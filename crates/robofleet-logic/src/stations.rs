//! Station vocabulary and order presets.
//!
//! The station set is closed: four machine types, addressed by their
//! two-letter codes. Orders are sequences over this set.

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::Cell;

/// Lowest visit/order priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest visit/order priority.
pub const MAX_PRIORITY: u8 = 4;

/// The kind of service a station provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StationType {
    #[serde(rename = "CS")]
    Cs,
    #[serde(rename = "RS")]
    Rs,
    #[serde(rename = "BS")]
    Bs,
    #[serde(rename = "DS")]
    Ds,
}

impl StationType {
    pub const ALL: [StationType; 4] = [
        StationType::Cs,
        StationType::Rs,
        StationType::Bs,
        StationType::Ds,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            StationType::Cs => "CS",
            StationType::Rs => "RS",
            StationType::Bs => "BS",
            StationType::Ds => "DS",
        }
    }
}

impl std::fmt::Display for StationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// An unrecognised station code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown station code `{0}`")]
pub struct UnknownStationCode(pub String);

impl FromStr for StationType {
    type Err = UnknownStationCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CS" => Ok(StationType::Cs),
            "RS" => Ok(StationType::Rs),
            "BS" => Ok(StationType::Bs),
            "DS" => Ok(StationType::Ds),
            _ => Err(UnknownStationCode(s.to_string())),
        }
    }
}

/// A placed station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub station_type: StationType,
    pub cell: Cell,
}

/// Find the cell of a station type in a placed layout.
pub fn station_cell(stations: &[Station], station_type: StationType) -> Option<Cell> {
    stations
        .iter()
        .find(|s| s.station_type == station_type)
        .map(|s| s.cell)
}

/// The four canned order recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderPreset {
    C0,
    C1,
    C2,
    C3,
}

impl OrderPreset {
    pub const ALL: [OrderPreset; 4] = [
        OrderPreset::C0,
        OrderPreset::C1,
        OrderPreset::C2,
        OrderPreset::C3,
    ];

    pub fn sequence(&self) -> &'static [StationType] {
        use StationType::*;
        match self {
            OrderPreset::C0 => &[Cs, Rs, Bs, Cs, Ds],
            OrderPreset::C1 => &[Cs, Rs, Bs, Rs, Cs, Ds],
            OrderPreset::C2 => &[Rs, Bs, Cs, Ds],
            OrderPreset::C3 => &[Bs, Cs, Rs, Ds],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderPreset::C0 => "C0",
            OrderPreset::C1 => "C1",
            OrderPreset::C2 => "C2",
            OrderPreset::C3 => "C3",
        }
    }

    /// Look up a preset by name (`"C0"`..`"C3"`, case-insensitive).
    pub fn from_name(name: &str) -> Option<OrderPreset> {
        OrderPreset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Draw a random preset and a random priority in `MIN_PRIORITY..=MAX_PRIORITY`.
pub fn random_order<R: Rng + ?Sized>(rng: &mut R) -> (OrderPreset, u8) {
    let preset = OrderPreset::ALL[rng.gen_range(0..OrderPreset::ALL.len())];
    let priority = rng.gen_range(MIN_PRIORITY..=MAX_PRIORITY);
    (preset, priority)
}

/// Parse a sequence of station codes, e.g. `["CS", "RS"]`.
pub fn parse_sequence<S: AsRef<str>>(codes: &[S]) -> Result<Vec<StationType>, UnknownStationCode> {
    codes.iter().map(|c| c.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_code_roundtrip() {
        for t in StationType::ALL {
            assert_eq!(t.code().parse::<StationType>().unwrap(), t);
        }
    }

    #[test]
    fn test_parse_lowercase_and_whitespace() {
        assert_eq!(" bs ".parse::<StationType>().unwrap(), StationType::Bs);
    }

    #[test]
    fn test_unknown_code() {
        let err = "XS".parse::<StationType>().unwrap_err();
        assert_eq!(err, UnknownStationCode("XS".into()));
    }

    #[test]
    fn test_parse_sequence() {
        let seq = parse_sequence(&["CS", "RS", "DS"]).unwrap();
        assert_eq!(seq, vec![StationType::Cs, StationType::Rs, StationType::Ds]);
        assert!(parse_sequence(&["CS", "??"]).is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(OrderPreset::C0.sequence().len(), 5);
        assert_eq!(OrderPreset::C1.sequence().len(), 6);
        assert_eq!(OrderPreset::C2.sequence()[0], StationType::Rs);
        assert_eq!(OrderPreset::C3.sequence()[0], StationType::Bs);
        // every preset ends at delivery
        for p in OrderPreset::ALL {
            assert_eq!(*p.sequence().last().unwrap(), StationType::Ds);
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(OrderPreset::from_name("c2"), Some(OrderPreset::C2));
        assert_eq!(OrderPreset::from_name("C9"), None);
    }

    #[test]
    fn test_random_order_priority_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let (_, priority) = random_order(&mut rng);
            assert!((MIN_PRIORITY..=MAX_PRIORITY).contains(&priority));
        }
    }

    #[test]
    fn test_station_cell_lookup() {
        let stations = [
            Station {
                station_type: StationType::Cs,
                cell: Cell::new(1, 2),
            },
            Station {
                station_type: StationType::Ds,
                cell: Cell::new(5, 5),
            },
        ];
        assert_eq!(station_cell(&stations, StationType::Ds), Some(Cell::new(5, 5)));
        assert_eq!(station_cell(&stations, StationType::Rs), None);
    }
}
