use crate::error::UnknownMode;
use std::fmt;
use std::str::FromStr;

/// Transport mode selected with `--mode`; narrows Navitia queries by physical mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Metro,
    Rer,
    Train,
    Tram,
    Bus,
    All,
}

impl TransportMode {
    /// Navitia `filter=` value, `None` for [`TransportMode::All`].
    pub fn filter(self) -> Option<&'static str> {
        match self {
            TransportMode::Metro => Some("physical_mode.id=physical_mode:Metro"),
            TransportMode::Rer => Some("physical_mode.id=physical_mode:RapidTransit"),
            TransportMode::Train => Some("physical_mode.id=physical_mode:LocalTrain"),
            TransportMode::Tram => Some("physical_mode.id=physical_mode:Tramway"),
            TransportMode::Bus => Some("physical_mode.id=physical_mode:Bus"),
            TransportMode::All => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TransportMode::Metro => "metro",
            TransportMode::Rer => "rer",
            TransportMode::Train => "train",
            TransportMode::Tram => "tram",
            TransportMode::Bus => "bus",
            TransportMode::All => "all",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metro" | "m" => Ok(TransportMode::Metro),
            "rer" => Ok(TransportMode::Rer),
            "train" | "transilien" => Ok(TransportMode::Train),
            "tram" | "tramway" => Ok(TransportMode::Tram),
            "bus" => Ok(TransportMode::Bus),
            "all" => Ok(TransportMode::All),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Short line label as shown on Paris signage: `M14`, `RER A`, `T3a`.
///
/// `commercial_mode` is Navitia's display mode ("Métro", "RER", "Tramway", ...).
pub fn line_label(commercial_mode: &str, code: &str) -> String {
    let mode = commercial_mode.to_lowercase();
    if mode.starts_with("métro") || mode.starts_with("metro") {
        format!("M{code}")
    } else if mode == "rer" {
        format!("RER {code}")
    } else if mode.starts_with("tram") {
        format!("T{}", code.trim_start_matches('T'))
    } else {
        code.to_string()
    }
}
