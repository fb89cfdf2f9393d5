//! Domain vocabulary for paired CAR × SIGEF registry records
//!
//! Closed enumerations for every categorical column the query layer filters
//! or groups on. Each enum round-trips through the code used in the source
//! dataset (`regiao`, `estado`, `class_tam_imovel`, `status_imovel`), so the
//! values returned as filter choices are accepted back by the filter parser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of groups kept by high-cardinality rollups before the tail is
/// collapsed into a synthetic "Other" group.
pub const TOP_N_GROUPS: usize = 20;

/// Label of the synthetic tail group.
pub const OTHER_LABEL: &str = "Other";

/// Label used for rows whose grouping column is null.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Shared behaviour of the one-byte categorical columns.
pub trait Category: Copy + Ord + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static {
    /// Every value, in declaration order.
    const ALL: &'static [Self];

    /// Code as written in the dataset.
    fn code(self) -> &'static str;

    /// Dense index in `0..ALL.len()`.
    fn index(self) -> usize;

    /// Lenient parse of a dataset cell (trimmed, case-insensitive).
    fn parse(raw: &str) -> Option<Self>;

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Strip surrounding whitespace and fold ASCII case for lookups.
fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ============================================================================
// Region
// ============================================================================

/// Brazilian macro-region (`regiao`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Region {
    Norte,
    Nordeste,
    CentroOeste,
    Sudeste,
    Sul,
}

impl Region {
    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Region::Norte => "Norte",
            Region::Nordeste => "Nordeste",
            Region::CentroOeste => "Centro-Oeste",
            Region::Sudeste => "Sudeste",
            Region::Sul => "Sul",
        }
    }
}

impl Category for Region {
    const ALL: &'static [Self] = &[
        Region::Norte,
        Region::Nordeste,
        Region::CentroOeste,
        Region::Sudeste,
        Region::Sul,
    ];

    fn code(self) -> &'static str {
        match self {
            Region::Norte => "norte",
            Region::Nordeste => "nordeste",
            Region::CentroOeste => "centro_oeste",
            Region::Sudeste => "sudeste",
            Region::Sul => "sul",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn parse(raw: &str) -> Option<Self> {
        let key = normalize(raw).replace(['-', ' '], "_");
        match key.as_str() {
            "norte" => Some(Region::Norte),
            "nordeste" => Some(Region::Nordeste),
            "centro_oeste" | "centrooeste" => Some(Region::CentroOeste),
            "sudeste" => Some(Region::Sudeste),
            "sul" => Some(Region::Sul),
            _ => None,
        }
    }
}

// ============================================================================
// State (UF)
// ============================================================================

macro_rules! states {
    ($($variant:ident => $region:ident),+ $(,)?) => {
        /// Federative unit (`estado`), one of the 27 UFs
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "UPPERCASE")]
        #[repr(u8)]
        pub enum State {
            $($variant),+
        }

        impl State {
            /// Macro-region the state belongs to
            pub fn region(self) -> Region {
                match self {
                    $(State::$variant => Region::$region),+
                }
            }
        }

        impl Category for State {
            const ALL: &'static [Self] = &[$(State::$variant),+];

            fn code(self) -> &'static str {
                match self {
                    $(State::$variant => {
                        const CODE: &str = stringify!($variant);
                        CODE
                    }),+
                }
            }

            fn index(self) -> usize {
                self as usize
            }

            fn parse(raw: &str) -> Option<Self> {
                let key = raw.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|state| state.code().eq_ignore_ascii_case(key))
            }
        }
    };
}

states! {
    AC => Norte,
    AL => Nordeste,
    AP => Norte,
    AM => Norte,
    BA => Nordeste,
    CE => Nordeste,
    DF => CentroOeste,
    ES => Sudeste,
    GO => CentroOeste,
    MA => Nordeste,
    MT => CentroOeste,
    MS => CentroOeste,
    MG => Sudeste,
    PA => Norte,
    PB => Nordeste,
    PR => Sul,
    PE => Nordeste,
    PI => Nordeste,
    RJ => Sudeste,
    RN => Nordeste,
    RS => Sul,
    RO => Norte,
    RR => Norte,
    SC => Sul,
    SP => Sudeste,
    SE => Nordeste,
    TO => Norte,
}

// ============================================================================
// Size class
// ============================================================================

/// Property size class (`class_tam_imovel`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SizeClass {
    #[serde(rename = "Pequeno")]
    Small,
    #[serde(rename = "Médio")]
    Medium,
    #[serde(rename = "Grande")]
    Large,
}

impl Category for SizeClass {
    const ALL: &'static [Self] = &[SizeClass::Small, SizeClass::Medium, SizeClass::Large];

    fn code(self) -> &'static str {
        match self {
            SizeClass::Small => "Pequeno",
            SizeClass::Medium => "Médio",
            SizeClass::Large => "Grande",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "pequeno" | "pequena" | "small" => Some(SizeClass::Small),
            "médio" | "medio" | "média" | "media" | "medium" => Some(SizeClass::Medium),
            "grande" | "large" => Some(SizeClass::Large),
            _ => None,
        }
    }
}

// ============================================================================
// Registration status
// ============================================================================

/// CAR registration status (`status_imovel`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    #[serde(rename = "AT")]
    Active,
    #[serde(rename = "PE")]
    Pending,
    #[serde(rename = "SU")]
    Suspended,
    #[serde(rename = "CA")]
    Canceled,
}

impl Status {
    pub fn name(self) -> &'static str {
        match self {
            Status::Active => "Ativo",
            Status::Pending => "Pendente",
            Status::Suspended => "Suspenso",
            Status::Canceled => "Cancelado",
        }
    }
}

impl Category for Status {
    const ALL: &'static [Self] = &[
        Status::Active,
        Status::Pending,
        Status::Suspended,
        Status::Canceled,
    ];

    fn code(self) -> &'static str {
        match self {
            Status::Active => "AT",
            Status::Pending => "PE",
            Status::Suspended => "SU",
            Status::Canceled => "CA",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "at" | "ativo" | "active" => Some(Status::Active),
            "pe" | "pendente" | "pending" => Some(Status::Pending),
            "su" | "suspenso" | "suspended" => Some(Status::Suspended),
            "ca" | "cancelado" | "canceled" | "cancelled" => Some(Status::Canceled),
            _ => None,
        }
    }
}

macro_rules! display_as_code {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        })+
    };
}

display_as_code!(Region, State, SizeClass, Status);

// ============================================================================
// Grouping / filter dimensions
// ============================================================================

/// Categorical dimension a filter can restrict or a rollup can group by.
///
/// Each dimension maps to exactly one dataset column and carries its own
/// cardinality policy (see [`Dimension::top_n`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Region,
    State,
    Municipality,
    SizeClass,
    Status,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Region,
        Dimension::State,
        Dimension::Municipality,
        Dimension::SizeClass,
        Dimension::Status,
    ];

    /// Source column in the dataset
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Region => "regiao",
            Dimension::State => "estado",
            Dimension::Municipality => "municipio_nome",
            Dimension::SizeClass => "class_tam_imovel",
            Dimension::Status => "status_imovel",
        }
    }

    /// Maximum number of individually reported groups, `None` when every
    /// group is always reported.
    pub fn top_n(self) -> Option<usize> {
        match self {
            Dimension::Municipality => Some(TOP_N_GROUPS),
            Dimension::Region | Dimension::State | Dimension::SizeClass | Dimension::Status => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Dimension::Region => "region",
            Dimension::State => "state",
            Dimension::Municipality => "municipality",
            Dimension::SizeClass => "size_class",
            Dimension::Status => "status",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s).replace('-', "_");
        Dimension::ALL
            .into_iter()
            .find(|d| d.code() == key || d.column() == key)
            .ok_or_else(|| format!("unknown dimension '{}'", s.trim()))
    }
}
