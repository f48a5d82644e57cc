use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which inventory family a record belongs to.
///
/// Properties and tax lots share the same entity/state/view/audit tables and
/// are told apart by this discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryKind {
    Property,
    TaxLot,
}

impl InventoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryKind::Property => "property",
            InventoryKind::TaxLot => "tax_lot",
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "property" => Ok(InventoryKind::Property),
            "tax_lot" | "taxlot" => Ok(InventoryKind::TaxLot),
            other => Err(format!("Unknown inventory kind: {}", other)),
        }
    }
}

/// Where a state's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    AssessedRaw,
    PortfolioRaw,
    AssessedFinal,
    PortfolioFinal,
    Composite,
    GreenButtonRaw,
    GreenButtonFinal,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::AssessedRaw => "assessed_raw",
            SourceType::PortfolioRaw => "portfolio_raw",
            SourceType::AssessedFinal => "assessed_final",
            SourceType::PortfolioFinal => "portfolio_final",
            SourceType::Composite => "composite",
            SourceType::GreenButtonRaw => "green_button_raw",
            SourceType::GreenButtonFinal => "green_button_final",
        }
    }

    /// Raw rows straight out of an import file.
    pub fn is_raw(&self) -> bool {
        matches!(
            self,
            SourceType::AssessedRaw | SourceType::PortfolioRaw | SourceType::GreenButtonRaw
        )
    }

    /// Mapped, per-source final records.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            SourceType::AssessedFinal | SourceType::PortfolioFinal | SourceType::GreenButtonFinal
        )
    }

    /// Source types that never count as "unmatched" import output.
    pub fn excluded_from_matching() -> [SourceType; 4] {
        [
            SourceType::Composite,
            SourceType::AssessedRaw,
            SourceType::PortfolioRaw,
            SourceType::GreenButtonRaw,
        ]
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assessed_raw" => Ok(SourceType::AssessedRaw),
            "portfolio_raw" => Ok(SourceType::PortfolioRaw),
            "assessed_final" => Ok(SourceType::AssessedFinal),
            "portfolio_final" => Ok(SourceType::PortfolioFinal),
            "composite" => Ok(SourceType::Composite),
            "green_button_raw" => Ok(SourceType::GreenButtonRaw),
            "green_button_final" => Ok(SourceType::GreenButtonFinal),
            other => Err(format!("Unknown source type: {}", other)),
        }
    }
}

/// Position of a state in the import pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataState {
    Unknown,
    Imported,
    Mapped,
    Matched,
    FlaggedForDelete,
}

impl DataState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataState::Unknown => "unknown",
            DataState::Imported => "imported",
            DataState::Mapped => "mapped",
            DataState::Matched => "matched",
            DataState::FlaggedForDelete => "flagged_for_delete",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DataState::Unknown => 0,
            DataState::Imported => 1,
            DataState::Mapped => 2,
            DataState::Matched => 3,
            DataState::FlaggedForDelete => 4,
        }
    }

    /// Pipeline stages only move forward; any live state may be flagged for
    /// deletion, and a flagged state is terminal.
    pub fn can_transition_to(&self, next: DataState) -> bool {
        match (self, next) {
            (DataState::FlaggedForDelete, _) => false,
            (_, DataState::FlaggedForDelete) => true,
            (current, next) => next.rank() > current.rank(),
        }
    }
}

impl fmt::Display for DataState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(DataState::Unknown),
            "imported" => Ok(DataState::Imported),
            "mapped" => Ok(DataState::Mapped),
            "matched" => Ok(DataState::Matched),
            "flagged_for_delete" => Ok(DataState::FlaggedForDelete),
            other => Err(format!("Unknown data state: {}", other)),
        }
    }
}

/// Merge bookkeeping for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    Unknown,
    New,
    Merged,
    Duplicate,
    Deleted,
}

impl MergeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeState::Unknown => "unknown",
            MergeState::New => "new",
            MergeState::Merged => "merged",
            MergeState::Duplicate => "duplicate",
            MergeState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(MergeState::Unknown),
            "new" => Ok(MergeState::New),
            "merged" => Ok(MergeState::Merged),
            "duplicate" => Ok(MergeState::Duplicate),
            "deleted" => Ok(MergeState::Deleted),
            other => Err(format!("Unknown merge state: {}", other)),
        }
    }
}

/// What caused an audit log entry to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditRecordType {
    ImportCreate,
    ImportUpdate,
    UserCreate,
    UserEdit,
    Merge,
    Unmerge,
}

impl AuditRecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditRecordType::ImportCreate => "import_create",
            AuditRecordType::ImportUpdate => "import_update",
            AuditRecordType::UserCreate => "user_create",
            AuditRecordType::UserEdit => "user_edit",
            AuditRecordType::Merge => "merge",
            AuditRecordType::Unmerge => "unmerge",
        }
    }
}

impl fmt::Display for AuditRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditRecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "import_create" => Ok(AuditRecordType::ImportCreate),
            "import_update" => Ok(AuditRecordType::ImportUpdate),
            "user_create" => Ok(AuditRecordType::UserCreate),
            "user_edit" => Ok(AuditRecordType::UserEdit),
            "merge" => Ok(AuditRecordType::Merge),
            "unmerge" => Ok(AuditRecordType::Unmerge),
            other => Err(format!("Unknown audit record type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelColor {
    Red,
    Orange,
    White,
    Blue,
    LightBlue,
    Green,
    Gray,
}

impl LabelColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelColor::Red => "red",
            LabelColor::Orange => "orange",
            LabelColor::White => "white",
            LabelColor::Blue => "blue",
            LabelColor::LightBlue => "light blue",
            LabelColor::Green => "green",
            LabelColor::Gray => "gray",
        }
    }
}

impl Default for LabelColor {
    fn default() -> Self {
        LabelColor::Green
    }
}

impl fmt::Display for LabelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(LabelColor::Red),
            "orange" => Ok(LabelColor::Orange),
            "white" => Ok(LabelColor::White),
            "blue" => Ok(LabelColor::Blue),
            "light blue" => Ok(LabelColor::LightBlue),
            "green" => Ok(LabelColor::Green),
            "gray" | "grey" => Ok(LabelColor::Gray),
            other => Err(format!("Unknown label color: {}", other)),
        }
    }
}
