//! Waste classes the classifier can return and their Spanish display names.

use std::fmt;

/// Classifier label outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown class: {0}")]
pub struct UnknownClass(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasteClass {
    Cardboard,
    Glass,
    Metal,
    Organic,
    Paper,
    Plastic,
    Trash,
}

impl WasteClass {
    pub const ALL: [WasteClass; 7] = [
        WasteClass::Cardboard,
        WasteClass::Glass,
        WasteClass::Metal,
        WasteClass::Organic,
        WasteClass::Paper,
        WasteClass::Plastic,
        WasteClass::Trash,
    ];

    /// Exact, case-sensitive match on the classifier label.
    pub fn from_label(label: &str) -> Result<Self, UnknownClass> {
        Self::ALL
            .into_iter()
            .find(|c| c.label() == label)
            .ok_or_else(|| UnknownClass(label.to_string()))
    }

    /// Label as the classifier spells it.
    pub fn label(self) -> &'static str {
        match self {
            WasteClass::Cardboard => "cardboard",
            WasteClass::Glass => "glass",
            WasteClass::Metal => "metal",
            WasteClass::Organic => "organic",
            WasteClass::Paper => "paper",
            WasteClass::Plastic => "plastic",
            WasteClass::Trash => "trash",
        }
    }

    pub fn spanish(self) -> &'static str {
        match self {
            WasteClass::Cardboard => "carton",
            WasteClass::Glass => "vidrio",
            WasteClass::Metal => "metal",
            WasteClass::Organic => "organico",
            WasteClass::Paper => "papel",
            WasteClass::Plastic => "plastico",
            WasteClass::Trash => "otros",
        }
    }
}

impl fmt::Display for WasteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reply sent to the chat for a classified image.
pub fn reply_text(probability: &str, class: WasteClass) -> String {
    format!(
        "Hay un {} de probabilidad que su residuo sea de tipo: {}",
        probability,
        class.spanish()
    )
}
