use pukpuk_shared::{RegionIdentity, RegionLevel, RegionMapping};

/// What a click on a map feature (or an insight card) should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickPlan {
    DrillIn { code: String, name: String },
    /// Navigable level, but there is no detail dataset to show.
    Unavailable { name: String },
    /// Leaf feature; only its name is shown.
    Info { name: String },
}

impl ClickPlan {
    /// Transient message shown instead of navigating.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::DrillIn { .. } => None,
            Self::Unavailable { name } => Some(format!("Peta detail untuk {name} belum tersedia.")),
            Self::Info { name } => Some(format!("Kecamatan: {name}")),
        }
    }
}

/// Decide the outcome of clicking `identity` while `level` is displayed.
pub fn plan_click(level: RegionLevel, identity: &RegionIdentity, mapping: &RegionMapping) -> ClickPlan {
    let name = identity.name.clone();
    // Districts are leaves: nothing below them to open.
    if matches!(level.child(), None | Some(RegionLevel::District)) {
        return ClickPlan::Info { name };
    }
    match identity.code.as_deref() {
        Some(code) if mapping.has_dataset(code) => ClickPlan::DrillIn {
            code: code.to_string(),
            name,
        },
        _ => ClickPlan::Unavailable { name },
    }
}
