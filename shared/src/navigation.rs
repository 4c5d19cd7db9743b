//! Drill-down navigation across the administrative hierarchy.
//!
//! [`Navigator`] is the only owner of [`NavigationState`]. It exposes three
//! transitions (`drill_in`, `drill_out`, `go_home`) and every one reports
//! either the new view or why the request was ignored. Callers re-issue the
//! dataset load and the overlay fetch on `Moved` and do nothing otherwise.

use serde::{Deserialize, Serialize};

use crate::region::{ROOT_LABEL, RegionCode, RegionLevel, RegionRef, is_root_code};

/// A previously visited ancestor view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbEntry {
    pub level: RegionLevel,
    pub code: RegionCode,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub level: RegionLevel,
    pub code: RegionCode,
    pub region_name: String,
    /// Oldest first. Never contains the root or the current view.
    pub breadcrumbs: Vec<BreadcrumbEntry>,
}

impl NavigationState {
    pub fn root() -> Self {
        let root = RegionRef::root();
        Self {
            level: root.level,
            code: root.code,
            region_name: ROOT_LABEL.to_string(),
            breadcrumbs: Vec::new(),
        }
    }

    pub fn region(&self) -> RegionRef {
        RegionRef {
            level: self.level,
            code: self.code.clone(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.level == RegionLevel::National
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::root()
    }
}

/// Where a breadcrumb click goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreadcrumbTarget {
    Home,
    Crumb(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The clicked feature has no resolvable code.
    NoCode,
    /// Already showing that region.
    AlreadyCurrent,
    /// The current level has no children.
    Terminal,
    /// The code's shape matches no level.
    UnrecognizedCode,
    /// The code is not one level below the current view.
    LevelMismatch {
        expected: RegionLevel,
        found: RegionLevel,
    },
    NoSuchCrumb(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    Moved(RegionRef),
    Ignored(Rejection),
}

impl Transition {
    pub fn moved(&self) -> Option<&RegionRef> {
        match self {
            Self::Moved(region) => Some(region),
            Self::Ignored(_) => None,
        }
    }
}

/// One rendered breadcrumb position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailItem {
    Home,
    Crumb { index: usize, name: String },
    Current { name: String },
}

#[derive(Debug, Clone, Default)]
pub struct Navigator {
    state: NavigationState,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn current(&self) -> RegionRef {
        self.state.region()
    }

    /// Descend into a child region of the current view.
    pub fn drill_in(&mut self, code: Option<&str>, name: &str) -> Transition {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Transition::Ignored(Rejection::NoCode);
        };
        if code == self.state.code {
            return Transition::Ignored(Rejection::AlreadyCurrent);
        }
        let Some(expected) = self.state.level.child() else {
            return Transition::Ignored(Rejection::Terminal);
        };
        let found = match RegionLevel::from_code(code) {
            Some(level) if !is_root_code(code) => level,
            _ => return Transition::Ignored(Rejection::UnrecognizedCode),
        };
        if found != expected {
            return Transition::Ignored(Rejection::LevelMismatch { expected, found });
        }

        if !self.state.is_root() {
            self.state.breadcrumbs.push(BreadcrumbEntry {
                level: self.state.level,
                code: self.state.code.clone(),
                name: self.state.region_name.clone(),
            });
        }
        self.state.level = found;
        self.state.code = code.to_string();
        self.state.region_name = name.to_string();
        Transition::Moved(self.state.region())
    }

    /// Return to the root or to an ancestor on the breadcrumb trail.
    pub fn drill_out(&mut self, target: BreadcrumbTarget) -> Transition {
        match target {
            BreadcrumbTarget::Home => self.go_home(),
            BreadcrumbTarget::Crumb(index) => {
                if index >= self.state.breadcrumbs.len() {
                    return Transition::Ignored(Rejection::NoSuchCrumb(index));
                }
                let mut tail = self.state.breadcrumbs.split_off(index);
                // `tail[0]` is the crumb being restored.
                let entry = tail.swap_remove(0);
                self.state.level = entry.level;
                self.state.code = entry.code;
                self.state.region_name = entry.name;
                Transition::Moved(self.state.region())
            }
        }
    }

    pub fn go_home(&mut self) -> Transition {
        self.state = NavigationState::root();
        Transition::Moved(self.state.region())
    }

    pub fn trail(&self) -> Vec<TrailItem> {
        let mut trail = Vec::with_capacity(self.state.breadcrumbs.len() + 2);
        trail.push(TrailItem::Home);
        trail.extend(
            self.state
                .breadcrumbs
                .iter()
                .enumerate()
                .map(|(index, entry)| TrailItem::Crumb {
                    index,
                    name: entry.name.clone(),
                }),
        );
        if !self.state.is_root() {
            trail.push(TrailItem::Current {
                name: self.state.region_name.clone(),
            });
        }
        trail
    }
}
