use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Organization,
    Applications,
    People,
    Technology,
    Data,
    Procurements,
    Facilities,
    Server,
    Network,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Self::Organization,
        Self::Applications,
        Self::People,
        Self::Technology,
        Self::Data,
        Self::Procurements,
        Self::Facilities,
        Self::Server,
        Self::Network,
        Self::Unknown,
    ];

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "organization" | "organizations" | "organisation" => Self::Organization,
            "applications" | "application" | "app" | "apps" => Self::Applications,
            "people" | "person" => Self::People,
            "technology" | "technologies" => Self::Technology,
            "data" => Self::Data,
            "procurements" | "procurement" => Self::Procurements,
            "facilities" | "facility" => Self::Facilities,
            "server" | "servers" => Self::Server,
            "network" | "networks" => Self::Network,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Organization => "Organization",
            Self::Applications => "Applications",
            Self::People => "People",
            Self::Technology => "Technology",
            Self::Data => "Data",
            Self::Procurements => "Procurements",
            Self::Facilities => "Facilities",
            Self::Server => "Server",
            Self::Network => "Network",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-category visibility toggles.
///
/// Categories without an explicit entry are visible, so a fresh map shows
/// everything and toggles can be applied in any order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryVisibility {
    toggles: BTreeMap<Category, bool>,
}

impl CategoryVisibility {
    pub fn is_visible(&self, category: Category) -> bool {
        self.toggles.get(&category).copied().unwrap_or(true)
    }

    pub fn set(&mut self, category: Category, visible: bool) {
        self.toggles.insert(category, visible);
    }

    pub fn hidden(&self) -> impl Iterator<Item = Category> + '_ {
        self.toggles
            .iter()
            .filter(|(_, visible)| !**visible)
            .map(|(category, _)| *category)
    }

    pub fn show_all(&mut self) {
        self.toggles.clear();
    }
}

impl FromIterator<(Category, bool)> for CategoryVisibility {
    fn from_iter<T: IntoIterator<Item = (Category, bool)>>(iter: T) -> Self {
        let mut visibility = Self::default();
        for (category, visible) in iter {
            visibility.set(category, visible);
        }
        visibility
    }
}
