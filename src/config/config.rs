use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::data::sort_compare::{SortDirection, SortState};
use crate::debouncer::DEFAULT_DEBOUNCE_MS;
use crate::pagination::DEFAULT_PAGE_SIZE;

/// Configuration of one grid view.
///
/// Treated as an immutable value: a view takes its own copy, and sibling
/// views derive variants with [`GridConfig::with_overrides`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub pagination: PaginationConfig,
    pub search: SearchConfig,
    pub rows: RowConfig,
    pub columns: ColumnConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_sort: Option<InitialSort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    pub show_first_last_buttons: bool,
    pub show_go_to_page: bool,
    /// Hide the page size selector
    pub hide_page_size: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Show the global search input
    pub enabled: bool,
    /// Apply global search text without the debounce delay
    pub instant_search: bool,
    pub debounce_delay_ms: u64,
    pub label: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowConfig {
    pub show_row_numbers: bool,
    pub multi_row_selection: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub sticky_headers: bool,
    pub show_hide_columns: bool,
    pub reorder_columns: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialSort {
    pub active: String,
    pub direction: SortDirection,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![10, 15, 20, 25],
            show_first_last_buttons: false,
            show_go_to_page: false,
            hide_page_size: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instant_search: false,
            debounce_delay_ms: DEFAULT_DEBOUNCE_MS,
            label: "Search".to_string(),
            placeholder: "Search table for...".to_string(),
        }
    }
}

impl InitialSort {
    pub fn to_sort_state(&self) -> SortState {
        SortState::new(self.active.clone(), self.direction)
    }
}

impl GridConfig {
    /// Load config from the default location, falling back to defaults
    /// when no file exists yet
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            debug!(target: "view", "No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: GridConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("grid-view").join("config.toml"))
    }

    /// A copy of this config with `f` applied to the copy
    pub fn with_overrides<F>(&self, f: F) -> Self
    where
        F: FnOnce(&mut GridConfig),
    {
        let mut copy = self.clone();
        f(&mut copy);
        copy
    }

    /// Debounce delay for the global search input
    pub fn search_delay_ms(&self) -> u64 {
        if self.search.instant_search {
            0
        } else {
            self.search.debounce_delay_ms
        }
    }

    /// Whether the "Modify columns" action is offered
    pub fn allows_column_edits(&self) -> bool {
        self.columns.show_hide_columns || self.columns.reorder_columns
    }

    /// Default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Grid view configuration
# Location: ~/.config/grid-view/config.toml (Linux)

[pagination]
page_size = 10
# Offered page sizes; the current size is added when missing
page_size_options = [10, 15, 20, 25]
show_first_last_buttons = false
show_go_to_page = false
hide_page_size = false

[search]
enabled = true
# Apply search text on every keystroke instead of after a pause
instant_search = false
debounce_delay_ms = 500
label = "Search"
placeholder = "Search table for..."

[rows]
show_row_numbers = false
multi_row_selection = false

[columns]
sticky_headers = false
show_hide_columns = false
reorder_columns = false

# [initial_sort]
# active = "name"
# direction = "asc"
"#
        .to_string()
    }
}
