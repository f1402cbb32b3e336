//! Configuration consumed while merging definitions.
//!
//! The engine only reads configuration through [`ColumnConfig`]. The
//! stock implementation, [`ColumnOptions`], deserializes from the same
//! camelCase JSON the grid options use.
//!
//! # Environment Variables (sizing)
//!
//! | Variable | Type | Default | Description |
//! |----------|------|---------|-------------|
//! | `FGRID_COLUMN_WIDTH` | u32 | 200 | Width of a column with no `width` |
//! | `FGRID_COLUMN_MIN_WIDTH` | u32 | 10 | Lower clamp for every width |
//! | `FGRID_COLUMN_MAX_WIDTH` | u32 | unset | Upper clamp for every width |

use crate::def::{ColDef, ColGroupDef};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Default width for a column with no explicit width.
pub const DEFAULT_COLUMN_WIDTH: u32 = 200;
/// Default lower bound for column widths.
pub const DEFAULT_MIN_COLUMN_WIDTH: u32 = 10;

const ENV_COLUMN_WIDTH: &str = "FGRID_COLUMN_WIDTH";
const ENV_COLUMN_MIN_WIDTH: &str = "FGRID_COLUMN_MIN_WIDTH";
const ENV_COLUMN_MAX_WIDTH: &str = "FGRID_COLUMN_MAX_WIDTH";

/// Read-only configuration source queried during the merge.
pub trait ColumnConfig {
    /// Grid-wide defaults applied under every leaf definition.
    fn default_leaf_definition(&self) -> Option<&ColDef>;

    /// Grid-wide defaults applied under every real group definition.
    fn default_group_definition(&self) -> Option<&ColGroupDef>;

    /// Named column types that leaf definitions can reference.
    fn column_types(&self) -> &BTreeMap<String, ColDef>;

    /// Width bounds for new columns.
    fn sizing(&self) -> ColumnSizing {
        ColumnSizing::default()
    }
}

/// Width defaults and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSizing {
    pub default_width: u32,
    pub min_width: u32,
    pub max_width: Option<u32>,
}

impl Default for ColumnSizing {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_COLUMN_WIDTH,
            min_width: DEFAULT_MIN_COLUMN_WIDTH,
            max_width: None,
        }
    }
}

impl ColumnSizing {
    #[must_use]
    pub fn with_default_width(mut self, width: u32) -> Self {
        self.default_width = width;
        self
    }

    #[must_use]
    pub fn with_min_width(mut self, width: u32) -> Self {
        self.min_width = width;
        self
    }

    #[must_use]
    pub fn with_max_width(mut self, width: Option<u32>) -> Self {
        self.max_width = width;
        self
    }

    /// Load sizing from environment variables over the defaults.
    ///
    /// Unparseable values are ignored. The result is [`validated`].
    ///
    /// [`validated`]: ColumnSizing::validated
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load sizing using a custom environment lookup (for tests).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut sizing = Self::default();

        if let Some(val) = get_env(ENV_COLUMN_WIDTH)
            && let Ok(width) = val.parse::<u32>()
        {
            sizing.default_width = width;
        }

        if let Some(val) = get_env(ENV_COLUMN_MIN_WIDTH)
            && let Ok(width) = val.parse::<u32>()
        {
            sizing.min_width = width;
        }

        if let Some(val) = get_env(ENV_COLUMN_MAX_WIDTH)
            && let Ok(width) = val.parse::<u32>()
        {
            sizing.max_width = Some(width);
        }

        sizing.validated()
    }

    /// Clamp to a consistent configuration.
    ///
    /// - `min_width` is at least 1
    /// - `max_width` is at least `min_width`
    /// - `default_width` lies within `[min_width, max_width]`
    ///
    /// ```
    /// use fgrid_columns::config::ColumnSizing;
    ///
    /// let sizing = ColumnSizing::default()
    ///     .with_min_width(50)
    ///     .with_default_width(20)
    ///     .validated();
    /// assert_eq!(sizing.default_width, 50);
    /// ```
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.min_width = self.min_width.max(1);
        self.max_width = self.max_width.map(|max| max.max(self.min_width));
        self.default_width = self.clamp(self.default_width);
        self
    }

    /// Resolve the width a column starts with.
    #[must_use]
    pub fn initial_width(&self, def: &ColDef) -> u32 {
        self.clamp_for(def, def.width.unwrap_or(self.default_width))
    }

    /// Clamp `width` to the bounds of `def`, falling back to the grid bounds.
    #[must_use]
    pub fn clamp_for(&self, def: &ColDef, width: u32) -> u32 {
        let min = def.min_width.unwrap_or(self.min_width);
        let max = def.max_width.or(self.max_width).unwrap_or(u32::MAX).max(min);
        width.clamp(min, max)
    }

    fn clamp(&self, width: u32) -> u32 {
        let max = self.max_width.unwrap_or(u32::MAX);
        width.clamp(self.min_width, max.max(self.min_width))
    }
}

/// Stock configuration source.
///
/// ```
/// use fgrid_columns::config::{ColumnConfig, ColumnOptions};
///
/// let options = ColumnOptions::from_json(r#"{
///     "defaultColDef": { "width": 120 },
///     "columnTypes": { "money": { "cellClass": "money" } }
/// }"#).unwrap();
/// assert_eq!(options.default_leaf_definition().unwrap().width, Some(120));
/// assert!(options.column_types().contains_key("money"));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnOptions {
    pub default_col_def: Option<ColDef>,
    pub default_col_group_def: Option<ColGroupDef>,
    pub column_types: BTreeMap<String, ColDef>,
    pub sizing: ColumnSizing,
}

impl ColumnOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default options with sizing read from `FGRID_COLUMN_*`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_sizing(ColumnSizing::from_env())
    }

    /// Parse options from JSON. Sizing is validated after parsing.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut options: Self = serde_json::from_str(json)?;
        options.sizing = options.sizing.validated();
        Ok(options)
    }

    #[must_use]
    pub fn with_default_col_def(mut self, def: ColDef) -> Self {
        self.default_col_def = Some(def);
        self
    }

    #[must_use]
    pub fn with_default_col_group_def(mut self, def: ColGroupDef) -> Self {
        self.default_col_group_def = Some(def);
        self
    }

    #[must_use]
    pub fn with_column_type(mut self, name: impl Into<String>, def: ColDef) -> Self {
        self.column_types.insert(name.into(), def);
        self
    }

    #[must_use]
    pub fn with_sizing(mut self, sizing: ColumnSizing) -> Self {
        self.sizing = sizing.validated();
        self
    }
}

impl ColumnConfig for ColumnOptions {
    fn default_leaf_definition(&self) -> Option<&ColDef> {
        self.default_col_def.as_ref()
    }

    fn default_group_definition(&self) -> Option<&ColGroupDef> {
        self.default_col_group_def.as_ref()
    }

    fn column_types(&self) -> &BTreeMap<String, ColDef> {
        &self.column_types
    }

    fn sizing(&self) -> ColumnSizing {
        self.sizing
    }
}
