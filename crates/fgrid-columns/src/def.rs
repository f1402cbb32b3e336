//! User-supplied column and column-group definitions.
//!
//! A definition list is an arbitrarily nested list of leaves and groups.
//! Group-ness is decided once, when the definition is ingested: a JSON
//! object carrying a `children` key is a group, anything else is a leaf.
//!
//! ```
//! use fgrid_columns::def::ColumnDefinition;
//!
//! let defs: Vec<ColumnDefinition> = serde_json::from_str(r#"[
//!     { "field": "athlete" },
//!     { "headerName": "Medals", "children": [{ "field": "gold" }, { "field": "silver" }] }
//! ]"#).unwrap();
//!
//! assert!(defs[0].is_leaf());
//! assert_eq!(defs[1].children().len(), 2);
//! ```

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Pinned section of the grid a column renders in.
///
/// On the wire: `"left"` or `true` pin left, `"right"` pins right,
/// `false`, `""` and `"center"` leave the column unpinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinnedSide {
    Left,
    /// Unpinned (the scrolling middle section).
    #[default]
    Center,
    Right,
}

impl PinnedSide {
    /// All sections in render order.
    pub const ALL: [PinnedSide; 3] = [PinnedSide::Left, PinnedSide::Center, PinnedSide::Right];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for PinnedSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PinnedSide {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(true) => Ok(Self::Left),
            Value::Bool(false) => Ok(Self::Center),
            Value::String(s) => match s.as_str() {
                "left" => Ok(Self::Left),
                "right" => Ok(Self::Right),
                "" | "center" => Ok(Self::Center),
                other => Err(de::Error::unknown_variant(other, &["left", "right", "center"])),
            },
            other => Err(de::Error::custom(format!(
                "pinned must be a string or boolean, got {other}"
            ))),
        }
    }
}

/// When a child is shown inside an expandable group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnGroupShow {
    /// Only while the parent group is expanded.
    Open,
    /// Only while the parent group is collapsed.
    Closed,
}

/// The `type` field of a leaf definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnTypeRef {
    /// Named column types, applied in order.
    Names(Vec<String>),
    /// Neither a string nor an array of strings. Kept so the merge step
    /// can warn about it.
    Invalid(Value),
}

impl ColumnTypeRef {
    /// Parse a raw JSON `type` value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Names(s.split(',').map(str::to_owned).collect()),
            Value::Array(items) if items.iter().all(Value::is_string) => Self::Names(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Self::Invalid(other),
        }
    }
}

impl<'de> Deserialize<'de> for ColumnTypeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Configuration of a single data column.
///
/// Every typed field is optional: an absent field does not take part in
/// the merge. Keys the grid does not interpret are kept in [`extra`].
///
/// [`extra`]: ColDef::extra
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColDef {
    pub col_id: Option<String>,
    pub field: Option<String>,
    pub header_name: Option<String>,
    #[serde(rename = "type")]
    pub col_type: Option<ColumnTypeRef>,
    pub width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub hide: Option<bool>,
    pub pinned: Option<PinnedSide>,
    pub column_group_show: Option<ColumnGroupShow>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ColDef {
    /// An empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.col_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header_name = Some(header.into());
        self
    }

    /// Reference one or more named column types (comma separated).
    #[must_use]
    pub fn with_type(mut self, types: &str) -> Self {
        self.col_type = Some(ColumnTypeRef::from_value(Value::String(types.to_owned())));
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn with_hidden(mut self, hide: bool) -> Self {
        self.hide = Some(hide);
        self
    }

    #[must_use]
    pub fn with_pinned(mut self, side: PinnedSide) -> Self {
        self.pinned = Some(side);
        self
    }

    #[must_use]
    pub fn with_group_show(mut self, show: ColumnGroupShow) -> Self {
        self.column_group_show = Some(show);
        self
    }

    /// Set an uninterpreted configuration key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Shallow-merge `top` over `self`: every field present on `top`
    /// replaces the one here.
    pub fn overlay(&mut self, top: &ColDef) {
        overlay_opt(&mut self.col_id, &top.col_id);
        overlay_opt(&mut self.field, &top.field);
        overlay_opt(&mut self.header_name, &top.header_name);
        overlay_opt(&mut self.col_type, &top.col_type);
        overlay_opt(&mut self.width, &top.width);
        overlay_opt(&mut self.min_width, &top.min_width);
        overlay_opt(&mut self.max_width, &top.max_width);
        overlay_opt(&mut self.hide, &top.hide);
        overlay_opt(&mut self.pinned, &top.pinned);
        overlay_opt(&mut self.column_group_show, &top.column_group_show);
        for (key, value) in &top.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Configuration of a column group, without its children.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColGroupDef {
    pub group_id: Option<String>,
    pub header_name: Option<String>,
    pub open_by_default: Option<bool>,
    pub marry_children: Option<bool>,
    pub column_group_show: Option<ColumnGroupShow>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ColGroupDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_group_id(mut self, id: impl Into<String>) -> Self {
        self.group_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header_name = Some(header.into());
        self
    }

    #[must_use]
    pub fn with_open_by_default(mut self, open: bool) -> Self {
        self.open_by_default = Some(open);
        self
    }

    #[must_use]
    pub fn with_group_show(mut self, show: ColumnGroupShow) -> Self {
        self.column_group_show = Some(show);
        self
    }

    /// Shallow-merge `top` over `self`.
    pub fn overlay(&mut self, top: &ColGroupDef) {
        overlay_opt(&mut self.group_id, &top.group_id);
        overlay_opt(&mut self.header_name, &top.header_name);
        overlay_opt(&mut self.open_by_default, &top.open_by_default);
        overlay_opt(&mut self.marry_children, &top.marry_children);
        overlay_opt(&mut self.column_group_show, &top.column_group_show);
        for (key, value) in &top.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

fn overlay_opt<T: Clone>(slot: &mut Option<T>, top: &Option<T>) {
    if let Some(value) = top {
        *slot = Some(value.clone());
    }
}

/// One entry of a definition list.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefinition {
    Leaf(ColDef),
    Group {
        def: ColGroupDef,
        children: Vec<ColumnDefinition>,
    },
}

impl ColumnDefinition {
    #[must_use]
    pub fn leaf(def: ColDef) -> Self {
        Self::Leaf(def)
    }

    #[must_use]
    pub fn group(def: ColGroupDef, children: Vec<ColumnDefinition>) -> Self {
        Self::Group { def, children }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Children of a group; empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[ColumnDefinition] {
        match self {
            Self::Leaf(_) => &[],
            Self::Group { children, .. } => children,
        }
    }
}

impl<'de> Deserialize<'de> for ColumnDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        match map.remove("children") {
            Some(children) => {
                let children = match children {
                    Value::Null => Vec::new(),
                    other => {
                        Vec::<ColumnDefinition>::deserialize(other).map_err(de::Error::custom)?
                    }
                };
                let def = ColGroupDef::deserialize(Value::Object(map)).map_err(de::Error::custom)?;
                Ok(Self::Group { def, children })
            }
            None => ColDef::deserialize(Value::Object(map))
                .map(Self::Leaf)
                .map_err(de::Error::custom),
        }
    }
}
