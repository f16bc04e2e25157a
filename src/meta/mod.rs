//! Schema metadata documents.
//!
//! Every DBC file kind is described by one `<name>.meta.json` document:
//! an ordered field list plus relational key and sort declarations. The
//! resolver parses the raw JSON, then validates it into a [`TableMeta`]
//! that drives the binary codec and the SQL layer alike. Field order is
//! significant: it fixes both the binary slot order and the default
//! column order.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Locale identifiers for localized string fields, in wire order.
///
/// This order is part of the DBC format; do not reorder. The 17th slot
/// of a localized field is the flags value, not a locale.
pub const LOCALES: [&str; 16] = [
    "enUS", "koKR", "frFR", "deDE", "zhCN", "zhTW", "esES", "esMX", "ruRU", "jaJP", "ptPT", "itIT",
    "unused1", "unused2", "unused3", "unused4",
];

/// Binary slots occupied by a localized field: 16 offsets + 1 flags value.
pub const LOC_SLOTS: usize = LOCALES.len() + 1;

/// Default primary key column when the schema declares none.
pub const DEFAULT_PRIMARY_KEY: &str = "ID";

// ── Field kinds ───────────────────────────────────────────────

/// The closed set of field kinds a schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Signed 32-bit integer, one slot.
    Int32,
    /// Unsigned 32-bit integer, one slot.
    Uint32,
    /// 32-bit float, one slot.
    Float,
    /// String-block offset, one slot.
    Text,
    /// Localized string group, [`LOC_SLOTS`] slots.
    Loc,
}

impl FieldKind {
    /// Parse the wire name used in meta documents.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "int32" => Some(Self::Int32),
            "uint32" => Some(Self::Uint32),
            "float" => Some(Self::Float),
            "string" => Some(Self::Text),
            "Loc" => Some(Self::Loc),
            _ => None,
        }
    }

    /// Wire name as written in meta documents.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Float => "float",
            Self::Text => "string",
            Self::Loc => "Loc",
        }
    }

    /// Number of 4-byte binary slots one value of this kind occupies.
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        match self {
            Self::Loc => LOC_SLOTS,
            _ => 1,
        }
    }
}

// ── Raw document shape ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    file: String,
    #[serde(default)]
    primary_keys: Vec<String>,
    #[serde(default)]
    unique_keys: Vec<Vec<String>>,
    #[serde(default)]
    sort_order: Vec<RawSortField>,
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawSortField {
    name: String,
    #[serde(default)]
    direction: String,
}

// ── Resolved schema ───────────────────────────────────────────

/// One declared field after kind resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Repeat count; `count > 1` expands the field into `<name>_1..<name>_N`.
    pub count: u32,
}

/// One logical field after repeat expansion.
///
/// A `FieldSpec` with `count = 3` yields three logical fields, each
/// holding an independent value in every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalField {
    pub name: String,
    pub kind: FieldKind,
}

/// Sort direction for export ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Lenient parse: anything that is not `desc`/`DESC` sorts ascending.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    /// SQL keyword for this direction.
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// One sort key for export ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub direction: SortDirection,
}

/// A validated schema for one DBC file kind.
///
/// Immutable once loaded; shared read-only by the codec, the SQL layer,
/// and the pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    /// DBC file name, e.g. `Spell.dbc`.
    pub file: String,
    /// Declared fields in binary slot order.
    pub fields: Vec<FieldSpec>,
    /// Primary key column names; empty means the `ID` convention applies.
    pub primary_keys: Vec<String>,
    /// Unique key column groups, checked by the duplicate auditor and
    /// enforced as UNIQUE constraints.
    pub unique_keys: Vec<Vec<String>>,
    /// Export sort order.
    pub sort_order: Vec<SortField>,
}

impl TableMeta {
    /// Load and validate a meta document from disk.
    ///
    /// # Errors
    ///
    /// Returns a schema error naming the table if the file cannot be
    /// read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let origin = table_name_from_meta_path(path);
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::schema(&origin, format!("cannot read meta document: {e}")))?;
        Self::from_json(&text, &origin)
    }

    /// Parse and validate a meta document from a JSON string.
    ///
    /// `origin` names the table in error messages.
    ///
    /// # Errors
    ///
    /// Returns a schema error naming the offending field or key.
    pub fn from_json(text: &str, origin: &str) -> Result<Self> {
        let raw: RawMeta = serde_json::from_str(text)
            .map_err(|e| Error::schema(origin, format!("invalid meta document: {e}")))?;

        if raw.fields.is_empty() {
            return Err(Error::schema(origin, "no fields declared"));
        }

        let mut fields = Vec::with_capacity(raw.fields.len());
        for f in &raw.fields {
            let kind = FieldKind::parse(&f.kind).ok_or_else(|| {
                Error::schema(
                    origin,
                    format!("field `{}` has unknown type `{}`", f.name, f.kind),
                )
            })?;
            let count = match f.count {
                None => 1,
                Some(n) if n >= 1 => u32::try_from(n).map_err(|_| {
                    Error::schema(origin, format!("field `{}` has invalid count {n}", f.name))
                })?,
                Some(n) => {
                    return Err(Error::schema(
                        origin,
                        format!("field `{}` has non-positive count {n}", f.name),
                    ));
                }
            };
            fields.push(FieldSpec {
                name: f.name.clone(),
                kind,
                count,
            });
        }

        let meta = Self {
            file: raw.file,
            fields,
            primary_keys: raw.primary_keys,
            unique_keys: raw.unique_keys,
            sort_order: raw
                .sort_order
                .iter()
                .map(|s| SortField {
                    name: s.name.clone(),
                    direction: SortDirection::parse(&s.direction),
                })
                .collect(),
        };

        meta.validate_key_references(origin)?;
        Ok(meta)
    }

    /// Verify every primary/unique/sort name exists among the expanded
    /// column names.
    fn validate_key_references(&self, origin: &str) -> Result<()> {
        let columns = self.column_names();
        let known: std::collections::HashSet<&str> = columns.iter().map(String::as_str).collect();

        for pk in &self.primary_keys {
            if !known.contains(pk.as_str()) {
                return Err(Error::schema(
                    origin,
                    format!("primary key `{pk}` is not a column of this table"),
                ));
            }
        }
        for (i, group) in self.unique_keys.iter().enumerate() {
            for col in group {
                if !known.contains(col.as_str()) {
                    return Err(Error::schema(
                        origin,
                        format!("unique key #{i} references unknown column `{col}`"),
                    ));
                }
            }
        }
        for sf in &self.sort_order {
            if !known.contains(sf.name.as_str()) {
                return Err(Error::schema(
                    origin,
                    format!("sort order references unknown column `{}`", sf.name),
                ));
            }
        }
        Ok(())
    }

    /// Table name: the file name without its `.dbc` extension.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.file
            .strip_suffix(".dbc")
            .unwrap_or(&self.file)
            .to_string()
    }

    /// Logical fields after repeat expansion, in slot order.
    ///
    /// A field with `count = 1` keeps its name; `count = N > 1` yields
    /// `<name>_1 .. <name>_N`, each an independent value.
    #[must_use]
    pub fn logical_fields(&self) -> Vec<LogicalField> {
        let mut out = Vec::new();
        for f in &self.fields {
            if f.count == 1 {
                out.push(LogicalField {
                    name: f.name.clone(),
                    kind: f.kind,
                });
            } else {
                for i in 1..=f.count {
                    out.push(LogicalField {
                        name: format!("{}_{i}", f.name),
                        kind: f.kind,
                    });
                }
            }
        }
        out
    }

    /// Relational column names in order: logical fields expanded, with
    /// localized fields becoming one column per locale plus `_flags`.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        for lf in self.logical_fields() {
            match lf.kind {
                FieldKind::Loc => {
                    for lang in LOCALES {
                        out.push(format!("{}_{lang}", lf.name));
                    }
                    out.push(format!("{}_flags", lf.name));
                }
                _ => out.push(lf.name),
            }
        }
        out
    }

    /// Primary key columns, falling back to the `ID` convention.
    #[must_use]
    pub fn effective_primary_keys(&self) -> Vec<String> {
        if self.primary_keys.is_empty() {
            vec![DEFAULT_PRIMARY_KEY.to_string()]
        } else {
            self.primary_keys.clone()
        }
    }

    /// Binary slots per record.
    #[must_use]
    pub fn field_count(&self) -> u32 {
        let slots: usize = self
            .fields
            .iter()
            .map(|f| f.kind.slot_count() * f.count as usize)
            .sum();
        u32::try_from(slots).unwrap_or(u32::MAX)
    }

    /// Record stride in bytes: 4 bytes per slot.
    #[must_use]
    pub fn record_size(&self) -> u32 {
        self.field_count() * 4
    }
}

/// Derive the table name from a `<name>.meta.json` path.
#[must_use]
pub fn table_name_from_meta_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.strip_suffix(".meta.json").unwrap_or(n).to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spell_meta() -> TableMeta {
        TableMeta::from_json(
            r#"{
                "file": "Spell.dbc",
                "primaryKeys": ["ID"],
                "uniqueKeys": [["ID"], ["Name_enUS", "Rank_1"]],
                "sortOrder": [{"name": "ID", "direction": "asc"}],
                "fields": [
                    {"name": "ID", "type": "uint32"},
                    {"name": "Rank", "type": "int32", "count": 2},
                    {"name": "Speed", "type": "float"},
                    {"name": "Name", "type": "Loc"}
                ]
            }"#,
            "Spell",
        )
        .unwrap()
    }

    #[test]
    fn test_parses_and_expands() {
        let meta = spell_meta();
        assert_eq!(meta.table_name(), "Spell");

        let logical = meta.logical_fields();
        let names: Vec<&str> = logical.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["ID", "Rank_1", "Rank_2", "Speed", "Name"]);
    }

    #[test]
    fn test_repeat_count_expands_to_exactly_n_columns() {
        let meta = TableMeta::from_json(
            r#"{"file": "T.dbc", "fields": [{"name": "Stat", "type": "int32", "count": 3}]}"#,
            "T",
        )
        .unwrap();
        assert_eq!(meta.column_names(), ["Stat_1", "Stat_2", "Stat_3"]);
    }

    #[test]
    fn test_loc_expands_to_locale_columns_plus_flags() {
        let meta = spell_meta();
        let cols = meta.column_names();
        assert!(cols.contains(&"Name_enUS".to_string()));
        assert!(cols.contains(&"Name_unused4".to_string()));
        assert!(cols.contains(&"Name_flags".to_string()));
        // 1 (ID) + 2 (Rank) + 1 (Speed) + 17 (Name)
        assert_eq!(cols.len(), 21);
    }

    #[test]
    fn test_stride_is_multiple_of_four_and_matches_slots() {
        let meta = spell_meta();
        // 1 + 2 + 1 + 17 slots
        assert_eq!(meta.field_count(), 21);
        assert_eq!(meta.record_size(), 84);
        assert_eq!(meta.record_size() % 4, 0);
    }

    #[test]
    fn test_unknown_type_names_field() {
        let err = TableMeta::from_json(
            r#"{"file": "T.dbc", "fields": [{"name": "Flags", "type": "uint16"}]}"#,
            "T",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Flags"));
        assert!(msg.contains("uint16"));
    }

    #[test]
    fn test_empty_field_list_rejected() {
        let err = TableMeta::from_json(r#"{"file": "T.dbc", "fields": []}"#, "T").unwrap_err();
        assert!(err.to_string().contains("no fields"));
    }

    #[test]
    fn test_non_positive_count_rejected() {
        let err = TableMeta::from_json(
            r#"{"file": "T.dbc", "fields": [{"name": "Stat", "type": "int32", "count": 0}]}"#,
            "T",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Stat"));
    }

    #[test]
    fn test_key_reference_to_unknown_column_rejected() {
        let err = TableMeta::from_json(
            r#"{
                "file": "T.dbc",
                "uniqueKeys": [["Nope"]],
                "fields": [{"name": "ID", "type": "uint32"}]
            }"#,
            "T",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_key_may_reference_expanded_column() {
        // `Rank_1` only exists after repeat expansion.
        let meta = TableMeta::from_json(
            r#"{
                "file": "T.dbc",
                "uniqueKeys": [["Rank_1"]],
                "fields": [{"name": "Rank", "type": "int32", "count": 2}]
            }"#,
            "T",
        );
        assert!(meta.is_ok());
    }

    #[test]
    fn test_unknown_sort_direction_coerces_to_ascending() {
        let meta = TableMeta::from_json(
            r#"{
                "file": "T.dbc",
                "sortOrder": [{"name": "ID", "direction": "sideways"}],
                "fields": [{"name": "ID", "type": "uint32"}]
            }"#,
            "T",
        )
        .unwrap();
        assert_eq!(meta.sort_order[0].direction, SortDirection::Ascending);
    }

    #[test]
    fn test_default_primary_key_convention() {
        let meta = TableMeta::from_json(
            r#"{"file": "T.dbc", "fields": [{"name": "ID", "type": "uint32"}]}"#,
            "T",
        )
        .unwrap();
        assert_eq!(meta.effective_primary_keys(), ["ID"]);
    }

    #[test]
    fn test_table_name_from_meta_path() {
        let path = Path::new("/tmp/meta/Spell.meta.json");
        assert_eq!(table_name_from_meta_path(path), "Spell");
    }
}
