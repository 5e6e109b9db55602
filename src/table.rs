use serde_json::{Map, Value};
use tracing::trace;

use crate::domain::PortalError;

/// Normalized tabular data: one header row plus value rows, everything rendered as text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Accepts the three payload shapes the sheet endpoint produces.
    ///
    /// 1. `{"headers": [...], "rows": [...]}` where a row is an array or a keyed object
    /// 2. `[{...}, {...}]` keyed objects, headers are the union of all keys in first-seen order
    /// 3. `[[...], [...]]` first array is the header row
    pub fn normalize(payload: &Value) -> Result<Self, PortalError> {
        if let Value::Object(obj) = payload
            && let (Some(Value::Array(headers)), Some(Value::Array(rows))) =
                (obj.get("headers"), obj.get("rows"))
        {
            trace!("Normalizing headers/rows payload with {} rows", rows.len());
            let headers: Vec<String> = headers.iter().map(cell_text).collect();
            let rows = rows
                .iter()
                .map(|r| match r {
                    Value::Array(cells) => cells.iter().map(cell_text).collect(),
                    Value::Object(o) => project(o, &headers),
                    _ => vec![String::new(); headers.len()],
                })
                .collect();
            return Ok(Table { headers, rows });
        }

        if let Value::Array(items) = payload
            && let Some(first) = items.first()
        {
            if first.is_object() {
                trace!("Normalizing array of {} objects", items.len());
                let mut headers: Vec<String> = Vec::new();
                for item in items.iter() {
                    if let Value::Object(o) = item {
                        for key in o.keys() {
                            if !headers.iter().any(|h| h == key) {
                                headers.push(key.clone());
                            }
                        }
                    }
                }
                let empty = Map::new();
                let rows = items
                    .iter()
                    .map(|item| project(item.as_object().unwrap_or(&empty), &headers))
                    .collect();
                return Ok(Table { headers, rows });
            }
            if let Value::Array(header_row) = first {
                trace!("Normalizing array of {} arrays", items.len());
                let headers = header_row.iter().map(cell_text).collect();
                let rows = items[1..]
                    .iter()
                    .map(|r| match r {
                        Value::Array(cells) => cells.iter().map(cell_text).collect(),
                        other => vec![cell_text(other)],
                    })
                    .collect();
                return Ok(Table { headers, rows });
            }
        }

        Err(PortalError::UnexpectedShape)
    }

    /// Index of the first alias that names a header.
    ///
    /// Headers are compared trimmed and lowercased. Aliases are tried in order, so the
    /// first alias that matches any header wins.
    pub fn column_index(&self, aliases: &[&str]) -> Option<usize> {
        let normalized: Vec<String> = self
            .headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        aliases.iter().find_map(|alias| {
            let alias = alias.to_lowercase();
            normalized.iter().position(|h| *h == alias)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn project(obj: &Map<String, Value>, headers: &[String]) -> Vec<String> {
    headers.iter().map(|h| lookup(obj, h)).collect()
}

/// Text of a single cell. `null` is empty, strings are kept as is, everything else is JSON text.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn replace_whitespace(s: &str, with: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_ws {
                out.push_str(with);
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

/// Candidate keys for a header, in the order they are tried.
pub fn candidate_keys(header: &str) -> [String; 4] {
    let lower = header.to_lowercase();
    [
        lower.clone(),
        replace_whitespace(&lower, "_"),
        replace_whitespace(&lower, ""),
        replace_whitespace(header, "_"),
    ]
}

/// Best-effort value lookup of `header` in a keyed row.
///
/// An exact key hit short-circuits. Otherwise each candidate is compared case-insensitively
/// against the object's own keys. Missing values are the empty string.
pub fn lookup(obj: &Map<String, Value>, header: &str) -> String {
    if let Some(v) = obj.get(header) {
        return cell_text(v);
    }
    for candidate in candidate_keys(header) {
        let candidate = candidate.to_lowercase();
        if let Some((_, v)) = obj.iter().find(|(k, _)| k.to_lowercase() == candidate) {
            return cell_text(v);
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sorted_rows(t: &Table) -> Vec<Vec<String>> {
        let mut rows = t.rows.clone();
        rows.sort();
        rows
    }

    #[test]
    fn three_shapes_normalize_to_same_table() {
        let headers_rows = json!({
            "headers": ["Supplier", "Email"],
            "rows": [["Acme", "a@x.com"], {"supplier": "Globex", "email": "g@x.com"}]
        });
        let objects = json!([
            {"Supplier": "Globex", "Email": "g@x.com"},
            {"Supplier": "Acme", "Email": "a@x.com"}
        ]);
        let arrays = json!([["Supplier", "Email"], ["Acme", "a@x.com"], ["Globex", "g@x.com"]]);

        let a = Table::normalize(&headers_rows).unwrap();
        let b = Table::normalize(&objects).unwrap();
        let c = Table::normalize(&arrays).unwrap();

        assert_eq!(a.headers, b.headers);
        assert_eq!(b.headers, c.headers);
        assert_eq!(sorted_rows(&a), sorted_rows(&b));
        assert_eq!(sorted_rows(&b), sorted_rows(&c));
    }

    #[test]
    fn object_rows_union_keys_in_first_seen_order() {
        let payload: Value =
            serde_json::from_str(include_str!("../tests/fixtures/contacts_objects.json")).unwrap();
        let table = Table::normalize(&payload).unwrap();
        assert_eq!(
            table.headers,
            vec!["Supplier", "Contact", "Email", "Phone", "Notes"]
        );
        assert_eq!(table.rows.len(), 4);
        // Second record has no notes field
        assert_eq!(table.rows[1][4], "");
    }

    #[test]
    fn single_supplier_payload() {
        let table = Table::normalize(&json!([{"Supplier": "Acme", "Email": "a@x.com"}])).unwrap();
        assert!(table.headers.contains(&"Supplier".to_string()));
        assert!(table.headers.contains(&"Email".to_string()));
        assert_eq!(table.rows, vec![vec!["Acme", "a@x.com"]]);
    }

    #[test]
    fn cells_are_rendered_as_text() {
        let table = Table::normalize(&json!([["Name", "Count", "Active", "Missing"], ["x", 3, true, null]]))
            .unwrap();
        assert_eq!(table.rows[0], vec!["x", "3", "true", ""]);
    }

    #[test]
    fn unexpected_shapes_fail() {
        for payload in [json!({}), json!([]), json!("text"), json!(42), json!([1, 2]), json!({"headers": []})] {
            assert!(matches!(
                Table::normalize(&payload),
                Err(PortalError::UnexpectedShape)
            ));
        }
    }

    #[test]
    fn fuzzy_lookup_candidates() {
        let obj = json!({"photo_file": "jane.png", "FULLNAME": "Jane", "Contact Number": "555"});
        let obj = obj.as_object().unwrap();
        assert_eq!(lookup(obj, "Photo File"), "jane.png");
        assert_eq!(lookup(obj, "full name"), "Jane");
        assert_eq!(lookup(obj, "contact number"), "555");
        assert_eq!(lookup(obj, "Email"), "");
    }

    #[test]
    fn exact_key_wins_over_candidates() {
        // "name" would match the lowercase candidate, but the exact key is taken first
        let obj = json!({"name": "lower", "Name": "exact"});
        assert_eq!(lookup(obj.as_object().unwrap(), "Name"), "exact");
        assert_eq!(lookup(obj.as_object().unwrap(), "name"), "lower");
    }

    #[test]
    fn candidate_order() {
        let c = candidate_keys("Photo  File");
        assert_eq!(c[0], "photo  file");
        assert_eq!(c[1], "photo_file");
        assert_eq!(c[2], "photofile");
        assert_eq!(c[3], "Photo_File");
    }

    #[test]
    fn column_index_uses_alias_order() {
        let table = Table {
            headers: vec![" Company ".into(), "Vendor".into()],
            rows: vec![],
        };
        assert_eq!(table.column_index(&["supplier", "vendor", "company"]), Some(1));
        assert_eq!(table.column_index(&["email"]), None);
    }
}
