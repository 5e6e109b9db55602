use rayon::prelude::*;
use tracing::{debug, trace};

use crate::table::Table;

const SUPPLIER: [&str; 3] = ["supplier", "vendor", "company"];
const CONTACT: [&str; 4] = ["contact", "name", "contact name", "full name"];
const EMAIL: [&str; 2] = ["email", "email address"];
const PHONE: [&str; 4] = ["phone", "phone number", "contact number", "mobile"];
const NOTES: [&str; 4] = ["notes", "remarks", "comment", "comments"];

pub const CONTACT_HEADERS: [&str; 5] = ["Supplier", "Contact", "Email", "Phone", "Notes"];

/// Where each contact field lives in the source table, if anywhere.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ContactColumns {
    pub supplier: Option<usize>,
    pub contact: Option<usize>,
    pub email: Option<usize>,
    pub phone: Option<usize>,
    pub notes: Option<usize>,
}

impl ContactColumns {
    pub fn resolve(table: &Table) -> Self {
        let columns = Self {
            supplier: table.column_index(&SUPPLIER),
            contact: table.column_index(&CONTACT),
            email: table.column_index(&EMAIL),
            phone: table.column_index(&PHONE),
            notes: table.column_index(&NOTES),
        };
        debug!("Contact columns for {:?}: {:?}", table.headers, columns);
        columns
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Mail(String),
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Text(s) | Cell::Mail(s) => s,
        }
    }

    pub fn href(&self) -> Option<String> {
        match self {
            Cell::Mail(s) => Some(format!("mailto:{s}")),
            Cell::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactRow {
    pub supplier: Cell,
    pub contact: Cell,
    pub email: Cell,
    pub phone: Cell,
    pub notes: Cell,
}

impl ContactRow {
    pub fn cells(&self) -> [&Cell; 5] {
        [
            &self.supplier,
            &self.contact,
            &self.email,
            &self.phone,
            &self.notes,
        ]
    }
}

/// Single `@`, something on both sides and no whitespace.
pub fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Contacts table with its supplier drop-down and live filters.
#[derive(Debug, Default)]
pub struct ContactsView {
    table: Table,
    columns: ContactColumns,
    suppliers: Vec<String>,
    supplier_idx: usize, // 0 means "All", otherwise suppliers[supplier_idx - 1]
    text_filter: String,
    visible: Vec<ContactRow>,
    pub selected: usize,
}

impl ContactsView {
    pub fn new(table: Table) -> Self {
        let columns = ContactColumns::resolve(&table);
        let mut suppliers: Vec<String> = match columns.supplier {
            Some(idx) => table
                .rows
                .iter()
                .filter_map(|r| r.get(idx))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => Vec::new(),
        };
        suppliers.sort();
        suppliers.dedup();

        let mut view = Self {
            table,
            columns,
            suppliers,
            ..Default::default()
        };
        view.apply_filters();
        view
    }

    /// Total rows received from the sheet, including blank ones.
    pub fn total_rows(&self) -> usize {
        self.table.rows.len()
    }

    pub fn status_line(&self) -> String {
        format!("{} contacts loaded", self.total_rows())
    }

    /// Drop-down entries, "All" first.
    pub fn supplier_options(&self) -> Vec<&str> {
        std::iter::once("All")
            .chain(self.suppliers.iter().map(String::as_str))
            .collect()
    }

    pub fn supplier_filter(&self) -> Option<&str> {
        match self.supplier_idx {
            0 => None,
            i => self.suppliers.get(i - 1).map(String::as_str),
        }
    }

    pub fn text_filter(&self) -> &str {
        &self.text_filter
    }

    pub fn rows(&self) -> &[ContactRow] {
        &self.visible
    }

    pub fn selected_row(&self) -> Option<&ContactRow> {
        self.visible.get(self.selected)
    }

    /// Select a supplier by name, `""` selects all.
    pub fn set_supplier(&mut self, supplier: &str) {
        let wanted = supplier.trim().to_lowercase();
        self.supplier_idx = if wanted.is_empty() {
            0
        } else {
            self.suppliers
                .iter()
                .position(|s| s.to_lowercase() == wanted)
                .map(|i| i + 1)
                .unwrap_or(0)
        };
        self.apply_filters();
    }

    pub fn cycle_supplier(&mut self, forward: bool) {
        let n = self.suppliers.len() + 1;
        self.supplier_idx = if forward {
            (self.supplier_idx + 1) % n
        } else {
            (self.supplier_idx + n - 1) % n
        };
        self.apply_filters();
    }

    pub fn set_text_filter(&mut self, text: &str) {
        self.text_filter = text.to_string();
        self.apply_filters();
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn apply_filters(&mut self) {
        let supplier = self
            .supplier_filter()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let query = self.text_filter.trim().to_lowercase();
        let supplier_col = self.columns.supplier;

        let columns = self.columns;
        self.visible = self
            .table
            .rows
            .par_iter()
            .filter(|row| {
                let matches_supplier = supplier.is_empty()
                    || supplier_col
                        .and_then(|i| row.get(i))
                        .map(|s| s.trim().to_lowercase() == supplier)
                        .unwrap_or(false);
                let matches_text =
                    query.is_empty() || row.iter().any(|c| c.to_lowercase().contains(&query));
                matches_supplier && matches_text
            })
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .map(|row| Self::contact_row(&columns, row))
            .collect();

        self.selected = self.selected.min(self.visible.len().saturating_sub(1));
        trace!(
            "Contacts filter supplier={:?} text={:?} -> {} rows",
            supplier,
            query,
            self.visible.len()
        );
    }

    fn contact_row(columns: &ContactColumns, row: &[String]) -> ContactRow {
        let get = |col: Option<usize>| {
            col.and_then(|i| row.get(i))
                .cloned()
                .unwrap_or_default()
        };
        let email = get(columns.email);
        let email = if is_email(&email) {
            Cell::Mail(email)
        } else {
            Cell::Text(email)
        };
        ContactRow {
            supplier: Cell::Text(get(columns.supplier)),
            contact: Cell::Text(get(columns.contact)),
            email,
            phone: Cell::Text(get(columns.phone)),
            notes: Cell::Text(get(columns.notes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn fixture() -> ContactsView {
        let payload: Value =
            serde_json::from_str(include_str!("../tests/fixtures/contacts_objects.json")).unwrap();
        ContactsView::new(Table::normalize(&payload).unwrap())
    }

    #[test]
    fn blank_rows_are_skipped_but_counted() {
        let view = fixture();
        assert_eq!(view.total_rows(), 4);
        assert_eq!(view.rows().len(), 3);
        assert_eq!(view.status_line(), "4 contacts loaded");
    }

    #[test]
    fn supplier_options_are_distinct_and_sorted() {
        let view = fixture();
        assert_eq!(view.supplier_options(), vec!["All", "Acme", "Globex", "acme"]);
    }

    #[test]
    fn supplier_filter_is_case_insensitive() {
        let mut view = fixture();
        view.set_supplier("Acme");
        view.set_text_filter("");
        let suppliers: Vec<&str> = view.rows().iter().map(|r| r.supplier.text()).collect();
        assert_eq!(suppliers, vec!["Acme", "acme "]);
    }

    #[test]
    fn filters_combine_with_and() {
        let mut view = fixture();
        view.set_supplier("acme");
        view.set_text_filter("  NIGHT ");
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.rows()[0].contact.text(), "Wile E.");

        view.set_supplier("");
        view.set_text_filter("555-01");
        assert_eq!(view.rows().len(), 2);
    }

    #[test]
    fn cycling_suppliers_wraps_to_all() {
        let mut view = fixture();
        view.cycle_supplier(false);
        assert_eq!(view.supplier_filter(), Some("acme"));
        view.cycle_supplier(true);
        assert_eq!(view.supplier_filter(), None);
        assert_eq!(view.rows().len(), 3);
    }

    #[test]
    fn email_cells_become_mail_links() {
        let table = Table::normalize(&json!([{"Supplier": "Acme", "Email": "a@x.com"}])).unwrap();
        let view = ContactsView::new(table);
        let row = &view.rows()[0];
        assert_eq!(row.email, Cell::Mail("a@x.com".into()));
        assert_eq!(row.email.href().as_deref(), Some("mailto:a@x.com"));
        assert_eq!(row.contact, Cell::Text(String::new()));

        let view = fixture();
        assert_eq!(view.rows()[2].email, Cell::Text("not an email".into()));
    }

    #[test]
    fn aliases_resolve_columns() {
        let table = Table {
            headers: vec!["Vendor".into(), "Full Name".into(), "Mobile".into(), "Remarks".into()],
            rows: vec![vec!["Initech".into(), "Bill".into(), "1".into(), "tps".into()]],
        };
        let columns = ContactColumns::resolve(&table);
        assert_eq!(columns.supplier, Some(0));
        assert_eq!(columns.contact, Some(1));
        assert_eq!(columns.email, None);
        assert_eq!(columns.phone, Some(2));
        assert_eq!(columns.notes, Some(3));
    }

    #[test]
    fn email_check() {
        assert!(is_email("a@x.com"));
        assert!(!is_email("@x.com"));
        assert!(!is_email("a@"));
        assert!(!is_email("a b@x.com"));
        assert!(!is_email("a@b@c"));
    }
}
