use chrono::NaiveDateTime;
use serde::Deserialize;

/// One roster row as served by `/api/v1/users`. The backend emits naive
/// `isoformat()` timestamps, hence `NaiveDateTime`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub unique_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_active")]
    pub account_active: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The selection set. Ids are kept in insertion order because the export
/// URL exposes that order to the backend.
///
/// This is the single source of truth: row checkboxes and the select-all
/// marker are derived from membership at render time, never stored.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: Vec<u64>,
}

impl Selection {
    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Checks or unchecks one row. Idempotent.
    pub fn set_checked(&mut self, id: u64, checked: bool) {
        if checked {
            if !self.contains(id) {
                self.ids.push(id);
            }
        } else {
            self.ids.retain(|&other| other != id);
        }
    }

    /// Flips membership of one row, returning the new checked state.
    pub fn toggle(&mut self, id: u64) -> bool {
        let checked = !self.contains(id);
        self.set_checked(id, checked);
        checked
    }

    /// Checks or unchecks every visible row at once.
    pub fn set_all(&mut self, visible_ids: &[u64], checked: bool) {
        for &id in visible_ids {
            self.set_checked(id, checked);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }
}

/// State of the select-all control, always derived from counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Checked when every visible row is selected (and there is at least one),
/// indeterminate when some but not all are.
pub fn select_all_state(selection: &Selection, visible_ids: &[u64]) -> SelectAllState {
    let total = visible_ids.len();
    let checked = visible_ids.iter().filter(|&&id| selection.contains(id)).count();
    if total > 0 && checked == total {
        SelectAllState::Checked
    } else if checked > 0 {
        SelectAllState::Indeterminate
    } else {
        SelectAllState::Unchecked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Csv,
    Excel,
}

impl ExportFormat {
    /// Value of the `format` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Csv => "CSV",
            ExportFormat::Excel => "Excel",
        }
    }

    /// Extension for the fallback filename when the server sends no
    /// Content-Disposition.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }
}

/// Client-side substring filter over the roster. Rows that match are the
/// "visible" rows: the cursor, select-all and the tri-state marker all
/// operate on these. Hidden rows keep their selection membership.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub active: bool,
    pub query: String,
}

impl Filter {
    pub fn matches(&self, user: &User) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        user.first_name.to_lowercase().contains(&needle)
            || user.last_name.to_lowercase().contains(&needle)
            || user.email.to_lowercase().contains(&needle)
            || user.unique_code.to_lowercase().contains(&needle)
    }

    pub fn visible_users<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        users.iter().filter(|u| self.matches(u)).collect()
    }
}

/// Modal status popup, shared with background tasks. `loading` keeps the
/// dialog undismissable while a request is in flight, which also blocks a
/// second bulk operation from starting.
#[derive(Debug, Default)]
pub struct StatusDialog {
    pub visible: bool,
    pub loading: bool,
    pub text: String,
    /// Set by a successful delete; the event loop refetches the roster and
    /// clears the selection when it sees this.
    pub roster_stale: bool,
}

impl StatusDialog {
    pub fn open(&mut self, text: impl Into<String>) {
        self.visible = true;
        self.loading = false;
        self.text = text.into();
    }

    pub fn open_loading(&mut self, text: impl Into<String>) {
        self.visible = true;
        self.loading = true;
        self.text = text.into();
    }

    pub fn finish(&mut self, text: impl Into<String>) {
        self.loading = false;
        self.text = text.into();
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
        self.text.clear();
    }
}

/// The irreversibility prompt shown before a bulk delete.
#[derive(Debug, Default)]
pub struct ConfirmDelete {
    pub visible: bool,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, first: &str, last: &str, email: &str) -> User {
        User {
            id,
            unique_code: format!("U{id:04}"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            availability: None,
            country: None,
            city: None,
            account_active: true,
            created_at: None,
        }
    }

    #[test]
    fn toggle_sequences_track_membership() {
        let mut sel = Selection::default();
        sel.toggle(3);
        sel.toggle(7);
        sel.toggle(3);
        assert!(!sel.contains(3));
        assert!(sel.contains(7));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn set_checked_is_idempotent() {
        let mut sel = Selection::default();
        sel.set_checked(5, true);
        sel.set_checked(5, true);
        assert_eq!(sel.len(), 1);
        sel.set_checked(5, false);
        sel.set_checked(5, false);
        assert!(sel.is_empty());
    }

    #[test]
    fn ids_preserve_insertion_order() {
        let mut sel = Selection::default();
        sel.set_checked(7, true);
        sel.set_checked(3, true);
        assert_eq!(sel.ids(), &[7, 3]);
    }

    #[test]
    fn select_all_then_none_returns_to_empty() {
        let mut sel = Selection::default();
        let visible = vec![1, 2, 3];
        sel.set_all(&visible, true);
        assert_eq!(sel.len(), 3);
        assert_eq!(select_all_state(&sel, &visible), SelectAllState::Checked);
        sel.set_all(&visible, false);
        assert!(sel.is_empty());
        assert_eq!(select_all_state(&sel, &visible), SelectAllState::Unchecked);
    }

    #[test]
    fn select_all_over_filter_keeps_hidden_rows() {
        let mut sel = Selection::default();
        sel.set_checked(9, true);
        sel.set_all(&[1, 2], true);
        sel.set_all(&[1, 2], false);
        assert!(sel.contains(9));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn tri_state_is_indeterminate_iff_partially_checked() {
        let mut sel = Selection::default();
        let visible = vec![1, 2, 3];
        assert_eq!(select_all_state(&sel, &visible), SelectAllState::Unchecked);
        sel.set_checked(2, true);
        assert_eq!(select_all_state(&sel, &visible), SelectAllState::Indeterminate);
        sel.set_checked(1, true);
        sel.set_checked(3, true);
        assert_eq!(select_all_state(&sel, &visible), SelectAllState::Checked);
    }

    #[test]
    fn tri_state_with_no_visible_rows_is_unchecked() {
        let sel = Selection::default();
        assert_eq!(select_all_state(&sel, &[]), SelectAllState::Unchecked);
    }

    #[test]
    fn filter_matches_name_email_and_code() {
        let users = vec![
            user(1, "Awa", "Diallo", "awa@example.com"),
            user(2, "Bintou", "Keita", "bintou@example.com"),
        ];
        let mut filter = Filter::default();
        assert_eq!(filter.visible_users(&users).len(), 2);

        filter.query = "awa".to_string();
        let visible = filter.visible_users(&users);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, 1);

        filter.query = "U0002".to_string();
        assert_eq!(filter.visible_users(&users)[0].id, 2);
    }

    #[test]
    fn status_dialog_loading_then_finish() {
        let mut dialog = StatusDialog::default();
        dialog.open_loading("Deleting 3 user(s)…");
        assert!(dialog.visible && dialog.loading);
        dialog.finish("3 user(s) deleted");
        assert!(dialog.visible);
        assert!(!dialog.loading);
        assert_eq!(dialog.text, "3 user(s) deleted");
    }

    #[test]
    fn user_deserializes_from_backend_shape() {
        let raw = r#"{
            "id": 42,
            "unique_code": "U0042",
            "first_name": "Awa",
            "last_name": "Diallo",
            "email": "awa@example.com",
            "gender": "F",
            "availability": "freelance",
            "country": "Senegal",
            "city": "Dakar",
            "account_active": true,
            "created_at": "2024-03-01T09:30:00",
            "talents": []
        }"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.full_name(), "Awa Diallo");
        assert!(user.created_at.is_some());
    }
}
