//! Contact rendering for Telegram Markdown replies.

use crate::domain::{ApartmentRecord, Resident};

/// Label used for mention links when a resident has no username.
const MENTION_PLACEHOLDER: &str = "resident";

/// Escape the characters the legacy Markdown parse mode treats as formatting
/// control. Underscores are the common case (usernames like `jane_doe`).
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render one resident as `@username`, or as a clickable id-based mention
/// when no username is set.
pub fn render_contact(resident: &Resident) -> String {
    match &resident.username {
        Some(name) => format!("@{}", escape_markdown(name)),
        None => format!(
            "[{}](tg://user?id={})",
            MENTION_PLACEHOLDER, resident.user_id.0
        ),
    }
}

/// Render many residents the way `aptcontacts` replies expect.
pub fn render_contacts(residents: &[Resident]) -> String {
    residents
        .iter()
        .map(render_contact)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per apartment: consecutive records sharing a number collapse into
/// `apt <n>: <contacts>`. Records must already be sorted by apartment number,
/// which is what the store's `list_all` returns.
pub fn render_apartment_lines(records: &[ApartmentRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut idx = 0;
    while idx < records.len() {
        let number = records[idx].apartment_number;
        let mut contacts = Vec::new();
        while idx < records.len() && records[idx].apartment_number == number {
            contacts.push(render_contact(&records[idx].resident()));
            idx += 1;
        }
        lines.push(format!("apt {number}: {}", contacts.join(", ")));
    }
    lines
}
