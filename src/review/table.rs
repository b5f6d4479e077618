//! The tracking table embedded in every review request of a train.
//!
//! The table lives between two fixed markers so it can be found and replaced
//! on later runs without touching anything the author wrote around it:
//!
//! ```text
//! <pr-train-toc>
//!
//! | | PR | Status | Title |
//! | --- | --- | --- | --- |
//! | 👉 | #12 | open | Split the parser |
//! |  | #13 | open | Use the new parser |
//!
//! </pr-train-toc>
//! ```

use crate::types::{BranchNode, PrNumber, ReviewRequest, Train};

/// The marker that begins the tracking table.
pub const TABLE_START: &str = "<pr-train-toc>";

/// The marker that ends the tracking table.
pub const TABLE_END: &str = "</pr-train-toc>";

/// Marks the row of the request the table is embedded in.
pub const POINTER: &str = "👉";

/// Requests whose title carries this tag are left out of the table.
const IGNORE_TAG: &str = "(ignore)";

/// Leading title marker stripped for display.
const MERGED_PREFIX: &str = "[merged]";

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub number: PrNumber,
    pub merged: bool,
    pub title: String,
}

fn is_ignored(request: &ReviewRequest) -> bool {
    request.title.contains(IGNORE_TAG)
}

/// The title as shown in the table.
pub fn display_title(title: &str) -> &str {
    let trimmed = title.trim();
    let stripped = match trimmed.get(..MERGED_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(MERGED_PREFIX) => &trimmed[MERGED_PREFIX.len()..],
        _ => trimmed,
    };
    stripped.trim_start()
}

fn branch_rows(node: &BranchNode) -> impl Iterator<Item = TableRow> + '_ {
    let mut requests: Vec<&ReviewRequest> =
        node.review_requests.iter().filter(|r| !is_ignored(r)).collect();
    // Open before closed, then oldest first.
    requests.sort_by_key(|r| (!r.is_open(), r.number));

    requests.into_iter().map(|r| TableRow {
        number: r.number,
        merged: node.is_merged() || !r.is_open(),
        title: display_title(&r.title).to_string(),
    })
}

/// Every row of the train's table, in train order.
pub fn table_rows(train: &Train) -> Vec<TableRow> {
    train
        .nodes()
        .iter()
        .filter(|n| !n.is_upstream)
        .flat_map(branch_rows)
        .collect()
}

/// Keeps a title on one row and stops it from closing the table early.
fn escape_cell(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('|', "\\|")
        .replace(['\r', '\n'], " ")
}

/// Renders the table for the body of `owner`, or with no pointer if `None`.
///
/// The output starts with [`TABLE_START`] and ends with [`TABLE_END`].
pub fn render_table(train: &Train, owner: Option<PrNumber>) -> String {
    let mut out = String::new();
    out.push_str(TABLE_START);
    out.push_str("\n\n| | PR | Status | Title |\n| --- | --- | --- | --- |\n");
    for row in table_rows(train) {
        let pointer = if Some(row.number) == owner { POINTER } else { "" };
        let status = if row.merged { "merged" } else { "open" };
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            pointer,
            row.number,
            status,
            escape_cell(&row.title)
        ));
    }
    out.push('\n');
    out.push_str(TABLE_END);
    out
}

/// Locates an existing table as a byte range covering both markers.
fn find_table(body: &str) -> Option<(usize, usize)> {
    let start = body.find(TABLE_START)?;
    let end = start + body[start..].find(TABLE_END)? + TABLE_END.len();
    Some((start, end))
}

/// Puts `table` into `body`: in place of an existing table, or at the top.
///
/// Text outside the markers is never changed. Applying the same table twice
/// gives the same body as applying it once.
pub fn substitute_table(body: &str, table: &str) -> String {
    match find_table(body) {
        Some((start, end)) => format!("{}{}{}", &body[..start], table, &body[end..]),
        None if body.trim().is_empty() => table.to_string(),
        None => format!("{}\n\n{}", table, body),
    }
}
