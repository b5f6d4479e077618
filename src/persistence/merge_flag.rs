//! Line-oriented edits of a branch's `merged` flag.
//!
//! The definition file is human-edited, so it is never re-serialised. An edit
//! finds the train's header line, then the branch's list entry within that
//! train, and touches only the entry line and the line directly beneath it:
//!
//! ```text
//!     - part-2            ->      - part-2:
//!                                     merged: true
//! ```
//!
//! Unmarking removes the inserted line and drops the colon again when the
//! entry has no other children, so marking then unmarking restores the
//! original bytes. Line terminators (`\n` or `\r\n`) and trailing comments on
//! the entry line are preserved.
//!
//! Entries written flow-style (`- part-2: {}`) keep that style; only the
//! braces are rewritten, to `{merged: true}` or `{merged: false}`.

use super::PersistError;

/// Extra indentation of the `merged:` line relative to the entry's `-`.
const CHILD_INDENT: usize = 4;

/// Location of a branch's list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    /// Line index.
    line: usize,
    /// Column of the `-`.
    indent: usize,
    /// Byte offset just past the branch name.
    name_end: usize,
    /// Whether a `:` directly follows the name.
    has_colon: bool,
    /// Byte range of a `{...}` options mapping on the entry line.
    flow: Option<(usize, usize)>,
}

/// Applies a merged-flag change to definition file content.
///
/// Returns `Ok(None)` when the file already records `merged`.
pub fn set_merged_flag(
    content: &str,
    train: &str,
    branch: &str,
    merged: bool,
) -> Result<Option<String>, PersistError> {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let anchor = find_anchor(&lines, train, branch)?;

    if let Some((start, end)) = anchor.flow {
        let line = &mut lines[anchor.line];
        if flow_merged(&line[start..end]) == merged {
            return Ok(None);
        }
        line.replace_range(start..end, &format!("{{merged: {}}}", merged));
        return Ok(Some(lines.join("\n")));
    }

    let child = anchor.line + 1;
    let flag_line = lines
        .get(child)
        .and_then(|line| parse_merged_line(line, anchor.indent));

    if merged {
        match flag_line {
            Some(true) => return Ok(None),
            Some(false) => {
                lines[child] = replace_merged_value(&lines[child]);
            }
            None => {
                let cr = if lines[anchor.line].ends_with('\r') { "\r" } else { "" };
                let inserted = format!(
                    "{}merged: true{}",
                    " ".repeat(anchor.indent + CHILD_INDENT),
                    cr
                );
                if !anchor.has_colon {
                    lines[anchor.line].insert(anchor.name_end, ':');
                }
                lines.insert(child, inserted);
            }
        }
    } else {
        if flag_line != Some(true) {
            return Ok(None);
        }
        lines.remove(child);
        let has_other_children = lines
            .get(child)
            .is_some_and(|line| is_child_line(line, anchor.indent));
        if anchor.has_colon && !has_other_children {
            lines[anchor.line].remove(anchor.name_end);
        }
    }

    Ok(Some(lines.join("\n")))
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = strip_cr(line).trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Whether `line` is nested under a list entry whose `-` is at `indent`.
fn is_child_line(line: &str, indent: usize) -> bool {
    !is_blank_or_comment(line) && indentation(line) > indent + 1
}

/// Reads `merged: <bool>` if `line` is the entry's merged child.
fn parse_merged_line(line: &str, indent: usize) -> Option<bool> {
    if !is_child_line(line, indent) {
        return None;
    }
    let value = strip_cr(line).trim().strip_prefix("merged:")?;
    let value = value.split(" #").next().unwrap_or_default().trim();
    match value {
        "true" => Some(true),
        "false" | "" => Some(false),
        _ => None,
    }
}

/// Reads `merged` out of a flow mapping such as `{merged: true}`.
fn flow_merged(mapping: &str) -> bool {
    mapping
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .filter_map(|pair| pair.split_once(':'))
        .any(|(key, value)| key.trim() == "merged" && value.trim() == "true")
}

fn replace_merged_value(line: &str) -> String {
    let cr = if line.ends_with('\r') { "\r" } else { "" };
    format!("{}merged: true{}", " ".repeat(indentation(line)), cr)
}

fn is_train_header(line: &str, train: &str) -> bool {
    let trimmed = strip_cr(line).trim();
    let key = trimmed.split(" #").next().unwrap_or_default().trim_end();
    let Some(key) = key.strip_suffix(':') else {
        return false;
    };
    let key = key.trim_end();
    key == train || key == format!("\"{}\"", train) || key == format!("'{}'", train)
}

fn find_anchor(lines: &[String], train: &str, branch: &str) -> Result<Anchor, PersistError> {
    let header = lines
        .iter()
        .position(|line| !is_blank_or_comment(line) && is_train_header(line, train))
        .ok_or_else(|| PersistError::TrainNotFound(train.to_string()))?;
    let header_indent = indentation(&lines[header]);

    for (offset, line) in lines[header + 1..].iter().enumerate() {
        if is_blank_or_comment(line) {
            continue;
        }
        // The train's block ends at the next line indented no deeper than its
        // header, unless that line is a list entry (compact sequences).
        let indent = indentation(line);
        let body = &strip_cr(line)[indent..];
        if indent <= header_indent && !body.starts_with("- ") {
            break;
        }
        if let Some(anchor) = match_entry(line, header + 1 + offset, branch) {
            return Ok(anchor);
        }
    }

    Err(PersistError::BranchNotFound {
        train: train.to_string(),
        branch: branch.to_string(),
    })
}

/// Matches `- <branch>`, `- <branch>:` or `- <branch>: {...}`, with an
/// optional trailing comment.
fn match_entry(line: &str, index: usize, branch: &str) -> Option<Anchor> {
    let content = strip_cr(line);
    let indent = indentation(content);
    let after_dash = content[indent..].strip_prefix("- ")?;
    let value_start = content.len() - after_dash.trim_start().len();
    let rest = &content[value_start..];
    let value = rest.split(" #").next().unwrap_or_default().trim_end();
    let name_end = value_start + branch.len();

    let mut flow = None;
    let has_colon = if value == branch {
        false
    } else {
        let options = value.strip_prefix(branch)?.strip_prefix(':')?;
        let mapping = options.trim_start();
        if !mapping.is_empty() {
            if !(mapping.starts_with('{') && mapping.ends_with('}')) {
                return None;
            }
            let start = name_end + 1 + (options.len() - mapping.len());
            flow = Some((start, start + mapping.len()));
        }
        true
    };

    Some(Anchor {
        line: index,
        indent,
        name_end,
        has_colon,
        flow,
    })
}
