//! Train status report formatting.
//!
//! One line per node, upstream first, then the train in order:
//!
//! ```text
//!   main (up to date)
//! * part-1 (2 commits need grafting) (origin: up to date)
//!   part-2 (merged)
//!   part-3 (end of train) (origin: 1 unpushed commit)
//! ```

use serde::Serialize;

use crate::types::{BranchNode, Divergence, SyncState, Train};

/// `"1 unpulled commit"`, `"3 unpulled commits"`.
fn commits(n: u32, kind: &str) -> String {
    let noun = if n == 1 { "commit" } else { "commits" };
    if kind.is_empty() {
        format!("{} {}", n, noun)
    } else {
        format!("{} {} {}", n, kind, noun)
    }
}

fn marker(node: &BranchNode, current: Option<&str>) -> &'static str {
    if current == Some(node.name.as_str()) {
        "* "
    } else {
        "  "
    }
}

fn upstream_line(node: &BranchNode, current: Option<&str>) -> String {
    let state = match node.origin {
        Some(Divergence::Diverged) => "(diverged from origin)".to_string(),
        Some(Divergence::NoRemote) => "(no remote)".to_string(),
        _ if node.behind_origin() > 0 => format!("({} behind origin)", commits(node.behind_origin(), "")),
        _ if node.ahead_of_origin() > 0 => format!("({} ahead of origin)", commits(node.ahead_of_origin(), "")),
        _ => "(up to date)".to_string(),
    };
    format!("{}{} {}", marker(node, current), node.name, state)
}

fn origin_part(node: &BranchNode) -> String {
    match node.origin {
        None => String::new(),
        Some(Divergence::NoRemote) => " (origin: no remote)".to_string(),
        Some(Divergence::Diverged) => " (origin: diverged)".to_string(),
        Some(Divergence::Counts(counts)) => {
            let mut parts = Vec::new();
            if counts.behind > 0 {
                parts.push(commits(counts.behind, "unpulled"));
            }
            if counts.ahead > 0 {
                parts.push(commits(counts.ahead, "unpushed"));
            }
            if parts.is_empty() {
                " (origin: up to date)".to_string()
            } else {
                format!(" (origin: {})", parts.join(", "))
            }
        }
    }
}

fn branch_line(node: &BranchNode, current: Option<&str>) -> String {
    let mut line = format!("{}{}", marker(node, current), node.name);
    if node.is_merged() {
        line.push_str(" (merged)");
        return line;
    }
    match node.ahead_of_next() {
        None => line.push_str(" (end of train)"),
        Some(0) => line.push_str(" (grafted)"),
        Some(1) => line.push_str(" (1 commit needs grafting)"),
        Some(n) => line.push_str(&format!(" ({} need grafting)", commits(n, ""))),
    }
    line.push_str(&origin_part(node));
    line
}

/// Renders the human-readable report, marking `current` with `*`.
pub fn render_train_status(train: &Train, current: Option<&str>) -> String {
    let mut lines = vec![upstream_line(train.upstream(), current)];
    lines.extend(
        train
            .nodes()
            .iter()
            .filter(|n| !n.is_upstream)
            .map(|n| branch_line(n, current)),
    );
    lines.join("\n")
}

/// One node of the machine-readable report.
#[derive(Debug, Serialize)]
pub struct NodeStatus<'a> {
    pub name: &'a str,
    pub upstream: bool,
    pub merged: bool,
    pub state: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahead_of_next: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Divergence>,
    pub pull_requests: Vec<u64>,
}

/// The machine-readable report.
#[derive(Debug, Serialize)]
pub struct TrainStatus<'a> {
    pub train: &'a str,
    pub nodes: Vec<NodeStatus<'a>>,
}

impl<'a> TrainStatus<'a> {
    pub fn new(train: &'a Train) -> Self {
        let nodes = train
            .nodes()
            .iter()
            .map(|n| NodeStatus {
                name: &n.name,
                upstream: n.is_upstream,
                merged: n.is_merged(),
                state: n.sync_state(),
                ahead_of_next: if n.is_merged() { None } else { n.ahead_of_next() },
                origin: if n.is_merged() { None } else { n.origin },
                pull_requests: n.review_requests.iter().map(|r| r.number.0).collect(),
            })
            .collect();
        Self {
            train: train.name(),
            nodes,
        }
    }
}

/// Renders the report as pretty-printed JSON.
pub fn render_train_json(train: &Train) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&TrainStatus::new(train))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainDefinition;
    use crate::types::AheadBehind;

    fn train() -> Train {
        let yaml = "prs:\n  main-branch-name: main\ntrains:\n  t:\n    - b1\n    - b2:\n        merged: true\n    - b3\n";
        let mut train = Train::build(&TrainDefinition::parse(yaml).unwrap(), "t").unwrap();
        train.node_mut(0).to_next = Some(AheadBehind::new(2, 0));
        train.node_mut(0).origin = Some(Divergence::Counts(AheadBehind::LEVEL));
        train.node_mut(1).origin = Some(Divergence::Counts(AheadBehind::new(0, 5)));
        train.node_mut(2).origin = Some(Divergence::Counts(AheadBehind::new(1, 3)));
        train.node_mut(3).origin = Some(Divergence::Counts(AheadBehind::LEVEL));
        train
    }

    #[test]
    fn report_lists_upstream_then_train_order() {
        let report = render_train_status(&train(), Some("b1"));
        assert_eq!(
            report,
            "  main (up to date)\n\
             * b1 (2 commits need grafting) (origin: up to date)\n\
             \x20 b2 (merged)\n\
             \x20 b3 (end of train) (origin: 3 unpulled commits, 1 unpushed commit)"
        );
    }

    #[test]
    fn upstream_behind_and_missing_remotes() {
        let mut train = train();
        let upstream = train.upstream_index();
        train.node_mut(upstream).origin = Some(Divergence::Counts(AheadBehind::new(0, 4)));
        train.node_mut(0).to_next = Some(AheadBehind::LEVEL);
        train.node_mut(0).origin = Some(Divergence::NoRemote);
        train.node_mut(2).origin = Some(Divergence::Diverged);

        let report = render_train_status(&train, None);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "  main (4 commits behind origin)");
        assert_eq!(lines[1], "  b1 (grafted) (origin: no remote)");
        assert_eq!(lines[3], "  b3 (end of train) (origin: diverged)");
    }

    #[test]
    fn json_omits_figures_for_merged_branches() {
        let json: serde_json::Value =
            serde_json::from_str(&render_train_json(&train()).unwrap()).unwrap();
        assert_eq!(json["train"], "t");
        let b2 = &json["nodes"][1];
        assert_eq!(b2["name"], "b2");
        assert_eq!(b2["merged"], true);
        assert_eq!(b2["state"], "merged");
        assert!(b2.get("origin").is_none());
        assert_eq!(json["nodes"][0]["ahead_of_next"], 2);
        assert_eq!(json["nodes"][3]["upstream"], true);
    }
}
