//! Review request synchronisation.
//!
//! Runs after the cascade, against the review host:
//!
//! 1. List every request (any state) whose head is a train branch.
//! 2. Settle branches with no open request: a request merged on the host
//!    marks the branch merged; requests all closed unmerged, or none at all
//!    on a branch already grafted into its successor, go to the operator.
//! 3. Walking from the tail, open a request for every branch still lacking
//!    one. Failures are reported per branch and the walk continues.
//! 4. Regenerate the tracking table in every open request's body.

use std::io;

use thiserror::Error;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::GitHubApiError;
use crate::operator::{InactiveBranchChoice, Operator};
use crate::persistence::{DefinitionFile, PersistError};
use crate::types::{PrNumber, ReviewRequest, Train};

use super::table::{render_table, substitute_table};

/// Errors that stop review synchronisation.
#[derive(Debug, Error)]
pub enum ReviewSyncError {
    #[error("failed to list pull requests for {branch}: {source}")]
    List {
        branch: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("review host returned {response} for {effect}")]
    UnexpectedResponse {
        effect: &'static str,
        response: &'static str,
    },

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("failed to prompt the operator: {0}")]
    Prompt(#[from] io::Error),
}

/// A per-branch host failure that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub branch: String,
    pub error: String,
}

/// What synchronisation changed on the host and in the definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewReport {
    pub created: Vec<(String, PrNumber)>,
    pub updated: Vec<PrNumber>,
    pub marked_merged: Vec<String>,
    pub failures: Vec<BranchFailure>,
}

/// Synchronises a train's review requests with the host.
pub struct ReviewSync<'a, H, O> {
    host: &'a H,
    operator: &'a mut O,
    file: &'a DefinitionFile,
    /// Base for the first branch's request.
    merge_branch: String,
}

impl<'a, H, O> ReviewSync<'a, H, O>
where
    H: GitHubInterpreter<Error = GitHubApiError>,
    O: Operator,
{
    pub fn new(
        host: &'a H,
        operator: &'a mut O,
        file: &'a DefinitionFile,
        merge_branch: impl Into<String>,
    ) -> Self {
        Self {
            host,
            operator,
            file,
            merge_branch: merge_branch.into(),
        }
    }

    pub async fn run(&mut self, train: &mut Train) -> Result<ReviewReport, ReviewSyncError> {
        let mut report = ReviewReport::default();
        self.load_requests(train).await?;
        self.settle_inactive(train, &mut report)?;
        self.create_missing(train, &mut report).await;
        self.update_tables(train, &mut report).await;

        tracing::info!(
            train = train.name(),
            created = report.created.len(),
            updated = report.updated.len(),
            failures = report.failures.len(),
            "review requests synchronised"
        );
        Ok(report)
    }

    /// Fills every train branch's `review_requests`, merged branches included.
    pub async fn load_requests(&self, train: &mut Train) -> Result<(), ReviewSyncError> {
        for index in 0..train.upstream_index() {
            let branch = train.node(index).name.clone();
            let response = self
                .host
                .interpret(GitHubEffect::ListPrs {
                    head: branch.clone(),
                })
                .await
                .map_err(|source| ReviewSyncError::List {
                    branch: branch.clone(),
                    source,
                })?;
            let requests = match response {
                GitHubResponse::Prs(requests) => requests,
                other => {
                    return Err(ReviewSyncError::UnexpectedResponse {
                        effect: "list_prs",
                        response: other.kind(),
                    });
                }
            };
            tracing::debug!(branch = %branch, count = requests.len(), "loaded pull requests");
            train.node_mut(index).review_requests = requests;
        }
        Ok(())
    }

    fn settle_inactive(
        &mut self,
        train: &mut Train,
        report: &mut ReviewReport,
    ) -> Result<(), ReviewSyncError> {
        let active: Vec<usize> = train.active_indices().collect();
        for index in active {
            let node = train.node(index);
            if node.has_open_request() {
                continue;
            }
            // A branch nothing was ever opened for is new work unless its
            // commits already sit in the next branch.
            if node.review_requests.is_empty() && node.ahead_of_next() != Some(0) {
                continue;
            }
            let branch = node.name.clone();

            let merged_on_host = node.review_requests.iter().any(|r| r.merged);
            let mark = if merged_on_host {
                tracing::info!(branch = %branch, "pull request merged on the host");
                true
            } else {
                tracing::debug!(branch = %branch, requests = node.review_requests.len(), "no open pull request");
                self.operator.resolve_inactive_branch(&branch)? == InactiveBranchChoice::MarkMerged
            };

            if mark {
                train.mark_merged(index, true, self.file)?;
                report.marked_merged.push(branch);
            }
        }
        Ok(())
    }

    /// Opens a request for every non-merged branch without an open one, tail first.
    ///
    /// Each request proposes the branch's own commits: its head is the branch
    /// and its base is the previous non-merged branch, or the merge branch for
    /// the first one. Grafting has already carried those commits forward, so
    /// a request pointing the other way would be empty.
    async fn create_missing(&self, train: &mut Train, report: &mut ReviewReport) {
        let active: Vec<usize> = train.active_indices().rev().collect();
        for index in active {
            if train.node(index).has_open_request() {
                continue;
            }
            let head = train.node(index).name.clone();
            let base = train
                .previous(index)
                .map_or_else(|| self.merge_branch.clone(), |i| train.node(i).name.clone());

            let effect = GitHubEffect::CreatePr {
                base: base.clone(),
                head: head.clone(),
                title: head.clone(),
                body: render_table(train, None),
            };
            match self.host.interpret(effect).await {
                Ok(GitHubResponse::PrCreated(request)) => {
                    tracing::info!(branch = %head, base = %base, pr = %request.number, "opened pull request");
                    report.created.push((head, request.number));
                    train.node_mut(index).review_requests.push(request);
                }
                Ok(other) => {
                    self.record_failure(report, head, format!("unexpected response {}", other.kind()))
                }
                Err(e) => self.record_failure(report, head, e.to_string()),
            }
        }
    }

    /// Rewrites the table in every open request whose body is out of date.
    async fn update_tables(&self, train: &mut Train, report: &mut ReviewReport) {
        let mut pending: Vec<(usize, usize, String)> = Vec::new();
        for (index, node) in train.nodes().iter().enumerate() {
            for (slot, request) in node.review_requests.iter().enumerate() {
                if let Some(body) = refreshed_body(train, request) {
                    pending.push((index, slot, body));
                }
            }
        }

        for (index, slot, body) in pending {
            let branch = train.node(index).name.clone();
            let number = train.node(index).review_requests[slot].number;
            let effect = GitHubEffect::UpdatePrBody {
                pr: number,
                body: body.clone(),
            };
            match self.host.interpret(effect).await {
                Ok(_) => {
                    tracing::debug!(branch = %branch, pr = %number, "updated tracking table");
                    train.node_mut(index).review_requests[slot].body = Some(body);
                    report.updated.push(number);
                }
                Err(e) => self.record_failure(report, branch, e.to_string()),
            }
        }
    }

    fn record_failure(&self, report: &mut ReviewReport, branch: String, error: String) {
        tracing::warn!(branch = %branch, error = %error, "review host request failed; continuing");
        report.failures.push(BranchFailure { branch, error });
    }
}

/// The body `request` should have, if it is open and differs from what it has.
fn refreshed_body(train: &Train, request: &ReviewRequest) -> Option<String> {
    if !request.is_open() {
        return None;
    }
    let current = request.body.as_deref().unwrap_or("");
    let body = substitute_table(current, &render_table(train, Some(request.number)));
    (body != current).then_some(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainDefinition;
    use crate::review::table::POINTER;
    use crate::types::AheadBehind;
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet, VecDeque};
    use std::sync::Mutex;

    #[derive(Default)]
    struct HostState {
        requests: BTreeMap<String, Vec<ReviewRequest>>,
        next_number: u64,
        reject_create: BTreeSet<String>,
        log: Vec<GitHubEffect>,
    }

    #[derive(Default)]
    struct MockHost {
        state: Mutex<HostState>,
    }

    impl MockHost {
        fn with(self, branch: &str, number: u64, body: &str, closed: bool, merged: bool) -> Self {
            let mut state = self.state.lock().unwrap();
            state.next_number = state.next_number.max(number);
            state
                .requests
                .entry(branch.to_string())
                .or_default()
                .push(ReviewRequest {
                    number: PrNumber(number),
                    url: format!("https://github.com/acme/widgets/pull/{}", number),
                    title: format!("{} work", branch),
                    body: Some(body.to_string()),
                    closed_at: closed.then(Utc::now),
                    merged,
                });
            drop(state);
            self
        }

        fn rejecting(self, branch: &str) -> Self {
            self.state
                .lock()
                .unwrap()
                .reject_create
                .insert(branch.to_string());
            self
        }

        fn body(&self, number: u64) -> String {
            let state = self.state.lock().unwrap();
            state
                .requests
                .values()
                .flatten()
                .find(|r| r.number == PrNumber(number))
                .and_then(|r| r.body.clone())
                .unwrap()
        }

        fn creations(&self) -> Vec<(String, String)> {
            let state = self.state.lock().unwrap();
            state
                .log
                .iter()
                .filter_map(|e| match e {
                    GitHubEffect::CreatePr { base, head, .. } => Some((head.clone(), base.clone())),
                    _ => None,
                })
                .collect()
        }

        fn updates(&self) -> usize {
            let state = self.state.lock().unwrap();
            state
                .log
                .iter()
                .filter(|e| matches!(e, GitHubEffect::UpdatePrBody { .. }))
                .count()
        }
    }

    impl GitHubInterpreter for MockHost {
        type Error = GitHubApiError;

        async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
            let mut state = self.state.lock().unwrap();
            state.log.push(effect.clone());
            match effect {
                GitHubEffect::ListPrs { head } => Ok(GitHubResponse::Prs(
                    state.requests.get(&head).cloned().unwrap_or_default(),
                )),
                GitHubEffect::CreatePr {
                    head, title, body, ..
                } => {
                    if state.reject_create.contains(&head) {
                        return Err(GitHubApiError::permanent_without_source(
                            "Validation Failed: no commits between base and head",
                        ));
                    }
                    state.next_number += 1;
                    let request = ReviewRequest {
                        number: PrNumber(state.next_number),
                        url: String::new(),
                        title,
                        body: Some(body),
                        closed_at: None,
                        merged: false,
                    };
                    state.requests.entry(head).or_default().push(request.clone());
                    Ok(GitHubResponse::PrCreated(request))
                }
                GitHubEffect::UpdatePrBody { pr, body } => {
                    if let Some(request) = state
                        .requests
                        .values_mut()
                        .flatten()
                        .find(|r| r.number == pr)
                    {
                        request.body = Some(body);
                    }
                    Ok(GitHubResponse::Ok)
                }
            }
        }
    }

    #[derive(Default)]
    struct ScriptedOperator {
        choices: VecDeque<InactiveBranchChoice>,
        asked: Vec<String>,
    }

    impl Operator for ScriptedOperator {
        fn confirm_resume(&mut self, branch: &str, _conflicts: &[String]) -> io::Result<bool> {
            panic!("review sync asked to resume a merge into {}", branch);
        }

        fn resolve_inactive_branch(&mut self, branch: &str) -> io::Result<InactiveBranchChoice> {
            self.asked.push(branch.to_string());
            self.choices
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted choice"))
        }
    }

    const DEFINITION: &str = "prs:\n  main-branch-name: main\n  merge-branch-name: develop\ntrains:\n  t:\n    - b1\n    - b2\n    - b3\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        file: DefinitionFile,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(".pr-train.yml");
            std::fs::write(&path, DEFINITION).unwrap();
            Self {
                file: DefinitionFile::new(path),
                _dir: dir,
            }
        }

        fn train(&self) -> Train {
            Train::build(&TrainDefinition::load(self.file.path()).unwrap(), "t").unwrap()
        }

        async fn sync(
            &self,
            host: &MockHost,
            operator: &mut ScriptedOperator,
        ) -> (Train, ReviewReport) {
            self.sync_after(host, operator, |_| {}).await
        }

        /// Syncs a train whose cascade figures were set by `cascaded`.
        async fn sync_after(
            &self,
            host: &MockHost,
            operator: &mut ScriptedOperator,
            cascaded: impl FnOnce(&mut Train),
        ) -> (Train, ReviewReport) {
            let mut train = self.train();
            cascaded(&mut train);
            let report = ReviewSync::new(host, operator, &self.file, "develop")
                .run(&mut train)
                .await
                .unwrap();
            (train, report)
        }
    }

    #[tokio::test]
    async fn tables_are_written_once_and_then_left_alone() {
        let fixture = Fixture::new();
        let host = MockHost::default()
            .with("b1", 1, "First", false, false)
            .with("b2", 2, "Second", false, false)
            .with("b3", 3, "", false, false);
        let mut operator = ScriptedOperator::default();

        let (_, report) = fixture.sync(&host, &mut operator).await;
        assert_eq!(report.updated, vec![PrNumber(1), PrNumber(2), PrNumber(3)]);
        assert!(report.created.is_empty());

        for number in 1..=3 {
            let body = host.body(number);
            assert_eq!(body.matches(POINTER).count(), 1);
            assert!(body.contains(&format!("| {} | #{} |", POINTER, number)));
            for other in 1..=3 {
                assert!(body.contains(&format!("#{} | open", other)));
            }
        }
        assert!(host.body(1).ends_with("\n\nFirst"));

        let (_, again) = fixture.sync(&host, &mut operator).await;
        assert!(again.updated.is_empty());
        assert_eq!(host.updates(), 3);
    }

    #[tokio::test]
    async fn missing_requests_are_opened_from_the_tail() {
        let fixture = Fixture::new();
        let host = MockHost::default().with("b1", 7, "First", false, false);
        let mut operator = ScriptedOperator::default();

        let (train, report) = fixture.sync(&host, &mut operator).await;

        assert_eq!(
            host.creations(),
            vec![("b3".to_string(), "b2".to_string()), ("b2".to_string(), "b1".to_string())]
        );
        assert_eq!(
            report.created,
            vec![("b3".to_string(), PrNumber(8)), ("b2".to_string(), PrNumber(9))]
        );
        assert!(train.node(2).has_open_request());
        // Tables written before later requests existed are brought up to date.
        assert!(host.body(8).contains("#9 | open"));
        assert!(host.body(7).contains("#8 | open"));
        // Nothing has been grafted yet, so b2 and b3 are new work.
        assert!(operator.asked.is_empty());
    }

    /// b1 and b2 fully grafted forward; b3 is the end of the train.
    fn grafted(train: &mut Train) {
        train.node_mut(0).to_next = Some(AheadBehind::new(0, 1));
        train.node_mut(1).to_next = Some(AheadBehind::new(0, 1));
    }

    #[tokio::test]
    async fn grafted_branch_without_requests_marked_merged_by_the_operator() {
        let fixture = Fixture::new();
        let host = MockHost::default().with("b1", 7, "First", false, false);
        let mut operator = ScriptedOperator {
            choices: VecDeque::from([InactiveBranchChoice::MarkMerged]),
            ..Default::default()
        };

        let (train, report) = fixture.sync_after(&host, &mut operator, grafted).await;

        assert_eq!(operator.asked, vec!["b2"]);
        assert_eq!(report.marked_merged, vec!["b2"]);
        assert!(fixture.train().node(1).is_merged());
        assert_eq!(host.creations(), vec![("b3".to_string(), "b1".to_string())]);
        assert_eq!(report.created, vec![("b3".to_string(), PrNumber(8))]);
        assert!(!train.node(1).has_open_request());
    }

    #[tokio::test]
    async fn grafted_branch_without_requests_reopened_by_the_operator() {
        let fixture = Fixture::new();
        let host = MockHost::default().with("b1", 7, "First", false, false);
        let mut operator = ScriptedOperator {
            choices: VecDeque::from([InactiveBranchChoice::OpenNew]),
            ..Default::default()
        };

        let (_, report) = fixture.sync_after(&host, &mut operator, grafted).await;

        assert_eq!(operator.asked, vec!["b2"]);
        assert!(report.marked_merged.is_empty());
        assert_eq!(
            host.creations(),
            vec![("b3".to_string(), "b2".to_string()), ("b2".to_string(), "b1".to_string())]
        );
    }

    #[tokio::test]
    async fn first_branch_targets_the_merge_branch() {
        let fixture = Fixture::new();
        let host = MockHost::default()
            .with("b2", 2, "", false, false)
            .with("b3", 3, "", false, false);
        let mut operator = ScriptedOperator::default();

        fixture.sync(&host, &mut operator).await;

        assert_eq!(host.creations(), vec![("b1".to_string(), "develop".to_string())]);
    }

    #[tokio::test]
    async fn closed_branch_marked_merged_by_the_operator() {
        let fixture = Fixture::new();
        let host = MockHost::default()
            .with("b1", 1, "", false, false)
            .with("b2", 2, "", true, false)
            .with("b3", 3, "", false, false);
        let mut operator = ScriptedOperator {
            choices: VecDeque::from([InactiveBranchChoice::MarkMerged]),
            ..Default::default()
        };

        let (train, report) = fixture.sync(&host, &mut operator).await;

        assert_eq!(operator.asked, vec!["b2"]);
        assert_eq!(report.marked_merged, vec!["b2"]);
        assert!(train.node(1).is_merged());
        assert!(host.creations().is_empty());
        assert!(fixture.train().node(1).is_merged());
        assert!(host.body(3).contains("#2 | merged"));
    }

    #[tokio::test]
    async fn closed_branch_reopened_by_the_operator() {
        let fixture = Fixture::new();
        let host = MockHost::default()
            .with("b1", 1, "", false, false)
            .with("b2", 2, "", true, false)
            .with("b3", 3, "", false, false);
        let mut operator = ScriptedOperator {
            choices: VecDeque::from([InactiveBranchChoice::OpenNew]),
            ..Default::default()
        };

        let (train, report) = fixture.sync(&host, &mut operator).await;

        assert_eq!(host.creations(), vec![("b2".to_string(), "b1".to_string())]);
        assert!(!train.node(1).is_merged());
        assert!(report.marked_merged.is_empty());
    }

    #[tokio::test]
    async fn request_merged_on_host_marks_branch_without_asking() {
        let fixture = Fixture::new();
        let host = MockHost::default()
            .with("b1", 1, "", true, true)
            .with("b2", 2, "", false, false)
            .with("b3", 3, "", false, false);
        let mut operator = ScriptedOperator::default();

        let (train, report) = fixture.sync(&host, &mut operator).await;

        assert!(operator.asked.is_empty());
        assert_eq!(report.marked_merged, vec!["b1"]);
        assert!(train.node(0).is_merged());
        assert!(fixture.train().node(0).is_merged());
    }

    #[tokio::test]
    async fn failed_creation_is_reported_and_the_rest_continues() {
        let fixture = Fixture::new();
        let host = MockHost::default()
            .with("b1", 1, "", false, false)
            .rejecting("b2");
        let mut operator = ScriptedOperator::default();

        let (_, report) = fixture.sync(&host, &mut operator).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].branch, "b2");
        assert!(report.failures[0].error.contains("Validation Failed"));
        assert_eq!(report.created, vec![("b3".to_string(), PrNumber(2))]);
        assert!(report.updated.contains(&PrNumber(1)));
    }
}
