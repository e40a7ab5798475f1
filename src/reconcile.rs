//! Cross-source status reconciliation.
//!
//! The task graph decides which tasks matter. For each graph task the
//! reconciler gathers what the progress log and the task documents say about
//! it, validates every token, flags disagreement, and checks that completed
//! tasks carry no active counters. Tasks outside the graph are only reported
//! as warnings; their statuses are not compared.
use crate::parse::{CounterState, ParsedStatuses, StrikeCount};
use crate::schema::{Finding, StatusSource, TaskStatus};
use std::collections::BTreeSet;

/// Parsed sources handed to the reconciler, one per artifact.
pub struct ReconcileInputs<'a> {
    pub progress: &'a ParsedStatuses,
    pub documents: &'a ParsedStatuses,
    pub graph: &'a ParsedStatuses,
    pub counters: &'a CounterState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Sorted identifiers of the task graph.
    pub task_ids: Vec<String>,
    /// Findings and warnings in reporting order.
    pub findings: Vec<Finding>,
}

pub fn reconcile(inputs: &ReconcileInputs<'_>) -> Reconciliation {
    let mut findings = Vec::new();
    for parsed in [inputs.progress, inputs.documents, inputs.graph] {
        findings.extend(parsed.issues.iter().cloned().map(Finding::finding));
    }

    // BTreeMap keys are already sorted.
    let task_ids: Vec<String> = inputs.graph.statuses.keys().cloned().collect();
    if task_ids.is_empty() {
        findings.push(Finding::finding("no dispatchable task nodes in task graph"));
    }

    for task_id in orphans(inputs.progress, inputs.graph) {
        findings.push(Finding::warning(format!(
            "{task_id} present in PROGRESS but absent from task graph"
        )));
    }
    for task_id in orphans(inputs.documents, inputs.graph) {
        findings.push(Finding::warning(format!(
            "{task_id} present in task frontmatter but absent from task graph"
        )));
    }

    for task_id in &task_ids {
        check_task(task_id, inputs, &mut findings);
    }

    findings.extend(
        inputs
            .counters
            .issues
            .iter()
            .cloned()
            .map(Finding::finding),
    );
    findings.extend(
        inputs
            .counters
            .warnings
            .iter()
            .cloned()
            .map(Finding::warning),
    );

    tracing::debug!(
        tasks = task_ids.len(),
        findings = findings.len(),
        "reconciled sources"
    );
    Reconciliation { task_ids, findings }
}

fn orphans<'a>(source: &'a ParsedStatuses, graph: &ParsedStatuses) -> Vec<&'a str> {
    source
        .statuses
        .keys()
        .filter(|task_id| !graph.statuses.contains_key(task_id.as_str()))
        .map(String::as_str)
        .collect()
}

fn check_task(task_id: &str, inputs: &ReconcileInputs<'_>, findings: &mut Vec<Finding>) {
    let mut reported: Vec<(StatusSource, &str)> = Vec::new();
    match inputs.progress.statuses.get(task_id) {
        Some(status) => reported.push((StatusSource::Progress, status.as_str())),
        None => findings.push(Finding::finding(format!(
            "{task_id} missing task in PROGRESS"
        ))),
    }
    match inputs.documents.statuses.get(task_id) {
        Some(status) => reported.push((StatusSource::Document, status.as_str())),
        None => findings.push(Finding::finding(format!(
            "{task_id} missing task frontmatter entry"
        ))),
    }
    if let Some(status) = inputs.graph.statuses.get(task_id) {
        reported.push((StatusSource::Graph, status.as_str()));
    }

    for (source, status) in &reported {
        if status.parse::<TaskStatus>().is_err() {
            findings.push(Finding::finding(format!(
                "{task_id} invalid status '{status}' in {source}"
            )));
        }
    }

    let distinct: BTreeSet<&str> = reported.iter().map(|(_, status)| *status).collect();
    if distinct.len() > 1 {
        let mut pairs = reported.clone();
        pairs.sort_by_key(|(source, _)| source.name());
        let listing = pairs
            .iter()
            .map(|(source, status)| format!("{source}={status}"))
            .collect::<Vec<_>>()
            .join(" ");
        findings.push(Finding::finding(format!(
            "{task_id} status mismatch: {listing}"
        )));
    }

    let completed = TaskStatus::Completed.as_str();
    if reported.iter().any(|(_, status)| *status == completed) {
        check_completed_counters(task_id, inputs.counters, findings);
    }
}

fn check_completed_counters(task_id: &str, counters: &CounterState, findings: &mut Vec<Finding>) {
    let counts = counters.for_task(task_id);
    let strike = counts.strike();
    if let Some(StrikeCount::Nested(count)) = strike {
        if count > 0 {
            findings.push(Finding::finding(format!(
                "{task_id} completed with active strike count {count}"
            )));
        }
    }
    let security = counts.security();
    if security > 0 {
        findings.push(Finding::finding(format!(
            "{task_id} completed with active security count {security}"
        )));
    }
    if let Some(StrikeCount::Legacy(count)) = strike {
        if count > 0 {
            findings.push(Finding::finding(format!(
                "{task_id} completed with legacy strike count {count}"
            )));
        }
    }
}
