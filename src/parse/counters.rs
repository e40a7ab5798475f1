//! Strike/security counter parser.
//!
//! Two schemas coexist while the counters file migrates. The nested schema:
//!
//! ```text
//! tasks:
//!   TASK-A:
//!     strike:
//!       active: 0
//!     security:
//!       active: 1
//! ```
//!
//! and the legacy flat schema, one `TASK-...: <n>` line outside `tasks:`:
//!
//! ```text
//! strikes:
//!   TASK-A: 2
//! ```
//!
//! A nested strike entry always supersedes a legacy one for the same task.
use super::{normalize_scalar, split_key_value};
use crate::schema::is_task_id;
use crate::util::indent_width;
use std::collections::BTreeMap;

const TASK_INDENT: usize = 2;
const GROUP_INDENT: usize = 4;
const ACTIVE_INDENT: usize = 6;

pub const LEGACY_SCHEMA_WARNING: &str =
    "counters: legacy flat strike schema detected; migrate to tasks.<TASK>.strike.active";

/// The strike count that applies to a task, tagged by the schema it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeCount {
    Nested(u32),
    Legacy(u32),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskCounters {
    pub strike_active: Option<u32>,
    pub security_active: Option<u32>,
    pub legacy_active: Option<u32>,
}

impl TaskCounters {
    /// Resolve the strike count, preferring the nested schema.
    pub fn strike(&self) -> Option<StrikeCount> {
        self.strike_active
            .map(StrikeCount::Nested)
            .or(self.legacy_active.map(StrikeCount::Legacy))
    }

    pub fn security(&self) -> u32 {
        self.security_active.unwrap_or(0)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CounterState {
    pub tasks: BTreeMap<String, TaskCounters>,
    /// Legacy entries exist and no nested strike entry exists anywhere.
    pub legacy_schema_detected: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl CounterState {
    pub fn for_task(&self, task_id: &str) -> TaskCounters {
        self.tasks.get(task_id).copied().unwrap_or_default()
    }

    fn entry(&mut self, task_id: &str) -> &mut TaskCounters {
        self.tasks.entry(task_id.to_string()).or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Strike,
    Security,
}

impl Group {
    fn name(self) -> &'static str {
        match self {
            Group::Strike => "strike",
            Group::Security => "security",
        }
    }
}

#[derive(Default)]
struct ParseState {
    in_tasks: bool,
    current_task: Option<String>,
    current_group: Option<Group>,
    counters: CounterState,
}

impl ParseState {
    fn finish(mut self) -> CounterState {
        let has_legacy = self
            .counters
            .tasks
            .values()
            .any(|entry| entry.legacy_active.is_some());
        let has_nested_strike = self
            .counters
            .tasks
            .values()
            .any(|entry| entry.strike_active.is_some());
        if has_legacy && !has_nested_strike {
            self.counters.legacy_schema_detected = true;
            self.counters
                .warnings
                .push(LEGACY_SCHEMA_WARNING.to_string());
        }
        self.counters
    }
}

pub fn parse_counters(text: &str) -> CounterState {
    let mut state = ParseState::default();
    for raw in text.lines() {
        let stripped = raw.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let indent = indent_width(raw);

        if indent == 0 {
            state.in_tasks = stripped == "tasks:";
            state.current_task = None;
            state.current_group = None;
        }

        if state.in_tasks {
            handle_nested_line(indent, stripped, &mut state);
        } else {
            handle_legacy_line(stripped, &mut state);
        }
    }
    state.finish()
}

fn handle_nested_line(indent: usize, stripped: &str, state: &mut ParseState) {
    let Some((raw_key, value)) = split_key_value(stripped) else {
        return;
    };
    let key = normalize_scalar(raw_key);
    match indent {
        TASK_INDENT => {
            state.current_group = None;
            state.current_task =
                (is_task_id(&key) && value.trim().is_empty()).then_some(key);
        }
        GROUP_INDENT => {
            state.current_group = match key.as_str() {
                "strike" if state.current_task.is_some() => Some(Group::Strike),
                "security" if state.current_task.is_some() => Some(Group::Security),
                _ => None,
            };
        }
        ACTIVE_INDENT if key == "active" => {
            let (Some(task_id), Some(group)) = (state.current_task.clone(), state.current_group)
            else {
                return;
            };
            let Ok(count) = normalize_scalar(value).parse::<u32>() else {
                state.counters.issues.push(format!(
                    "counters: invalid active count for {task_id}.{}",
                    group.name()
                ));
                return;
            };
            let entry = state.counters.entry(&task_id);
            match group {
                Group::Strike => entry.strike_active = Some(count),
                Group::Security => entry.security_active = Some(count),
            }
        }
        _ => {}
    }
}

fn handle_legacy_line(stripped: &str, state: &mut ParseState) {
    let Some((raw_key, value)) = split_key_value(stripped) else {
        return;
    };
    let key = normalize_scalar(raw_key);
    if !is_task_id(&key) {
        return;
    }
    if let Ok(count) = normalize_scalar(value).parse::<u32>() {
        state.counters.entry(&key).legacy_active = Some(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = "version: 2\n\
        tasks:\n\
        \x20 TASK-A:\n\
        \x20   strike:\n\
        \x20     active: 2\n\
        \x20     total: 5\n\
        \x20   security:\n\
        \x20     active: 0\n\
        \x20 TASK-B:\n\
        \x20   security:\n\
        \x20     active: 1\n";

    #[test]
    fn reads_nested_schema() {
        let state = parse_counters(NESTED);
        assert!(state.issues.is_empty());
        assert!(state.warnings.is_empty());
        assert!(!state.legacy_schema_detected);
        let a = state.for_task("TASK-A");
        assert_eq!(a.strike(), Some(StrikeCount::Nested(2)));
        assert_eq!(a.security(), 0);
        let b = state.for_task("TASK-B");
        assert_eq!(b.strike(), None);
        assert_eq!(b.security(), 1);
        assert_eq!(state.for_task("TASK-C"), TaskCounters::default());
    }

    #[test]
    fn legacy_only_file_warns_exactly_once() {
        let text = "strikes:\n  TASK-A: 2\n  TASK-B: 0\nTASK-C: 1\n";
        let state = parse_counters(text);
        assert!(state.legacy_schema_detected);
        assert_eq!(state.warnings, vec![LEGACY_SCHEMA_WARNING.to_string()]);
        assert_eq!(
            state.for_task("TASK-A").strike(),
            Some(StrikeCount::Legacy(2))
        );
        assert_eq!(
            state.for_task("TASK-C").strike(),
            Some(StrikeCount::Legacy(1))
        );
    }

    #[test]
    fn nested_strike_supersedes_legacy() {
        let text = "legacy:\n  TASK-A: 4\ntasks:\n  TASK-A:\n    strike:\n      active: 0\n";
        let state = parse_counters(text);
        assert!(!state.legacy_schema_detected);
        assert!(state.warnings.is_empty());
        let a = state.for_task("TASK-A");
        assert_eq!(a.legacy_active, Some(4));
        assert_eq!(a.strike(), Some(StrikeCount::Nested(0)));
    }

    #[test]
    fn non_integer_active_is_an_issue() {
        let text = "tasks:\n  TASK-A:\n    strike:\n      active: many\n";
        let state = parse_counters(text);
        assert_eq!(
            state.issues,
            vec!["counters: invalid active count for TASK-A.strike".to_string()]
        );
        assert_eq!(state.for_task("TASK-A").strike(), None);
    }

    #[test]
    fn other_groups_do_not_record_counts() {
        let text = "tasks:\n  TASK-A:\n    retries:\n      active: 3\n";
        let state = parse_counters(text);
        assert_eq!(state.for_task("TASK-A"), TaskCounters::default());
    }

    #[test]
    fn empty_file_is_clean() {
        assert_eq!(parse_counters(""), CounterState::default());
    }
}
