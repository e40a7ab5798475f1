//! Requirement extraction from task and feature documents.
//!
//! Three notations are recognized in every scanned document. Variable
//! references anywhere in the text declare environment variables:
//!
//! ```text
//! $GITHUB_TOKEN  ${GITHUB_TOKEN}  $env:GITHUB_TOKEN  %GITHUB_TOKEN%
//! ```
//!
//! The first word of each line inside a closed code fence declares a command,
//! except comments, assignments, and bare pipe or chain operators. Bullet
//! subsections name requirements explicitly:
//!
//! ```text
//! ### Required Commands
//! - `jq`
//! - ./scripts/setup.sh
//!
//! **Required Environment Variables:**
//! - `GITHUB_TOKEN`: used for API calls
//! ```
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const COMMANDS_SUBSECTION: &str = "Required Commands";
const ENV_SUBSECTION: &str = "Required Environment Variables";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Requirements {
    pub env_vars: BTreeSet<String>,
    pub commands: BTreeSet<String>,
}

impl Requirements {
    fn add_env_var(&mut self, token: &str) {
        let name = token.trim_start_matches('$');
        let name = name
            .strip_prefix('{')
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or(name);
        if env_name_regex().is_match(name) {
            self.env_vars.insert(name.to_string());
        }
    }

    fn add_command(&mut self, token: &str) {
        if !token.is_empty() {
            self.commands.insert(token.to_string());
        }
    }
}

/// Collect every requirement a document declares.
pub fn extract_requirements(text: &str, reqs: &mut Requirements) {
    extract_env_references(text, reqs);
    extract_code_fence_commands(text, reqs);
    extract_bullet_requirements(text, reqs);
}

fn env_name_regex() -> &'static Regex {
    static ENV_NAME: OnceLock<Regex> = OnceLock::new();
    ENV_NAME.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("regex for env names"))
}

fn env_reference_regexes() -> &'static [Regex] {
    static ENV_REFERENCES: OnceLock<Vec<Regex>> = OnceLock::new();
    ENV_REFERENCES.get_or_init(|| {
        [
            r"\$env:([A-Z][A-Z0-9_]*)",
            r"\$\{([A-Z][A-Z0-9_]*)\}",
            r"(?:^|[^A-Za-z0-9_])\$([A-Z][A-Z0-9_]*)",
            r"%([A-Z][A-Z0-9_]*)%",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("regex for env references"))
        .collect()
    })
}

fn assignment_regex() -> &'static Regex {
    static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
    ASSIGNMENT.get_or_init(|| {
        Regex::new(r"^(?:\$env:)?[A-Za-z_][A-Za-z0-9_]*\s*=").expect("regex for assignments")
    })
}

/// Collect `$NAME`, `${NAME}`, `$env:NAME`, and `%NAME%` references.
pub fn extract_env_references(text: &str, reqs: &mut Requirements) {
    for regex in env_reference_regexes() {
        for caps in regex.captures_iter(text) {
            if let Some(name) = caps.get(1) {
                reqs.add_env_var(name.as_str());
            }
        }
    }
}

/// Collect the leading command of each line in closed code fences.
pub fn extract_code_fence_commands(text: &str, reqs: &mut Requirements) {
    let mut block: Option<Vec<&str>> = None;
    for raw in text.lines() {
        if raw.trim().starts_with("```") {
            match block.take() {
                Some(lines) => {
                    for line in lines {
                        if let Some(command) = fence_command(line) {
                            reqs.add_command(command);
                        }
                    }
                }
                None => block = Some(Vec::new()),
            }
            continue;
        }
        if let Some(lines) = block.as_mut() {
            lines.push(raw);
        }
    }
}

fn fence_command(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if value.is_empty() || value.starts_with('#') || assignment_regex().is_match(value) {
        return None;
    }
    let command = value.trim_start_matches(['$', ' ']).split_whitespace().next()?;
    if matches!(command, "|" | "&&" | "||") {
        return None;
    }
    Some(command)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subsection {
    Commands,
    EnvVars,
}

/// Collect requirements declared in `Required ...` bullet subsections.
pub fn extract_bullet_requirements(text: &str, reqs: &mut Requirements) {
    let mut subsection = None;
    let mut in_fence = false;
    for raw in text.lines() {
        let stripped = raw.trim();
        if stripped.starts_with("```") {
            in_fence = !in_fence;
            subsection = None;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(title) = section_title(stripped) {
            subsection = if title.eq_ignore_ascii_case(COMMANDS_SUBSECTION) {
                Some(Subsection::Commands)
            } else if title.eq_ignore_ascii_case(ENV_SUBSECTION) {
                Some(Subsection::EnvVars)
            } else {
                None
            };
            continue;
        }
        let Some(kind) = subsection else {
            continue;
        };
        if stripped.is_empty() {
            continue;
        }
        let Some(item) = bullet_body(stripped) else {
            subsection = None;
            continue;
        };
        let token = first_token(item);
        match kind {
            Subsection::Commands => reqs.add_command(token),
            Subsection::EnvVars => reqs.add_env_var(token),
        }
    }
}

fn heading(stripped: &str) -> Option<(usize, &str)> {
    let level = stripped.chars().take_while(|ch| *ch == '#').count();
    if level == 0 {
        return None;
    }
    let title = stripped[level..].trim();
    Some((level, title.trim_end_matches(':').trim_end()))
}

/// Heading text or a bold-only line such as `**Required Commands:**`.
fn section_title(stripped: &str) -> Option<&str> {
    if let Some((_, title)) = heading(stripped) {
        return Some(title);
    }
    let inner = stripped.strip_prefix("**")?.strip_suffix("**")?;
    Some(inner.trim().trim_end_matches(':').trim_end())
}

fn bullet_body(stripped: &str) -> Option<&str> {
    stripped
        .strip_prefix("- ")
        .or_else(|| stripped.strip_prefix("* "))
        .map(str::trim)
}

fn first_token(item: &str) -> &str {
    item.split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_start_matches('`')
        .trim_end_matches(['`', ',', ';', ':', '.'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_subsections_declare_commands_and_variables() {
        let text = "# TASK-A\n\
            ### Required Commands\n\
            - `jq` for JSON\n\
            * ./scripts/setup.sh\n\
            \n\
            **Required Environment Variables:**\n\
            - `GITHUB_TOKEN`: API calls\n\
            - $RUST_LOG\n\
            - lowercase_not_allowed\n\
            Some prose ends the list.\n\
            - `ignored-after-prose`\n";
        let mut reqs = Requirements::default();
        extract_bullet_requirements(text, &mut reqs);
        assert_eq!(
            reqs.commands.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["./scripts/setup.sh", "jq"]
        );
        assert_eq!(
            reqs.env_vars.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["GITHUB_TOKEN", "RUST_LOG"]
        );
    }

    #[test]
    fn other_headings_close_the_subsection() {
        let text = "## Required Commands\n- git\n## Notes\n- not-a-command\n";
        let mut reqs = Requirements::default();
        extract_bullet_requirements(text, &mut reqs);
        assert_eq!(reqs.commands.len(), 1);
        assert!(reqs.commands.contains("git"));
    }

    #[test]
    fn fence_lines_declare_commands() {
        let text = "# TASK-A\n\
            no-fence --here\n\
            ```sh\n\
            # comment line\n\
            export API_KEY=changeme\n\
            FOO=bar ignored\n\
            $env:PATH_EXTRA = 'C:/tools'\n\
            $ cargo --version\n\
            \x20 rg --files | head\n\
            &&\n\
            ```\n\
            ```\n\
            unterminated-fence --ignored\n";
        let mut reqs = Requirements::default();
        extract_code_fence_commands(text, &mut reqs);
        assert_eq!(
            reqs.commands.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["cargo", "export", "rg"]
        );
        assert!(reqs.env_vars.is_empty());
    }

    #[test]
    fn env_references_anywhere_in_the_text() {
        let text = "Set $API_TOKEN before running.\n\
            ```\n\
            curl -H \"${AUTH_HEADER}\" \"$BASE_URL\"\n\
            Write-Host $env:PS_VAR\n\
            echo %WIN_VAR%\n\
            ```\n\
            Not references: price$NOPE, $lower, $_UNDERSCORE, %mixed_Case%.\n";
        let mut reqs = Requirements::default();
        extract_env_references(text, &mut reqs);
        assert_eq!(
            reqs.env_vars.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["API_TOKEN", "AUTH_HEADER", "BASE_URL", "PS_VAR", "WIN_VAR"]
        );
    }

    #[test]
    fn task_document_fences_declare_requirements() {
        let text = "---\nstatus: pending\n---\n# TASK-A\n\
            ## Verification\n\
            ```bash\n\
            no-such-cmd --version\n\
            echo $UNSET_TOKEN\n\
            ```\n\
            ### Required Commands\n\
            - jq\n";
        let mut reqs = Requirements::default();
        extract_requirements(text, &mut reqs);
        assert_eq!(
            reqs.commands.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["echo", "jq", "no-such-cmd"]
        );
        assert_eq!(
            reqs.env_vars.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["UNSET_TOKEN"]
        );
    }
}
