use std::fmt;

use regex::Regex;

/// What the detector has seen of a container so far.
///
/// `exited` is only set once the log stream has been fully drained, so a
/// snapshot with `exited == true` is final: no later observation can differ.
/// A probe that cannot drain the stream reports an error instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub exited: bool,
    pub exit_code: Option<i32>,
    /// Health-check status, for images that define one.
    pub health: Option<String>,
    pub lines: Vec<String>,
}

/// A regular expression that must match at least `occurrence` log lines.
#[derive(Debug, Clone)]
pub struct LogPattern {
    regex: Regex,
    occurrence: usize,
}

impl LogPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::with_occurrence(pattern, 1)
    }

    /// An occurrence of zero is treated as one.
    pub fn with_occurrence(pattern: &str, occurrence: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            occurrence: occurrence.max(1),
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn occurrence(&self) -> usize {
        self.occurrence
    }

    /// Number of lines the pattern matches. Each line counts at most once.
    pub fn matches(&self, lines: &[String]) -> usize {
        lines.iter().filter(|l| self.regex.is_match(l)).count()
    }
}

/// A side-effect-free predicate over a [`Snapshot`].
///
/// `All([])` is always satisfied and `Any([])` never is.
#[derive(Debug, Clone)]
pub enum WaitCondition {
    Exit,
    Log(LogPattern),
    All(Vec<WaitCondition>),
    Any(Vec<WaitCondition>),
}

impl WaitCondition {
    pub fn for_exit() -> Self {
        Self::Exit
    }

    pub fn for_log(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Log(LogPattern::new(pattern)?))
    }

    pub fn for_log_occurrences(pattern: &str, occurrence: usize) -> Result<Self, regex::Error> {
        Ok(Self::Log(LogPattern::with_occurrence(pattern, occurrence)?))
    }

    pub fn all(conditions: impl IntoIterator<Item = WaitCondition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    pub fn any(conditions: impl IntoIterator<Item = WaitCondition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    pub fn is_satisfied(&self, snapshot: &Snapshot) -> bool {
        match self {
            Self::Exit => snapshot.exited,
            Self::Log(pattern) => pattern.matches(&snapshot.lines) >= pattern.occurrence(),
            Self::All(conditions) => conditions.iter().all(|c| c.is_satisfied(snapshot)),
            Self::Any(conditions) => conditions.iter().any(|c| c.is_satisfied(snapshot)),
        }
    }

    /// Descriptions of the parts of this condition that `snapshot` does not
    /// yet satisfy. Empty when the whole condition holds.
    pub fn pending(&self, snapshot: &Snapshot) -> Vec<String> {
        match self {
            Self::All(conditions) => conditions
                .iter()
                .flat_map(|c| c.pending(snapshot))
                .collect(),
            other if other.is_satisfied(snapshot) => Vec::new(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit => f.write_str("process exit"),
            Self::Log(pattern) if pattern.occurrence() == 1 => {
                write!(f, "log line /{}/", pattern.as_str())
            }
            Self::Log(pattern) => write!(
                f,
                "{} log lines /{}/",
                pattern.occurrence(),
                pattern.as_str()
            ),
            Self::All(conditions) => write_list(f, "all of", conditions),
            Self::Any(conditions) => write_list(f, "any of", conditions),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, conditions: &[WaitCondition]) -> fmt::Result {
    write!(f, "{label} [")?;
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{condition}")?;
    }
    f.write_str("]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(exited: bool, lines: &[&str]) -> Snapshot {
        Snapshot {
            exited,
            exit_code: exited.then_some(0),
            health: None,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn exit_tracks_exited_flag() {
        let cond = WaitCondition::for_exit();
        assert!(!cond.is_satisfied(&snapshot(false, &[])));
        assert!(cond.is_satisfied(&snapshot(true, &[])));
    }

    #[test]
    fn log_requires_occurrence_count() {
        let cond = WaitCondition::for_log_occurrences("ready to accept", 2).unwrap();
        let once = snapshot(false, &["database system is ready to accept connections"]);
        assert!(!cond.is_satisfied(&once));

        let twice = snapshot(
            false,
            &[
                "database system is ready to accept connections",
                "unrelated",
                "database system is ready to accept connections",
            ],
        );
        assert!(cond.is_satisfied(&twice));
    }

    #[test]
    fn zero_occurrence_means_one() {
        let pattern = LogPattern::with_occurrence("x", 0).unwrap();
        assert_eq!(pattern.occurrence(), 1);
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(WaitCondition::for_log("(unclosed").is_err());
    }

    #[test]
    fn all_and_any_combine() {
        let log = WaitCondition::for_log("done").unwrap();
        let all = WaitCondition::all([WaitCondition::for_exit(), log.clone()]);
        let any = WaitCondition::any([WaitCondition::for_exit(), log]);

        let only_log = snapshot(false, &["done"]);
        assert!(!all.is_satisfied(&only_log));
        assert!(any.is_satisfied(&only_log));

        let both = snapshot(true, &["done"]);
        assert!(all.is_satisfied(&both));
    }

    #[test]
    fn empty_combinators() {
        let s = snapshot(false, &[]);
        assert!(WaitCondition::all([]).is_satisfied(&s));
        assert!(!WaitCondition::any([]).is_satisfied(&s));
    }

    #[test]
    fn pending_lists_unsatisfied_legs_of_all() {
        let cond = WaitCondition::all([
            WaitCondition::for_exit(),
            WaitCondition::for_log("applied").unwrap(),
            WaitCondition::for_log("validated").unwrap(),
        ]);
        let s = snapshot(false, &["Successfully validated 1 migration"]);
        assert_eq!(
            cond.pending(&s),
            vec!["process exit".to_string(), "log line /applied/".to_string()]
        );
        assert!(cond.pending(&snapshot(true, &["applied", "validated"])).is_empty());
    }

    #[test]
    fn display_nests() {
        let cond = WaitCondition::any([
            WaitCondition::for_exit(),
            WaitCondition::for_log_occurrences("ok", 3).unwrap(),
        ]);
        assert_eq!(cond.to_string(), "any of [process exit, 3 log lines /ok/]");
    }
}
