//! Rule-based handlers that answer common requests without a model call.
//!
//! Skills are tried in the order they were registered and the first match
//! wins. A skill that errors is treated as not matching.

mod followup;
mod mysql;
mod system_info;

pub use followup::{FollowupAnalysisSkill, FollowupIntent};
pub use mysql::MysqlInfoSkill;
pub use system_info::SystemInfoSkill;

use crate::error::SkillError;
use crate::types::{HistoryEntry, SkillResult};
use regex::Regex;

/// What a skill may look at besides the query.
#[derive(Debug, Clone, Copy)]
pub struct SkillContext<'a> {
    pub history: &'a [HistoryEntry],
}

impl<'a> SkillContext<'a> {
    pub fn new(history: &'a [HistoryEntry]) -> Self {
        Self { history }
    }

    /// Newest entry that produced output, else the newest entry.
    pub fn latest_with_output(&self) -> Option<&'a HistoryEntry> {
        self.history
            .iter()
            .rev()
            .find(|e| e.has_output())
            .or_else(|| self.history.last())
    }

    pub fn latest(&self) -> Option<&'a HistoryEntry> {
        self.history.last()
    }
}

pub trait Skill {
    fn name(&self) -> &'static str;

    fn matches(&self, query: &str, ctx: &SkillContext<'_>) -> Result<bool, SkillError>;

    fn build(&self, query: &str, ctx: &SkillContext<'_>) -> Result<SkillResult, SkillError>;
}

/// Case-insensitive substring test against a keyword list.
fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

/// A keyword table split by script.
///
/// CJK terms match as substrings. English terms must stand as whole words,
/// so "list" does not fire on "listen". Neighbouring CJK characters count as
/// a word boundary.
pub(crate) struct Keywords {
    cjk: &'static [&'static str],
    english: Regex,
}

impl Keywords {
    pub(crate) fn new(cjk: &'static [&'static str], english: &[&str]) -> Self {
        let alternatives = english
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?i)(?:^|[^a-z0-9_])(?:{})(?:$|[^a-z0-9_])", alternatives);
        Self {
            cjk,
            english: Regex::new(&pattern).expect("keyword pattern must compile"),
        }
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        contains_any(text, self.cjk) || self.english.is_match(text)
    }
}

pub struct SkillManager {
    skills: Vec<Box<dyn Skill>>,
}

impl Default for SkillManager {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SystemInfoSkill),
            Box::new(MysqlInfoSkill),
            Box::new(FollowupAnalysisSkill),
        ])
    }
}

impl SkillManager {
    pub fn new(skills: Vec<Box<dyn Skill>>) -> Self {
        Self { skills }
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Returns the first matching skill's name and result.
    pub fn handle(
        &self,
        query: &str,
        history: &[HistoryEntry],
    ) -> Option<(&'static str, SkillResult)> {
        if query.trim().is_empty() {
            return None;
        }
        let ctx = SkillContext::new(history);
        for skill in &self.skills {
            let result = skill
                .matches(query, &ctx)
                .and_then(|hit| hit.then(|| skill.build(query, &ctx)).transpose());
            match result {
                Ok(Some(result)) => {
                    tracing::debug!("skill {} handled query", skill.name());
                    return Some((skill.name(), result));
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("skill {} skipped: {}", skill.name(), e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Intent;

    struct Broken;

    impl Skill for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn matches(&self, _query: &str, _ctx: &SkillContext<'_>) -> Result<bool, SkillError> {
            Ok(true)
        }

        fn build(&self, _query: &str, _ctx: &SkillContext<'_>) -> Result<SkillResult, SkillError> {
            Err(SkillError::Failed {
                skill: "broken".into(),
                reason: "boom".into(),
            })
        }
    }

    struct Echo(&'static str);

    impl Skill for Echo {
        fn name(&self) -> &'static str {
            self.0
        }

        fn matches(&self, query: &str, _ctx: &SkillContext<'_>) -> Result<bool, SkillError> {
            Ok(query.contains("echo"))
        }

        fn build(&self, _query: &str, _ctx: &SkillContext<'_>) -> Result<SkillResult, SkillError> {
            Ok(SkillResult::reply(self.0))
        }
    }

    fn memory_history() -> Vec<HistoryEntry> {
        vec![HistoryEntry::new(
            "查询内存使用情况",
            "free -h",
            Some(
                "               total        used        free\n内存：       62Gi       5.7Gi        12Gi\n交换：      2.0Gi       1.0Mi       2.0Gi"
                    .to_string(),
            ),
        )]
    }

    #[test]
    fn failing_skill_falls_through() {
        let manager = SkillManager::new(vec![Box::new(Broken), Box::new(Echo("second"))]);
        let (name, result) = manager.handle("echo this", &[]).unwrap();
        assert_eq!(name, "second");
        assert_eq!(result.response.as_deref(), Some("second"));
    }

    #[test]
    fn first_match_wins() {
        let manager = SkillManager::new(vec![Box::new(Echo("first")), Box::new(Echo("second"))]);
        assert_eq!(manager.handle("echo", &[]).unwrap().0, "first");
    }

    #[test]
    fn empty_query_never_matches() {
        assert!(SkillManager::default().handle("   ", &memory_history()).is_none());
    }

    #[test]
    fn unrelated_query_misses() {
        assert!(SkillManager::default()
            .handle("list files in the current directory", &[])
            .is_none());
    }

    #[test]
    fn hardware_query_runs_inspection_script() {
        let (name, result) = SkillManager::default()
            .handle("我的机器是什么配置", &memory_history())
            .unwrap();
        assert_eq!(name, "system_info");
        assert_eq!(result.intent, Some(Intent::RunCommand));
        assert!(result.needs_summary);
        assert!(result.command.unwrap().contains("<<'SH'"));
    }

    #[test]
    fn mysql_wins_over_hardware_keywords() {
        let (name, result) = SkillManager::default()
            .handle("mysql 配置 有几个数据库", &[])
            .unwrap();
        assert_eq!(name, "mysql_info");
        assert_eq!(result.intent, Some(Intent::ChatReply));
    }

    #[test]
    fn english_keywords_need_whole_words() {
        let keywords = Keywords::new(&["列举"], &["list", "how many"]);
        assert!(keywords.matches("list the tables"));
        assert!(keywords.matches("mysql列表list一下"));
        assert!(keywords.matches("How Many rows?"));
        assert!(keywords.matches("请列举"));
        assert!(!keywords.matches("which port does it listen on"));
        assert!(!keywords.matches("blacklist"));
    }

    #[test]
    fn ordinary_requests_reach_the_model() {
        let manager = SkillManager::default();
        for query in [
            "which port does mysql listen on",
            "create a mysql account for bob",
            "which python interpreter is installed",
        ] {
            assert!(manager.handle(query, &memory_history()).is_none(), "{}", query);
        }
    }

    #[test]
    fn default_order_covers_all_three_skills() {
        let manager = SkillManager::default();
        let history = memory_history();
        assert_eq!(manager.len(), 3);
        assert_eq!(manager.handle("mysql目前有几个数据库", &history).unwrap().0, "mysql_info");
        assert_eq!(manager.handle("62.63 GB对于我来说够用吗", &history).unwrap().0, "followup_analysis");
        assert_eq!(manager.handle("你执行了什么操作？", &history).unwrap().0, "followup_analysis");
    }
}
