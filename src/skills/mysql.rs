use super::{Keywords, Skill, SkillContext};
use crate::error::SkillError;
use crate::types::SkillResult;
use std::sync::LazyLock;

static ENUMERATION: LazyLock<Keywords> = LazyLock::new(|| {
    Keywords::new(
        &["几个数据库", "表有哪些", "列举", "统计", "显示", "有多少"],
        &["how many", "list", "show", "count"],
    )
});

const CREDENTIALS_REQUEST: &str = "I need MySQL connection details (host, port, username and password) before I can run that query.\nPlease provide a read-only account, or tell me whether default credentials are already configured.";

/// MySQL questions need credentials we never guess, so this skill only asks for them.
pub struct MysqlInfoSkill;

impl Skill for MysqlInfoSkill {
    fn name(&self) -> &'static str {
        "mysql_info"
    }

    fn matches(&self, query: &str, _ctx: &SkillContext<'_>) -> Result<bool, SkillError> {
        if !query.to_lowercase().contains("mysql") {
            return Ok(false);
        }
        Ok(query.contains('?') || query.contains('？') || ENUMERATION.matches(query))
    }

    fn build(&self, _query: &str, _ctx: &SkillContext<'_>) -> Result<SkillResult, SkillError> {
        Ok(SkillResult::reply(CREDENTIALS_REQUEST))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Intent;

    fn matches(query: &str) -> bool {
        MysqlInfoSkill.matches(query, &SkillContext::new(&[])).unwrap()
    }

    #[test]
    fn needs_mysql_and_a_question() {
        assert!(matches("mysql目前有几个数据库"));
        assert!(matches("MySQL running?"));
        assert!(matches("how many tables in MYSQL"));
        assert!(!matches("restart mysql"));
        assert!(!matches("how many databases are there?"));
    }

    #[test]
    fn enumeration_words_must_stand_alone() {
        assert!(matches("show mysql databases"));
        assert!(matches("count the mysql users"));
        assert!(!matches("which port does mysql listen on"));
        assert!(!matches("create a mysql account for bob"));
        assert!(!matches("mysql showcase report"));
    }

    #[test]
    fn always_asks_for_credentials() {
        let result = MysqlInfoSkill
            .build("mysql目前有几个数据库", &SkillContext::new(&[]))
            .unwrap();
        assert_eq!(result.intent, Some(Intent::ChatReply));
        assert!(result.command.is_none());
        assert!(result.response.unwrap().contains("MySQL connection details"));
    }
}
