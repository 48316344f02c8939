//! Assistant wording. Kept in one place so front ends and tests agree on the text.

use crate::workflows::job_search::dialogue::{RequirementField, Requirements, Stage};
use crate::workflows::job_search::retrieval::{MatchView, SearchSummary};

pub const GREETING: &str = "你好！我是您的专属求职助手 🤖\n我将帮助您找到最合适的工作机会。让我们开始吧！\n\n请告诉我，您想找什么类型的工作呢？比如：Python开发工程师、UI设计师、产品经理等。";

pub const EMPTY_INPUT: &str = "请告诉我一些信息，这样我能更好地帮助您。";

pub const SEARCH_UNAVAILABLE: &str =
    "抱歉，职位搜索暂时不可用，您的需求已保存。请稍后回复任意内容，我会重新为您搜索。";

pub const CLOSING: &str = "祝您求职顺利！如果想重新开始搜索，请告诉我“重新开始”。";

pub const COMPLETED_HINT: &str = "本次搜索已经完成。如需查找其他职位，请重新开始对话。";

const DESCRIPTION_EXCERPT_CHARS: usize = 60;

pub const CONFIRMATION_REJECTED: &str = "好的，我们重新来。";

pub fn question(stage: Stage) -> &'static str {
    match stage {
        Stage::Greeting => GREETING,
        Stage::CollectingJobType => "请告诉我您想要从事的具体职位，比如：\n• Python开发工程师\n• UI/UX设计师\n• 产品经理\n• 数据分析师\n• 市场运营专员\n\n您的目标职位是？",
        Stage::CollectingLocation => "很好！接下来请告诉我您希望在哪个城市工作？\n\n比如：北京、上海、深圳、杭州、成都等。",
        Stage::CollectingSalary => "最后一个问题，请告诉我您的薪资期望？\n\n可以这样表达：\n• 15-20K\n• 月薪1万以上\n• 年薪30万左右\n• 面议",
        Stage::Searching => "正在为您搜索匹配的职位，请稍候...",
        Stage::ShowingResults | Stage::Completed => CLOSING,
    }
}

pub fn confirmation(field: RequirementField, value: &str) -> String {
    match field {
        RequirementField::JobType => format!(
            "我理解您想找{value}相关的工作，这个理解对吗？\n\n如果不准确，请再详细描述一下您的目标职位。"
        ),
        RequirementField::Location => format!("确认一下，您希望在{value}工作，是这样吗？"),
        RequirementField::Salary => format!("您的薪资期望是{value}，这样理解对吗？"),
        other => format!("您的{}是{value}，这样理解对吗？", label(other)),
    }
}

/// Retry prompt; `with_examples` switches to the longer hint.
pub fn retry(field: RequirementField, with_examples: bool) -> &'static str {
    match (field, with_examples) {
        (RequirementField::JobType, true) => "抱歉，我没有完全理解您想要的职位类型。\n\n能否更具体地说明一下？比如：\n• 技术开发类：Java工程师、前端开发\n• 设计创意类：UI设计师、平面设计\n• 运营管理类：产品经理、市场运营",
        (RequirementField::JobType, false) => "让我重新理解一下，您希望从事什么样的工作呢？\n\n请尽量具体，这样我能为您找到更匹配的职位。",
        (RequirementField::Location, true) => "请告诉我一个具体的城市名称，比如北京、上海、深圳等。",
        (RequirementField::Location, false) => "工作地点请说一个城市名称，这样我能为您搜索当地的职位。",
        (RequirementField::Salary, true) => "请告诉我一个具体的薪资数字或范围，比如：\n• 10K-15K\n• 8K以上\n• 年薪20万",
        (RequirementField::Salary, false) => "关于薪资，请给出一个数字范围，这样我能筛选合适的职位。",
        _ => "抱歉，我没有理解您的意思。请再试一次。",
    }
}

pub fn acknowledgement(field: RequirementField, value: &str) -> String {
    format!("好的，我记录下了：\n✅ {}：{value}", label(field))
}

pub fn collected(requirements: &Requirements) -> String {
    let lines = [
        ("🎯", RequirementField::JobType),
        ("📍", RequirementField::Location),
        ("💰", RequirementField::Salary),
    ]
    .into_iter()
    .filter_map(|(icon, field)| {
        requirements
            .get(field)
            .map(|value| format!("{icon} {}：{value}", label(field)))
    })
    .collect::<Vec<_>>()
    .join("\n");

    format!("✅ 太好了！我已经收集到了所有必要信息：\n{lines}")
}

pub fn results(views: &[MatchView]) -> String {
    if views.is_empty() {
        return "抱歉，暂时没有找到符合您薪资期望的职位。您可以重新开始，调整职位类型、地点或薪资范围。"
            .to_string();
    }

    let summary = SearchSummary::from_views(views);
    let mut text = format!(
        "🎉 为您找到 {} 个匹配的职位，来自 {} 家公司：",
        summary.total,
        summary.companies.len()
    );
    for view in views {
        text.push_str(&format!(
            "\n{}. {} | {} | {} | {}",
            view.rank,
            or_unknown(&view.title),
            or_unknown(&view.company),
            or_unknown(&view.location),
            if view.salary.is_empty() { "面议" } else { view.salary.as_str() }
        ));
        text.push_str(&format!(
            "\n   🎓 学历：{} | 💼 经验：{}",
            or_unknown(&view.education),
            or_unknown(&view.experience)
        ));
        if !view.description.trim().is_empty() {
            text.push_str(&format!("\n   📝 {}", excerpt(&view.description)));
        }
    }
    if !summary.locations.is_empty() {
        text.push_str(&format!("\n\n📍 涉及地点：{}", summary.locations.join("、")));
    }
    text
}

/// Description shortened to `DESCRIPTION_EXCERPT_CHARS` characters.
fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= DESCRIPTION_EXCERPT_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(DESCRIPTION_EXCERPT_CHARS).collect();
    short.push_str("...");
    short
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "未知"
    } else {
        value
    }
}

fn label(field: RequirementField) -> &'static str {
    match field {
        RequirementField::JobType => "职位类型",
        RequirementField::Location => "工作地点",
        RequirementField::Salary => "薪资期望",
        RequirementField::Experience => "工作经验",
        RequirementField::Education => "学历要求",
        RequirementField::CompanySize => "公司规模",
        RequirementField::Industry => "行业",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_list_ranks_and_fill_blanks() {
        let views = vec![MatchView {
            rank: 1,
            id: "job-1".to_string(),
            title: "Python开发工程师".to_string(),
            company: String::new(),
            location: "深圳".to_string(),
            salary: String::new(),
            education: "本科".to_string(),
            experience: String::new(),
            description: "负责推荐系统后端服务开发".repeat(6),
            score: 1.0,
            match_type: "posting-negotiable".to_string(),
        }];

        let text = results(&views);
        assert!(text.contains("为您找到 1 个匹配的职位"));
        assert!(text.contains("1. Python开发工程师 | 未知 | 深圳 | 面议"));
        assert!(text.contains("🎓 学历：本科 | 💼 经验：未知"));
        assert!(text.contains("📝 负责推荐系统后端服务开发"));
        assert!(text.contains("..."));
        assert!(text.contains("涉及地点：深圳"));
    }

    #[test]
    fn salary_examples_parse_as_advertised() {
        use crate::workflows::job_search::salary::{SalaryParse, SalaryParser};

        let hint = retry(RequirementField::Salary, true);
        assert!(hint.contains("8K以上"));
        let SalaryParse::Range(range) = SalaryParser::default().parse("8K以上") else {
            panic!("hint example parses");
        };
        assert_eq!((range.min(), range.max()), (8_000, 24_000));
    }

    #[test]
    fn empty_results_are_not_an_error_message() {
        assert!(results(&[]).starts_with("抱歉，暂时没有找到"));
    }

    #[test]
    fn collected_lists_required_fields() {
        let mut requirements = Requirements::default();
        requirements.set(RequirementField::JobType, "产品经理");
        requirements.set(RequirementField::Location, "杭州");
        requirements.set(RequirementField::Salary, "20K以上");

        let text = collected(&requirements);
        assert!(text.contains("🎯 职位类型：产品经理"));
        assert!(text.contains("📍 工作地点：杭州"));
        assert!(text.contains("💰 薪资期望：20K以上"));
    }
}
