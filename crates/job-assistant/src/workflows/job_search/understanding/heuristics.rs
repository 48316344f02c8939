use async_trait::async_trait;

use super::{Extraction, TextUnderstandingProvider, Understanding, UnderstandingError};
use crate::workflows::job_search::dialogue::{RequirementField, Stage, Turn};
use crate::workflows::job_search::salary::{SalaryParse, SalaryParser};

const JOB_KEYWORDS: [&str; 28] = [
    "开发", "工程师", "程序员", "设计师", "产品经理", "运营", "销售", "市场", "人事", "财务",
    "客服", "测试", "数据", "算法", "前端", "后端", "全栈", "移动", "安卓", "ios", "ui", "ux",
    "java", "python", "javascript", "react", "vue", "node",
];

const CITIES: [&str; 24] = [
    "北京", "上海", "广州", "深圳", "杭州", "南京", "苏州", "成都", "武汉", "西安", "重庆", "天津",
    "青岛", "大连", "厦门", "长沙", "郑州", "济南", "合肥", "福州", "昆明", "南昌", "贵阳", "海口",
];

const REMOTE_PHRASES: [&str; 5] = ["远程", "在家办公", "居家办公", "remote", "wfh"];

const REMOTE_LOCATION: &str = "远程";

/// Keyword and pattern rules per collecting stage. Deterministic and offline.
#[derive(Debug, Clone, Default)]
pub struct KeywordHeuristics {
    parser: SalaryParser,
}

impl KeywordHeuristics {
    pub fn new(parser: SalaryParser) -> Self {
        Self { parser }
    }

    pub fn understand(&self, text: &str, stage: Stage) -> Understanding {
        let text = text.trim();
        if text.is_empty() {
            return Understanding::NotUnderstood;
        }

        match stage.collected_field() {
            Some(RequirementField::JobType) => job_type(text),
            Some(RequirementField::Location) => location(text),
            Some(RequirementField::Salary) => self.salary(text),
            _ => Understanding::NotUnderstood,
        }
    }

    fn salary(&self, text: &str) -> Understanding {
        match self.parser.parse(text) {
            SalaryParse::Range(_) | SalaryParse::Negotiable => {
                extracted(RequirementField::Salary, text, 0.8)
            }
            SalaryParse::Unparseable if text.chars().any(|c| c.is_ascii_digit()) => {
                extracted(RequirementField::Salary, text, 0.5)
            }
            SalaryParse::Unparseable => Understanding::NotUnderstood,
        }
    }
}

#[async_trait]
impl TextUnderstandingProvider for KeywordHeuristics {
    async fn extract(
        &self,
        text: &str,
        stage: Stage,
        _recent: &[Turn],
    ) -> Result<Understanding, UnderstandingError> {
        Ok(self.understand(text, stage))
    }

    fn name(&self) -> &'static str {
        "keyword-heuristics"
    }
}

fn job_type(text: &str) -> Understanding {
    let lowered = text.to_lowercase();
    if JOB_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
        extracted(RequirementField::JobType, text, 0.8)
    } else if has_letters(text) {
        extracted(RequirementField::JobType, text, 0.6)
    } else {
        Understanding::NotUnderstood
    }
}

fn location(text: &str) -> Understanding {
    let lowered = text.to_lowercase();
    if let Some(city) = CITIES.iter().find(|city| text.contains(*city)) {
        extracted(RequirementField::Location, city, 0.9)
    } else if REMOTE_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        extracted(RequirementField::Location, REMOTE_LOCATION, 0.8)
    } else if has_letters(text) {
        extracted(RequirementField::Location, text, 0.6)
    } else {
        Understanding::NotUnderstood
    }
}

fn has_letters(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

fn extracted(field: RequirementField, value: &str, confidence: f32) -> Understanding {
    Understanding::Extracted(Extraction {
        field,
        value: value.to_string(),
        confidence,
    })
}
