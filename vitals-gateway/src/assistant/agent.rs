//! Profile-aware health agent: picks a task from the message and renders a
//! task-specific prompt around the user's health data.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Snippets retrieved for an agent request.
pub const AGENT_TOP_K: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepSchedule {
    /// `HH:MM`
    pub bedtime: Option<String>,
    /// `HH:MM`
    pub wake_time: Option<String>,
}

/// Health data supplied with a consultation. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub age: Option<u32>,
    /// Centimetres.
    pub height: Option<f64>,
    /// Kilograms.
    pub weight: Option<f64>,
    pub diet_records: Option<Vec<String>>,
    pub exercise_contraindications: Option<String>,
    pub avg_sleep_hours: Option<f64>,
    pub sleep_issues: Option<Vec<String>>,
    pub sleep_schedule: Option<SleepSchedule>,
}

impl UserProfile {
    /// Body-mass index rounded to two decimals, or 0 when height or weight
    /// is missing or not positive.
    pub fn bmi(&self) -> f64 {
        match (self.height, self.weight) {
            (Some(height_cm), Some(weight)) if height_cm > 0.0 && weight > 0.0 => {
                let height_m = height_cm / 100.0;
                (weight / (height_m * height_m) * 100.0).round() / 100.0
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTask {
    DietAnalysis,
    ExercisePlanning,
    SleepAdvice,
    KnowledgeQuery,
    General,
}

const TASK_KEYWORDS: &[(HealthTask, &[&str])] = &[
    (HealthTask::DietAnalysis, &["饮食", "吃", "营养", "食谱", "减肥"]),
    (HealthTask::ExercisePlanning, &["运动", "锻炼", "健身", "跑步", "力量"]),
    (HealthTask::SleepAdvice, &["睡眠", "失眠", "作息", "休息", "觉"]),
    (HealthTask::KnowledgeQuery, &["是什么", "怎么办", "如何", "科普", "介绍"]),
];

impl HealthTask {
    /// First task whose keyword list has a hit, checked in declaration order.
    pub fn classify(message: &str) -> Self {
        TASK_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|word| message.contains(word)))
            .map(|(task, _)| *task)
            .unwrap_or(Self::General)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DietAnalysis => "饮食分析",
            Self::ExercisePlanning => "运动规划",
            Self::SleepAdvice => "睡眠建议",
            Self::KnowledgeQuery => "健康知识",
            Self::General => "general",
        }
    }
}

fn or_unknown<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "未提供".to_string())
}

fn list_or(value: Option<&Vec<String>>, empty: &str) -> String {
    match value {
        Some(items) if !items.is_empty() => items.join("、"),
        _ => empty.to_string(),
    }
}

fn schedule_text(schedule: Option<&SleepSchedule>) -> String {
    match schedule {
        Some(SleepSchedule {
            bedtime: None,
            wake_time: None,
        })
        | None => "未提供".to_string(),
        Some(schedule) => format!(
            "就寝 {}，起床 {}",
            schedule.bedtime.as_deref().unwrap_or("未提供"),
            schedule.wake_time.as_deref().unwrap_or("未提供")
        ),
    }
}

fn basic_info(profile: &UserProfile) -> String {
    format!(
        "- 年龄：{}\n- 身高：{}\n- 体重：{}\n- BMI：{}",
        or_unknown(profile.age),
        or_unknown(profile.height),
        or_unknown(profile.weight),
        profile.bmi()
    )
}

/// Render the user prompt for `task`.
pub fn render_task_prompt(
    task: HealthTask,
    message: &str,
    profile: &UserProfile,
    context: &str,
) -> String {
    let body = match task {
        HealthTask::DietAnalysis => format!(
            "用户信息：\n{}\n\n饮食记录：\n{}\n\n用户问题：{message}\n\n请基于以上信息进行分析并给出个性化的饮食建议。",
            basic_info(profile),
            list_or(profile.diet_records.as_ref(), "无"),
        ),
        HealthTask::ExercisePlanning => format!(
            "用户基础信息：\n{}\n- 运动目标：{message}\n- 运动禁忌：{}\n\n请基于以上信息制定安全、科学、个性化的运动计划。",
            basic_info(profile),
            profile
                .exercise_contraindications
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or("无"),
        ),
        HealthTask::SleepAdvice => format!(
            "用户睡眠情况：\n- 平均睡眠时间：{}\n- 入睡困难：{}\n- 作息时间：{}\n\n用户问题：{message}\n\n请基于以上信息提供个性化的睡眠改善建议。",
            or_unknown(profile.avg_sleep_hours),
            list_or(profile.sleep_issues.as_ref(), "无"),
            schedule_text(profile.sleep_schedule.as_ref()),
        ),
        HealthTask::KnowledgeQuery => format!(
            "用户问题：{message}\n\n请基于参考知识和专业见解回答用户问题。如果信息不足，可以补充其他相关的专业知识。"
        ),
        HealthTask::General => format!(
            "用户问题：{message}\n\n请提供专业、准确的回答。注意：\n1. 不要给出医疗诊断\n2. 对于需要就医的情况，建议用户及时就医\n3. 保持答复的科学性和可操作性"
        ),
    };
    format!("参考知识：\n{context}\n\n{body}")
}
