use crate::models::{MatchOrigin, ScoredResult};

/// Score at or above which a keyword match skips the vector path.
pub const HIGH_QUALITY_SCORE: u32 = 2;

const KEYWORD_WEIGHT: u32 = 2;
const TOKEN_WEIGHT: u32 = 1;
const MIN_TOKEN_CHARS: usize = 3;

/// A curated topic matched by keywords instead of embeddings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTopic {
    pub content: String,
    pub source: String,
    pub keywords: Vec<String>,
}

impl KeywordTopic {
    pub fn new(content: &str, source: &str, keywords: &[&str]) -> Self {
        Self {
            content: content.to_string(),
            source: source.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// +2 per keyword contained in the lower-cased query, +1 per query token
    /// of three or more characters found in the content.
    pub fn score(&self, query: &str) -> u32 {
        let query_lower = query.to_lowercase();
        let content_lower = self.content.to_lowercase();

        let keyword_hits = self
            .keywords
            .iter()
            .filter(|keyword| query_lower.contains(keyword.as_str()))
            .count() as u32;
        let token_hits = query_lower
            .split_whitespace()
            .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
            .filter(|token| content_lower.contains(token))
            .count() as u32;

        keyword_hits * KEYWORD_WEIGHT + token_hits * TOKEN_WEIGHT
    }
}

const BUILTIN_TOPICS: &[(&str, &str, &[&str])] = &[
    (
        "健康饮食应该包含多样化的食物，包括蔬菜、水果、全谷物、瘦肉蛋白和健康脂肪。建议每天摄入5-9份蔬菜和水果，选择全谷物而非精制谷物，限制加工食品和高糖食品的摄入。均衡的营养摄入有助于维持健康体重、增强免疫力、预防慢性疾病。",
        "营养指南",
        &[
            "饮食", "营养", "蔬菜", "水果", "健康食品", "均衡", "维生素", "吃什么", "怎么吃",
            "吃才", "食物", "膳食",
        ],
    ),
    (
        "规律运动对健康至关重要。成年人每周应进行至少150分钟中等强度有氧运动，或75分钟高强度有氧运动，同时每周进行2次或以上肌肉强化活动。运动可以改善心血管健康、增强免疫力、控制体重、改善心情、增强骨密度。",
        "运动指南",
        &["运动", "锻炼", "有氧", "肌肉", "健身", "体重", "心血管", "骨密度"],
    ),
    (
        "良好的睡眠对健康不可或缺。成年人每晚需要7-9小时的优质睡眠。保持规律的作息时间、创造舒适的睡眠环境、避免睡前使用电子设备、限制咖啡因摄入都有助于改善睡眠质量。充足的睡眠有助于记忆巩固、免疫系统恢复、情绪调节。",
        "睡眠指南",
        &["睡眠", "作息", "失眠", "休息", "睡眠质量", "记忆", "免疫", "情绪"],
    ),
    (
        "心理健康同样重要。管理压力、保持社交联系、培养兴趣爱好、寻求专业帮助都是维护心理健康的有效方法。冥想、深呼吸、瑜伽等放松技巧可以帮助缓解压力和焦虑。保持积极的心态和良好的人际关系对心理健康至关重要。",
        "心理健康指南",
        &["心理", "压力", "焦虑", "冥想", "放松", "情绪", "社交", "人际关系"],
    ),
    (
        "定期体检和健康监测有助于早期发现和预防疾病。建议成年人每年进行一次全面体检，包括血压、血糖、胆固醇检查。女性应定期进行乳腺和宫颈癌筛查，男性应关注前列腺健康。预防胜于治疗，早期发现问题可以大大提高治疗效果。",
        "预防医学指南",
        &["体检", "预防", "筛查", "血压", "血糖", "胆固醇", "癌症", "早期发现"],
    ),
    (
        "水分摄入对健康至关重要。成年人每天应饮用8-10杯水（约2-2.5升）。充足的水分有助于维持体温、润滑关节、运输营养物质、排除废物。运动时或炎热天气下需要增加水分摄入。避免过量饮用含糖饮料和酒精。",
        "水分补充指南",
        &["水分", "饮水", "补水", "脱水", "体温", "关节", "营养", "废物"],
    ),
];

/// The six built-in health topics.
pub fn builtin_topics() -> Vec<KeywordTopic> {
    BUILTIN_TOPICS
        .iter()
        .map(|(content, source, keywords)| KeywordTopic::new(content, source, keywords))
        .collect()
}

/// Zero-latency matcher over a fixed topic list.
#[derive(Debug, Clone)]
pub struct KeywordPrefilter {
    topics: Vec<KeywordTopic>,
}

impl KeywordPrefilter {
    pub fn new(topics: Vec<KeywordTopic>) -> Self {
        Self { topics }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_topics())
    }

    pub fn topics(&self) -> &[KeywordTopic] {
        &self.topics
    }

    /// Topics with a positive score, best first (ties keep topic order), at most `k`.
    pub fn match_query(&self, query: &str, k: usize) -> Vec<ScoredResult> {
        let mut scored: Vec<(u32, &KeywordTopic)> = self
            .topics
            .iter()
            .map(|topic| (topic.score(query), topic))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(k)
            .map(|(score, topic)| ScoredResult {
                content: topic.content.clone(),
                similarity: score as f32,
                source: Some(topic.source.clone()),
                origin: MatchOrigin::Keyword,
            })
            .collect()
    }
}

impl Default for KeywordPrefilter {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Whether a keyword result is good enough to return without vector search.
pub fn is_high_quality(results: &[ScoredResult]) -> bool {
    results
        .first()
        .is_some_and(|top| top.similarity >= HIGH_QUALITY_SCORE as f32)
}
