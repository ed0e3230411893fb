//! 文本相似度计算

/// 统一比较口径：去除首尾空白并转小写
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 编辑距离（插入、删除、替换代价均为 1），按 Unicode 字符计算
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // 只保留上一行
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// 归一化相似度 `1 - 距离 / 较长串长度`
///
/// 两串（归一化后）相同记 1，仅一方为空记 0。
pub fn similarity(extracted: &str, expected: &str) -> f64 {
    let a = normalize(extracted);
    let b = normalize(expected);
    if a == b {
        return 1.0;
    }
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / len_a.max(len_b) as f64
}

/// 关键词覆盖情况
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordCoverage {
    /// 按方案顺序列出命中的关键词
    pub found: Vec<String>,
    /// 命中数 / 关键词数，无关键词时为 0
    pub score: f64,
}

/// 统计作答中（忽略大小写）包含的关键词
pub fn keyword_coverage(answer: &str, keywords: &[String]) -> KeywordCoverage {
    if keywords.is_empty() {
        return KeywordCoverage {
            found: Vec::new(),
            score: 0.0,
        };
    }

    let answer = answer.to_lowercase();
    let found: Vec<String> = keywords
        .iter()
        .filter(|k| answer.contains(&k.to_lowercase()))
        .cloned()
        .collect();
    let score = found.len() as f64 / keywords.len() as f64;
    KeywordCoverage { found, score }
}
