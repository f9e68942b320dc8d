use config::SanitizerConfig;

use super::TextSanitizer;

/// 敏感词规则
#[derive(Debug, Clone, PartialEq)]
pub struct ProfanityRules {
    /// 只在完整单词边界上匹配
    pub standalone_words: Vec<String>,
    /// 任意位置匹配，包括单词内部
    pub substring_words: Vec<String>,
    /// 被白名单词完整覆盖的命中不屏蔽
    pub whitelist_words: Vec<String>,
    pub preserve_length: bool,
    pub mask_char: char,
    pub mask_width: usize,
}

impl Default for ProfanityRules {
    fn default() -> Self {
        Self {
            standalone_words: Vec::new(),
            substring_words: Vec::new(),
            whitelist_words: Vec::new(),
            preserve_length: true,
            mask_char: '*',
            mask_width: 4,
        }
    }
}

impl From<&SanitizerConfig> for ProfanityRules {
    fn from(config: &SanitizerConfig) -> Self {
        Self {
            standalone_words: config.standalone_words.clone(),
            substring_words: config.substring_words.clone(),
            whitelist_words: config.whitelist_words.clone(),
            preserve_length: config.preserve_length,
            mask_char: config.mask_char,
            mask_width: config.mask_width,
        }
    }
}

/// 敏感词屏蔽（大小写不敏感）。
///
/// 一次扫描收集两类匹配的命中区间，去掉被白名单覆盖的部分后，
/// 相邻或重叠的区间合并成一段再整体替换，所以 `shitshit` 会变成连续的 8 个屏蔽字符。
/// 未命中的文本原样保留（包括大小写和空白）。
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    standalone: Vec<Vec<char>>,
    substring: Vec<Vec<char>>,
    whitelist: Vec<Vec<char>>,
    preserve_length: bool,
    mask_char: char,
    mask_width: usize,
}

impl ProfanityFilter {
    pub fn new(rules: ProfanityRules) -> Self {
        Self {
            standalone: fold_words(&rules.standalone_words),
            substring: fold_words(&rules.substring_words),
            whitelist: fold_words(&rules.whitelist_words),
            preserve_length: rules.preserve_length,
            mask_char: rules.mask_char,
            mask_width: rules.mask_width,
        }
    }

    fn banned_positions(&self, folded: &[char]) -> Vec<bool> {
        let exempt: Vec<(usize, usize)> = self
            .whitelist
            .iter()
            .flat_map(|word| occurrences(folded, word).map(move |start| (start, start + word.len())))
            .collect();

        let mut banned = vec![false; folded.len()];
        let mut flag = |start: usize, end: usize| {
            let covered = exempt.iter().any(|&(ws, we)| ws <= start && end <= we);
            if !covered {
                banned[start..end].iter_mut().for_each(|slot| *slot = true);
            }
        };

        for word in &self.substring {
            for start in occurrences(folded, word) {
                flag(start, start + word.len());
            }
        }

        for word in &self.standalone {
            for start in occurrences(folded, word) {
                let end = start + word.len();
                if is_word_boundary(folded, start, end) {
                    flag(start, end);
                }
            }
        }

        banned
    }

    fn mask(&self, span_len: usize) -> impl Iterator<Item = char> {
        let width = if self.preserve_length {
            span_len
        } else {
            self.mask_width
        };
        std::iter::repeat(self.mask_char).take(width)
    }
}

impl TextSanitizer for ProfanityFilter {
    fn name(&self) -> &'static str {
        "profanity"
    }

    fn sanitize(&self, text: &str) -> String {
        if self.standalone.is_empty() && self.substring.is_empty() {
            return text.to_owned();
        }

        let original: Vec<char> = text.chars().collect();
        let folded: Vec<char> = original.iter().copied().map(fold_char).collect();
        let banned = self.banned_positions(&folded);
        if !banned.contains(&true) {
            return text.to_owned();
        }

        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < original.len() {
            if !banned[i] {
                out.push(original[i]);
                i += 1;
                continue;
            }
            let start = i;
            while i < original.len() && banned[i] {
                i += 1;
            }
            out.extend(self.mask(i - start));
        }
        out
    }
}

// 逐字符折叠大小写，保证折叠前后字符位置一一对应
fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn fold_words(words: &[String]) -> Vec<Vec<char>> {
    words
        .iter()
        .map(|word| word.trim().chars().map(fold_char).collect::<Vec<_>>())
        .filter(|word| !word.is_empty())
        .collect()
}

fn occurrences<'a>(haystack: &'a [char], needle: &'a [char]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(move |(_, window)| *window == needle)
        .map(|(start, _)| start)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_boundary(text: &[char], start: usize, end: usize) -> bool {
    let before = start == 0 || !is_word_char(text[start - 1]);
    let after = end == text.len() || !is_word_char(text[end]);
    before && after
}
