//! 消息净化管道
//!
//! 每条消息在写入前都要依次经过各个净化阶段。每个阶段都是纯函数：
//! 不做 I/O、不会失败，相同输入永远得到相同输出。
//!
//! HTML 阶段必须排在敏感词阶段之前，否则 `sh<b></b>it` 这类标记可以把敏感词拆开躲过匹配。

mod html;
mod profanity;

use config::SanitizerConfig;

pub use html::HtmlSanitizer;
pub use profanity::{ProfanityFilter, ProfanityRules};

/// 单个文本净化阶段
pub trait TextSanitizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn sanitize(&self, text: &str) -> String;
}

/// 按顺序执行的净化阶段列表，整体就是对各阶段的一次 fold
#[derive(Default)]
pub struct SanitizationPipeline {
    stages: Vec<Box<dyn TextSanitizer>>,
}

impl SanitizationPipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_stage(mut self, stage: impl TextSanitizer + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// 标准管道：先 HTML，再敏感词
    pub fn from_config(config: &SanitizerConfig) -> Self {
        Self::new()
            .with_stage(HtmlSanitizer::new(config.blocked_elements.iter()))
            .with_stage(ProfanityFilter::new(ProfanityRules::from(config)))
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn sanitize(&self, text: &str) -> String {
        self.stages
            .iter()
            .fold(text.to_owned(), |acc, stage| stage.sanitize(&acc))
    }
}

impl TextSanitizer for SanitizationPipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn sanitize(&self, text: &str) -> String {
        SanitizationPipeline::sanitize(self, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> SanitizationPipeline {
        SanitizationPipeline::from_config(&SanitizerConfig {
            substring_words: vec!["shit".to_string()],
            ..SanitizerConfig::default()
        })
    }

    #[test]
    fn stages_run_html_first() {
        assert_eq!(pipeline().stage_names(), vec!["html", "profanity"]);
    }

    #[test]
    fn markup_cannot_hide_banned_words() {
        let output = pipeline().sanitize(" <i>shit</i> <script>alert(1)</script> ");

        assert_eq!(output, "****");
        assert!(!output.contains("script"));
        assert!(!output.to_lowercase().contains("shit"));
        assert_eq!(output, output.trim());
    }

    #[test]
    fn split_word_is_rejoined_before_masking() {
        assert_eq!(pipeline().sanitize("oh sh<b></b>it!"), "oh ****!");
    }

    #[test]
    fn empty_and_clean_input_pass_through() {
        let pipeline = pipeline();
        assert_eq!(pipeline.sanitize(""), "");
        assert_eq!(pipeline.sanitize("   "), "");
        assert_eq!(pipeline.sanitize("  Is this still available?  "), "Is this still available?");
    }

    #[test]
    fn empty_pipeline_is_identity() {
        assert_eq!(SanitizationPipeline::new().sanitize(" <b>x</b> "), " <b>x</b> ");
    }
}
