use crate::error::{AiError, Result};
use crate::extract::{parse_json_object, Shape};
use crate::prompt;
use async_trait::async_trait;
use ideaforge_common::analysis::{IdeaAnalysis, OnePager, PitchDeck, ReportMetrics};
use ideaforge_common::types::IdeaSubmission;
use serde_json::Value;

/// What a completion is for. Selects the system prompt and lets test
/// doubles script replies per document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    Analysis,
    PitchDeck,
    OnePager,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::PitchDeck => "pitch_deck",
            Self::OnePager => "one_pager",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Analysis => prompt::ANALYST_SYSTEM_PROMPT,
            Self::PitchDeck => prompt::PITCH_DECK_SYSTEM_PROMPT,
            Self::OnePager => prompt::ONE_PAGER_SYSTEM_PROMPT,
        }
    }

    fn shape(&self) -> Shape {
        match self {
            Self::Analysis => Shape::Analysis,
            Self::PitchDeck => Shape::PitchDeck,
            Self::OnePager => Shape::OnePager,
        }
    }
}

/// One chat completion: a system message plus a single user prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub purpose: Purpose,
    pub system: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(purpose: Purpose, prompt: String) -> Self {
        Self {
            purpose,
            system: purpose.system_prompt().to_string(),
            prompt,
        }
    }
}

/// Stored report fields needed to generate follow-up documents.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub idea: IdeaSubmission,
    pub analysis: IdeaAnalysis,
}

/// 创意分析结果
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Parsed object exactly as the model returned it.
    pub raw: Value,
    pub analysis: IdeaAnalysis,
    pub metrics: ReportMetrics,
}

/// AI 分析器 trait（支持多模型扩展）
///
/// Implementors supply the transport in [`IdeaAnalyzer::complete`]; the
/// prompt and parsing pipeline comes from the provided methods.
#[async_trait]
pub trait IdeaAnalyzer: Send + Sync {
    /// 模型提供商名称
    fn provider(&self) -> &str;

    /// 模型名称
    fn model_name(&self) -> &str;

    /// Sends one completion and returns the assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// 分析创意，生成验证报告
    async fn analyze_idea(&self, idea: &IdeaSubmission) -> Result<AnalysisOutcome> {
        let raw = self
            .run(Purpose::Analysis, prompt::build_validation_prompt(idea))
            .await?;
        let analysis = IdeaAnalysis::from_value(&raw);
        let metrics = analysis.metrics();
        Ok(AnalysisOutcome {
            raw,
            analysis,
            metrics,
        })
    }

    /// 生成 10 页路演 PPT
    async fn generate_pitch_deck(&self, ctx: &ReportContext) -> Result<PitchDeck> {
        let raw = self
            .run(Purpose::PitchDeck, prompt::build_pitch_deck_prompt(ctx))
            .await?;
        serde_json::from_value(raw).map_err(AiError::from)
    }

    /// 生成一页纸摘要
    async fn generate_one_pager(&self, ctx: &ReportContext) -> Result<OnePager> {
        let raw = self
            .run(Purpose::OnePager, prompt::build_one_pager_prompt(ctx))
            .await?;
        serde_json::from_value(raw).map_err(AiError::from)
    }

    #[doc(hidden)]
    async fn run(&self, purpose: Purpose, prompt: String) -> Result<Value> {
        tracing::info!(
            provider = self.provider(),
            model = self.model_name(),
            purpose = purpose.as_str(),
            prompt_length = prompt.len(),
            "Requesting completion"
        );
        let reply = self.complete(CompletionRequest::new(purpose, prompt)).await?;
        parse_json_object(&reply, purpose.shape()).inspect_err(|e| {
            tracing::warn!(
                purpose = purpose.as_str(),
                reply_length = reply.len(),
                error = %e,
                "Model reply could not be parsed"
            );
        })
    }
}
