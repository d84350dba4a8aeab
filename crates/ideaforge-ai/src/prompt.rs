use crate::analyzer::ReportContext;
use ideaforge_common::analysis::{IdeaAnalysis, ONE_PAGER_SECTIONS, PITCH_DECK_SLIDES};
use ideaforge_common::types::IdeaSubmission;

pub const ANALYST_SYSTEM_PROMPT: &str = "You are a senior venture analyst who evaluates startup ideas. \
Respond with a single valid JSON object and nothing else.";

pub const PITCH_DECK_SYSTEM_PROMPT: &str = "You are a pitch coach who writes concise investor decks. \
Respond with a single valid JSON object and nothing else.";

pub const ONE_PAGER_SYSTEM_PROMPT: &str = "You are a startup advisor who writes executive one-page summaries. \
Respond with a single valid JSON object and nothing else.";

const NOT_SPECIFIED: &str = "Not specified";

/// Prompt for the initial idea validation.
pub fn build_validation_prompt(idea: &IdeaSubmission) -> String {
    fill_idea(VALIDATION_PROMPT, idea, &[])
}

/// Prompt for the ten-slide pitch deck of an existing report.
pub fn build_pitch_deck_prompt(ctx: &ReportContext) -> String {
    let slide_list = PITCH_DECK_SLIDES
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n");

    let summary = summarize_analysis(&ctx.analysis);
    fill_idea(
        PITCH_DECK_PROMPT,
        &ctx.idea,
        &[("ANALYSIS_SUMMARY", &summary), ("SLIDE_LIST", &slide_list)],
    )
}

/// Prompt for the ten-section one-pager of an existing report.
pub fn build_one_pager_prompt(ctx: &ReportContext) -> String {
    let section_list = ONE_PAGER_SECTIONS
        .iter()
        .map(|key| format!("  \"{key}\": \"string\""))
        .collect::<Vec<_>>()
        .join(",\n");

    let summary = summarize_analysis(&ctx.analysis);
    fill_idea(
        ONE_PAGER_PROMPT,
        &ctx.idea,
        &[("ANALYSIS_SUMMARY", &summary), ("SECTION_LIST", &section_list)],
    )
}

fn fill_idea(template: &str, idea: &IdeaSubmission, extra: &[(&str, &str)]) -> String {
    let target_market = idea
        .target_market
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_SPECIFIED);

    let mut vars = vec![
        ("TITLE", idea.title.trim()),
        ("DESCRIPTION", idea.description.trim()),
        ("INDUSTRY", idea.industry.trim()),
        ("TARGET_MARKET", target_market),
        ("REGION", idea.region.trim()),
    ];
    vars.extend_from_slice(extra);
    render(template, &vars)
}

/// Single-pass `{{NAME}}` substitution. Inserted text is never re-scanned and
/// unknown placeholders are kept verbatim.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Compact digest of a stored analysis for follow-up prompts.
fn summarize_analysis(analysis: &IdeaAnalysis) -> String {
    let figure = |v: Option<u64>| v.map_or("unknown".to_string(), |n| format!("${n}"));
    let top = |items: &[String]| {
        if items.is_empty() {
            "none listed".to_string()
        } else {
            items.iter().take(3).cloned().collect::<Vec<_>>().join("; ")
        }
    };

    let market = &analysis.market_analysis;
    let risks: Vec<String> = analysis
        .risks
        .iter()
        .map(|r| {
            if r.description.is_empty() {
                r.category.clone()
            } else {
                r.description.clone()
            }
        })
        .collect();
    let revenue: Vec<String> = analysis
        .business_model
        .revenue_streams
        .iter()
        .map(|s| s.name.clone())
        .collect();
    let competitors: Vec<String> = analysis
        .competitors
        .direct
        .iter()
        .map(|c| c.name.clone())
        .collect();

    let mut out = String::new();
    out.push_str(&format!(
        "- Market size: TAM {}, SAM {}, SOM {}\n",
        figure(market.tam),
        figure(market.sam),
        figure(market.som)
    ));
    out.push_str(&format!(
        "- Investment score: {}\n",
        analysis
            .investment_score
            .score
            .map_or("unknown".to_string(), |s| format!("{s}/100"))
    ));
    out.push_str(&format!("- Key strengths: {}\n", top(&analysis.swot.strengths)));
    out.push_str(&format!("- Key risks: {}\n", top(&risks)));
    out.push_str(&format!("- Revenue streams: {}\n", top(&revenue)));
    out.push_str(&format!("- Direct competitors: {}", top(&competitors)));
    out
}

const VALIDATION_PROMPT: &str = r#"Analyze the following startup idea and produce an investor-grade validation report.

Idea title: {{TITLE}}
Description: {{DESCRIPTION}}
Industry: {{INDUSTRY}}
Target market: {{TARGET_MARKET}}
Region: {{REGION}}

Return ONLY a JSON object with exactly this structure:
{
  "marketAnalysis": {
    "tam": number (total addressable market in USD, integer),
    "sam": number (serviceable addressable market in USD, integer),
    "som": number (serviceable obtainable market in USD, integer),
    "growthRate": "string, e.g. 12% CAGR",
    "trends": ["string"]
  },
  "competitors": {
    "direct": [{"name": "string", "description": "string", "strengths": ["string"], "weaknesses": ["string"], "marketShare": "string"}],
    "indirect": [{"name": "string", "description": "string", "strengths": ["string"], "weaknesses": ["string"], "marketShare": "string"}]
  },
  "swot": {
    "strengths": ["string"],
    "weaknesses": ["string"],
    "opportunities": ["string"],
    "threats": ["string"]
  },
  "risks": [
    {"category": "string", "description": "string", "impact": "high|medium|low", "probability": "high|medium|low", "mitigation": "string"}
  ],
  "businessModel": {
    "revenueStreams": [{"name": "string", "description": "string", "potential": "high|medium|low"}],
    "costStructure": [{"category": "string", "description": "string", "estimatedCost": "string"}]
  },
  "technology": {
    "stack": [{"layer": "string", "technologies": ["string"]}],
    "team": [{"role": "string", "count": number, "responsibilities": "string"}],
    "budget": "string, estimated initial technology budget in USD",
    "timeline": "string, estimated time to MVP"
  },
  "investmentScore": {
    "score": number between 0 and 100,
    "factors": [{"name": "string", "score": number between 0 and 100, "weight": number, "rationale": "string"}],
    "improvements": ["string"]
  }
}

Use realistic figures for the given region and industry. Do not wrap the JSON in markdown."#;

const PITCH_DECK_PROMPT: &str = r#"Write an investor pitch deck for the following startup.

Idea title: {{TITLE}}
Description: {{DESCRIPTION}}
Industry: {{INDUSTRY}}
Target market: {{TARGET_MARKET}}
Region: {{REGION}}

Validation findings:
{{ANALYSIS_SUMMARY}}

The deck must have exactly 10 slides, in this order:
{{SLIDE_LIST}}

Return ONLY a JSON object with this structure:
{
  "slides": [
    {"title": "string", "content": "string", "bulletPoints": ["string"], "speakerNotes": "string"}
  ]
}

Keep each slide to at most 5 bullet points. Do not wrap the JSON in markdown."#;

const ONE_PAGER_PROMPT: &str = r#"Write a one-page executive summary for the following startup.

Idea title: {{TITLE}}
Description: {{DESCRIPTION}}
Industry: {{INDUSTRY}}
Target market: {{TARGET_MARKET}}
Region: {{REGION}}

Validation findings:
{{ANALYSIS_SUMMARY}}

Return ONLY a JSON object with exactly these 10 keys, each a short paragraph of plain text:
{
{{SECTION_LIST}}
}

Do not wrap the JSON in markdown."#;
