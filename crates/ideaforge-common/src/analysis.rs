//! Typed view of the analysis blob.
//!
//! The model returns a loosely structured JSON object. The blob is stored
//! verbatim, and this module re-hydrates it for charts and for the scalar
//! columns copied onto the report row. Every section is read independently,
//! and inside a section a wrong-typed field falls back to its default and a
//! malformed list item is dropped, so one bad value never blanks out its
//! neighbours.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Top-level keys the validation prompt asks the model to return.
pub const ANALYSIS_SECTIONS: [&str; 7] = [
    "marketAnalysis",
    "competitors",
    "swot",
    "risks",
    "businessModel",
    "technology",
    "investmentScore",
];

/// Slide titles of the fixed pitch deck, in presentation order.
pub const PITCH_DECK_SLIDES: [&str; 10] = [
    "Title",
    "Problem",
    "Solution",
    "Market Opportunity",
    "Product",
    "Business Model",
    "Competition",
    "Go-to-Market",
    "Team",
    "Financials & Ask",
];

/// Section keys of the fixed one-pager, in document order.
pub const ONE_PAGER_SECTIONS: [&str; 10] = [
    "companyOverview",
    "problem",
    "solution",
    "targetMarket",
    "businessModel",
    "competitiveAdvantage",
    "marketingStrategy",
    "financialProjections",
    "team",
    "fundingAsk",
];

/// Keys under which generated documents are merged into the analysis blob.
pub const PITCH_DECK_KEY: &str = "pitchDeck";
pub const PITCH_DECK_GENERATED_AT_KEY: &str = "pitchDeckGeneratedAt";
pub const ONE_PAGER_KEY: &str = "onePager";
pub const ONE_PAGER_GENERATED_AT_KEY: &str = "onePagerGeneratedAt";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaAnalysis {
    pub market_analysis: MarketAnalysis,
    pub competitors: Competitors,
    pub swot: Swot,
    pub risks: Vec<Risk>,
    pub business_model: BusinessModel,
    pub technology: TechnologyPlan,
    pub investment_score: InvestmentScore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketAnalysis {
    #[serde(deserialize_with = "de_market_value")]
    pub tam: Option<u64>,
    #[serde(deserialize_with = "de_market_value")]
    pub sam: Option<u64>,
    #[serde(deserialize_with = "de_market_value")]
    pub som: Option<u64>,
    #[serde(deserialize_with = "de_lenient_string")]
    pub growth_rate: String,
    #[serde(deserialize_with = "de_string_list")]
    pub trends: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Competitors {
    #[serde(deserialize_with = "de_lenient_list")]
    pub direct: Vec<Competitor>,
    #[serde(deserialize_with = "de_lenient_list")]
    pub indirect: Vec<Competitor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Competitor {
    #[serde(deserialize_with = "de_lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "de_string_list")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "de_string_list")]
    pub weaknesses: Vec<String>,
    #[serde(deserialize_with = "de_lenient_string")]
    pub market_share: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Swot {
    #[serde(deserialize_with = "de_string_list")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "de_string_list")]
    pub weaknesses: Vec<String>,
    #[serde(deserialize_with = "de_string_list")]
    pub opportunities: Vec<String>,
    #[serde(deserialize_with = "de_string_list")]
    pub threats: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Risk {
    #[serde(deserialize_with = "de_lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub impact: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub probability: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub mitigation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessModel {
    #[serde(deserialize_with = "de_lenient_list")]
    pub revenue_streams: Vec<RevenueStream>,
    #[serde(deserialize_with = "de_lenient_list")]
    pub cost_structure: Vec<CostItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueStream {
    #[serde(deserialize_with = "de_lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub potential: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostItem {
    #[serde(deserialize_with = "de_lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub estimated_cost: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyPlan {
    #[serde(deserialize_with = "de_lenient_list")]
    pub stack: Vec<StackLayer>,
    #[serde(deserialize_with = "de_lenient_list")]
    pub team: Vec<StaffRole>,
    #[serde(deserialize_with = "de_lenient_string")]
    pub budget: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub timeline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackLayer {
    #[serde(deserialize_with = "de_lenient_string")]
    pub layer: String,
    #[serde(deserialize_with = "de_string_list")]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffRole {
    #[serde(deserialize_with = "de_lenient_string")]
    pub role: String,
    #[serde(deserialize_with = "de_lenient_u32")]
    pub count: u32,
    #[serde(deserialize_with = "de_lenient_string")]
    pub responsibilities: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestmentScore {
    #[serde(deserialize_with = "de_score")]
    pub score: Option<u8>,
    #[serde(deserialize_with = "de_lenient_list")]
    pub factors: Vec<ScoreFactor>,
    #[serde(deserialize_with = "de_string_list")]
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct ScoreFactor {
    #[serde(deserialize_with = "de_lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "de_score")]
    pub score: Option<u8>,
    #[serde(deserialize_with = "de_lenient_string")]
    pub weight: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub rationale: String,
}

impl IdeaAnalysis {
    /// Best-effort re-hydration of a stored or freshly parsed blob.
    pub fn from_value(value: &Value) -> Self {
        Self {
            market_analysis: section(value, "marketAnalysis"),
            competitors: section(value, "competitors"),
            swot: section(value, "swot"),
            risks: value.get("risks").map(lenient_list).unwrap_or_default(),
            business_model: section(value, "businessModel"),
            technology: section(value, "technology"),
            investment_score: section(value, "investmentScore"),
        }
    }

    /// Scalars copied onto the report row for filtering and sorting.
    pub fn metrics(&self) -> ReportMetrics {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        ReportMetrics {
            tam: self.market_analysis.tam.map(saturating_i64),
            sam: self.market_analysis.sam.map(saturating_i64),
            som: self.market_analysis.som.map(saturating_i64),
            investment_score: self.investment_score.score.map(i32::from),
            tech_budget: non_empty(&self.technology.budget),
            tech_timeline: non_empty(&self.technology.timeline),
        }
    }

    /// Aggregates consumed by the dashboard charts.
    pub fn chart_view(&self) -> ChartView {
        let market = &self.market_analysis;
        let market_size = [("TAM", market.tam), ("SAM", market.sam), ("SOM", market.som)]
            .into_iter()
            .filter_map(|(label, value)| {
                value.map(|v| ChartPoint {
                    label: label.to_string(),
                    value: v.to_string(),
                })
            })
            .collect();

        ChartView {
            market_size,
            trends: market.trends.clone(),
            competitor_counts: CompetitorCounts {
                direct: self.competitors.direct.len(),
                indirect: self.competitors.indirect.len(),
            },
            swot_counts: SwotCounts {
                strengths: self.swot.strengths.len(),
                weaknesses: self.swot.weaknesses.len(),
                opportunities: self.swot.opportunities.len(),
                threats: self.swot.threats.len(),
            },
            risk_matrix: risk_matrix(&self.risks),
            investment_score: self.investment_score.score,
            score_factors: self.investment_score.factors.clone(),
        }
    }
}

fn section<T: DeserializeOwned + Default>(value: &Value, key: &str) -> T {
    value
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn saturating_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Scalar fields duplicated from the blob into report columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReportMetrics {
    pub tam: Option<i64>,
    pub sam: Option<i64>,
    pub som: Option<i64>,
    /// 0..=100
    pub investment_score: Option<i32>,
    pub tech_budget: Option<String>,
    pub tech_timeline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ChartView {
    /// 市场规模（TAM/SAM/SOM），大整数以字符串返回
    pub market_size: Vec<ChartPoint>,
    pub trends: Vec<String>,
    pub competitor_counts: CompetitorCounts,
    pub swot_counts: SwotCounts,
    pub risk_matrix: Vec<RiskCell>,
    pub investment_score: Option<u8>,
    pub score_factors: Vec<ScoreFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ChartPoint {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct CompetitorCounts {
    pub direct: usize,
    pub indirect: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SwotCounts {
    pub strengths: usize,
    pub weaknesses: usize,
    pub opportunities: usize,
    pub threats: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct RiskCell {
    pub impact: String,
    pub probability: String,
    pub count: usize,
}

/// Normalized impact/probability rating of a risk entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskRating {
    High,
    Medium,
    Low,
    Unknown,
}

impl RiskRating {
    pub const ALL: [RiskRating; 4] = [Self::High, Self::Medium, Self::Low, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for RiskRating {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "high" | "very high" | "critical" => Self::High,
            "medium" | "moderate" => Self::Medium,
            "low" | "very low" => Self::Low,
            _ => Self::Unknown,
        })
    }
}

fn risk_matrix(risks: &[Risk]) -> Vec<RiskCell> {
    let rate = |s: &str| s.parse::<RiskRating>().unwrap_or(RiskRating::Unknown);
    let mut cells = Vec::new();
    for impact in RiskRating::ALL {
        for probability in RiskRating::ALL {
            let count = risks
                .iter()
                .filter(|r| rate(&r.impact) == impact && rate(&r.probability) == probability)
                .count();
            if count > 0 {
                cells.push(RiskCell {
                    impact: impact.as_str().to_string(),
                    probability: probability.as_str().to_string(),
                    count,
                });
            }
        }
    }
    cells
}

/// Fixed ten-slide pitch deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PitchDeck {
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Slide {
    #[serde(deserialize_with = "de_lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "de_lenient_string")]
    pub content: String,
    #[serde(deserialize_with = "de_string_list")]
    pub bullet_points: Vec<String>,
    #[serde(deserialize_with = "de_lenient_string")]
    pub speaker_notes: String,
}

/// Fixed ten-section one-pager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnePager {
    pub company_overview: String,
    pub problem: String,
    pub solution: String,
    pub target_market: String,
    pub business_model: String,
    pub competitive_advantage: String,
    pub marketing_strategy: String,
    pub financial_projections: String,
    pub team: String,
    pub funding_ask: String,
}

/// Parses a market-size figure the way models tend to write them:
/// `5000000000`, `"5000000000"`, `"$5,000,000,000"`, `"5.2B"`, `"12 million"`.
///
/// # Examples
///
/// ```
/// use ideaforge_common::analysis::parse_market_value;
/// use serde_json::json;
///
/// assert_eq!(parse_market_value(&json!(1500)), Some(1500));
/// assert_eq!(parse_market_value(&json!("$2.5B")), Some(2_500_000_000));
/// assert_eq!(parse_market_value(&json!("unknown")), None);
/// ```
pub fn parse_market_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => parse_market_str(s),
        _ => None,
    }
}

fn parse_market_str(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_' | ' ' | '€' | '£'))
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    let (number, multiplier) = [
        ("trillion", 1e12),
        ("billion", 1e9),
        ("million", 1e6),
        ("thousand", 1e3),
        ("t", 1e12),
        ("b", 1e9),
        ("m", 1e6),
        ("k", 1e3),
    ]
    .iter()
    .find_map(|(suffix, mult)| cleaned.strip_suffix(suffix).map(|n| (n, *mult)))
    .unwrap_or((cleaned.as_str(), 1.0));

    let parsed: f64 = number.parse().ok()?;
    let scaled = parsed * multiplier;
    (scaled.is_finite() && scaled >= 0.0 && scaled < u64::MAX as f64).then(|| scaled.round() as u64)
}

fn de_market_value<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_market_value(&value))
}

fn de_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("/100").trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw
        .filter(|f| f.is_finite())
        .map(|f| f.round().clamp(0.0, 100.0) as u8))
}

fn de_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Text of a list item: strings as-is, objects by their most telling field.
fn list_item_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(map) => {
            let named = ["name", "title", "text", "description"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str).map(str::to_string));
            Some(named.unwrap_or_else(|| Value::Object(map).to_string()))
        }
        other => Some(other.to_string()),
    }
}

/// Array items that fail to parse as `T` are dropped; a non-array is empty.
fn lenient_list<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn de_lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_list(&value))
}

fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().filter_map(list_item_text).collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn de_lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().map(|v| v.min(u32::MAX as u64) as u32).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
