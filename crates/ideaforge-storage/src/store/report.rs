use anyhow::Result;
use chrono::Utc;
use ideaforge_common::types::{CreateReportRequest, ReportFilter, ReportRow};
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde_json::{Map, Value};

use crate::entities::report::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::ReportStore;

const MAX_SQL_OFFSET: u64 = i64::MAX as u64;

fn model_to_report(m: report::Model) -> ReportRow {
    ReportRow {
        id: m.id,
        user_id: m.user_id,
        title: m.title,
        description: m.description,
        industry: m.industry,
        target_market: m.target_market,
        region: m.region,
        analysis_json: m.analysis_json,
        tam: m.tam,
        sam: m.sam,
        som: m.som,
        investment_score: m.investment_score,
        tech_budget: m.tech_budget,
        tech_timeline: m.tech_timeline,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn owned_by(id: &str, user_id: &str) -> Condition {
    Condition::all()
        .add(Column::Id.eq(id))
        .add(Column::UserId.eq(user_id))
}

/// `%needle%` with LIKE wildcards in the needle taken literally.
fn contains_pattern(needle: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

fn apply_filter(mut q: Select<Entity>, user_id: &str, filter: &ReportFilter) -> Select<Entity> {
    q = q.filter(Column::UserId.eq(user_id));
    if let Some(industry) = filter.industry.as_deref() {
        q = q.filter(Column::Industry.eq(industry));
    }
    if let Some(region) = filter.region.as_deref() {
        q = q.filter(Column::Region.eq(region));
    }
    if let Some(search) = filter.search.as_deref() {
        q = q.filter(
            Condition::any()
                .add(Column::Title.like(contains_pattern(search)))
                .add(Column::Description.like(contains_pattern(search))),
        );
    }
    q
}

impl ReportStore {
    pub async fn insert_report(&self, req: &CreateReportRequest) -> Result<ReportRow> {
        let now = Utc::now().fixed_offset();
        let am = report::ActiveModel {
            id: Set(ideaforge_common::id::next_id()),
            user_id: Set(req.user_id.clone()),
            title: Set(req.idea.title.clone()),
            description: Set(req.idea.description.clone()),
            industry: Set(req.idea.industry.clone()),
            target_market: Set(req.idea.target_market.clone()),
            region: Set(req.idea.region.clone()),
            analysis_json: Set(req.analysis_json.clone()),
            tam: Set(req.metrics.tam),
            sam: Set(req.metrics.sam),
            som: Set(req.metrics.som),
            investment_score: Set(req.metrics.investment_score),
            tech_budget: Set(req.metrics.tech_budget.clone()),
            tech_timeline: Set(req.metrics.tech_timeline.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(self.db()).await?;
        tracing::debug!(report_id = %m.id, user_id = %m.user_id, "Report inserted");
        Ok(model_to_report(m))
    }

    /// Returns the report only if it belongs to `user_id`.
    pub async fn get_report_for_user(&self, id: &str, user_id: &str) -> Result<Option<ReportRow>> {
        let m = Entity::find()
            .filter(owned_by(id, user_id))
            .one(self.db())
            .await?;
        Ok(m.map(model_to_report))
    }

    /// Newest first.
    pub async fn list_reports(
        &self,
        user_id: &str,
        filter: &ReportFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ReportRow>> {
        // SQLite 绑定参数为 i64，超出范围的偏移必然为空页
        if offset > MAX_SQL_OFFSET || limit == 0 {
            return Ok(Vec::new());
        }
        let rows = apply_filter(Entity::find(), user_id, filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .limit(limit.min(MAX_SQL_OFFSET))
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_report).collect())
    }

    pub async fn count_reports(&self, user_id: &str, filter: &ReportFilter) -> Result<u64> {
        Ok(apply_filter(Entity::find(), user_id, filter)
            .count(self.db())
            .await?)
    }

    /// Replaces the stored analysis blob. Returns false when the report does
    /// not exist or is owned by someone else.
    pub async fn update_report_analysis(
        &self,
        id: &str,
        user_id: &str,
        analysis_json: &str,
    ) -> Result<bool> {
        let res = Entity::update_many()
            .col_expr(Column::AnalysisJson, analysis_json.into())
            .col_expr(Column::UpdatedAt, Utc::now().fixed_offset().into())
            .filter(owned_by(id, user_id))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Merges `entries` into the top level of the stored analysis object,
    /// overwriting existing keys, and returns the updated row.
    ///
    /// Fails with [`StorageError::NotFound`] when the report is missing or
    /// not owned by `user_id`.
    pub async fn merge_report_analysis(
        &self,
        id: &str,
        user_id: &str,
        entries: Map<String, Value>,
    ) -> Result<ReportRow> {
        let not_found = || StorageError::NotFound {
            entity: "report",
            id: id.to_string(),
        };

        let m = Entity::find()
            .filter(owned_by(id, user_id))
            .one(self.db())
            .await?
            .ok_or_else(not_found)?;

        let mut blob: Value = serde_json::from_str(&m.analysis_json).map_err(StorageError::from)?;
        let obj = blob.as_object_mut().ok_or(StorageError::NotAnObject {
            column: "analysis_json",
        })?;
        obj.extend(entries);
        let merged = serde_json::to_string(&blob).map_err(StorageError::from)?;

        let mut am: report::ActiveModel = m.into();
        am.analysis_json = Set(merged);
        am.updated_at = Set(Utc::now().fixed_offset());
        let m = am.update(self.db()).await?;
        Ok(model_to_report(m))
    }

    /// Returns false when the report does not exist or is owned by someone else.
    pub async fn delete_report_for_user(&self, id: &str, user_id: &str) -> Result<bool> {
        let res = Entity::delete_many()
            .filter(owned_by(id, user_id))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected > 0)
    }
}
