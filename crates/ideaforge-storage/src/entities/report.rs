use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub industry: String,
    pub target_market: Option<String>,
    pub region: String,
    /// 模型返回的原始 JSON（含后续合并的 pitchDeck / onePager）
    #[sea_orm(column_type = "Text")]
    pub analysis_json: String,
    pub tam: Option<i64>,
    pub sam: Option<i64>,
    pub som: Option<i64>,
    pub investment_score: Option<i32>,
    pub tech_budget: Option<String>,
    pub tech_timeline: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
