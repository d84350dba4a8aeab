pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Page-number pagination as requested by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    /// Parses the raw `page` / `limit` query values. Blank counts as absent.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, String> {
        Ok(Self {
            page: parse_u64_param("page", page)?,
            limit: parse_u64_param("limit", limit)?,
        })
    }

    /// 页码，最小为 1
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// 每页条数，限制在 1..=100
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// `(page - 1) * limit`，溢出时饱和到 `u64::MAX`（存储层按空页处理）
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

fn parse_u64_param(name: &str, raw: Option<&str>) -> Result<Option<u64>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("{name} must be a non-negative integer")),
    }
}

/// `ceil(total / limit)`; zero when there is nothing to show.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}
