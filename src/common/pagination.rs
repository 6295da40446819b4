// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Parâmetros de paginação como chegam na query string.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

/// `?q=` dos endpoints de busca.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Paginação já normalizada: page >= 1, 1 <= limit <= 1000.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort_by: None,
            sort_order: None,
        }
    }
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        Self {
            page: query.page.unwrap_or(1).max(1),
            limit: query
                .limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
            sort_by: query.sort_by.filter(|s| !s.trim().is_empty()),
            sort_order: query.sort_order,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        PageQuery {
            page: Some(page),
            limit: Some(limit),
            ..Default::default()
        }
        .into()
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Direção pedida pelo cliente ou a padrão da entidade.
    pub fn order_or(&self, default: SortOrder) -> SortOrder {
        self.sort_order.unwrap_or(default)
    }

    /// Resolve o campo de ordenação contra uma lista permitida.
    /// Campos desconhecidos caem no padrão da entidade.
    pub fn sort_key<'a>(&self, allowed: &[&'a str], default: &'a str) -> &'a str {
        self.sort_by
            .as_deref()
            .and_then(|requested| allowed.iter().copied().find(|a| *a == requested))
            .unwrap_or(default)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit as u64)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Fatia uma lista já filtrada e ordenada (usado pelos repositórios em memória).
pub fn paginate<T>(items: Vec<T>, request: &PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.limit as usize)
        .collect();
    Page {
        items,
        total,
        page: request.page,
        limit: request.limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped_and_page_is_at_least_one() {
        let req: PageRequest = PageQuery {
            page: Some(0),
            limit: Some(5000),
            ..Default::default()
        }
        .into();
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn second_page_slice_keeps_total() {
        let items: Vec<u32> = (0..120).collect();
        let page = paginate(items, &PageRequest::new(2, 50));
        assert_eq!(page.total, 120);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.items.first(), Some(&50));
        assert_eq!(page.items.len(), 50);
    }

    #[test]
    fn unknown_sort_key_falls_back() {
        let mut req = PageRequest::default();
        req.sort_by = Some("drop table".into());
        assert_eq!(req.sort_key(&["name", "createdAt"], "name"), "name");
        req.sort_by = Some("createdAt".into());
        assert_eq!(req.sort_key(&["name", "createdAt"], "name"), "createdAt");
    }
}
