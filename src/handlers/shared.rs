use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: Option<T>, message: &str) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.to_string()),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

/// A state-guarded operation declined to run; nothing changed. Surfaced as
/// 409 with the warning in the envelope.
pub fn blocked_response(message: &str) -> HttpResponse {
    HttpResponse::Conflict().json(ApiResponse::<()>::error(message))
}

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// (limit, offset) from 1-based `page`/`per_page` query params.
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    (per_page, (page - 1) * per_page)
}

/// List filters use `all` as the explicit "no filter" choice.
pub fn parse_choice<T: std::str::FromStr>(value: &Option<String>) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    match value.as_deref() {
        None | Some("all") | Some("") => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ApplicationStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn page_bounds_default_to_first_page_of_ten() {
        assert_eq!(page_bounds(None, None), (10, 0));
        assert_eq!(page_bounds(Some(3), None), (10, 20));
        assert_eq!(page_bounds(Some(2), Some(25)), (25, 25));
        assert_eq!(page_bounds(Some(0), Some(1000)), (100, 0));
    }

    #[test]
    fn choice_parsing_treats_all_as_no_filter() {
        assert_eq!(
            parse_choice::<ApplicationStatus>(&Some("all".to_string())).unwrap(),
            None
        );
        assert_eq!(
            parse_choice::<ApplicationStatus>(&Some("approved".to_string())).unwrap(),
            Some(ApplicationStatus::Approved)
        );
        assert!(parse_choice::<ApplicationStatus>(&Some("bogus".to_string())).is_err());
    }
}
