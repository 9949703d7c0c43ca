//! Canonical remote payload shapes and their adapters.
//!
//! The backend is inconsistent about field spelling (`title` vs `name`,
//! `favorite_count` vs `likes`, list payloads wrapped in `data` or not).
//! Each endpoint gets exactly one adapter function here that normalizes the
//! raw JSON into the canonical DTO, so nothing downstream ever inspects
//! alternate shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// The primary entity of a detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: u64,
    pub title: String,
    pub summary: String,
    pub price: f64,
    pub rating: f32,
    pub favorite_count: u32,
    pub favorited: bool,
    pub wishlisted: bool,
}

/// A related-list entry (catalog card).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSummary {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub rating: f32,
}

/// One review of a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub author: String,
    pub body: String,
    pub rating: f32,
    pub created_at: Option<DateTime<Utc>>,
}

/// One fetched page of reviews plus its recomputed cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPage {
    pub items: Vec<Review>,
    pub cursor: PaginationCursor,
}

/// Where the sub-resource collection currently stands.
///
/// `page`/`page_size` hold the last values the user requested and are
/// retained across retries; `total` is recomputed from each successful
/// fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// Unwrap the common `{"data": ...}` envelope if present.
fn payload(v: &Value) -> &Value {
    v.get("data").unwrap_or(v)
}

fn str_field<'a>(v: &'a Value, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|n| v.get(*n).and_then(Value::as_str))
}

fn u64_field(v: &Value, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|n| v.get(*n).and_then(Value::as_u64))
}

fn f64_field(v: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| v.get(*n).and_then(Value::as_f64))
}

fn bool_field(v: &Value, names: &[&str]) -> Option<bool> {
    names.iter().find_map(|n| v.get(*n).and_then(Value::as_bool))
}

/// Adapter for `GET /tours/{id}`.
pub fn tour_from_value(v: &Value) -> Result<Tour, ApiError> {
    let v = payload(v);
    let id = u64_field(v, &["id", "tour_id"])
        .ok_or_else(|| ApiError::Decode("tour payload missing id".to_string()))?;
    Ok(Tour {
        id,
        title: str_field(v, &["title", "name"]).unwrap_or_default().to_string(),
        summary: str_field(v, &["summary", "description"])
            .unwrap_or_default()
            .to_string(),
        price: f64_field(v, &["price"]).unwrap_or(0.0),
        rating: f64_field(v, &["rating", "ratings_average"]).unwrap_or(0.0) as f32,
        favorite_count: u64_field(v, &["favorite_count", "likes"]).unwrap_or(0) as u32,
        favorited: bool_field(v, &["favorited", "is_favorite"]).unwrap_or(false),
        wishlisted: bool_field(v, &["wishlisted", "in_wishlist"]).unwrap_or(false),
    })
}

/// Adapter for `GET /tours/{id}/related`.
pub fn tour_list_from_value(v: &Value) -> Result<Vec<TourSummary>, ApiError> {
    let v = payload(v);
    let items = v
        .as_array()
        .or_else(|| v.get("items").and_then(Value::as_array))
        .or_else(|| v.get("tours").and_then(Value::as_array))
        .ok_or_else(|| ApiError::Decode("related tours payload is not a list".to_string()))?;
    Ok(items
        .iter()
        .filter_map(|item| {
            let id = u64_field(item, &["id", "tour_id"])?;
            Some(TourSummary {
                id,
                title: str_field(item, &["title", "name"]).unwrap_or_default().to_string(),
                price: f64_field(item, &["price"]).unwrap_or(0.0),
                rating: f64_field(item, &["rating", "ratings_average"]).unwrap_or(0.0) as f32,
            })
        })
        .collect())
}

/// Adapter for `GET /tours/{id}/reviews?page=..&page_size=..`.
///
/// The requested page/size are carried into the cursor because the response
/// does not always echo them back.
pub fn review_page_from_value(v: &Value, page: u32, page_size: u32) -> Result<ReviewPage, ApiError> {
    let v = payload(v);
    let raw_items = v
        .as_array()
        .or_else(|| v.get("items").and_then(Value::as_array))
        .or_else(|| v.get("reviews").and_then(Value::as_array))
        .ok_or_else(|| ApiError::Decode("review payload is not a list".to_string()))?;

    let items: Vec<Review> = raw_items
        .iter()
        .filter_map(|item| {
            let id = u64_field(item, &["id", "review_id"])?;
            Some(Review {
                id,
                author: str_field(item, &["author", "user", "username"])
                    .unwrap_or("anonymous")
                    .to_string(),
                body: str_field(item, &["body", "text", "review"])
                    .unwrap_or_default()
                    .to_string(),
                rating: f64_field(item, &["rating"]).unwrap_or(0.0) as f32,
                created_at: str_field(item, &["created_at", "createdAt"])
                    .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
            })
        })
        .collect();

    let total = u64_field(v, &["total", "total_count"]).unwrap_or(items.len() as u64);
    Ok(ReviewPage {
        items,
        cursor: PaginationCursor {
            page,
            page_size,
            total,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tour_adapter_normalizes_alternate_spellings() {
        let canonical = json!({
            "id": 7, "title": "Fjord Kayaking", "summary": "Three days on the water",
            "price": 899.0, "rating": 4.7, "favorite_count": 41, "favorited": true,
        });
        let legacy = json!({
            "data": {
                "tour_id": 7, "name": "Fjord Kayaking", "description": "Three days on the water",
                "price": 899.0, "ratings_average": 4.7, "likes": 41, "is_favorite": true,
            }
        });

        let a = tour_from_value(&canonical).unwrap();
        let b = tour_from_value(&legacy).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.title, "Fjord Kayaking");
        assert_eq!(a.favorite_count, 41);
        assert!(a.favorited);
        assert!(!a.wishlisted);
    }

    #[test]
    fn tour_adapter_requires_an_id() {
        let err = tour_from_value(&json!({"title": "No id"})).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn tour_list_accepts_bare_and_wrapped_arrays() {
        let bare = json!([{"id": 1, "title": "A", "price": 10.0, "rating": 4.0}]);
        let wrapped = json!({"data": {"tours": [{"id": 1, "name": "A", "price": 10.0, "rating": 4.0}]}});
        assert_eq!(
            tour_list_from_value(&bare).unwrap(),
            tour_list_from_value(&wrapped).unwrap()
        );
    }

    #[test]
    fn review_page_recomputes_cursor_and_keeps_requested_page() {
        let body = json!({
            "reviews": [
                {"id": 1, "author": "mira", "body": "great", "rating": 5.0},
                {"id": 2, "user": "petr", "text": "fine", "rating": 3.5},
            ],
            "total_count": 23,
        });
        let page = review_page_from_value(&body, 3, 10).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].author, "petr");
        assert_eq!(page.cursor.page, 3);
        assert_eq!(page.cursor.page_size, 10);
        assert_eq!(page.cursor.total, 23);
    }

    #[test]
    fn review_page_falls_back_to_item_count_for_total() {
        let body = json!({"items": [{"id": 9, "rating": 4.0}]});
        let page = review_page_from_value(&body, 1, 10).unwrap();
        assert_eq!(page.cursor.total, 1);
        assert_eq!(page.items[0].author, "anonymous");
    }
}
