//! Serde-deserializable types matching catalog API responses.
//!
//! These types are separate from the stored entities: every field is optional
//! on the wire, and mapping to entities fills in safe defaults.

use serde::Deserialize;

/// Paginated list envelope.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Page<T> {
  #[serde(default)]
  pub count: u64,
  pub next: Option<String>,
  pub previous: Option<String>,
  #[serde(default = "Vec::new")]
  pub results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ApiSet {
  pub set_num: Option<String>,
  pub name: Option<String>,
  pub year: Option<i32>,
  pub theme_id: Option<i64>,
  pub num_parts: Option<i32>,
  pub set_img_url: Option<String>,
  pub set_url: Option<String>,
  pub last_modified_dt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ApiTheme {
  pub id: Option<i64>,
  pub name: Option<String>,
  pub parent_id: Option<i64>,
}

/// Filters for the set list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetQuery {
  pub page: Option<u32>,
  pub page_size: Option<u32>,
  pub ordering: Option<String>,
  pub theme_id: Option<i64>,
  pub min_year: Option<i32>,
  pub max_year: Option<i32>,
  pub min_parts: Option<i32>,
  pub max_parts: Option<i32>,
  pub search: Option<String>,
}

/// Filters for the theme list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeQuery {
  pub page: Option<u32>,
  pub page_size: Option<u32>,
  pub ordering: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_set_page() {
    let json = r#"{
      "count": 2,
      "next": "https://rebrickable.com/api/v3/lego/sets/?page=2",
      "previous": null,
      "results": [
        {"set_num": "10030-1", "name": "Imperial Star Destroyer", "year": 2002,
         "theme_id": 174, "num_parts": 3115, "set_img_url": null,
         "set_url": "https://rebrickable.com/sets/10030-1/", "last_modified_dt": "2020-01-01T00:00:00Z"},
        {"name": "No number"}
      ]
    }"#;

    let page: Page<ApiSet> = serde_json::from_str(json).unwrap();
    assert_eq!(page.count, 2);
    assert!(page.next.is_some());
    assert!(page.previous.is_none());
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[0].set_num.as_deref(), Some("10030-1"));
    assert_eq!(page.results[0].theme_id, Some(174));
    assert_eq!(page.results[1].set_num, None);
  }

  #[test]
  fn test_decode_theme_with_unknown_fields() {
    let theme: ApiTheme =
      serde_json::from_str(r#"{"id": 1, "name": "Technic", "parent_id": null, "extra": 5}"#).unwrap();
    assert_eq!(theme.id, Some(1));
    assert_eq!(theme.parent_id, None);
  }
}
