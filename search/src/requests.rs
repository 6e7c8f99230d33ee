//! State-derived base requests, one builder per request name.
//!
//! These are the first step of composition; [`crate::composer`] layers
//! defaults and overrides on top.

use crate::config::StorefrontConfig;
use crate::models::Refinement;
use crate::state::Present;
use serde_json::{Value, json};

fn refinement_json(field: &str, refinement: &Refinement) -> Value {
    match refinement {
        Refinement::Value { value, .. } => json!({
            "navigationName": field,
            "type": "Value",
            "value": value,
        }),
        Refinement::Range { low, high, .. } => json!({
            "navigationName": field,
            "type": "Range",
            "low": low,
            "high": high,
        }),
    }
}

fn value_refinements<'a, I>(field: &str, values: I) -> Vec<Value>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .map(|value| refinement_json(field, &Refinement::value(value)))
        .collect()
}

/// Primary search for the current state
#[must_use]
pub fn search(present: &Present, config: &StorefrontConfig) -> Value {
    let refinements: Vec<Value> = present
        .selected_refinements()
        .iter()
        .map(|(field, refinement)| refinement_json(field, refinement))
        .collect();

    let mut request = json!({
        "query": present.query.original,
        "area": config.area,
        "collection": present.collections.selected,
        "pageSize": present.page.size,
        "skip": present.page.skip(),
        "refinements": refinements,
        "fields": ["*"],
    });

    if let Some(sort) = present.sort.current().filter(|sort| !sort.field.is_empty()) {
        request["sort"] = json!([{
            "field": sort.field,
            "order": if sort.descending { "Descending" } else { "Ascending" },
        }]);
    }
    if !present.session.id.is_empty() {
        request["sessionId"] = json!(present.session.id);
    }
    if !present.personalization.biasing.is_empty() {
        let biases: Vec<Value> = present
            .personalization
            .biasing
            .iter()
            .map(|bias| {
                json!({
                    "name": bias.field,
                    "content": bias.value,
                    "strength": config.personalization.strength,
                })
            })
            .collect();
        request["biasing"] = json!({ "biases": biases });
    }

    request
}

/// Secondary call ordering facets for the current query
#[must_use]
pub fn navigation_ranking(present: &Present, config: &StorefrontConfig) -> Value {
    json!({
        "query": present.query.original,
        "collection": present.collections.selected,
        "area": config.area,
    })
}

/// Infinite-scroll window on top of the primary search
#[must_use]
pub fn more_products(skip: usize, size: usize) -> serde_json::Map<String, Value> {
    let mut window = serde_json::Map::new();
    window.insert("skip".to_string(), json!(skip));
    window.insert("pageSize".to_string(), json!(size));
    window
}

/// Every refinement of one facet for the current search
#[must_use]
pub fn refinements(present: &Present, config: &StorefrontConfig, field: &str) -> Value {
    json!({
        "originalQuery": search(present, config),
        "navigationName": field,
    })
}

/// Query suggestions for a partial query
#[must_use]
pub fn autocomplete_suggestions(present: &Present, config: &StorefrontConfig, query: &str) -> Value {
    json!({
        "query": query,
        "collection": present.collections.selected,
        "area": config.area,
        "numSearchTerms": config.autocomplete.suggestion_count,
        "numNavigations": config.autocomplete.navigation_count,
    })
}

/// Product preview for a suggestion
#[must_use]
pub fn autocomplete_products(
    present: &Present,
    config: &StorefrontConfig,
    query: &str,
    refinements: &[(String, String)],
) -> Value {
    let refinements: Vec<Value> = refinements
        .iter()
        .map(|(field, value)| refinement_json(field, &Refinement::value(value.as_str())))
        .collect();
    json!({
        "query": query,
        "area": config.area,
        "collection": present.collections.selected,
        "pageSize": config.autocomplete.product_count,
        "skip": 0,
        "refinements": refinements,
        "fields": ["*"],
    })
}

/// Single-product lookup by id
#[must_use]
pub fn details(present: &Present, config: &StorefrontConfig, id: &str) -> Value {
    json!({
        "query": "",
        "area": config.area,
        "collection": present.collections.selected,
        "pageSize": 1,
        "skip": 0,
        "refinements": value_refinements(&config.id_field, [id]),
        "fields": ["*"],
    })
}

/// Recommended product ids
#[must_use]
pub fn recommendations(present: &Present, config: &StorefrontConfig) -> Value {
    json!({
        "size": config.recommendations.product_count,
        "type": config.recommendations.strategy,
        "target": config.id_field,
        "sessionId": present.session.id,
    })
}

/// Product lookup for a list of ids (or SKUs) on `field`
#[must_use]
pub fn products_by_values(present: &Present, config: &StorefrontConfig, field: &str, values: &[String]) -> Value {
    json!({
        "query": "",
        "area": config.area,
        "collection": present.collections.selected,
        "pageSize": values.len(),
        "skip": 0,
        "refinements": value_refinements(field, values.iter().map(String::as_str)),
        "fields": ["*"],
    })
}

/// Previously purchased SKUs for the signed shopper
#[must_use]
pub fn past_purchases(config: &StorefrontConfig, secured_payload: &str) -> Value {
    json!({
        "securedPayload": secured_payload,
        "size": config.past_purchases.product_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Navigation, SortOption};
    use crate::state::Bias;

    fn config() -> StorefrontConfig {
        StorefrontConfig::builder("acme").collection("products").build()
    }

    #[test]
    fn search_carries_query_page_and_selected_refinements() {
        let config = config();
        let mut present = Present::from_config(&config);
        present.query.original = "boots".into();
        present.page.current = 3;
        present.navigations.facets.push(Navigation {
            field: "color".into(),
            refinements: vec![Refinement::value("red"), Refinement::value("blue")],
            selected: vec![1],
            ..Navigation::default()
        });

        let request = search(&present, &config);

        assert_eq!(request["query"], "boots");
        assert_eq!(request["collection"], "products");
        assert_eq!(request["skip"], 20);
        assert_eq!(request["refinements"][0]["navigationName"], "color");
        assert_eq!(request["refinements"][0]["value"], "blue");
        assert!(request.get("sort").is_none());
    }

    #[test]
    fn search_includes_sort_and_biasing_when_present() {
        let config = config();
        let mut present = Present::from_config(&config);
        present.sort.options.push(SortOption {
            label: "Price".into(),
            field: "price".into(),
            descending: true,
        });
        present.sort.selected = 1;
        present.personalization.biasing.push(Bias {
            field: "brand".into(),
            value: "Acme".into(),
        });

        let request = search(&present, &config);

        assert_eq!(request["sort"][0]["field"], "price");
        assert_eq!(request["sort"][0]["order"], "Descending");
        assert_eq!(request["biasing"]["biases"][0]["content"], "Acme");
    }

    #[test]
    fn range_refinements_keep_their_bounds() {
        let value = refinement_json("price", &Refinement::range(10.0, 50.0));
        assert_eq!(value["type"], "Range");
        assert_eq!(value["low"], 10.0);
        assert_eq!(value["high"], 50.0);
    }

    #[test]
    fn details_looks_up_the_id_field() {
        let config = config();
        let request = details(&Present::from_config(&config), &config, "sku-9");

        assert_eq!(request["pageSize"], 1);
        assert_eq!(request["refinements"][0]["navigationName"], "id");
        assert_eq!(request["refinements"][0]["value"], "sku-9");
    }
}
