// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Plan catalog
//
// Backing store for `searchPlans`. The in-memory catalog loads a JSON
// array of plan records at startup.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PlanSearchError {
    #[error("failed to read plan catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("plan catalog is not a JSON array of objects: {0}")]
    Format(String),
}

/// Plan lookup by exact-match filters.
#[async_trait]
pub trait PlanSearch: Send + Sync {
    async fn search(&self, filters: &Map<String, Value>) -> Result<Vec<Value>, PlanSearchError>;
}

pub struct InMemoryPlanCatalog {
    plans: Vec<Map<String, Value>>,
}

impl InMemoryPlanCatalog {
    pub fn new(plans: Vec<Map<String, Value>>) -> Self {
        Self { plans }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn from_json(json: &str) -> Result<Self, PlanSearchError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| PlanSearchError::Format(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(PlanSearchError::Format("top level is not an array".to_string()));
        };
        let plans = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(plan) => Ok(plan),
                _ => Err(PlanSearchError::Format(format!("entry {i} is not an object"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(plans))
    }

    pub fn from_path(path: &Path) -> Result<Self, PlanSearchError> {
        let json = std::fs::read_to_string(path).map_err(|source| PlanSearchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), plans = catalog.len(), "plan catalog loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// A plan matches when every scalar filter equals the plan's value for that
/// key. Null, array and object filters are ignored, as are filters naming
/// keys the plan does not have.
fn matches(plan: &Map<String, Value>, filters: &Map<String, Value>) -> bool {
    filters.iter().all(|(key, wanted)| {
        if matches!(wanted, Value::Null | Value::Array(_) | Value::Object(_)) {
            return true;
        }
        plan.get(key).map_or(true, |actual| actual == wanted)
    })
}

#[async_trait]
impl PlanSearch for InMemoryPlanCatalog {
    async fn search(&self, filters: &Map<String, Value>) -> Result<Vec<Value>, PlanSearchError> {
        Ok(self
            .plans
            .iter()
            .filter(|plan| matches(plan, filters))
            .cloned()
            .map(Value::Object)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLANS: &str = r#"[
        {"_id": "p1", "name": "5G Max", "category": "5G", "isPopular": true, "dataGb": -1, "monthlyFee": 89000},
        {"_id": "p2", "name": "5G Slim", "category": "5G", "isPopular": false, "dataGb": 10, "monthlyFee": 55000},
        {"_id": "p3", "name": "LTE Basic", "category": "LTE", "isPopular": true, "dataGb": 5, "monthlyFee": 33000}
    ]"#;

    fn filters(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("filters must be an object"),
        }
    }

    fn ids(plans: &[Value]) -> Vec<&str> {
        plans.iter().map(|p| p["_id"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn filters_are_exact_and_conjunctive() {
        let catalog = InMemoryPlanCatalog::from_json(PLANS).unwrap();

        let found = catalog.search(&filters(json!({"category": "5G"}))).await.unwrap();
        assert_eq!(ids(&found), vec!["p1", "p2"]);

        let found = catalog
            .search(&filters(json!({"category": "5G", "isPopular": true})))
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["p1"]);

        let found = catalog.search(&filters(json!({"dataGb": -1}))).await.unwrap();
        assert_eq!(ids(&found), vec!["p1"]);
    }

    #[tokio::test]
    async fn empty_and_unknown_filters_match_everything() {
        let catalog = InMemoryPlanCatalog::from_json(PLANS).unwrap();
        assert_eq!(catalog.search(&Map::new()).await.unwrap().len(), 3);
        assert_eq!(
            catalog.search(&filters(json!({"colour": "red", "ageGroup": null}))).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn no_match_is_empty_not_error() {
        let catalog = InMemoryPlanCatalog::from_json(PLANS).unwrap();
        let found = catalog.search(&filters(json!({"category": "3G"}))).await.unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn rejects_malformed_catalogs() {
        assert!(matches!(
            InMemoryPlanCatalog::from_json(r#"{"plans": []}"#),
            Err(PlanSearchError::Format(_))
        ));
        assert!(matches!(
            InMemoryPlanCatalog::from_json(r#"[{"_id": "p1"}, 3]"#),
            Err(PlanSearchError::Format(m)) if m.contains("entry 1")
        ));
        assert!(matches!(
            InMemoryPlanCatalog::from_path(Path::new("/nonexistent/plans.json")),
            Err(PlanSearchError::Read { .. })
        ));
    }
}
