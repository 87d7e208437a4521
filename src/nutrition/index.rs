//! Nutrition index abstraction and the in-memory implementation

use super::types::NutritionRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A scored nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub record: NutritionRecord,
    pub score: f32,
}

/// Lookup operations offered by a nutrition index
#[async_trait]
pub trait NutritionIndex: Send + Sync {
    /// Record whose keyword equals `name`
    async fn find_exact(&self, name: &str) -> Result<Option<NutritionRecord>>;

    /// Closest record by embedding
    async fn find_nearest(&self, vector: &[f32]) -> Result<Option<VectorHit>>;

    /// Best approximate text match
    async fn find_fuzzy(&self, name: &str) -> Result<Option<NutritionRecord>>;

    /// Add or replace records, returning how many were written
    async fn index_batch(&self, records: Vec<NutritionRecord>) -> Result<usize>;
}

/// Cosine similarity, 0 when either vector is empty, zero or the lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Edit distance allowed for a term of `len` characters
pub fn auto_fuzziness(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Levenshtein distance over characters
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Score a candidate name against a query; lower is better, `None` is no match
fn fuzzy_score(query: &str, candidate: &str) -> Option<usize> {
    if candidate.is_empty() {
        return None;
    }
    let distance = edit_distance(query, candidate);
    if distance <= auto_fuzziness(query.chars().count()) {
        return Some(distance);
    }
    if candidate.contains(query) || query.contains(candidate) {
        return Some(distance);
    }
    None
}

/// Index held in memory, filled from CSV files or tests
#[derive(Clone, Default)]
pub struct MemoryNutritionIndex {
    records: Arc<RwLock<Vec<NutritionRecord>>>,
}

impl MemoryNutritionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<NutritionRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl NutritionIndex for MemoryNutritionIndex {
    async fn find_exact(&self, name: &str) -> Result<Option<NutritionRecord>> {
        let name = name.trim();
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.ingredient_name_keyword == name)
            .cloned())
    }

    async fn find_nearest(&self, vector: &[f32]) -> Result<Option<VectorHit>> {
        let records = self.records.read().await;
        let best = records
            .iter()
            .filter_map(|r| {
                r.embedding
                    .as_deref()
                    .map(|e| (r, cosine_similarity(vector, e)))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));
        Ok(best.map(|(record, score)| VectorHit {
            record: record.clone(),
            score,
        }))
    }

    async fn find_fuzzy(&self, name: &str) -> Result<Option<NutritionRecord>> {
        let query = name.trim();
        if query.is_empty() {
            return Ok(None);
        }
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter_map(|r| fuzzy_score(query, &r.ingredient_name_keyword).map(|s| (s, r)))
            .min_by_key(|(score, r)| (*score, r.ingredient_name_keyword.chars().count()))
            .map(|(_, r)| r.clone()))
    }

    async fn index_batch(&self, records: Vec<NutritionRecord>) -> Result<usize> {
        let count = records.len();
        let mut stored = self.records.write().await;
        for record in records {
            let id = record.document_id();
            match stored.iter_mut().find(|r| r.document_id() == id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::types::NutritionFacts;

    fn record(name: &str, embedding: Option<Vec<f32>>) -> NutritionRecord {
        let mut record = NutritionRecord::new(name, "표준식품", NutritionFacts::default());
        record.embedding = embedding;
        record
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_edit_distance_and_fuzziness() {
        assert_eq!(edit_distance("양파", "양파"), 0);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(auto_fuzziness(2), 0);
        assert_eq!(auto_fuzziness(4), 1);
        assert_eq!(auto_fuzziness(8), 2);
    }

    #[tokio::test]
    async fn test_exact_and_fuzzy_lookup() {
        let index = MemoryNutritionIndex::with_records(vec![
            record("양파", None),
            record("적양파", None),
            record("브로콜리", None),
        ]);

        assert_eq!(
            index.find_exact(" 양파 ").await.unwrap().unwrap().ingredient_name,
            "양파"
        );
        assert!(index.find_exact("마늘").await.unwrap().is_none());

        // one edit away from a five-character name
        let hit = index.find_fuzzy("브로컬리").await.unwrap().unwrap();
        assert_eq!(hit.ingredient_name, "브로콜리");

        // substring containment prefers the shorter name
        let hit = index.find_fuzzy("다진 양파").await.unwrap().unwrap();
        assert_eq!(hit.ingredient_name, "양파");

        assert!(index.find_fuzzy("소고기").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nearest_ignores_records_without_embedding() {
        let index = MemoryNutritionIndex::with_records(vec![
            record("양파", Some(vec![1.0, 0.0])),
            record("마늘", Some(vec![0.6, 0.8])),
            record("새우", None),
        ]);
        let hit = index.find_nearest(&[0.0, 1.0]).await.unwrap().unwrap();
        assert_eq!(hit.record.ingredient_name, "마늘");
        assert!((hit.score - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_index_batch_replaces_same_document() {
        let index = MemoryNutritionIndex::new();
        index.index_batch(vec![record("양파", None)]).await.unwrap();
        let mut updated = record("양파", None);
        updated.protein = 1.1;
        index.index_batch(vec![updated]).await.unwrap();
        assert_eq!(index.len().await, 1);
        assert_eq!(index.find_exact("양파").await.unwrap().unwrap().protein, 1.1);
    }
}
