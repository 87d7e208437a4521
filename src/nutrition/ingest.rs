//! Loading food composition spreadsheets into a nutrition index
//!
//! Input is the CSV export of the spreadsheet with Korean column headers.

use super::index::NutritionIndex;
use super::types::{NutritionFacts, NutritionRecord};
use crate::abstractions::ModelClient;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub const BATCH_SIZE: usize = 100;

const COL_NAME: &str = "식품명";
const COL_CALORIES: &str = "에너지(kcal)";
const COL_PROTEIN: &str = "단백질(g)";
const COL_FAT: &str = "지방(g)";
const COL_CARBS: &str = "탄수화물(g)";
const COL_FIBER: &str = "식이섬유(g)";
const COL_SODIUM: &str = "나트륨(mg)";

/// Which source table rows come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FoodCategory {
    /// Processed food database
    Processed,
    /// National standard food composition table
    Standard,
}

impl FoodCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processed => "가공식품",
            Self::Standard => "표준식품",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub rows: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub without_embedding: usize,
    pub batches: usize,
}

/// Parse CSV rows into records; rows without a name are skipped
pub fn parse_csv<R: Read>(reader: R, category: FoodCategory) -> Result<(Vec<NutritionRecord>, usize)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = csv_reader
        .headers()
        .context("CSV has no header row")?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == &name.to_lowercase());
    let name_col = column(COL_NAME).with_context(|| format!("CSV is missing the {COL_NAME} column"))?;
    let numeric = [
        column(COL_CALORIES),
        column(COL_PROTEIN),
        column(COL_FAT),
        column(COL_CARBS),
        column(COL_FIBER),
        column(COL_SODIUM),
    ];

    let mut records = Vec::new();
    let mut skipped = 0;
    for row in csv_reader.records() {
        let row = row.context("Malformed CSV row")?;
        let name = row.get(name_col).unwrap_or("").trim();
        if name.is_empty() {
            skipped += 1;
            continue;
        }
        let value = |idx: Option<usize>| -> f64 {
            idx.and_then(|i| row.get(i))
                .and_then(|v| v.replace(',', "").parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        };
        let facts = NutritionFacts {
            calories: value(numeric[0]),
            protein: value(numeric[1]),
            fat: value(numeric[2]),
            carbs: value(numeric[3]),
            fiber: value(numeric[4]),
            sodium: value(numeric[5]),
        };
        records.push(NutritionRecord::new(name, category.label(), facts));
    }
    Ok((records, skipped))
}

/// Embed and index `records` in batches
///
/// A failed embedding leaves the record indexed for exact and fuzzy matching.
pub async fn index_records(
    records: Vec<NutritionRecord>,
    index: &dyn NutritionIndex,
    model: &dyn ModelClient,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        rows: records.len(),
        ..IngestReport::default()
    };
    let mut pending = records.into_iter().peekable();
    while pending.peek().is_some() {
        let mut batch: Vec<NutritionRecord> = pending.by_ref().take(BATCH_SIZE).collect();
        for record in &mut batch {
            let text = format!("{} {}", record.ingredient_name, record.category);
            match model.embed(&text).await {
                Ok(vector) if !vector.is_empty() => record.embedding = Some(vector),
                Ok(_) => report.without_embedding += 1,
                Err(e) => {
                    debug!("No embedding for {}: {}", text, e);
                    report.without_embedding += 1;
                }
            }
        }
        report.indexed += index.index_batch(batch).await?;
        report.batches += 1;
        debug!("Indexed batch {}, total {}", report.batches, report.indexed);
    }
    if report.without_embedding > 0 {
        warn!(
            "{} of {} records were indexed without an embedding",
            report.without_embedding, report.rows
        );
    }
    Ok(report)
}

/// Parse and index one CSV file
pub async fn ingest_file(
    path: &Path,
    category: FoodCategory,
    index: &dyn NutritionIndex,
    model: &dyn ModelClient,
) -> Result<IngestReport> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let (records, skipped) = parse_csv(file, category)?;
    let mut report = index_records(records, index, model).await?;
    report.skipped = skipped;
    info!(
        "Ingested {}: {} indexed, {} skipped",
        path.display(),
        report.indexed,
        report.skipped
    );
    Ok(report)
}
