use crate::commands::{period_for, Out};
use crate::pipeline::{Pipeline, SavedFile};
use crate::Result;

/// Rolls the expenses of the month containing `date` (today when `None`) forward into the next
/// month's sheet, keeping only fixed expenses and installments that are not yet paid off.
pub async fn generate(pipeline: &Pipeline, date: Option<&str>) -> Result<Out<SavedFile>> {
    let period = period_for(date)?;
    let saved = pipeline.generate_next(period).await?;
    let message = format!(
        "Filtered CSV for {} created successfully from {period}.",
        saved.name
    );
    Ok(Out::new(message, saved))
}
