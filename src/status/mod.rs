pub mod inject;
pub mod render;
pub mod scheme;
pub mod sections;

use crate::db::{Database, EntryRow};
use crate::dates;
use anyhow::Result;
use chrono::NaiveDate;
use scheme::CategoryScheme;
use serde::Serialize;
use thiserror::Error;

/// Input problems reported back to the caller verbatim. Everything else
/// travels as `anyhow` context.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a date range")]
    MissingDateRange,
    #[error("The template has no text content")]
    EmptyTemplate,
    #[error("Entry content is empty")]
    EmptyContent,
    #[error("Please enter a template name")]
    EmptyName,
}

/// Entries bucketed by category. Scheme categories come first in scheme
/// order, unknown categories follow in order of first appearance, and
/// categories without entries are absent. Buckets keep store order.
#[derive(Debug, Default)]
pub struct GroupedEntries {
    groups: Vec<(String, Vec<EntryRow>)>,
}

impl GroupedEntries {
    pub fn group(entries: &[EntryRow], scheme: &CategoryScheme) -> Self {
        let mut groups: Vec<(String, Vec<EntryRow>)> = scheme
            .category_names()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();

        for entry in entries {
            match groups.iter_mut().find(|(name, _)| *name == entry.category) {
                Some((_, bucket)) => bucket.push(entry.clone()),
                None => groups.push((entry.category.clone(), vec![entry.clone()])),
            }
        }

        groups.retain(|(_, bucket)| !bucket.is_empty());

        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[EntryRow])> {
        self.groups
            .iter()
            .map(|(name, bucket)| (name.as_str(), bucket.as_slice()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub date_range: String,
    pub html: String,
    pub text: String,
}

/// Builds a status report from the entries logged in `start..=end`.
///
/// The template is validated for visible text first, then entries are
/// grouped per the scheme and injected. The returned markup is stripped of
/// background styling so it pastes cleanly into mail and wiki editors.
pub fn generate_status(
    database: &Database,
    scheme: &CategoryScheme,
    start: NaiveDate,
    end: NaiveDate,
    template: &str,
) -> Result<StatusReport> {
    if render::text_content(template).is_empty() {
        return Err(ValidationError::EmptyTemplate.into());
    }

    let entries = database.entries_between_dates(start, end)?;
    let grouped = GroupedEntries::group(&entries, scheme);
    let date_range = dates::format_date_range(start, end);

    let html =
        render::strip_background_styling(&inject::inject(template, &grouped, &date_range, scheme));
    let text = render::text_content(&html);

    Ok(StatusReport {
        date_range,
        html,
        text,
    })
}
