//! Query Builder SELECT operations

use super::builder::QueryBuilder;

fn split_fields(fields: &str) -> impl Iterator<Item = String> + '_ {
    fields
        .split(',')
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
}

impl<M> QueryBuilder<M> {
    /// Replace the SELECT list; accepts a comma-separated field list
    pub fn select(mut self, fields: &str) -> Self {
        self.select_fields = split_fields(fields).collect();
        self
    }

    /// Append one or more fields to the SELECT list
    pub fn add_select(mut self, fields: &str) -> Self {
        self.select_fields.extend(split_fields(fields));
        self
    }

    /// Add custom SELECT expression, kept verbatim even if it contains commas
    pub fn select_raw(mut self, expression: &str) -> Self {
        self.select_fields.push(expression.to_string());
        self
    }

    /// Add SELECT DISTINCT to the query
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Fields currently selected; an empty list renders as `*`
    pub fn selected(&self) -> &[String] {
        &self.select_fields
    }
}
