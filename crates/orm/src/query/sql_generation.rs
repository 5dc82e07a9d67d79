//! Query Builder SQL generation
//!
//! Rendering walks the clauses in a fixed order and collects each predicate's
//! values as it writes its placeholders, so `?` count and binding order
//! always agree.

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::Row;
use crate::error::{ModelError, ModelResult};

impl<M> QueryBuilder<M> {
    /// Render the SELECT statement with `?` placeholders
    pub fn to_sql(&self) -> String {
        self.to_sql_with_bindings().0
    }

    /// Values bound to the placeholders of [`to_sql`](Self::to_sql), in order
    pub fn bindings(&self) -> Vec<Value> {
        self.to_sql_with_bindings().1
    }

    /// Render the SELECT statement together with its bindings
    pub fn to_sql_with_bindings(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut bindings = Vec::new();

        // SELECT clause
        if self.distinct {
            sql.push_str("SELECT DISTINCT ");
        } else {
            sql.push_str("SELECT ");
        }

        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        // FROM clause
        if !self.table.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&self.table);
        }

        // JOIN clauses
        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {} {} {}",
                join.join_type, join.table, join.left, join.operator, join.right
            ));
        }

        self.build_where_clause(&mut sql, &mut bindings);

        // GROUP BY clause
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        // HAVING clause
        if !self.having_conditions.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&render_conditions(&self.having_conditions, &mut bindings));
        }

        self.build_order_limit_clause(&mut sql);

        (sql, bindings)
    }

    /// Helper method to build the WHERE clause
    pub(crate) fn build_where_clause(&self, sql: &mut String, bindings: &mut Vec<Value>) {
        if !self.where_conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_conditions(&self.where_conditions, bindings));
        }
    }

    /// Helper method to build ORDER BY, LIMIT and OFFSET clauses
    fn build_order_limit_clause(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let order_clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(&order_clauses.join(", "));
        }

        match (self.limit_count, self.offset_value) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }
    }

    /// Build INSERT SQL for one or more rows sharing the first row's columns
    pub(crate) fn build_insert_sql(&self, rows: &[Row]) -> ModelResult<(String, Vec<Value>)> {
        let Some(first) = rows.first() else {
            return Err(ModelError::Query(format!("No rows given for insert into {}", self.table)));
        };

        let columns: Vec<&String> = first.keys().collect();
        let mut bindings = Vec::with_capacity(columns.len() * rows.len());

        // Every row must carry exactly the first row's columns
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() || !columns.iter().all(|c| row.contains_key(c.as_str())) {
                return Err(ModelError::Query(format!(
                    "Row {} of insert into {} has columns [{}], expected [{}]",
                    index,
                    self.table,
                    row.keys().cloned().collect::<Vec<_>>().join(", "),
                    columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
                )));
            }
            bindings.extend(columns.iter().map(|c| row[c.as_str()].clone()));
        }

        if columns.is_empty() {
            if rows.len() > 1 {
                return Err(ModelError::Query(format!(
                    "Cannot insert {} rows of default values into {} in one statement",
                    rows.len(),
                    self.table
                )));
            }
            return Ok((format!("INSERT INTO {} DEFAULT VALUES", self.table), Vec::new()));
        }

        let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "),
            vec![placeholders; rows.len()].join(", ")
        );

        Ok((sql, bindings))
    }

    /// Build UPDATE SQL; bindings are the SET values followed by the WHERE values
    pub(crate) fn build_update_sql(&self, set_clauses: &[SetClause]) -> (String, Vec<Value>) {
        let mut sql = format!("UPDATE {} SET ", self.table);
        let mut bindings = Vec::new();

        let assignments: Vec<String> = set_clauses
            .iter()
            .map(|clause| match &clause.value {
                SetValue::Bind(value) => {
                    bindings.push(value.clone());
                    format!("{} = ?", clause.column)
                }
                SetValue::Raw(expression) => format!("{} = {}", clause.column, expression),
            })
            .collect();
        sql.push_str(&assignments.join(", "));

        self.build_where_clause(&mut sql, &mut bindings);
        (sql, bindings)
    }

    /// Build DELETE SQL applying the existing WHERE clause
    pub(crate) fn build_delete_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut bindings = Vec::new();
        self.build_where_clause(&mut sql, &mut bindings);
        (sql, bindings)
    }

    /// Build the total-count query used by pagination: no ordering, limit or offset
    pub(crate) fn build_count_sql(&self) -> (String, Vec<Value>) {
        let mut base = self.clone();
        base.order_by.clear();
        base.limit_count = None;
        base.offset_value = None;

        if base.group_by.is_empty() && !base.distinct {
            base.select_fields = vec!["COUNT(*) AS aggregate".to_string()];
            base.to_sql_with_bindings()
        } else {
            let (inner, bindings) = base.to_sql_with_bindings();
            (
                format!("SELECT COUNT(*) AS aggregate FROM ({}) AS aggregate_table", inner),
                bindings,
            )
        }
    }
}

fn render_conditions(conditions: &[WhereCondition], bindings: &mut Vec<Value>) -> String {
    let mut sql = String::new();

    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            sql.push_str(&format!(" {} ", condition.boolean));
        }
        sql.push_str(&render_predicate(&condition.predicate, bindings));
    }

    sql
}

fn render_predicate(predicate: &Predicate, bindings: &mut Vec<Value>) -> String {
    match predicate {
        Predicate::Basic { column, operator, value } => {
            bindings.push(value.clone());
            format!("{} {} ?", column, operator)
        }
        Predicate::In { column, values, negated } => {
            if values.is_empty() {
                // IN () is not valid SQL; an empty set matches nothing, its negation everything
                return if *negated { "1 = 1".to_string() } else { "0 = 1".to_string() };
            }
            bindings.extend(values.iter().cloned());
            format!(
                "{} {} ({})",
                column,
                if *negated { "NOT IN" } else { "IN" },
                vec!["?"; values.len()].join(", ")
            )
        }
        Predicate::Null { column, negated } => {
            format!("{} {}", column, if *negated { "IS NOT NULL" } else { "IS NULL" })
        }
        Predicate::Between { column, low, high, negated } => {
            bindings.push(low.clone());
            bindings.push(high.clone());
            format!("{} {} ? AND ?", column, if *negated { "NOT BETWEEN" } else { "BETWEEN" })
        }
        Predicate::Column { first, operator, second } => format!("{} {} {}", first, operator, second),
        Predicate::Raw { sql, bindings: raw_bindings } => {
            bindings.extend(raw_bindings.iter().cloned());
            sql.clone()
        }
    }
}
