use serde::Serialize;

use super::{column::Column, foreign_key::ForeignKey};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    /// identifier as returned by the dialect, original case preserved
    pub name: String,
    /// ordinal position order
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    /// referenced table names present in the analyzed set, self excluded
    pub dependencies: Vec<String>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_dependency(&mut self, ref_table: &str) {
        if !self.dependencies.iter().any(|dep| dep == ref_table) {
            self.dependencies.push(ref_table.to_string());
        }
    }

    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|col| col.is_auto_inc)
    }

    pub fn pk_count(&self) -> usize {
        self.columns.iter().filter(|col| col.is_pk).count()
    }

    /// The primary key column, only when the table has exactly one.
    pub fn single_pk_column(&self) -> Option<&Column> {
        let mut pk_cols = self.columns.iter().filter(|col| col.is_pk);
        match (pk_cols.next(), pk_cols.next()) {
            (Some(col), None) => Some(col),
            _ => None,
        }
    }

    pub fn find_foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// All columns except auto-increment ones, the server fills those.
    pub fn insertable_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|col| !col.is_auto_inc).collect()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn pk_col(name: &str) -> Column {
        Column {
            name: name.to_string(),
            is_pk: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_pk_column() {
        let mut table = Table::new("film_actor");
        table.columns.push(pk_col("actor_id"));
        assert_eq!(table.single_pk_column().unwrap().name, "actor_id");

        table.columns.push(pk_col("film_id"));
        assert!(table.single_pk_column().is_none());
        assert_eq!(table.pk_count(), 2);
    }

    #[test]
    fn test_add_dependency_dedups() {
        let mut table = Table::new("payment");
        table.add_dependency("customer");
        table.add_dependency("staff");
        table.add_dependency("customer");
        assert_eq!(table.dependencies, vec!["customer", "staff"]);
    }

    #[test]
    fn test_insertable_columns_skip_auto_inc() {
        let mut table = Table::new("actor");
        let mut id = pk_col("actor_id");
        id.is_auto_inc = true;
        table.columns.push(id);
        table.columns.push(Column {
            name: "first_name".to_string(),
            ..Default::default()
        });

        let cols = table.insertable_columns();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].name, "first_name");
        assert!(table.has_identity());
    }
}
