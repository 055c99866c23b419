use std::collections::HashMap;

use dp_common::{
    log_info, log_warn,
    meta::{column::Column, foreign_key::ForeignKey, meaning::analyze_meaning, table::Table},
};
use futures::TryStreamExt;
use sqlx::{any::AnyPool, Row};

use crate::{dialect::Dialect, table_sorter};

/// Loads tables, columns and foreign keys through the dialect and returns
/// the tables in dependency order. Lookups run on uppercase-normalized
/// names since Oracle stores identifiers uppercase.
pub struct SchemaAnalyzer<'a> {
    pub conn_pool: &'a AnyPool,
    pub dialect: &'a (dyn Dialect + Send + Sync),
    pub schema: String,
}

impl SchemaAnalyzer<'_> {
    pub async fn analyze(&self) -> anyhow::Result<Vec<Table>> {
        let target = self.dialect.default_schema(&self.schema);

        let mut tables: Vec<Table> = Vec::new();
        // uppercase name -> position in tables, dropped before returning
        let mut table_index: HashMap<String, usize> = HashMap::new();

        self.load_tables(&target, &mut tables, &mut table_index)
            .await?;
        self.load_columns(&target, &mut tables, &table_index).await?;
        self.load_foreign_keys(&target, &mut tables, &table_index)
            .await?;

        log_info!("analyzed {} tables in schema {}", tables.len(), target);
        Ok(table_sorter::sort_tables(tables))
    }

    async fn load_tables(
        &self,
        target: &str,
        tables: &mut Vec<Table>,
        table_index: &mut HashMap<String, usize>,
    ) -> anyhow::Result<()> {
        let sql = self.dialect.tables_query();
        let mut rows = sqlx::query(&sql).bind(target).fetch(self.conn_pool);
        while let Some(row) = rows.try_next().await? {
            let name: String = row.try_get(0)?;
            table_index.insert(name.to_uppercase(), tables.len());
            tables.push(Table::new(&name));
        }

        if tables.is_empty() {
            log_warn!("no base tables found in schema: {}", target);
        }
        Ok(())
    }

    async fn load_columns(
        &self,
        target: &str,
        tables: &mut [Table],
        table_index: &HashMap<String, usize>,
    ) -> anyhow::Result<()> {
        let sql = self.dialect.columns_query();
        let mut rows = sqlx::query(&sql).bind(target).fetch(self.conn_pool);
        while let Some(row) = rows.try_next().await? {
            let table_name: Option<String> = row.try_get(0)?;
            let col_name: Option<String> = row.try_get(1)?;
            let (Some(table_name), Some(col_name)) = (table_name, col_name) else {
                continue;
            };
            let Some(&index) = table_index.get(&table_name.to_uppercase()) else {
                continue;
            };

            let data_type: String = row.try_get::<Option<String>, _>(2)?.unwrap_or_default();
            let extended_type: String = row.try_get::<Option<String>, _>(3)?.unwrap_or_default();
            let length_str: String = row.try_get::<Option<String>, _>(4)?.unwrap_or_default();
            let is_nullable: String = row.try_get::<Option<String>, _>(5)?.unwrap_or_default();
            let key_hint: String = row.try_get::<Option<String>, _>(6)?.unwrap_or_default();
            let extra_hint: String = row.try_get::<Option<String>, _>(7)?.unwrap_or_default();
            let unique_hint: String = row.try_get::<Option<String>, _>(8)?.unwrap_or_default();
            let comment: String = row.try_get::<Option<String>, _>(9)?.unwrap_or_default();

            let extra_lower = extra_hint.to_lowercase();
            let normalized_type = self.dialect.normalize_type(&data_type);

            let column = Column {
                name: col_name.clone(),
                length: parse_length(&length_str),
                is_nullable: is_nullable == "YES",
                is_pk: key_hint.contains("PRI") || key_hint.contains("PRIMARY"),
                is_auto_inc: extra_lower.contains("auto_increment")
                    || extra_lower.contains("identity")
                    || extra_lower.contains("nextval"),
                is_unique: unique_hint.contains("UNIQUE"),
                enum_values: parse_enum_values(&normalized_type, &extended_type),
                meaning: analyze_meaning(&col_name, &comment),
                comment,
                data_type: normalized_type,
            };
            tables[index].columns.push(column);
        }
        Ok(())
    }

    async fn load_foreign_keys(
        &self,
        target: &str,
        tables: &mut [Table],
        table_index: &HashMap<String, usize>,
    ) -> anyhow::Result<()> {
        let sql = self.dialect.foreign_keys_query();
        let mut rows = sqlx::query(&sql).bind(target).fetch(self.conn_pool);
        while let Some(row) = rows.try_next().await? {
            let table_name: Option<String> = row.try_get(0)?;
            let col_name: Option<String> = row.try_get(2)?;
            let ref_table: Option<String> = row.try_get(3)?;
            let ref_column: Option<String> = row.try_get::<Option<String>, _>(4)?;
            let (Some(table_name), Some(col_name), Some(ref_table)) =
                (table_name, col_name, ref_table)
            else {
                continue;
            };

            // self references cannot help ordering
            if table_name == ref_table {
                continue;
            }

            let Some(&index) = table_index.get(&table_name.to_uppercase()) else {
                continue;
            };
            // references to tables outside the analyzed set are dropped
            let Some(&ref_index) = table_index.get(&ref_table.to_uppercase()) else {
                continue;
            };

            let ref_table_name = tables[ref_index].name.clone();
            tables[index].add_dependency(&ref_table_name);
            tables[index].foreign_keys.push(ForeignKey {
                column: col_name,
                ref_table: ref_table_name,
                ref_column: ref_column.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Character max length or numeric precision, integer first, float second,
/// 0 when neither parses.
fn parse_length(raw: &str) -> usize {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    if let Ok(length) = raw.parse::<usize>() {
        return length;
    }
    if let Ok(length) = raw.parse::<f64>() {
        if length > 0.0 {
            return length as usize;
        }
    }
    0
}

/// MySQL keeps the member list in the full column definition,
/// e.g. `enum('G','PG','PG-13')`.
fn parse_enum_values(normalized_type: &str, extended_type: &str) -> Vec<String> {
    if normalized_type != "enum" && normalized_type != "set" {
        return Vec::new();
    }
    let Some(start) = extended_type.find('(') else {
        return Vec::new();
    };
    let Some(end) = extended_type.rfind(')') else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }

    extended_type[start + 1..end]
        .split(',')
        .map(|member| member.trim().trim_matches('\'').to_string())
        .filter(|member| !member.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("255"), 255);
        assert_eq!(parse_length(" 10 "), 10);
        assert_eq!(parse_length("10.0"), 10);
        assert_eq!(parse_length(""), 0);
        assert_eq!(parse_length("abc"), 0);
    }

    #[test]
    fn test_parse_enum_values() {
        assert_eq!(
            parse_enum_values("enum", "enum('G','PG','PG-13','R','NC-17')"),
            vec!["G", "PG", "PG-13", "R", "NC-17"]
        );
        assert_eq!(
            parse_enum_values("set", "set('Trailers','Commentaries')"),
            vec!["Trailers", "Commentaries"]
        );
        assert!(parse_enum_values("varchar", "varchar(10)").is_empty());
        assert!(parse_enum_values("enum", "enum").is_empty());
    }
}
