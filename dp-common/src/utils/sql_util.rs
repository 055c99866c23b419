use crate::config::config_enums::DbType;

pub struct SqlUtil {}

const MYSQL_ESCAPE: char = '`';
const PG_ESCAPE: char = '"';

impl SqlUtil {
    pub fn is_escaped(token: &str, escape_pair: &(char, char)) -> bool {
        token.starts_with(escape_pair.0) && token.ends_with(escape_pair.1)
    }

    pub fn escape(token: &str, escape_pair: &(char, char)) -> String {
        if !Self::is_escaped(token, escape_pair) {
            return format!("{}{}{}", escape_pair.0, token, escape_pair.1);
        }
        token.to_string()
    }

    pub fn escape_by_db_type(token: &str, db_type: &DbType) -> String {
        let mut result = token.to_string();
        for escape_pair in Self::get_escape_pairs(db_type) {
            result = Self::escape(token, &escape_pair);
        }
        result
    }

    pub fn escape_cols(cols: &[String], db_type: &DbType) -> Vec<String> {
        cols.iter()
            .map(|col| Self::escape_by_db_type(col, db_type))
            .collect()
    }

    pub fn get_escape_pairs(db_type: &DbType) -> Vec<(char, char)> {
        match db_type {
            DbType::Mysql => vec![(MYSQL_ESCAPE, MYSQL_ESCAPE)],
            DbType::Pg => vec![(PG_ESCAPE, PG_ESCAPE)],
            // identifiers come straight from introspection, mssql/oracle
            // schemas used here store them unquoted
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_escape_by_db_type() {
        assert_eq!(
            SqlUtil::escape_by_db_type("actor", &DbType::Mysql),
            "`actor`"
        );
        assert_eq!(SqlUtil::escape_by_db_type("actor", &DbType::Pg), "\"actor\"");
        assert_eq!(SqlUtil::escape_by_db_type("actor", &DbType::Mssql), "actor");
        assert_eq!(SqlUtil::escape_by_db_type("actor", &DbType::Oracle), "actor");
    }

    #[test]
    fn test_escape_is_idempotent() {
        assert_eq!(
            SqlUtil::escape_by_db_type("`actor`", &DbType::Mysql),
            "`actor`"
        );
    }

    #[test]
    fn test_escape_cols() {
        let cols = vec!["a".to_string(), "b".to_string()];
        assert_eq!(SqlUtil::escape_cols(&cols, &DbType::Pg), vec!["\"a\"", "\"b\""]);
    }
}
