use dp_common::meta::col_value::ColValue;
use sqlx::{
    any::{Any, AnyArguments},
    query::Query,
};

pub trait SqlxAnyExt<'q> {
    fn bind_col_value(self, col_value: &ColValue) -> Self;
}

impl<'q> SqlxAnyExt<'q> for Query<'q, Any, AnyArguments<'q>> {
    fn bind_col_value(self, col_value: &ColValue) -> Self {
        match col_value {
            ColValue::Bool(v) => self.bind(*v),
            ColValue::LongLong(v) => self.bind(*v),
            ColValue::Double(v) => self.bind(*v),
            ColValue::String(v) => self.bind(v.clone()),
            ColValue::None => {
                let none: Option<String> = Option::None;
                self.bind(none)
            }
        }
    }
}
