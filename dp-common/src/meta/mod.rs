pub mod col_value;
pub mod column;
pub mod foreign_key;
pub mod meaning;
pub mod pump_result;
pub mod table;
