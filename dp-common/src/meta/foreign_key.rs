use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}
