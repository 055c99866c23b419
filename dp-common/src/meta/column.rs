use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Column {
    pub name: String,
    /// normalized by the dialect, e.g. varchar, int, datetime
    pub data_type: String,
    /// character max length or numeric precision, 0 when unknown
    pub length: usize,
    pub is_nullable: bool,
    pub is_pk: bool,
    pub is_auto_inc: bool,
    pub is_unique: bool,
    pub enum_values: Vec<String>,
    /// raw DB comment, possibly in a non-English language
    pub comment: String,
    /// semantic tag inferred from name abbreviations / comment keywords
    pub meaning: String,
}
