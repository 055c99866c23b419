use chrono::{Duration, Months, NaiveDate, Utc};
use dp_common::meta::{col_value::ColValue, column::Column};
use rand::{rngs::StdRng, Rng, SeedableRng};
use regex::Regex;

use super::dicts;

const SECONDS_PER_YEAR: i64 = 365 * 24 * 3600;

/// Produces a single bindable value for a column, honoring type, length,
/// nullability, enum members and the inferred meaning. One seedable PRNG
/// drives the whole run so a fixed seed reproduces it.
pub struct ValueGenerator {
    rng: StdRng,
    partition_suffix: Regex,
}

impl ValueGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            partition_suffix: Regex::new(r"^payment_p(\d{4})_(\d{2})").unwrap(),
        }
    }

    /// Uniform index draw, also used by the pump engine for FK pool picks.
    pub fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    pub fn generate(&mut self, col: &Column, table_name: &str) -> ColValue {
        let data_type = col.data_type.to_lowercase();
        let col_name = col.name.to_lowercase();

        // app-specific enum/set columns, declined rather than guessed
        if col_name.contains("special_features")
            || col_name.contains("features")
            || col_name.contains("rating")
        {
            if col.is_nullable {
                return ColValue::None;
            }
            return ColValue::String(String::new());
        }

        if !col.enum_values.is_empty() {
            let index = self.pick_index(col.enum_values.len());
            return ColValue::String(col.enum_values[index].clone());
        }

        if data_type.contains("char")
            || data_type.contains("text")
            || data_type.contains("varchar")
            || data_type.contains("string")
            || data_type.contains("year")
        {
            return self.string_value(col, &col_name, table_name);
        }

        if data_type.contains("date") || data_type.contains("time") {
            return self.datetime_value(&data_type, table_name);
        }

        if data_type.contains("int") || data_type.contains("integer") {
            return self.integer_value(col, &data_type, &col_name);
        }

        if data_type.contains("decimal")
            || data_type.contains("numeric")
            || data_type.contains("float")
            || data_type.contains("double")
        {
            return ColValue::Double(self.price());
        }

        if data_type.contains("bool") || data_type.contains("bit") {
            return ColValue::Bool(self.rng.gen_bool(0.5));
        }

        if data_type.contains("tsvector") {
            return ColValue::String(self.english_text(5));
        }

        if data_type.contains("binary") || data_type.contains("blob") || data_type.contains("bytea")
        {
            return ColValue::String("dummy".to_string());
        }

        ColValue::None
    }

    fn string_value(&mut self, col: &Column, col_name: &str, table_name: &str) -> ColValue {
        let meaning = col.meaning.as_str();
        let length = col.length;
        // id-looking columns skip the plausible-text producers
        let is_id = col_name.ends_with("id");

        if meaning.contains("year") || col_name.contains("year") {
            let year = self.rng.gen_range(2000..=2025).to_string();
            return ColValue::String(truncate(&year, length));
        }
        if !is_id && (meaning.contains("phone") || col_name.contains("phone")) {
            return ColValue::String(truncate(&self.korean_phone(), length));
        }
        if !is_id && (meaning.contains("email") || col_name.contains("email")) {
            return ColValue::String(truncate(&self.email(), length));
        }
        if !is_id
            && (meaning.contains("name")
                || col_name.contains("name")
                || col_name.contains("first")
                || col_name.contains("last"))
        {
            if length > 0 && length < 3 {
                let surname = dicts::LAST_NAMES[self.pick_index(dicts::LAST_NAMES.len())];
                return ColValue::String(truncate(surname, length));
            }
            return ColValue::String(truncate(&self.korean_name(), length));
        }
        if !is_id && (meaning.contains("address") || col_name.contains("address")) {
            if col_name.contains('2') {
                let fragment = format!(
                    "{}층 {}호",
                    self.rng.gen_range(1..=20),
                    self.rng.gen_range(1..=10)
                );
                return ColValue::String(truncate(&fragment, length));
            }
            return ColValue::String(truncate(&self.korean_address(), length));
        }
        if meaning.contains("zipcode") || col_name.contains("zip") || col_name.contains("postal") {
            let zipcode = format!("{:05}", self.rng.gen_range(0..100000));
            return ColValue::String(truncate(&zipcode, length));
        }
        if meaning.contains("yesno") || col_name.contains("active") || col_name.contains("is_") {
            let flag = if self.rng.gen_bool(0.5) { "Y" } else { "N" };
            return ColValue::String(flag.to_string());
        }
        if !is_id && (meaning.contains("title") || meaning.contains("subject")) {
            let text = self.english_text(2);
            return ColValue::String(truncate(&translate(&text), length));
        }
        if !is_id
            && (meaning.contains("description")
                || meaning.contains("content")
                || meaning.contains("comment")
                || meaning.contains("text"))
        {
            let text = self.english_text(10);
            return ColValue::String(truncate(&translate(&text), length));
        }
        if !is_id && (meaning.contains("country") || col_name.contains("country")) {
            return ColValue::String(truncate("대한민국", length));
        }
        if !is_id && (meaning.contains("city") || col_name.contains("city")) {
            let city = dicts::CITIES[self.pick_index(dicts::CITIES.len())];
            return ColValue::String(truncate(city, length));
        }
        if !is_id && (meaning.contains("district") || col_name.contains("district")) {
            let district = dicts::DISTRICTS[self.pick_index(dicts::DISTRICTS.len())];
            return ColValue::String(truncate(district, length));
        }

        // lookup-style tables get a short token plus a discriminator
        if table_name == "language" || table_name == "category" {
            let word = translate(&self.english_text(1));
            let token = format!("{}-{}", word, self.rng.gen_range(0..1000));
            return ColValue::String(truncate(&token, length));
        }

        let words = if length > 0 && length < 20 { 1 } else { 5 };
        let text = self.english_text(words);
        ColValue::String(truncate(&translate(&text), length))
    }

    fn datetime_value(&mut self, data_type: &str, table_name: &str) -> ColValue {
        // postgres partitioned payment tables only accept their own month
        if let Some(caps) = self.partition_suffix.captures(table_name) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            if let Some(start) = NaiveDate::from_ymd_opt(year, month, 1) {
                let month_seconds = start
                    .checked_add_months(Months::new(1))
                    .map(|next| (next - start).num_seconds() - 1)
                    .unwrap_or(0)
                    .max(0);
                let offset = self.rng.gen_range(0..=month_seconds);
                let instant = start.and_hms_opt(0, 0, 0).unwrap() + Duration::seconds(offset);
                return ColValue::String(instant.format("%Y-%m-%d %H:%M:%S").to_string());
            }
        }

        let offset = self.rng.gen_range(0..=SECONDS_PER_YEAR);
        let instant = Utc::now().naive_utc() - Duration::seconds(offset);
        let formatted = match data_type {
            "date" => instant.format("%Y-%m-%d").to_string(),
            "time" => instant.format("%H:%M:%S").to_string(),
            _ => instant.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        ColValue::String(formatted)
    }

    fn integer_value(&mut self, col: &Column, data_type: &str, col_name: &str) -> ColValue {
        if col_name.contains("active")
            || col_name.contains("enabled")
            || col_name.contains("is_")
            || col.meaning.contains("yesno")
        {
            return ColValue::LongLong(self.rng.gen_range(0..=1));
        }

        if data_type.contains("tinyint") {
            return ColValue::LongLong(self.rng.gen_range(0..=127));
        }
        if data_type.contains("smallint") {
            return ColValue::LongLong(self.rng.gen_range(1..=30000));
        }
        if col_name.contains("year") || col.meaning.contains("year") {
            return ColValue::LongLong(self.rng.gen_range(2000..=2025));
        }

        let mut max_val: i64 = 50000;
        if col.length > 0 && col.length < 10 {
            let limit = 10_i64.pow(col.length as u32) - 1;
            if limit < max_val {
                max_val = limit.max(9);
            }
        }
        ColValue::LongLong(self.rng.gen_range(1..=max_val))
    }

    fn price(&mut self) -> f64 {
        let value: f64 = self.rng.gen_range(0.99..=99.99);
        (value * 100.0).round() / 100.0
    }

    fn korean_name(&mut self) -> String {
        format!(
            "{}{}",
            dicts::LAST_NAMES[self.pick_index(dicts::LAST_NAMES.len())],
            dicts::FIRST_NAMES[self.pick_index(dicts::FIRST_NAMES.len())]
        )
    }

    fn korean_address(&mut self) -> String {
        format!(
            "{} {} {} {}번길",
            dicts::CITIES[self.pick_index(dicts::CITIES.len())],
            dicts::DISTRICTS[self.pick_index(dicts::DISTRICTS.len())],
            dicts::STREETS[self.pick_index(dicts::STREETS.len())],
            self.rng.gen_range(1..=100)
        )
    }

    fn korean_phone(&mut self) -> String {
        format!(
            "010-{:04}-{:04}",
            self.rng.gen_range(0..10000),
            self.rng.gen_range(0..10000)
        )
    }

    fn email(&mut self) -> String {
        let word = dicts::ENG_TO_KOR[self.pick_index(dicts::ENG_TO_KOR.len())].0;
        let local: String = word
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let local = if local.is_empty() {
            "user".to_string()
        } else {
            local
        };
        format!(
            "{}{}@{}",
            local,
            self.rng.gen_range(1..1000),
            dicts::EMAIL_DOMAINS[self.pick_index(dicts::EMAIL_DOMAINS.len())]
        )
    }

    fn english_text(&mut self, word_count: usize) -> String {
        let words: Vec<&str> = (0..word_count)
            .map(|_| dicts::ENG_TO_KOR[self.pick_index(dicts::ENG_TO_KOR.len())].0)
            .collect();
        words.join(" ")
    }
}

fn translate(text: &str) -> String {
    text.split(' ')
        .map(dicts::translate_word)
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Truncate by codepoint count, DB length limits count characters.
fn truncate(text: &str, limit: usize) -> String {
    if limit == 0 {
        return text.to_string();
    }
    text.chars().take(limit).collect()
}
