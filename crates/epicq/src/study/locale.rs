use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Language used when rendering user-facing messages and dates.
///
/// Passed explicitly to every formatter; there is no process-wide locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "es" | "es-ar" | "es_ar" => Some(Self::Es),
            "en" | "en-us" | "en_us" => Some(Self::En),
            _ => None,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    pub fn format_date(self, date: NaiveDate) -> String {
        match self {
            Self::Es => date.format("%d/%m/%Y").to_string(),
            Self::En => date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn format_range(self, start: NaiveDate, end: NaiveDate) -> String {
        match self {
            Self::Es => format!("{} al {}", self.format_date(start), self.format_date(end)),
            Self::En => format!("{} to {}", self.format_date(start), self.format_date(end)),
        }
    }

    pub fn format_percentage(self, value: u8) -> String {
        match self {
            Self::Es => format!("{value} %"),
            Self::En => format!("{value}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_dates_per_locale() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).expect("valid date");
        assert_eq!(Locale::Es.format_date(date), "09/03/2025");
        assert_eq!(Locale::En.format_date(date), "2025-03-09");
    }

    #[test]
    fn parses_regional_codes() {
        assert_eq!(Locale::parse("es-AR"), Some(Locale::Es));
        assert_eq!(Locale::parse(" EN "), Some(Locale::En));
        assert_eq!(Locale::parse("pt"), None);
    }
}
