use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub second_name: Option<String>,
    pub last_name: String,
    pub id_number: String,
    #[serde(default)]
    pub contact_number: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        match self.second_name.as_deref().map(str::trim) {
            Some(second) if !second.is_empty() => {
                format!("{} {} {}", self.first_name, second, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Case-insensitive substring match on first name, last name or id number.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.first_name.to_lowercase().contains(&query)
            || self.last_name.to_lowercase().contains(&query)
            || self.id_number.to_lowercase().contains(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        Student {
            id: 1,
            first_name: "Lerato".into(),
            second_name: Some(" ".into()),
            last_name: "Mahlangu".into(),
            id_number: "9001015000081".into(),
            contact_number: None,
        }
    }

    #[test]
    fn blank_second_name_is_left_out() {
        assert_eq!(student().full_name(), "Lerato Mahlangu");
    }

    #[test]
    fn search_ignores_case_and_covers_id_number() {
        let s = student();
        assert!(s.matches("lerATO"));
        assert!(s.matches("hlan"));
        assert!(s.matches("500008"));
        assert!(s.matches("  "));
        assert!(!s.matches("smith"));
    }
}
