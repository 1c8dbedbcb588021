//! Text buffers behind the marks grid and their conversion to patches.

use services::subject_result_service::{MarksPatch, SubjectResult};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkField {
    Theory,
    Practical,
}

impl MarkField {
    pub const ALL: [MarkField; 2] = [MarkField::Theory, MarkField::Practical];

    pub fn as_str(self) -> &'static str {
        match self {
            MarkField::Theory => "theory",
            MarkField::Practical => "practical",
        }
    }
}

impl fmt::Display for MarkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "theory" | "t" => Ok(MarkField::Theory),
            "practical" | "p" => Ok(MarkField::Practical),
            other => Err(format!("unknown mark field '{other}' (expected theory or practical)")),
        }
    }
}

/// Trimmed input parsed as a finite number; anything else is no value at all.
pub fn parse_mark(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Null becomes an empty cell; whole numbers drop their decimals.
pub fn format_mark(mark: Option<f64>) -> String {
    match mark {
        None => String::new(),
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => v.to_string(),
    }
}

/// What the operator sees (and types) for one cell, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarksEdit {
    pub theory: String,
    pub practical: String,
}

impl MarksEdit {
    pub fn from_row(row: &SubjectResult) -> Self {
        Self {
            theory: format_mark(row.theory_marks),
            practical: format_mark(row.practical_marks),
        }
    }

    pub fn get(&self, field: MarkField) -> &str {
        match field {
            MarkField::Theory => &self.theory,
            MarkField::Practical => &self.practical,
        }
    }

    pub fn set(&mut self, field: MarkField, value: impl Into<String>) {
        match field {
            MarkField::Theory => self.theory = value.into(),
            MarkField::Practical => self.practical = value.into(),
        }
    }

    /// Fields that hold a number and differ from what `stored` has.
    ///
    /// Blank or unparseable text is left out, so it can never clear or zero a
    /// stored mark.
    pub fn patch_against(&self, stored: Option<&SubjectResult>) -> MarksPatch {
        let changed = |text: &str, current: Option<f64>| parse_mark(text).filter(|v| Some(*v) != current);
        MarksPatch {
            theory_marks: changed(&self.theory, stored.and_then(|r| r.theory_marks)),
            practical_marks: changed(&self.practical, stored.and_then(|r| r.practical_marks)),
        }
    }
}
