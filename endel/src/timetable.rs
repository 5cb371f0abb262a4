//! Weekly class timetable and subject catalog.
//!
//! Both are read from the `[timetable]` section of the client config file:
//!
//! ```toml
//! [timetable]
//! days = ["MON", "TUE", "WED", "THU", "FRI"]
//!
//! [[timetable.slots]]
//! time = "07:15 - 08:20"
//! subjects = ["MAT", "CHEM", "CIVICS", "CHEM", "HIST"]
//!
//! [[timetable.subjects]]
//! code = "MAT"
//! teacher = "J. Doe"
//! ```

use std::io::{self, Write};

use crossterm::style::Stylize;

/// Width of the time column when rendering.
const TIME_COLUMN_WIDTH: usize = 18;

/// Width of each day column when rendering.
const DAY_COLUMN_WIDTH: usize = 12;

/// A subject tasks can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Subject {
    /// Short code shown in the timetable (e.g. `MAT`).
    pub code: String,
    /// Person teaching it, if known.
    #[serde(default)]
    pub teacher: Option<String>,
}

/// One row of the timetable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Slot {
    /// Time range label, e.g. `07:15 - 08:20`.
    pub time: String,
    /// Subject code per day, in the same order as [`Timetable::days`].
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Weekly timetable plus the subject catalog.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Timetable {
    /// Column headers.
    pub days: Vec<String>,
    /// Rows, top to bottom.
    pub slots: Vec<Slot>,
    /// Subject catalog in file order.
    pub subjects: Vec<Subject>,
}

impl Default for Timetable {
    fn default() -> Self {
        Self {
            days: ["MON", "TUE", "WED", "THU", "FRI"]
                .into_iter()
                .map(String::from)
                .collect(),
            slots: Vec::new(),
            subjects: Vec::new(),
        }
    }
}

impl Timetable {
    /// Whether there are no rows to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The subject catalog.
    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Looks up a subject by code, ignoring case.
    #[must_use]
    pub fn subject(&self, code: &str) -> Option<&Subject> {
        self.subjects
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
    }

    /// Writes the timetable as a fixed-width grid.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        let mut header = format!("{:<TIME_COLUMN_WIDTH$}", "Time");
        for day in &self.days {
            header.push_str(&format!("{day:<DAY_COLUMN_WIDTH$}"));
        }
        writeln!(out, "{}", header.dark_grey())?;
        let rule_width = TIME_COLUMN_WIDTH + DAY_COLUMN_WIDTH * self.days.len();
        writeln!(out, "{}", "-".repeat(rule_width).dark_grey())?;

        for slot in &self.slots {
            let mut row = String::new();
            for subject in &slot.subjects {
                row.push_str(&format!("{subject:<DAY_COLUMN_WIDTH$}"));
            }
            writeln!(
                out,
                "{}{}",
                format!("{:<TIME_COLUMN_WIDTH$}", slot.time).cyan(),
                row
            )?;
        }
        Ok(())
    }
}
