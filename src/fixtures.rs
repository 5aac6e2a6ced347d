//! In-memory survey builder for tests. Surveys go through the real CSV
//! loader so schema discovery and region resolution are exercised too.

use crate::loader::{
    SurveyData, COL_AGE, COL_AREA, COL_COMPANION, COL_GENDER, COL_HOME, COL_INCOME,
    COL_MASUZUSHI_VENUE, COL_NIGHTS, COL_NPS, COL_REVISIT, COL_SUSHI_VENUE, COL_VISITS,
    SATISFACTION_COLUMNS, SPEND_COLUMNS,
};

#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.cells.iter_mut().find(|(c, _)| c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column.to_string(), value)),
        }
        self
    }

    pub fn home(self, v: impl ToString) -> Self {
        self.set(COL_HOME, v)
    }

    pub fn area(self, v: i64) -> Self {
        self.set(COL_AREA, v)
    }

    /// Shorthand for a Toyama respondent.
    pub fn toyama() -> Self {
        Row::new().home(1).area(1)
    }

    pub fn gender(self, v: i64) -> Self {
        self.set(COL_GENDER, v)
    }

    pub fn age(self, v: i64) -> Self {
        self.set(COL_AGE, v)
    }

    pub fn income(self, v: i64) -> Self {
        self.set(COL_INCOME, v)
    }

    pub fn companion(self, v: i64) -> Self {
        self.set(COL_COMPANION, v)
    }

    pub fn nights(self, v: f64) -> Self {
        self.set(COL_NIGHTS, v)
    }

    pub fn visits(self, v: i64) -> Self {
        self.set(COL_VISITS, v)
    }

    pub fn nps(self, v: i64) -> Self {
        self.set(COL_NPS, v)
    }

    pub fn revisit(self, v: f64) -> Self {
        self.set(COL_REVISIT, v)
    }

    pub fn sushi(self, v: i64) -> Self {
        self.set(COL_SUSHI_VENUE, v)
    }

    pub fn masuzushi(self, v: i64) -> Self {
        self.set(COL_MASUZUSHI_VENUE, v)
    }

    pub fn spend(mut self, amounts: [i64; 5]) -> Self {
        for (col, v) in SPEND_COLUMNS.iter().zip(amounts) {
            self = self.set(col, v);
        }
        self
    }

    pub fn satisfaction(mut self, scores: [f64; 6]) -> Self {
        for (col, v) in SATISFACTION_COLUMNS.iter().zip(scores) {
            self = self.set(col, v);
        }
        self
    }
}

/// Build a survey whose header holds every fixed column, then `extra`
/// columns, then any further columns named by `rows`.
pub fn survey(extra: &[&str], rows: &[Row]) -> SurveyData {
    let mut headers: Vec<String> = [
        COL_HOME,
        COL_AREA,
        COL_GENDER,
        COL_AGE,
        COL_INCOME,
        COL_COMPANION,
        COL_NIGHTS,
        COL_VISITS,
        COL_NPS,
        COL_REVISIT,
        COL_SUSHI_VENUE,
        COL_MASUZUSHI_VENUE,
    ]
    .iter()
    .chain(SPEND_COLUMNS.iter())
    .chain(SATISFACTION_COLUMNS.iter())
    .chain(extra.iter())
    .map(|s| s.to_string())
    .collect();
    for row in rows {
        for (c, _) in &row.cells {
            if !headers.contains(c) {
                headers.push(c.clone());
            }
        }
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&headers).unwrap();
    for row in rows {
        let record: Vec<&str> = headers
            .iter()
            .map(|h| {
                row.cells
                    .iter()
                    .find(|(c, _)| c == h)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("")
            })
            .collect();
        wtr.write_record(&record).unwrap();
    }
    let bytes = wtr.into_inner().unwrap();
    SurveyData::from_reader(bytes.as_slice()).unwrap().0
}
