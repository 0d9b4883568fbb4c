use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::grades::{self, DEFAULT_GRADE};

pub const DEFAULT_CREDITS: i64 = 4;

/// Semesters beyond the 8th stay in year 4.
const MAX_YEAR: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default, deserialize_with = "lenient_credits")]
    pub credits: i64,
}

impl Default for Subject {
    fn default() -> Self {
        Self {
            name: String::new(),
            grade: DEFAULT_GRADE.to_string(),
            credits: DEFAULT_CREDITS,
        }
    }
}

impl Subject {
    /// Grade points times credits, the numerator contribution of this row.
    pub fn quality_points(&self) -> i64 {
        grades::points_for(&self.grade).saturating_mul(self.credits)
    }
}

// Older snapshots may carry `null` (a failed parseInt) or a numeric string.
fn lenient_credits<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    #[serde(default)]
    pub year: i64,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl Semester {
    pub fn empty(semester_no: usize) -> Self {
        Self {
            year: year_for(semester_no),
            subjects: Vec::new(),
        }
    }
}

/// Academic year of a 1-based semester number: sems 1-2 are year 1, 3-4 year 2, capped at 4.
pub fn year_for(semester_no: usize) -> i64 {
    let year = (semester_no as i64 + 1) / 2;
    year.clamp(1, MAX_YEAR)
}

/// One field edit on a subject row. Values are already coerced by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectField {
    Name(String),
    Grade(String),
    Credits(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    SubjectNotFound { index: usize, len: usize },
    SemesterNotFound { semester: usize, count: usize },
    ConfirmationRequired,
}

impl RecordError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SubjectNotFound { .. } | Self::SemesterNotFound { .. } => "not_found",
            Self::ConfirmationRequired => "confirmation_required",
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubjectNotFound { index, len } => write!(
                f,
                "subject index {index} out of range (current semester has {len} subjects)"
            ),
            Self::SemesterNotFound { semester, count } => {
                write!(f, "semester {semester} out of range (1..={count})")
            }
            Self::ConfirmationRequired => write!(f, "operation requires explicit confirmation"),
        }
    }
}

impl std::error::Error for RecordError {}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterGpa {
    pub semester: usize,
    pub year: i64,
    pub sgpa: f64,
    pub total_credits: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeGpa {
    pub cgpa: f64,
    pub total_credits: i64,
    pub total_points: i64,
    pub semesters_with_subjects: usize,
    pub total_subjects: usize,
}

/// One user's semesters plus the 1-based pointer to the semester being edited.
///
/// Always holds at least one semester and `current_semester` is always in
/// `1..=semesters.len()`; every constructor and mutator keeps it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicRecord {
    semesters: Vec<Semester>,
    current_semester: usize,
}

impl AcademicRecord {
    /// A single empty semester; what `reset_all` leaves behind.
    pub fn empty() -> Self {
        Self {
            semesters: vec![Semester::empty(1)],
            current_semester: 1,
        }
    }

    /// First screen for a user with nothing stored: one semester, one default subject.
    pub fn starter() -> Self {
        Self {
            semesters: vec![Semester {
                year: 1,
                subjects: vec![Subject::default()],
            }],
            current_semester: 1,
        }
    }

    /// Rebuild from stored parts, repairing anything that breaks the invariants.
    pub fn from_parts(mut semesters: Vec<Semester>, current_semester: Option<i64>) -> Self {
        for (i, sem) in semesters.iter_mut().enumerate() {
            if sem.year <= 0 {
                sem.year = year_for(i + 1);
            }
        }
        if semesters.is_empty() {
            semesters.push(Semester::empty(1));
        }
        let count = semesters.len() as i64;
        let current = match current_semester {
            Some(n) if n >= 1 => n.min(count),
            _ => 1,
        };
        Self {
            semesters,
            current_semester: current as usize,
        }
    }

    pub fn semesters(&self) -> &[Semester] {
        &self.semesters
    }

    pub fn current_semester(&self) -> usize {
        self.current_semester
    }

    pub fn current(&self) -> &Semester {
        &self.semesters[self.current_semester - 1]
    }

    fn current_mut(&mut self) -> &mut Semester {
        let idx = self.current_semester - 1;
        &mut self.semesters[idx]
    }

    pub fn add_subject(&mut self) {
        self.current_mut().subjects.push(Subject::default());
    }

    pub fn delete_subject(&mut self, index: usize) -> Result<Subject, RecordError> {
        let subjects = &mut self.current_mut().subjects;
        if index >= subjects.len() {
            return Err(RecordError::SubjectNotFound {
                index,
                len: subjects.len(),
            });
        }
        Ok(subjects.remove(index))
    }

    pub fn update_subject(&mut self, index: usize, field: SubjectField) -> Result<(), RecordError> {
        let subjects = &mut self.current_mut().subjects;
        let len = subjects.len();
        let Some(subject) = subjects.get_mut(index) else {
            return Err(RecordError::SubjectNotFound { index, len });
        };
        match field {
            SubjectField::Name(name) => subject.name = name,
            SubjectField::Grade(grade) => subject.grade = grade,
            SubjectField::Credits(credits) => subject.credits = credits,
        }
        Ok(())
    }

    pub fn switch_semester(&mut self, semester: usize) -> Result<(), RecordError> {
        let count = self.semesters.len();
        if semester == 0 || semester > count {
            return Err(RecordError::SemesterNotFound { semester, count });
        }
        self.current_semester = semester;
        Ok(())
    }

    /// Append an empty semester and make it current. Returns its 1-based number.
    pub fn add_new_semester(&mut self) -> usize {
        let semester_no = self.semesters.len() + 1;
        self.semesters.push(Semester::empty(semester_no));
        self.current_semester = semester_no;
        semester_no
    }

    pub fn clear_current_semester(&mut self) {
        self.current_mut().subjects.clear();
    }

    /// Replace everything with one empty semester. The caller must have confirmed.
    pub fn reset_all(&mut self, confirmed: bool) -> Result<(), RecordError> {
        if !confirmed {
            return Err(RecordError::ConfirmationRequired);
        }
        *self = Self::empty();
        Ok(())
    }

    pub fn total_subjects(&self) -> usize {
        self.semesters.iter().map(|s| s.subjects.len()).sum()
    }

    pub fn compute_sgpa(&self) -> SemesterGpa {
        let sem = self.current();
        let (total_points, total_credits) = totals(&sem.subjects);
        SemesterGpa {
            semester: self.current_semester,
            year: sem.year,
            sgpa: grades::weighted_average(total_points, total_credits),
            total_credits,
            total_points,
        }
    }

    pub fn compute_cgpa(&self) -> CumulativeGpa {
        let (total_points, total_credits) =
            totals(self.semesters.iter().flat_map(|s| s.subjects.iter()));
        CumulativeGpa {
            cgpa: grades::weighted_average(total_points, total_credits),
            total_credits,
            total_points,
            semesters_with_subjects: self
                .semesters
                .iter()
                .filter(|s| !s.subjects.is_empty())
                .count(),
            total_subjects: self.total_subjects(),
        }
    }
}

fn totals<'a, I>(subjects: I) -> (i64, i64)
where
    I: IntoIterator<Item = &'a Subject>,
{
    subjects
        .into_iter()
        .fold((0, 0), |(points, credits), s| {
            (
                points.saturating_add(s.quality_points()),
                credits.saturating_add(s.credits),
            )
        })
}
