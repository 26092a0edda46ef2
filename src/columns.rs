use crate::error::{ImportError, Result};
use crate::normalize::normalize;

/// Logical fields a dean's-list sheet is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    StudentName,
    StudentId,
    Gpa,
    Major,
    PassedCredits,
    RegisteredCredits,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::StudentName,
        Field::StudentId,
        Field::Gpa,
        Field::Major,
        Field::PassedCredits,
        Field::RegisteredCredits,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::StudentName => "student name",
            Field::StudentId => "student id",
            Field::Gpa => "gpa",
            Field::Major => "major",
            Field::PassedCredits => "passed credits",
            Field::RegisteredCredits => "registered credits",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Field::StudentName | Field::StudentId)
    }

    /// Accepted spellings, in priority order for exact matching.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::StudentName => STUDENT_NAME_ALIASES,
            Field::StudentId => STUDENT_ID_ALIASES,
            Field::Gpa => GPA_ALIASES,
            Field::Major => MAJOR_ALIASES,
            Field::PassedCredits => PASSED_CREDITS_ALIASES,
            Field::RegisteredCredits => REGISTERED_CREDITS_ALIASES,
        }
    }
}

// Real-world labels seen in published sheets, misspellings included.
const PASSED_CREDITS_ALIASES: &[&str] = &[
    "الوحدات الكلية المجتازة",
    "الوحدات المجتازة",
    "الوحدات المجتازه",
    "الوحدات الكليه المجتازه",
    "الوحدات الكليه المجتازة",
    "الوحدات الكليه المجتازه",
    "الوحدات المكتسبة",
    "الوحدات المكتسبه",
    "الوحدات المنجزة",
    "الوحدات المنجزه",
];

const STUDENT_NAME_ALIASES: &[&str] = &[
    "اسم الطالب",
    "اسم الطالبة",
    "اسم الطالب/ة",
    "الاسم",
    "الإسم",
    "أسم الطالب",
    "إسم الطالب",
    "Student Name",
    "Name",
];

const STUDENT_ID_ALIASES: &[&str] = &[
    "رقم الطالب",
    "رقم الطالبة",
    "رقم الطالب/ة",
    "الرقم الجامعي",
    "الرقم الجامعى",
    "رقم الهوية",
    "رقم الهويه",
    "Student ID",
    "ID",
];

const GPA_ALIASES: &[&str] = &[
    "المعدل العام",
    "المعدل",
    "المعدل التراكمي",
    "المعدل التراكمى",
    "GPA",
    "Grade Point Average",
];

const MAJOR_ALIASES: &[&str] = &["التخصص", "التخصص الدراسي", "Major"];

const REGISTERED_CREDITS_ALIASES: &[&str] =
    &["الوحدات المسجلة", "الوحدات المسجله", "Registered Credits"];

/// Index of the column bound to `field`, if any.
///
/// Exact label matches win over normalized ones, so a sheet carrying both
/// `الاسم` and a variant spelling binds the exact one.
pub fn resolve(field: Field, labels: &[String]) -> Option<usize> {
    for alias in field.aliases() {
        if let Some(idx) = labels.iter().position(|l| l == alias) {
            return Some(idx);
        }
    }

    let wanted: Vec<String> = field.aliases().iter().map(|a| normalize(a)).collect();
    labels
        .iter()
        .position(|l| wanted.contains(&normalize(l)))
}

/// Resolved column index per logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub student_name: usize,
    pub student_id: usize,
    pub gpa: Option<usize>,
    pub major: Option<usize>,
    pub passed_credits: Option<usize>,
    pub registered_credits: Option<usize>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::StudentName => Some(self.student_name),
            Field::StudentId => Some(self.student_id),
            Field::Gpa => self.gpa,
            Field::Major => self.major,
            Field::PassedCredits => self.passed_credits,
            Field::RegisteredCredits => self.registered_credits,
        }
    }
}

/// Bind every field, failing when a required one is missing.
pub fn resolve_all(labels: &[String]) -> Result<ColumnMap> {
    let required = |field: Field| {
        resolve(field, labels).ok_or_else(|| ImportError::MissingColumn {
            field: field.label(),
            available: labels.to_vec(),
        })
    };

    Ok(ColumnMap {
        student_name: required(Field::StudentName)?,
        student_id: required(Field::StudentId)?,
        gpa: resolve(Field::Gpa, labels),
        major: resolve(Field::Major, labels),
        passed_credits: resolve(Field::PassedCredits, labels),
        registered_credits: resolve(Field::RegisteredCredits, labels),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_beats_earlier_normalized_match() {
        // "الأسم" is not an alias but normalizes to "الاسم"; the exact label
        // appears later in the sheet and must still win.
        let l = labels(&["الأسم", "رقم الطالب", "الاسم"]);
        assert_eq!(resolve(Field::StudentName, &l), Some(2));

        let l = labels(&["الأسم", "رقم الطالب"]);
        assert_eq!(resolve(Field::StudentName, &l), Some(0));

        let l = labels(&["أسم الطالب ", "اسم الطالب"]);
        assert_eq!(resolve(Field::StudentName, &l), Some(1));
    }

    #[test]
    fn alias_order_decides_between_exact_matches() {
        let l = labels(&["Name", "اسم الطالب"]);
        assert_eq!(resolve(Field::StudentName, &l), Some(1));
    }

    #[test]
    fn normalized_match_handles_spelling_variants() {
        let l = labels(&["الاسم", "الرقم الجامعى", "المعدل  التراكمى", "الوحدات الكليه المجتازه"]);
        assert_eq!(resolve(Field::StudentId, &l), Some(1));
        assert_eq!(resolve(Field::Gpa, &l), Some(2));
        assert_eq!(resolve(Field::PassedCredits, &l), Some(3));
        assert_eq!(resolve(Field::Major, &l), None);

        let l = labels(&["الوحدات الكلية المجتازة\u{00A0}"]);
        assert_eq!(resolve(Field::PassedCredits, &l), Some(0));
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let l = labels(&["Student Name", "GPA", "Major"]);
        match resolve_all(&l) {
            Err(ImportError::MissingColumn { field, available }) => {
                assert_eq!(field, "student id");
                assert_eq!(available, l);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn optional_fields_may_be_unresolved() {
        let l = labels(&["Student ID", "Student Name", "Unnamed_2"]);
        let map = resolve_all(&l).expect("resolve");
        assert_eq!(map.student_id, 0);
        assert_eq!(map.student_name, 1);
        assert_eq!(map.gpa, None);
        assert_eq!(map.get(Field::RegisteredCredits), None);
    }

    #[test]
    fn every_field_has_aliases() {
        for f in Field::ALL {
            assert!(!f.aliases().is_empty(), "{f:?}");
        }
        assert!(Field::StudentName.is_required());
        assert!(!Field::Gpa.is_required());
    }
}
