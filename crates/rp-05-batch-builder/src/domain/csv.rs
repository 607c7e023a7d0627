//! CSV encoding for export files.
//!
//! Lines end in `\n`. A field is quoted when it contains a comma, a double
//! quote, a carriage return or a newline; embedded quotes are doubled.

use std::borrow::Cow;
use std::fmt;

/// The files an artifact may hold, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExportFile {
    Users,
    Courses,
    Sections,
    Enrollments,
    GroupEnrollments,
}

impl ExportFile {
    pub const ALL: [ExportFile; 5] = [
        ExportFile::Users,
        ExportFile::Courses,
        ExportFile::Sections,
        ExportFile::Enrollments,
        ExportFile::GroupEnrollments,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ExportFile::Users => "users.csv",
            ExportFile::Courses => "courses.csv",
            ExportFile::Sections => "sections.csv",
            ExportFile::Enrollments => "enrollments.csv",
            ExportFile::GroupEnrollments => "group_enrollments.csv",
        }
    }

    pub fn header(self) -> &'static [&'static str] {
        match self {
            ExportFile::Users => &[
                "user_id",
                "login_id",
                "full_name",
                "sortable_name",
                "email",
                "status",
            ],
            ExportFile::Courses => &[
                "course_id",
                "short_name",
                "long_name",
                "account_id",
                "term_id",
                "status",
            ],
            ExportFile::Sections => &["section_id", "course_id", "name", "status"],
            ExportFile::Enrollments => &[
                "course_id",
                "root_account",
                "user_id",
                "role",
                "role_id",
                "section_id",
                "status",
                "associated_user_id",
            ],
            ExportFile::GroupEnrollments => &["course_id", "group_id", "role", "status"],
        }
    }
}

impl fmt::Display for ExportFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

pub fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// One encoded line, terminator included.
pub fn line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = fields
        .iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    out
}
