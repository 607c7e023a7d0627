//! Person and section identifiers.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REG_ID: Regex = Regex::new(r"^[0-9A-F]{32}$").expect("static pattern");
    static ref NET_ID: Regex = Regex::new(r"(?i)^[a-z][a-z0-9_\-]{0,127}$").expect("static pattern");
    static ref TEMPORARY_NET_ID: Regex =
        Regex::new(r"(?i)^(?:wire|event|lib|lawlib|uwctc)[0-9]{4,}$").expect("static pattern");
    static ref COURSE_GROUP: Regex =
        Regex::new(r"^course_(20[0-9]{2})([a-z]{3})-([a-z\-]+)([0-9]{3})([a-z][a-z0-9]?)$")
            .expect("static pattern");
}

/// Domains whose addresses are accepted as login ids.
pub const LOGIN_DOMAINS: [&str; 1] = ["gmail.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quarter {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Quarter {
    /// Accepts full names and three-letter abbreviations in any case.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.get(..3)? {
            "win" => Some(Quarter::Winter),
            "spr" => Some(Quarter::Spring),
            "sum" => Some(Quarter::Summer),
            "aut" => Some(Quarter::Autumn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quarter::Winter => "winter",
            Quarter::Spring => "spring",
            Quarter::Summer => "summer",
            Quarter::Autumn => "autumn",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionRef {
    pub year: i32,
    pub quarter: Quarter,
    pub curriculum: String,
    pub course_number: String,
    pub section_id: String,
}

impl SectionRef {
    /// `2024-spring-CSE-142-A`
    pub fn course_id(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.year,
            self.quarter,
            self.curriculum.trim().to_uppercase(),
            self.course_number.trim(),
            self.section_id.trim().to_uppercase()
        )
    }

    pub fn term_id(&self) -> String {
        format!("{}-{}", self.year, self.quarter)
    }

    /// The same term with another course and section.
    pub fn sibling(&self, curriculum: &str, course_number: &str, section_id: &str) -> SectionRef {
        SectionRef {
            year: self.year,
            quarter: self.quarter,
            curriculum: curriculum.to_string(),
            course_number: course_number.to_string(),
            section_id: section_id.to_string(),
        }
    }
}

impl fmt::Display for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.course_id())
    }
}

/// Uppercased reg id, or `None` when it is not 32 hex digits.
pub fn normalize_reg_id(raw: &str) -> Option<String> {
    let upper = raw.trim().to_ascii_uppercase();
    REG_ID.is_match(&upper).then_some(upper)
}

/// A personal net id. Temporary event and library accounts are refused.
pub fn is_valid_net_id(raw: &str) -> bool {
    !raw.is_empty() && NET_ID.is_match(raw) && !TEMPORARY_NET_ID.is_match(raw)
}

/// A net id, or an address in one of [`LOGIN_DOMAINS`].
pub fn is_valid_login_id(raw: &str) -> bool {
    if is_valid_net_id(raw) {
        return true;
    }
    let lower = raw.to_ascii_lowercase();
    let Some((user, domain)) = lower.split_once('@') else {
        return false;
    };
    let user = user.split('+').next().unwrap_or_default().replace('.', "");
    !user.is_empty() && LOGIN_DOMAINS.contains(&domain)
}

/// Course id for a course group name such as `course_2024spr-cse142a`.
pub fn course_group_id(group: &str) -> Option<String> {
    let caps = COURSE_GROUP.captures(group)?;
    let quarter = Quarter::parse(&caps[2])?;
    Some(format!(
        "{}-{}-{}-{}-{}",
        &caps[1],
        quarter,
        caps[3].replace('-', " ").to_uppercase(),
        &caps[4],
        caps[5].to_uppercase()
    ))
}
