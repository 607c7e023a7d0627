//! Event families and the envelope profile each one expects.

use std::fmt;
use std::str::FromStr;

use rp_01_message_envelope::{EnvelopeProfile, HeaderStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    Enrollment,
    InstructorAdd,
    InstructorDrop,
    Group,
    Person,
}

impl EventFamily {
    pub const ALL: [EventFamily; 5] = [
        EventFamily::Enrollment,
        EventFamily::InstructorAdd,
        EventFamily::InstructorDrop,
        EventFamily::Group,
        EventFamily::Person,
    ];

    /// Name of the message queue the family is read from.
    pub fn queue_name(self) -> &'static str {
        match self {
            EventFamily::Enrollment => "enrollment",
            EventFamily::InstructorAdd => "instructor-add",
            EventFamily::InstructorDrop => "instructor-drop",
            EventFamily::Group => "group",
            EventFamily::Person => "person",
        }
    }

    /// Frequency log and metrics label. Both instructor queues share one.
    pub fn log_source(self) -> &'static str {
        match self {
            EventFamily::Enrollment => "enrollment",
            EventFamily::InstructorAdd | EventFamily::InstructorDrop => "instructor",
            EventFamily::Group => "group",
            EventFamily::Person => "person",
        }
    }

    pub fn profile(self) -> EnvelopeProfile {
        let (message_type, version, style) = match self {
            EventFamily::Enrollment => ("uw-student-registration-v2", "2", HeaderStyle::Standard),
            EventFamily::InstructorAdd => ("uw-instructor-add", "1", HeaderStyle::Standard),
            EventFamily::InstructorDrop => ("uw-instructor-drop", "1", HeaderStyle::Standard),
            EventFamily::Group => ("gws", "UWIT-1", HeaderStyle::Group),
            EventFamily::Person => ("uw-person-change-v1", "1", HeaderStyle::Standard),
        };
        EnvelopeProfile {
            message_type,
            version,
            style,
        }
    }
}

impl fmt::Display for EventFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.queue_name())
    }
}

impl FromStr for EventFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventFamily::ALL
            .into_iter()
            .find(|f| f.queue_name() == s)
            .ok_or_else(|| format!("unknown event family: {s}"))
    }
}
