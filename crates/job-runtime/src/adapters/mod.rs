//! HTTP implementations of the subsystems' outbound ports.

pub mod certificates;
pub mod http;
pub mod keys;
pub mod lms;
pub mod roster;

pub use certificates::HttpCertificates;
pub use http::{HttpClient, HttpError};
pub use keys::HttpKeyMaterial;
pub use lms::HttpLms;
pub use roster::HttpRoster;
