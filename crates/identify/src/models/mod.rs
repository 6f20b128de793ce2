mod identity;
mod label;
mod record;

pub use self::identity::{Identity, Sessions};
pub use self::label::{SESSION_PREFIX, SUBJECT_PREFIX, normalize_session, normalize_subject};
pub use self::record::IdentityRecord;
