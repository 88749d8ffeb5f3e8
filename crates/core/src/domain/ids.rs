use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            pub fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self::from_uuid(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.into_inner()
            }
        }
    };
}

define_id_type!(UserId);
define_id_type!(StudentId);
define_id_type!(ClassId);
define_id_type!(SubjectId);
define_id_type!(TermId);
define_id_type!(AcademicSessionId);
define_id_type!(SubmissionId);
define_id_type!(ResultId);

/// The unit over which ranking runs: one class in one term of one academic session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CohortKey {
    pub class_id: ClassId,
    pub term_id: TermId,
    pub session_id: AcademicSessionId,
}

impl CohortKey {
    pub fn new(class_id: ClassId, term_id: TermId, session_id: AcademicSessionId) -> Self {
        Self {
            class_id,
            term_id,
            session_id,
        }
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.class_id, self.term_id, self.session_id)
    }
}

/// Teacher-independent identity of a grade sheet. At most one non-rejected
/// submission exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionKey {
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub term_id: TermId,
    pub session_id: AcademicSessionId,
}

impl SubmissionKey {
    pub fn new(
        class_id: ClassId,
        subject_id: SubjectId,
        term_id: TermId,
        session_id: AcademicSessionId,
    ) -> Self {
        Self {
            class_id,
            subject_id,
            term_id,
            session_id,
        }
    }

    pub fn cohort(&self) -> CohortKey {
        CohortKey::new(self.class_id, self.term_id, self.session_id)
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.class_id, self.subject_id, self.term_id, self.session_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_id_can_roundtrip_from_string() {
        let id = StudentId::new();
        let parsed: StudentId = id
            .to_string()
            .parse()
            .expect("generated student id should be valid");

        assert_eq!(id, parsed);
    }

    #[test]
    fn submission_key_projects_onto_its_cohort() {
        let key = SubmissionKey::new(
            ClassId::new(),
            SubjectId::new(),
            TermId::new(),
            AcademicSessionId::new(),
        );

        let cohort = key.cohort();
        assert_eq!(cohort.class_id, key.class_id);
        assert_eq!(cohort.term_id, key.term_id);
        assert_eq!(cohort.session_id, key.session_id);
    }
}
