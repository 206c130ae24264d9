use std::fmt::{Display, Formatter};

/// How confident a parse is.
///
/// The ordering is significant: `Valid < Incomplete < Error`, so the worst of
/// several statuses is simply the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    /// The input is acceptable as it stands.
    #[default]
    Valid,
    /// The input could become valid with more typing.
    Incomplete,
    /// The input cannot become valid without deleting something.
    Error,
}

impl Status {
    /// Returns the worst status of the set, `Valid` for an empty set.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::status::Status;
    ///
    /// let worst = Status::combine([Status::Valid, Status::Error, Status::Incomplete]);
    /// assert_eq!(worst, Status::Error);
    /// assert_eq!(Status::combine([]), Status::Valid);
    /// ```
    pub fn combine<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
        statuses.into_iter().max().unwrap_or(Status::Valid)
    }

    /// The worse of `self` and `other`.
    #[must_use]
    pub fn worst(self, other: Status) -> Status {
        self.max(other)
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Status::Valid
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Valid => f.write_str("VALID"),
            Status::Incomplete => f.write_str("INCOMPLETE"),
            Status::Error => f.write_str("ERROR"),
        }
    }
}
