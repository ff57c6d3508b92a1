//! User profile data model.
//!
//! Profiles carry the two halves of the follow relation as independent
//! sets. Nothing here keeps them in sync across users; see
//! [`crate::domain::membership`] for the reconciliation rules.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Validation errors returned by the user constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// The identifier was empty.
    EmptyId,
    /// The identifier carried surrounding whitespace.
    InvalidId,
    /// The display name was blank.
    EmptyDisplayName,
    /// The display name exceeded the maximum length.
    DisplayNameTooLong {
        /// Maximum permitted characters.
        max: usize,
    },
    /// The handle was blank once whitespace was removed.
    EmptyHandle,
    /// The handle contained whitespace.
    HandleContainsWhitespace,
    /// The photo reference was not an absolute URL.
    InvalidPhotoUrl,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must not contain surrounding whitespace"),
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
            Self::DisplayNameTooLong { max } => {
                write!(f, "display name must be at most {max} characters")
            }
            Self::EmptyHandle => write!(f, "handle must not be empty"),
            Self::HandleContainsWhitespace => write!(f, "handle must not contain whitespace"),
            Self::InvalidPhotoUrl => write!(f, "photo reference must be an absolute URL"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Opaque account identifier owned by the authentication provider.
///
/// The provider decides the format, so the only checks are non-emptiness
/// and the absence of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 64;

/// Human readable display name for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`] from owned input.
    pub fn new(display_name: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(display_name.into())
    }

    fn from_owned(display_name: String) -> Result<Self, UserValidationError> {
        if display_name.trim().is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        if display_name.chars().count() > DISPLAY_NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self(display_name))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_regex() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| {
        Regex::new(r"\s+")
            .unwrap_or_else(|error| panic!("whitespace regex failed to compile: {error}"))
    })
}

/// Public, human-chosen username distinct from the account identifier.
///
/// Handles should be unique but nothing enforces it; lookups by handle
/// return the first match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Validate an explicitly chosen handle.
    pub fn new(handle: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(handle.into())
    }

    /// Derive a handle from a display name: lowercase with all whitespace
    /// removed.
    ///
    /// # Examples
    /// ```
    /// use gather::domain::{DisplayName, Handle};
    ///
    /// let name = DisplayName::new("Ada  Lovelace").expect("valid name");
    /// assert_eq!(Handle::derive_from(&name).as_ref(), "adalovelace");
    /// ```
    #[must_use]
    pub fn derive_from(display_name: &DisplayName) -> Self {
        let lowered = display_name.as_ref().to_lowercase();
        Self(whitespace_regex().replace_all(&lowered, "").into_owned())
    }

    fn from_owned(handle: String) -> Result<Self, UserValidationError> {
        if handle.trim().is_empty() {
            return Err(UserValidationError::EmptyHandle);
        }
        if whitespace_regex().is_match(&handle) {
            return Err(UserValidationError::HandleContainsWhitespace);
        }
        Ok(Self(handle))
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Handle> for String {
    fn from(value: Handle) -> Self {
        value.0
    }
}

impl TryFrom<String> for Handle {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Parse an optional photo reference, treating blank input as absent.
pub fn parse_photo_url(raw: Option<&str>) -> Result<Option<Url>, UserValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Url::parse(value)
            .map(Some)
            .map_err(|_| UserValidationError::InvalidPhotoUrl),
    }
}

/// Which half of the follow relation a set operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationField {
    /// Users following the profile owner.
    Followers,
    /// Users the profile owner follows.
    Following,
}

impl fmt::Display for RelationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Followers => f.write_str("followers"),
            Self::Following => f.write_str("following"),
        }
    }
}

/// User profile record.
///
/// ## Invariants
/// - `followers` and `following` never contain duplicates.
/// - `handle` contains no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserDto", into = "UserDto")]
pub struct User {
    id: UserId,
    display_name: DisplayName,
    handle: Handle,
    photo_url: Option<Url>,
    bio: String,
    followers: BTreeSet<UserId>,
    following: BTreeSet<UserId>,
}

impl User {
    /// Build the profile created at signup: derived handle, empty bio, and
    /// empty relation sets.
    #[must_use]
    pub fn signup(id: UserId, display_name: DisplayName, photo_url: Option<Url>) -> Self {
        let handle = Handle::derive_from(&display_name);
        Self {
            id,
            display_name,
            handle,
            photo_url,
            bio: String::new(),
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
        }
    }

    /// Fallible constructor from string inputs, used by fixtures and
    /// adapters that receive raw documents.
    pub fn try_from_strings(
        id: impl AsRef<str>,
        display_name: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self::signup(
            UserId::new(id)?,
            DisplayName::new(display_name)?,
            None,
        ))
    }

    /// Replace the handle with an explicitly chosen one.
    #[must_use]
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = handle;
        self
    }

    /// Replace the display name. The handle is left as it is.
    #[must_use]
    pub fn with_display_name(mut self, display_name: DisplayName) -> Self {
        self.display_name = display_name;
        self
    }

    /// Replace the avatar reference.
    #[must_use]
    pub fn with_photo_url(mut self, photo_url: Url) -> Self {
        self.photo_url = Some(photo_url);
        self
    }

    /// Replace the biography text.
    #[must_use]
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    /// Stable user identifier.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Display name shown to other users.
    #[must_use]
    pub const fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    /// Public handle.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Avatar reference, if any.
    #[must_use]
    pub const fn photo_url(&self) -> Option<&Url> {
        self.photo_url.as_ref()
    }

    /// Biography text.
    #[must_use]
    pub const fn bio(&self) -> &str {
        self.bio.as_str()
    }

    /// Users following this profile.
    #[must_use]
    pub const fn followers(&self) -> &BTreeSet<UserId> {
        &self.followers
    }

    /// Users this profile follows.
    #[must_use]
    pub const fn following(&self) -> &BTreeSet<UserId> {
        &self.following
    }

    /// Borrow one half of the relation.
    #[must_use]
    pub const fn relation(&self, field: RelationField) -> &BTreeSet<UserId> {
        match field {
            RelationField::Followers => &self.followers,
            RelationField::Following => &self.following,
        }
    }

    /// Mutably borrow one half of the relation.
    pub const fn relation_mut(&mut self, field: RelationField) -> &mut BTreeSet<UserId> {
        match field {
            RelationField::Followers => &mut self.followers,
            RelationField::Following => &mut self.following,
        }
    }

    /// Case-insensitive substring match against handle or display name.
    ///
    /// `term` must already be trimmed and lowercased.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        self.handle.as_ref().to_lowercase().contains(term)
            || self.display_name.as_ref().to_lowercase().contains(term)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: String,
    display_name: String,
    #[serde(default)]
    handle: Option<String>,
    #[serde(rename = "photoURL", default)]
    photo_url: Option<String>,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    followers: Vec<String>,
    #[serde(default)]
    following: Vec<String>,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        Self {
            id: value.id.into(),
            display_name: value.display_name.into(),
            handle: Some(value.handle.into()),
            photo_url: value.photo_url.map(String::from),
            bio: value.bio,
            followers: value.followers.into_iter().map(String::from).collect(),
            following: value.following.into_iter().map(String::from).collect(),
        }
    }
}

impl TryFrom<UserDto> for User {
    type Error = UserValidationError;

    fn try_from(value: UserDto) -> Result<Self, Self::Error> {
        let display_name = DisplayName::new(value.display_name)?;
        let handle = match value.handle {
            Some(raw) => Handle::new(raw)?,
            None => Handle::derive_from(&display_name),
        };
        let followers = value
            .followers
            .into_iter()
            .map(UserId::try_from)
            .collect::<Result<BTreeSet<_>, _>>()?;
        let following = value
            .following
            .into_iter()
            .map(UserId::try_from)
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self {
            id: UserId::try_from(value.id)?,
            display_name,
            handle,
            photo_url: parse_photo_url(value.photo_url.as_deref())?,
            bio: value.bio,
            followers,
            following,
        })
    }
}
