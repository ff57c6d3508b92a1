//! Port error translation shared by the domain services.
//!
//! Connection failures surface as `ServiceUnavailable`; anything else the
//! backend rejects is an internal error.

use super::Error;
use super::ports::{
    BlobStoreError, ChatRepositoryError, ContributionRepositoryError, EventRepositoryError,
    UserRepositoryError,
};

pub(crate) fn map_user_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
    }
}

pub(crate) fn map_event_error(error: EventRepositoryError) -> Error {
    match error {
        EventRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("event repository unavailable: {message}"))
        }
        EventRepositoryError::Query { message } => {
            Error::internal(format!("event repository error: {message}"))
        }
        EventRepositoryError::Duplicate { id } => {
            Error::conflict(format!("event {id} already exists"))
        }
    }
}

pub(crate) fn map_contribution_error(error: ContributionRepositoryError) -> Error {
    match error {
        ContributionRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("contribution repository unavailable: {message}"))
        }
        ContributionRepositoryError::Query { message } => {
            Error::internal(format!("contribution repository error: {message}"))
        }
    }
}

pub(crate) fn map_chat_error(error: ChatRepositoryError) -> Error {
    match error {
        ChatRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("chat repository unavailable: {message}"))
        }
        ChatRepositoryError::Query { message } => {
            Error::internal(format!("chat repository error: {message}"))
        }
    }
}

pub(crate) fn map_blob_error(error: BlobStoreError) -> Error {
    match error {
        BlobStoreError::Connection { message } => {
            Error::service_unavailable(format!("blob store unavailable: {message}"))
        }
        BlobStoreError::Upload { message } | BlobStoreError::Delete { message } => {
            Error::internal(format!("blob store error: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    #[case(map_user_error(UserRepositoryError::connection("down")), ErrorCode::ServiceUnavailable)]
    #[case(map_user_error(UserRepositoryError::query("bad")), ErrorCode::InternalError)]
    #[case(map_event_error(EventRepositoryError::duplicate("evt-1")), ErrorCode::Conflict)]
    #[case(map_chat_error(ChatRepositoryError::connection("down")), ErrorCode::ServiceUnavailable)]
    #[case(map_blob_error(BlobStoreError::upload("quota")), ErrorCode::InternalError)]
    #[case(
        map_contribution_error(ContributionRepositoryError::query("bad")),
        ErrorCode::InternalError
    )]
    fn maps_port_errors_to_codes(#[case] error: Error, #[case] expected: ErrorCode) {
        assert_eq!(error.code(), expected);
    }
}
