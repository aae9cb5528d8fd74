//! Payloads for the match routes

use matching::model::PotentialMatchStatus;
use matching::transformer::MatchStatus;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Response for an accept call
#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub success: bool,
    /// Status as the caller now sees it
    pub status: MatchStatus,
}

#[derive(Debug, Serialize)]
pub struct DeclineResponse {
    pub success: bool,
}

/// Query parameters for listing potential matches
#[derive(Debug, Default, Deserialize)]
pub struct PotentialMatchQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PotentialMatchQuery {
    pub fn status_filter(&self) -> Result<Option<PotentialMatchStatus>, ApiError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ApiError::BadRequest(format!("Unknown status '{}'", value))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        let query = PotentialMatchQuery {
            status: Some("pending".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.status_filter().unwrap(),
            Some(PotentialMatchStatus::Pending)
        );

        assert_eq!(PotentialMatchQuery::default().status_filter().unwrap(), None);

        let bad = PotentialMatchQuery {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad.status_filter(), Err(ApiError::BadRequest(_))));
    }
}
