//! PostgreSQL implementation of [`MatchStore`]

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::MatchStore;
use crate::model::{
    Acceptance, AcceptanceSlot, CandidateProfile, ConfirmedMatch, ExpertiseClaim, HelpRequest,
    NewNotification, NewPotentialMatch, Notification, Party, PartyAcceptance, PartyColumns,
    PartyProfile, PotentialMatch, PotentialMatchStatus, UserRecord,
};

const PARTY_COLUMNS: &str = "seeker_id, helper_id, request_id, user1_id, user2_id, match_type, \
     mutual_score, user1_gives, user1_gets, user2_gives, user2_gets, rationale";

const ACCEPTANCE_COLUMNS: &str = "seeker_accepted, seeker_accepted_at, helper_accepted, \
     helper_accepted_at, user1_accepted, user1_accepted_at, user2_accepted, user2_accepted_at";

fn potential_columns() -> String {
    format!("id, {PARTY_COLUMNS}, status, confirmed_at, created_at")
}

fn confirmed_columns() -> String {
    format!("id, potential_match_id, {PARTY_COLUMNS}, {ACCEPTANCE_COLUMNS}, completed_at, created_at")
}

fn party_columns(row: &PgRow) -> DatabaseResult<PartyColumns> {
    Ok(PartyColumns {
        seeker_id: row.try_get("seeker_id")?,
        helper_id: row.try_get("helper_id")?,
        request_id: row.try_get("request_id")?,
        user1_id: row.try_get("user1_id")?,
        user2_id: row.try_get("user2_id")?,
        match_type: row.try_get("match_type")?,
        mutual_score: row.try_get("mutual_score")?,
        user1_gives: row.try_get("user1_gives")?,
        user1_gets: row.try_get("user1_gets")?,
        user2_gives: row.try_get("user2_gives")?,
        user2_gets: row.try_get("user2_gets")?,
    })
}

fn potential_from_row(row: &PgRow) -> DatabaseResult<PotentialMatch> {
    let status: String = row.try_get("status")?;

    Ok(PotentialMatch {
        id: row.try_get("id")?,
        parties: party_columns(row)?.into_parties()?,
        rationale: row.try_get("rationale")?,
        status: status.parse()?,
        confirmed_at: row.try_get("confirmed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn acceptance(row: &PgRow, slot: AcceptanceSlot) -> DatabaseResult<Acceptance> {
    let (flag, at) = slot.columns();
    Ok(Acceptance {
        accepted: row.try_get(flag)?,
        accepted_at: row.try_get(at)?,
    })
}

fn confirmed_from_row(row: &PgRow) -> DatabaseResult<ConfirmedMatch> {
    let parties = party_columns(row)?.into_parties()?;
    let first = acceptance(row, parties.slot(Party::First))?;
    let second = acceptance(row, parties.slot(Party::Second))?;

    Ok(ConfirmedMatch {
        id: row.try_get("id")?,
        potential_match_id: row.try_get("potential_match_id")?,
        parties,
        rationale: row.try_get("rationale")?,
        first,
        second,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Match store backed by a connection pool
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn matching_candidates(&self) -> DatabaseResult<Vec<CandidateProfile>> {
        let user_rows = sqlx::query(
            r#"
            SELECT id, name, current_focus, background, role_title, experience_years, industry
            FROM users
            WHERE BTRIM(COALESCE(current_focus, '')) <> ''
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut profiles = Vec::with_capacity(user_rows.len());
        for row in &user_rows {
            profiles.push(CandidateProfile {
                user: UserRecord {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    current_focus: row.try_get("current_focus")?,
                    background: row.try_get("background")?,
                    role_title: row.try_get("role_title")?,
                    experience_years: row.try_get("experience_years")?,
                    industry: row.try_get("industry")?,
                },
                claims: Vec::new(),
                requests: Vec::new(),
            });
        }

        let ids: Vec<String> = profiles.iter().map(|p| p.user.id.clone()).collect();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let claim_rows = sqlx::query(
            r#"
            SELECT user_id, title, proof
            FROM expertise_claims
            WHERE user_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &claim_rows {
            let claim = ExpertiseClaim {
                user_id: row.try_get("user_id")?,
                title: row.try_get("title")?,
                proof: row.try_get("proof")?,
            };
            if let Some(&i) = index.get(&claim.user_id) {
                profiles[i].claims.push(claim);
            }
        }

        let request_rows = sqlx::query(
            r#"
            SELECT id, user_id, challenge, title, reason, proof, help_type, timeline, status
            FROM help_requests
            WHERE user_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &request_rows {
            let timeline: String = row.try_get("timeline")?;
            let request = HelpRequest {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                challenge: row.try_get("challenge")?,
                title: row.try_get("title")?,
                reason: row.try_get("reason")?,
                proof: row.try_get("proof")?,
                help_type: row.try_get("help_type")?,
                timeline: timeline.parse()?,
                status: row.try_get("status")?,
            };
            if let Some(&i) = index.get(&request.user_id) {
                profiles[i].requests.push(request);
            }
        }

        debug!(candidates = profiles.len(), "Loaded matching candidates");
        Ok(profiles)
    }

    async fn pending_pair_exists(&self, user_a: &str, user_b: &str) -> DatabaseResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM potential_matches
                WHERE status = 'pending'
                  AND ((user1_id = $1 AND user2_id = $2) OR (user1_id = $2 AND user2_id = $1))
            ) AS present
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("present")?)
    }

    async fn insert_potential_match(
        &self,
        new: &NewPotentialMatch,
    ) -> DatabaseResult<PotentialMatch> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO potential_matches (
                user1_id, user2_id, match_type, mutual_score,
                user1_gives, user1_gets, user2_gives, user2_gets, rationale, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING {}
            "#,
            potential_columns()
        ))
        .bind(&new.user1_id)
        .bind(&new.user2_id)
        .bind(&new.match_type)
        .bind(new.mutual_score)
        .bind(&new.exchange.user1_gives)
        .bind(&new.exchange.user1_gets)
        .bind(&new.exchange.user2_gives)
        .bind(&new.exchange.user2_gets)
        .bind(&new.rationale)
        .fetch_one(&self.pool)
        .await?;

        potential_from_row(&row)
    }

    async fn get_potential_match(&self, id: Uuid) -> DatabaseResult<Option<PotentialMatch>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM potential_matches WHERE id = $1",
            potential_columns()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(potential_from_row).transpose()
    }

    async fn list_potential_matches(
        &self,
        status: Option<PotentialMatchStatus>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<PotentialMatch>, i64)> {
        let status = status.map(|s| s.as_str());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM potential_matches
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#,
            potential_columns()
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM potential_matches WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?
        .try_get("total")?;

        let matches = rows
            .iter()
            .map(potential_from_row)
            .collect::<DatabaseResult<Vec<_>>>()?;

        Ok((matches, total))
    }

    async fn transition_potential_match(
        &self,
        id: Uuid,
        to: PotentialMatchStatus,
    ) -> DatabaseResult<Option<PotentialMatch>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE potential_matches
            SET status = $2,
                confirmed_at = CASE WHEN $2 = 'confirmed' THEN NOW() ELSE confirmed_at END
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            potential_columns()
        ))
        .bind(id)
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(potential_from_row).transpose()
    }

    async fn insert_confirmed_match(
        &self,
        potential: &PotentialMatch,
    ) -> DatabaseResult<ConfirmedMatch> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO confirmed_matches (potential_match_id, {PARTY_COLUMNS})
            SELECT id, {PARTY_COLUMNS}
            FROM potential_matches
            WHERE id = $1
            RETURNING {}
            "#,
            confirmed_columns()
        ))
        .bind(potential.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            DatabaseError::CorruptRecord(format!("potential match {} disappeared", potential.id))
        })?;

        confirmed_from_row(&row)
    }

    async fn get_confirmed_match(&self, id: Uuid) -> DatabaseResult<Option<ConfirmedMatch>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM confirmed_matches WHERE id = $1",
            confirmed_columns()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(confirmed_from_row).transpose()
    }

    async fn confirmed_matches_for_user(
        &self,
        user_id: &str,
    ) -> DatabaseResult<Vec<ConfirmedMatch>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM confirmed_matches
            WHERE user1_id = $1 OR user2_id = $1 OR seeker_id = $1 OR helper_id = $1
            ORDER BY created_at DESC
            "#,
            confirmed_columns()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(confirmed_from_row).collect()
    }

    async fn accept_party(
        &self,
        id: Uuid,
        slot: AcceptanceSlot,
    ) -> DatabaseResult<Option<PartyAcceptance>> {
        let (flag, at) = slot.columns();
        let (other_flag, _) = slot.counterpart().columns();

        // The row lock serializes concurrent accepts, so `prev` always holds
        // the state this write started from.
        let row = sqlx::query(&format!(
            r#"
            WITH prev AS (
                SELECT id AS prev_id,
                       {flag} AS was_accepted,
                       completed_at IS NOT NULL AS was_completed
                FROM confirmed_matches
                WHERE id = $1
                FOR UPDATE
            )
            UPDATE confirmed_matches
            SET {flag} = TRUE,
                {at} = COALESCE({at}, NOW()),
                completed_at = CASE WHEN {other_flag}
                                    THEN COALESCE(completed_at, NOW())
                                    ELSE completed_at END
            FROM prev
            WHERE id = prev.prev_id
            RETURNING {}, prev.was_accepted, prev.was_completed
            "#,
            confirmed_columns()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let confirmed = confirmed_from_row(&row)?;
        let was_accepted: bool = row.try_get("was_accepted")?;
        let was_completed: bool = row.try_get("was_completed")?;
        debug!(%id, ?slot, was_accepted, was_completed, "Recorded acceptance");

        Ok(Some(PartyAcceptance {
            newly_accepted: !was_accepted,
            newly_completed: !was_completed && confirmed.completed_at.is_some(),
            confirmed,
        }))
    }

    async fn delete_confirmed_match(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM confirmed_matches WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn profiles(&self, user_ids: &[String]) -> DatabaseResult<Vec<PartyProfile>> {
        let rows = sqlx::query("SELECT id, name FROM users WHERE id = ANY($1)")
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(PartyProfile {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn insert_notification(&self, new: &NewNotification) -> DatabaseResult<Notification> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, match_id, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, kind, match_id, message, created_at
            "#,
        )
        .bind(&new.user_id)
        .bind(new.kind.as_str())
        .bind(new.match_id)
        .bind(&new.message)
        .fetch_one(&self.pool)
        .await?;

        let kind: String = row.try_get("kind")?;
        Ok(Notification {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: kind.parse()?,
            match_id: row.try_get("match_id")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
