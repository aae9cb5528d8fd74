//! Round trips through `PgMatchStore`
//!
//! Needs a PostgreSQL database with `migrations/0001_init.sql` applied
//! (see `DATABASE_URL`).

use common::database::{DatabaseConfig, init_pool};
use matching::acceptance::accept;
use matching::model::{MutualExchange, NewPotentialMatch, PotentialMatchStatus};
use matching::{MatchStore, PgMatchStore, review};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running PostgreSQL with the schema applied"]
async fn test_mutual_match_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    let suffix = Uuid::new_v4();
    let user1 = format!("a-{suffix}@example.com");
    let user2 = format!("b-{suffix}@example.com");

    for (id, name) in [(&user1, "Ada"), (&user2, "Ben")] {
        sqlx::query("INSERT INTO users (id, name, current_focus) VALUES ($1, $2, 'Hiring')")
            .bind(id)
            .bind(name)
            .execute(&pool)
            .await?;
    }

    let store = PgMatchStore::new(pool);
    let potential = store
        .insert_potential_match(&NewPotentialMatch {
            user1_id: user1.clone(),
            user2_id: user2.clone(),
            match_type: "mutual".to_string(),
            mutual_score: 8.0,
            exchange: MutualExchange {
                user1_gives: "intros".to_string(),
                ..Default::default()
            },
            rationale: "fit".to_string(),
        })
        .await?;
    assert_eq!(potential.status, PotentialMatchStatus::Pending);
    assert!(store.pending_pair_exists(&user2, &user1).await?);

    let duplicate = store
        .insert_potential_match(&NewPotentialMatch {
            user1_id: user2.clone(),
            user2_id: user1.clone(),
            match_type: "mutual".to_string(),
            mutual_score: 7.0,
            exchange: MutualExchange::default(),
            rationale: String::new(),
        })
        .await;
    assert!(duplicate.is_err_and(|e| e.is_unique_violation()));

    let confirmed = review::confirm(&store, potential.id).await?;
    assert_eq!(confirmed.parties, potential.parties);

    accept(&store, confirmed.id, &user1).await?;
    let done = accept(&store, confirmed.id, &user2).await?;
    assert!(done.confirmed.completed_at.is_some());
    assert!(done.newly_completed);

    let again = accept(&store, confirmed.id, &user2).await?;
    assert!(!again.newly_accepted);
    assert!(!again.newly_completed);
    assert_eq!(again.confirmed.completed_at, done.confirmed.completed_at);

    let listed = store.confirmed_matches_for_user(&user2).await?;
    assert_eq!(listed.len(), 1);

    let profiles = store.profiles(&[user1.clone()]).await?;
    assert_eq!(profiles[0].name, "Ada");

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL with the schema applied"]
async fn test_schema_rejects_rows_with_both_shapes() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&DatabaseConfig::from_env()?).await?;
    let suffix = Uuid::new_v4();
    let ids: Vec<String> = ["s", "h", "a", "b"]
        .iter()
        .map(|p| format!("{p}-{suffix}@example.com"))
        .collect();

    for id in &ids {
        sqlx::query("INSERT INTO users (id, name) VALUES ($1, $1)")
            .bind(id)
            .execute(&pool)
            .await?;
    }

    let both = sqlx::query(
        "INSERT INTO potential_matches \
         (seeker_id, helper_id, user1_id, user2_id, match_type, mutual_score) \
         VALUES ($1, $2, $3, $4, 'mutual', 7.0)",
    )
    .bind(&ids[0])
    .bind(&ids[1])
    .bind(&ids[2])
    .bind(&ids[3])
    .execute(&pool)
    .await;
    assert!(both.is_err());

    let scoreless = sqlx::query(
        "INSERT INTO potential_matches (user1_id, user2_id, match_type) VALUES ($1, $2, 'mutual')",
    )
    .bind(&ids[2])
    .bind(&ids[3])
    .execute(&pool)
    .await;
    assert!(scoreless.is_err());

    Ok(())
}
