//! Integration tests for user and plan CRUD.
//!
//! Each test creates a unique temporary database in the shared PostgreSQL
//! container, runs migrations, and drops it on completion so tests are
//! fully isolated.

use chrono::{Days, Utc};
use uuid::Uuid;

use huddle_db::models::{PlanCategory, PlanDraft, User};
use huddle_db::pool;
use huddle_db::queries::{plans, users};
use huddle_test_utils::{create_test_db, drop_test_db};

async fn make_user(pool: &sqlx::PgPool, name: &str) -> User {
    users::insert_user(pool, name, &format!("{name}@example.com"), "$opaque$hash")
        .await
        .expect("insert_user should succeed")
}

fn draft(title: &str) -> PlanDraft {
    let today = Utc::now().date_naive();
    PlanDraft {
        title: title.to_owned(),
        description: "desc".to_owned(),
        price: 50.0,
        duration: "3 days".to_owned(),
        category: PlanCategory::Socialize,
        location: "Porto".to_owned(),
        location_lat: 41.15,
        location_lon: -8.61,
        features: "rooftop".to_owned(),
        invited_friends: None,
        start_date: today,
        end_date: today.checked_add_days(Days::new(2)).unwrap(),
        max_participants: 10,
    }
}

// -----------------------------------------------------------------------
// Schema
// -----------------------------------------------------------------------

#[tokio::test]
async fn table_counts_covers_every_application_table() {
    let (pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&pool).await.expect("counting should succeed");
    let names: Vec<&str> = counts.iter().map(|(table, _)| *table).collect();
    assert_eq!(names, ["users", "friends", "plans", "sessions"]);
    assert!(counts.iter().all(|(_, n)| *n == 0), "fresh database should be empty");

    make_user(&pool, "ada").await;
    let counts = pool::table_counts(&pool).await.unwrap();
    assert!(counts.contains(&("users", 1)));

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

#[tokio::test]
async fn insert_and_get_user() {
    let (pool, db_name) = create_test_db().await;

    let user = make_user(&pool, "ada").await;
    assert_eq!(user.username, "ada");

    let fetched = users::get_user(&pool, user.id)
        .await
        .expect("get_user should succeed")
        .expect("user should exist");
    assert_eq!(fetched.email, "ada@example.com");

    let by_email = users::get_user_by_email(&pool, "ada@example.com")
        .await
        .unwrap()
        .expect("lookup by email should find the user");
    assert_eq!(by_email.id, user.id);

    assert!(
        users::get_user_by_email(&pool, "nobody@example.com")
            .await
            .unwrap()
            .is_none()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let (pool, db_name) = create_test_db().await;

    make_user(&pool, "ada").await;
    let result = users::insert_user(&pool, "ada2", "ada@example.com", "$h").await;
    assert!(result.is_err(), "unique email violation should surface");

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Plans
// -----------------------------------------------------------------------

#[tokio::test]
async fn insert_and_get_plan() {
    let (pool, db_name) = create_test_db().await;
    let author = make_user(&pool, "author").await;

    let plan = plans::insert_plan(&pool, author.id, &draft("rooftop party"))
        .await
        .expect("insert_plan should succeed");

    assert_eq!(plan.title, "rooftop party");
    assert_eq!(plan.posted_by, author.id);
    assert_eq!(plan.current_participants, 0);
    assert_eq!(plan.category, PlanCategory::Socialize);

    let fetched = plans::get_plan(&pool, plan.id)
        .await
        .unwrap()
        .expect("plan should exist");
    assert_eq!(fetched.id, plan.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn full_record_update_replaces_all_attributes() {
    let (pool, db_name) = create_test_db().await;
    let author = make_user(&pool, "author").await;

    let plan = plans::insert_plan(&pool, author.id, &draft("before")).await.unwrap();

    let mut updated = draft("after");
    updated.price = 75.0;
    updated.category = PlanCategory::Business;
    plans::update_plan(&pool, plan.id, &updated)
        .await
        .expect("update_plan should succeed");

    let fetched = plans::get_plan(&pool, plan.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "after");
    assert_eq!(fetched.price, 75.0);
    assert_eq!(fetched.category, PlanCategory::Business);
    // The owner is never touched by an update.
    assert_eq!(fetched.posted_by, author.id);
    assert!(fetched.updated_at >= fetched.created_at);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_of_missing_plan_is_a_silent_no_op() {
    let (pool, db_name) = create_test_db().await;

    let result = plans::update_plan(&pool, Uuid::new_v4(), &draft("ghost")).await;
    assert!(result.is_ok(), "zero rows affected is treated as success");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn delete_plan_and_delete_again() {
    let (pool, db_name) = create_test_db().await;
    let author = make_user(&pool, "author").await;

    let plan = plans::insert_plan(&pool, author.id, &draft("short-lived")).await.unwrap();

    plans::delete_plan(&pool, plan.id).await.expect("delete should succeed");
    assert!(plans::get_plan(&pool, plan.id).await.unwrap().is_none());

    // Deleting a nonexistent ID is indistinguishable from success.
    plans::delete_plan(&pool, plan.id)
        .await
        .expect("second delete should also succeed");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_plans_returns_everything() {
    let (pool, db_name) = create_test_db().await;
    let author = make_user(&pool, "author").await;

    assert!(plans::list_plans(&pool).await.unwrap().is_empty());

    plans::insert_plan(&pool, author.id, &draft("one")).await.unwrap();
    plans::insert_plan(&pool, author.id, &draft("two")).await.unwrap();

    let all = plans::list_plans(&pool).await.unwrap();
    assert_eq!(all.len(), 2);

    pool.close().await;
    drop_test_db(&db_name).await;
}
