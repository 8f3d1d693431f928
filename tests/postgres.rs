use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::types::Json;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use koktail::application::repos::{
    ContentRepo, CreateMessageParams, MembershipMutation, MessagesRepo, PlansRepo, RepoError,
    UsersRepo,
};
use koktail::domain::activities::{ActivityName, ActivityRegistry, MembershipRecord};
use koktail::infra::db::PostgresRepositories;

async fn seed_user(pool: &PgPool, name: &str, activities: Value) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, activities) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(Json(activities))
        .execute(pool)
        .await
        .expect("seed user");
    id
}

async fn raw_activities(pool: &PgPool, id: Uuid) -> Value {
    sqlx::query_scalar::<_, Value>("SELECT activities FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("activities")
}

fn activity(name: &str) -> ActivityName {
    ActivityRegistry::new([name])
        .expect("registry")
        .resolve(name)
        .cloned()
        .expect("registered")
}

#[sqlx::test(migrations = "./migrations")]
async fn pull_drops_both_shapes_and_keeps_everything_else(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let user = seed_user(
        &pool,
        "Ola",
        json!([
            "Chess",
            17,
            { "name": "Chess", "limit": 2 },
            { "title": "x" },
            { "name": "Dance" },
            "Hiking"
        ]),
    )
    .await;

    let changed = repos
        .update_membership(user, MembershipMutation::pull("Chess"))
        .await
        .expect("pull");

    assert!(changed);
    assert_eq!(
        raw_activities(&pool, user).await,
        json!([17, { "title": "x" }, { "name": "Dance" }, "Hiking"])
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn pull_of_an_absent_name_reports_no_change(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let user = seed_user(&pool, "Ola", json!(["Hiking", { "title": "x" }])).await;

    let changed = repos
        .update_membership(user, MembershipMutation::pull("Chess"))
        .await
        .expect("pull");

    assert!(!changed);
    assert_eq!(
        raw_activities(&pool, user).await,
        json!(["Hiking", { "title": "x" }])
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn join_appends_at_the_end_and_only_once(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let user = seed_user(&pool, "Ola", json!(["Hiking", { "name": "Dance", "limit": 3 }])).await;
    let chess = activity("Chess");

    assert!(
        repos
            .update_membership(user, MembershipMutation::join(&chess))
            .await
            .expect("first join")
    );
    assert!(
        !repos
            .update_membership(user, MembershipMutation::join(&chess))
            .await
            .expect("second join")
    );

    assert_eq!(
        raw_activities(&pool, user).await,
        json!(["Hiking", { "name": "Dance", "limit": 3 }, "Chess"])
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn join_is_a_no_op_when_a_structured_record_exists(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let user = seed_user(&pool, "Ola", json!([{ "name": "Chess", "limit": 2 }])).await;

    let changed = repos
        .update_membership(user, MembershipMutation::join(&activity("Chess")))
        .await
        .expect("join");

    assert!(!changed);
    assert_eq!(
        raw_activities(&pool, user).await,
        json!([{ "name": "Chess", "limit": 2 }])
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn limit_update_leaves_exactly_one_record_last(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let user = seed_user(
        &pool,
        "Ola",
        json!(["Chess", "Hiking", { "name": "Chess", "limit": 9 }, 17]),
    )
    .await;

    let changed = repos
        .update_membership(user, MembershipMutation::set_limit(&activity("Chess"), 4))
        .await
        .expect("set limit");

    assert!(changed);
    assert_eq!(
        raw_activities(&pool, user).await,
        json!(["Hiking", 17, { "name": "Chess", "limit": 4 }])
    );

    let record = repos.find_user(user).await.expect("find").expect("user");
    assert_eq!(
        record.activities.last(),
        Some(&MembershipRecord::Limited {
            name: "Chess".to_string(),
            limit: Some(4),
        })
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_limit_updates_leave_one_record(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let user = seed_user(&pool, "Ola", json!(["Chess"])).await;
    let chess = activity("Chess");

    let (first, second) = tokio::join!(
        repos.update_membership(user, MembershipMutation::set_limit(&chess, 2)),
        repos.update_membership(user, MembershipMutation::set_limit(&chess, 5)),
    );
    first.expect("first update");
    second.expect("second update");

    let record = repos.find_user(user).await.expect("find").expect("user");
    let chess_records = record
        .activities
        .iter()
        .filter(|entry| entry.matches("Chess"))
        .count();
    assert_eq!(chess_records, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn mutations_on_an_unknown_user_are_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let missing = Uuid::new_v4();
    let chess = activity("Chess");

    for mutation in [
        MembershipMutation::pull("Chess"),
        MembershipMutation::join(&chess),
        MembershipMutation::set_limit(&chess, 3),
    ] {
        assert!(matches!(
            repos.update_membership(missing, mutation).await,
            Err(RepoError::NotFound)
        ));
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_entries_decode_without_failing_the_read(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let user = seed_user(&pool, "Ola", json!(["Chess", 17, { "title": "x" }])).await;

    let record = repos.find_user(user).await.expect("find").expect("user");
    assert_eq!(
        record.activities,
        vec![
            MembershipRecord::Name("Chess".to_string()),
            MembershipRecord::Malformed(json!(17)),
            MembershipRecord::Malformed(json!({ "title": "x" })),
        ]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn content_is_listed_newest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let owner = seed_user(&pool, "Ola", json!([])).await;
    let now = OffsetDateTime::now_utc();

    for (body, age) in [("older", 20), ("newest", 1), ("middle", 10)] {
        sqlx::query("INSERT INTO comments (id, author, body, created_at) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind("Ola")
            .bind(body)
            .bind(now - Duration::minutes(age))
            .execute(&pool)
            .await
            .expect("seed comment");
        sqlx::query(
            r#"
            INSERT INTO gallery_items (id, owner_id, title, file_name, content_type, created_at)
            VALUES ($1, $2, $3, 'photo.png', 'image/png', $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(body)
        .bind(now - Duration::minutes(age))
        .execute(&pool)
        .await
        .expect("seed gallery item");
    }

    let comments = repos.list_recent_comments(2).await.expect("comments");
    let bodies: Vec<_> = comments.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(bodies, ["newest", "middle"]);

    let gallery = repos.list_recent_gallery_items(10).await.expect("gallery");
    let titles: Vec<_> = gallery.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(titles, ["newest", "middle", "older"]);

    let first = gallery[0].id;
    assert_eq!(
        repos
            .find_gallery_item(first)
            .await
            .expect("find")
            .map(|item| item.title),
        Some("newest".to_string())
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn plans_split_on_expiry(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let author = seed_user(&pool, "Ola", json!([])).await;
    let now = OffsetDateTime::now_utc();

    for (text, expires_in) in [
        ("Quiz night", -120),
        ("Karaoke", -30),
        ("Board games", 60),
        ("Long ago", -600),
    ] {
        sqlx::query(
            "INSERT INTO evening_plans (id, author_id, text, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(author)
        .bind(text)
        .bind(now + Duration::minutes(expires_in))
        .execute(&pool)
        .await
        .expect("seed plan");
    }

    let active = repos.list_active_plans(now).await.expect("active");
    let active: Vec<_> = active.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(active, ["Board games"]);

    let completed = repos.list_completed_plans(now, 2).await.expect("completed");
    let completed: Vec<_> = completed.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(completed, ["Karaoke", "Quiz night"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn reply_is_stored_once_and_only_for_the_owner(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let owner = seed_user(&pool, "Ola", json!([])).await;
    let stranger = seed_user(&pool, "Piotr", json!([])).await;
    let item = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO gallery_items (id, owner_id, title, file_name, content_type)
        VALUES ($1, $2, 'Harbour', 'harbour.png', 'image/png')
        "#,
    )
    .bind(item)
    .bind(owner)
    .execute(&pool)
    .await
    .expect("seed gallery item");

    let message = repos
        .create_message(CreateMessageParams {
            gallery_item_id: item,
            owner_id: owner,
            body: "Which harbour?".to_string(),
        })
        .await
        .expect("create");
    assert!(!message.is_answered());

    assert!(
        repos
            .record_reply(message.id, stranger, "Not mine".to_string())
            .await
            .expect("stranger reply")
            .is_none()
    );
    let answered = repos
        .record_reply(message.id, owner, "Gdynia".to_string())
        .await
        .expect("owner reply")
        .expect("answered");
    assert_eq!(answered.reply.as_deref(), Some("Gdynia"));
    assert!(
        repos
            .record_reply(message.id, owner, "Again".to_string())
            .await
            .expect("second reply")
            .is_none()
    );

    let inbox = repos
        .list_messages_for_owner(owner, 10)
        .await
        .expect("inbox");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].reply.as_deref(), Some("Gdynia"));
    assert!(
        repos
            .list_messages_for_owner(stranger, 10)
            .await
            .expect("empty inbox")
            .is_empty()
    );
}
