//! Relations, eager loading and pivot management

mod common;

use common::{attrs, setup, Post, Profile, RecordingConnection, Role, User};
use quarry_orm::{CrudOperations, DatabaseConnection, HasRelationships, Model, ModelError, QueryMethods};
use serde_json::{json, Value};

async fn user(conn: &mut dyn DatabaseConnection, name: &str) -> User {
    User::create(conn, attrs(json!({ "name": name }))).await.unwrap()
}

async fn roles(conn: &mut dyn DatabaseConnection, count: usize) {
    for i in 1..=count {
        Role::create(conn, attrs(json!({"name": format!("role{}", i)}))).await.unwrap();
    }
}

fn ids(values: &[Value]) -> Vec<i64> {
    values.iter().filter_map(Value::as_i64).collect()
}

#[tokio::test]
async fn test_has_many_create_and_get() {
    let mut conn = setup().await;
    let ada = user(&mut conn, "Ada").await;

    let posts = ada.has_many::<Post>();
    let first = posts.create(&mut conn, attrs(json!({"title": "One"}))).await.unwrap();
    assert_eq!(first.get("user_id"), ada.key());

    posts
        .create_many(&mut conn, vec![attrs(json!({"title": "Two"})), attrs(json!({"title": "Three", "published": 1}))])
        .await
        .unwrap();

    assert_eq!(posts.count(&mut conn).await.unwrap(), 3);
    assert_eq!(posts.get(&mut conn).await.unwrap().len(), 3);

    let published = ada.has_many::<Post>().where_eq("published", 1).get(&mut conn).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].get("title"), json!("Three"));

    let updated = posts.update(&mut conn, attrs(json!({"body": "bulk"}))).await.unwrap();
    assert_eq!(updated, 3);

    let latest = ada.has_many::<Post>().order_by_desc("id").first(&mut conn).await.unwrap().unwrap();
    assert_eq!(latest.get("title"), json!("Three"));
}

#[tokio::test]
async fn test_has_one() {
    let mut conn = setup().await;
    let ada = user(&mut conn, "Ada").await;
    let grace = user(&mut conn, "Grace").await;

    ada.has_one::<Profile>().create(&mut conn, attrs(json!({"bio": "Analyst"}))).await.unwrap();

    let profile = ada.has_one::<Profile>().get(&mut conn).await.unwrap().unwrap();
    assert_eq!(profile.get("bio"), json!("Analyst"));
    assert!(grace.has_one::<Profile>().get(&mut conn).await.unwrap().is_none());

    assert_eq!(ada.has_one::<Profile>().delete(&mut conn).await.unwrap(), 1);
    assert!(ada.has_one::<Profile>().get(&mut conn).await.unwrap().is_none());
}

#[tokio::test]
async fn test_belongs_to_and_associate() {
    let mut conn = RecordingConnection::new().await;
    let ada = user(&mut conn, "Ada").await;
    let mut post = ada.has_many::<Post>().create(&mut conn, attrs(json!({"title": "Notes"}))).await.unwrap();

    let owner = post.belongs_to::<User>().get(&mut conn).await.unwrap().unwrap();
    assert_eq!(owner.key(), ada.key());

    let grace = user(&mut conn, "Grace").await;
    conn.reset();
    post.belongs_to::<User>().associate(&mut post, &grace, "user");
    assert_eq!(conn.count(), 0, "associate does not persist");
    assert_eq!(post.get("user_id"), grace.key());

    let cached: Option<User> = post.loaded_relation("user").unwrap().unwrap();
    assert_eq!(cached.unwrap().get("name"), json!("Grace"));

    post.save(&mut conn).await.unwrap();
    let stored = Post::find_or_fail(&mut conn, post.key()).await.unwrap();
    assert_eq!(stored.get("user_id"), grace.key());

    post.belongs_to::<User>().dissociate(&mut post, "user");
    assert_eq!(post.get("user_id"), Value::Null);
    assert!(post.loaded_relation::<Option<User>>("user").unwrap().unwrap().is_none());
    assert!(post.belongs_to::<User>().get(&mut conn).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unsaved_parent() {
    let mut conn = RecordingConnection::new().await;
    let draft = User::make(attrs(json!({"name": "Draft"})));

    assert!(draft.has_many::<Post>().get(&mut conn).await.unwrap().is_empty());
    assert!(draft.has_one::<Profile>().get(&mut conn).await.unwrap().is_none());
    assert!(draft.belongs_to_many::<Role>().get(&mut conn).await.unwrap().is_empty());
    assert_eq!(conn.count(), 0);

    let err = draft
        .has_many::<Post>()
        .create(&mut conn, attrs(json!({"title": "Lost"})))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Relationship(_)));

    let err = draft.belongs_to_many::<Role>().attach(&mut conn, vec![1]).await.unwrap_err();
    assert!(matches!(err, ModelError::Relationship(_)));
}

#[tokio::test]
async fn test_get_relation_caches_results() {
    let mut conn = RecordingConnection::new().await;
    let mut ada = user(&mut conn, "Ada").await;
    ada.has_many::<Post>().create(&mut conn, attrs(json!({"title": "One"}))).await.unwrap();

    conn.reset();
    let posts = ada.get_relation(&mut conn, "posts", |u| u.has_many::<Post>()).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(conn.count(), 1);

    ada.has_many::<Post>().create(&mut conn, attrs(json!({"title": "Two"}))).await.unwrap();
    conn.reset();

    let cached = ada.get_relation(&mut conn, "posts", |u| u.has_many::<Post>()).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(conn.count(), 0, "second access is served from the cache");

    let reloaded = ada.reload_relation(&mut conn, "posts", |u| u.has_many::<Post>()).await.unwrap();
    assert_eq!(reloaded.len(), 2);

    assert!(ada.forget_relation("posts"));
    assert!(!ada.relation_loaded("posts"));
}

#[tokio::test]
async fn test_eager_load_has_many_covers_every_parent() {
    let mut conn = RecordingConnection::new().await;
    let a = user(&mut conn, "A").await;
    user(&mut conn, "B").await;
    let c = user(&mut conn, "C").await;

    a.has_many::<Post>()
        .create_many(&mut conn, vec![attrs(json!({"title": "a1"})), attrs(json!({"title": "a2"}))])
        .await
        .unwrap();
    c.has_many::<Post>().create(&mut conn, attrs(json!({"title": "c1"}))).await.unwrap();

    let mut users = User::query().order_by("id").get(&mut conn).await.unwrap();
    conn.reset();
    User::eager_load(&mut conn, &mut users, "posts", |u| u.has_many::<Post>())
        .await
        .unwrap();
    assert_eq!(conn.count(), 1, "one query for the whole batch");

    let counts: Vec<usize> = users
        .iter()
        .map(|u| u.loaded_relation::<Vec<Post>>("posts").unwrap().unwrap().len())
        .collect();
    assert_eq!(counts, vec![2, 0, 1]);

    let json = users[1].to_json();
    assert_eq!(json["posts"], json!([]));
    assert_eq!(users[0].to_json()["posts"][1]["title"], json!("a2"));
}

#[tokio::test]
async fn test_eager_load_keeps_extra_constraints() {
    let mut conn = setup().await;
    let a = user(&mut conn, "A").await;
    let b = user(&mut conn, "B").await;
    a.has_many::<Post>()
        .create_many(&mut conn, vec![attrs(json!({"title": "draft"})), attrs(json!({"title": "live", "published": 1}))])
        .await
        .unwrap();
    b.has_many::<Post>().create(&mut conn, attrs(json!({"title": "draft"}))).await.unwrap();

    let mut users = vec![a, b];
    User::eager_load(&mut conn, &mut users, "published_posts", |u| {
        u.has_many::<Post>().where_eq("published", 1)
    })
    .await
    .unwrap();

    let a_posts: Vec<Post> = users[0].loaded_relation("published_posts").unwrap().unwrap();
    let b_posts: Vec<Post> = users[1].loaded_relation("published_posts").unwrap().unwrap();
    assert_eq!(a_posts.len(), 1);
    assert_eq!(a_posts[0].get("title"), json!("live"));
    assert!(b_posts.is_empty());
}

#[tokio::test]
async fn test_eager_load_has_one_and_belongs_to() {
    let mut conn = RecordingConnection::new().await;
    let ada = user(&mut conn, "Ada").await;
    let grace = user(&mut conn, "Grace").await;
    ada.has_one::<Profile>().create(&mut conn, attrs(json!({"bio": "Analyst"}))).await.unwrap();

    for (owner, title) in [(&ada, "a1"), (&ada, "a2"), (&grace, "g1")] {
        owner.has_many::<Post>().create(&mut conn, attrs(json!({ "title": title }))).await.unwrap();
    }
    Post::create(&mut conn, attrs(json!({"title": "orphan"}))).await.unwrap();

    let mut users = User::query().order_by("id").get(&mut conn).await.unwrap();
    User::eager_load(&mut conn, &mut users, "profile", |u| u.has_one::<Profile>())
        .await
        .unwrap();
    let ada_profile: Option<Profile> = users[0].loaded_relation("profile").unwrap().unwrap();
    let grace_profile: Option<Profile> = users[1].loaded_relation("profile").unwrap().unwrap();
    assert_eq!(ada_profile.unwrap().get("bio"), json!("Analyst"));
    assert!(grace_profile.is_none());
    assert_eq!(users[1].to_json()["profile"], Value::Null);

    let mut posts = Post::query().order_by("id").get(&mut conn).await.unwrap();
    conn.reset();
    Post::eager_load(&mut conn, &mut posts, "user", |p| p.belongs_to::<User>())
        .await
        .unwrap();
    assert_eq!(conn.count(), 1);

    let owners: Vec<Option<String>> = posts
        .iter()
        .map(|post| {
            post.loaded_relation::<Option<User>>("user")
                .unwrap()
                .unwrap()
                .map(|owner| owner.get("name").as_str().unwrap_or_default().to_string())
        })
        .collect();
    assert_eq!(
        owners,
        vec![Some("Ada".to_string()), Some("Ada".to_string()), Some("Grace".to_string()), None]
    );
}

#[tokio::test]
async fn test_eager_load_without_parent_keys_issues_no_query() {
    let mut conn = RecordingConnection::new().await;
    let mut drafts = vec![User::make(attrs(json!({"name": "x"}))), User::make(attrs(json!({"name": "y"})))];

    User::eager_load(&mut conn, &mut drafts, "posts", |u| u.has_many::<Post>())
        .await
        .unwrap();
    assert_eq!(conn.count(), 0);
    assert!(drafts.iter().all(|u| u.relation_loaded("posts")));

    let mut empty: Vec<User> = Vec::new();
    User::eager_load(&mut conn, &mut empty, "posts", |u| u.has_many::<Post>())
        .await
        .unwrap();
    assert_eq!(conn.count(), 0);
}

#[tokio::test]
async fn test_belongs_to_many_attach_and_detach() {
    let mut conn = RecordingConnection::new().await;
    let ada = user(&mut conn, "Ada").await;
    roles(&mut conn, 3).await;

    let relation = ada.belongs_to_many::<Role>();
    assert_eq!(relation.pivot_table(), "role_user");

    relation.attach(&mut conn, vec![1, 2, 3]).await.unwrap();
    assert_eq!(relation.count(&mut conn).await.unwrap(), 3);
    assert_eq!(ids(&relation.related_ids(&mut conn).await.unwrap()), vec![1, 2, 3]);

    conn.reset();
    assert_eq!(relation.detach(&mut conn, Some(Vec::new())).await.unwrap(), 0);
    assert_eq!(conn.count(), 0, "an empty id list detaches nothing");

    assert_eq!(relation.detach(&mut conn, Some(vec![json!(2)])).await.unwrap(), 1);
    assert_eq!(ids(&relation.related_ids(&mut conn).await.unwrap()), vec![1, 3]);

    assert_eq!(relation.detach(&mut conn, None).await.unwrap(), 2);
    assert!(relation.get(&mut conn).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_reports_changes() {
    let mut conn = setup().await;
    let ada = user(&mut conn, "Ada").await;
    roles(&mut conn, 4).await;

    let relation = ada.belongs_to_many::<Role>();
    relation.attach(&mut conn, vec![1, 2, 3]).await.unwrap();

    let changes = relation.sync(&mut conn, vec![2, 4]).await.unwrap();
    assert_eq!(ids(&changes.attached), vec![4]);
    assert_eq!(ids(&changes.detached), vec![1, 3]);
    assert!(changes.updated.is_empty());

    let mut linked = ids(&relation.related_ids(&mut conn).await.unwrap());
    linked.sort();
    assert_eq!(linked, vec![2, 4]);

    let again = relation.sync(&mut conn, vec![2, 4]).await.unwrap();
    assert!(again.attached.is_empty() && again.detached.is_empty() && again.updated.is_empty());

    let kept = relation.sync_without_detaching(&mut conn, vec![1]).await.unwrap();
    assert_eq!(ids(&kept.attached), vec![1]);
    assert!(kept.detached.is_empty());
    assert_eq!(relation.count(&mut conn).await.unwrap(), 3);
}

#[tokio::test]
async fn test_sync_with_attributes_updates_pivot_rows() {
    let mut conn = setup().await;
    let ada = user(&mut conn, "Ada").await;
    roles(&mut conn, 2).await;

    let relation = ada.belongs_to_many::<Role>().with_pivot(&["scope"]);
    relation
        .attach_with(&mut conn, vec![(json!(1), attrs(json!({"scope": "read"})))])
        .await
        .unwrap();

    let changes = relation
        .sync_with_attributes(
            &mut conn,
            vec![
                (json!(1), attrs(json!({"scope": "write"}))),
                (json!(2), attrs(json!({"scope": "read"}))),
            ],
        )
        .await
        .unwrap();
    assert_eq!(ids(&changes.updated), vec![1]);
    assert_eq!(ids(&changes.attached), vec![2]);

    let linked = relation.order_by("roles.id").get(&mut conn).await.unwrap();
    let scopes: Vec<Value> = linked
        .iter()
        .map(|role| role.pivot().and_then(|pivot| pivot.get("scope")).cloned().unwrap_or(Value::Null))
        .collect();
    assert_eq!(scopes, vec![json!("write"), json!("read")]);
}

#[tokio::test]
async fn test_repeated_sync_with_attributes_is_stable() {
    let mut conn = setup().await;
    let ada = user(&mut conn, "Ada").await;
    roles(&mut conn, 2).await;

    let relation = ada.belongs_to_many::<Role>().with_pivot(&["scope"]);
    let records = || {
        vec![
            (json!(1), attrs(json!({"scope": 5.0}))),
            (json!(2), attrs(json!({"scope": true}))),
        ]
    };

    let first = relation.sync_with_attributes(&mut conn, records()).await.unwrap();
    assert_eq!(ids(&first.attached), vec![1, 2]);

    let second = relation.sync_with_attributes(&mut conn, records()).await.unwrap();
    assert!(second.attached.is_empty() && second.detached.is_empty());
    assert!(second.updated.is_empty(), "unchanged pivot values are not rewritten");

    let third = relation
        .sync_with_attributes(&mut conn, vec![(json!(1), attrs(json!({"scope": 6.5}))), (json!(2), attrs(json!({"scope": true})))])
        .await
        .unwrap();
    assert_eq!(ids(&third.updated), vec![1]);
}

#[tokio::test]
async fn test_toggle() {
    let mut conn = setup().await;
    let ada = user(&mut conn, "Ada").await;
    roles(&mut conn, 3).await;

    let relation = ada.belongs_to_many::<Role>();
    relation.attach(&mut conn, vec![1, 2]).await.unwrap();

    let changes = relation.toggle(&mut conn, vec![2, 3]).await.unwrap();
    assert_eq!(ids(&changes.attached), vec![3]);
    assert_eq!(ids(&changes.detached), vec![2]);

    let mut linked = ids(&relation.related_ids(&mut conn).await.unwrap());
    linked.sort();
    assert_eq!(linked, vec![1, 3]);
}

#[tokio::test]
async fn test_pivot_columns_and_timestamps() {
    let mut conn = setup().await;
    let ada = user(&mut conn, "Ada").await;
    roles(&mut conn, 2).await;

    let relation = ada.belongs_to_many::<Role>().with_pivot(&["scope"]).with_timestamps();
    relation
        .attach_with(&mut conn, vec![(json!(2), attrs(json!({"scope": "admin"})))])
        .await
        .unwrap();

    let role = relation.first(&mut conn).await.unwrap().unwrap();
    assert_eq!(role.get("name"), json!("role2"));

    let pivot = role.pivot().unwrap();
    assert_eq!(pivot["user_id"], ada.key());
    assert_eq!(pivot["role_id"], json!(2));
    assert_eq!(pivot["scope"], json!("admin"));
    assert!(pivot["created_at"].is_string());
    assert!(role.get_raw("pivot_scope").is_none());

    let updated = relation
        .update_existing_pivot(&mut conn, 2, attrs(json!({"scope": "owner"})))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let role = relation.first(&mut conn).await.unwrap().unwrap();
    assert_eq!(role.to_json()["pivot"]["scope"], json!("owner"));
}

#[tokio::test]
async fn test_eager_load_belongs_to_many() {
    let mut conn = RecordingConnection::new().await;
    let ada = user(&mut conn, "Ada").await;
    let grace = user(&mut conn, "Grace").await;
    user(&mut conn, "Linus").await;
    roles(&mut conn, 3).await;

    ada.belongs_to_many::<Role>().attach(&mut conn, vec![1, 2]).await.unwrap();
    grace.belongs_to_many::<Role>().attach(&mut conn, vec![2, 3]).await.unwrap();

    let mut users = User::query().order_by("id").get(&mut conn).await.unwrap();
    conn.reset();
    User::eager_load(&mut conn, &mut users, "roles", |u| {
        u.belongs_to_many::<Role>().with_pivot(&["scope"]).order_by("roles.id")
    })
    .await
    .unwrap();
    assert_eq!(conn.count(), 1);

    let names: Vec<Vec<Value>> = users
        .iter()
        .map(|u| {
            u.loaded_relation::<Vec<Role>>("roles")
                .unwrap()
                .unwrap()
                .iter()
                .map(|role| role.get("name"))
                .collect()
        })
        .collect();
    assert_eq!(
        names,
        vec![
            vec![json!("role1"), json!("role2")],
            vec![json!("role2"), json!("role3")],
            Vec::new(),
        ]
    );

    // the shared role carries each parent's own pivot row
    let json = users[1].to_json();
    assert_eq!(json["roles"][0]["pivot"]["user_id"], grace.key());
}
