use engine::{Engine, EngineError, MoneyCents, NewUser, User, UserFilter, UserState};

mod common;

use common::{engine_with_president, fund};

async fn create(engine: &Engine, operator: &User, new_user: NewUser) -> User {
    engine.create_user(operator.id, new_user).await.unwrap()
}

/// alice, bob, carl and emile are members, `visitor` is external and
/// `ghost` is deactivated.
async fn populated() -> (Engine, User) {
    let (engine, president) = engine_with_president().await;
    create(
        &engine,
        &president,
        NewUser::new("alice", "pw", "Alice", "Martin").family("12-34").year(2023),
    )
    .await;
    create(
        &engine,
        &president,
        NewUser::new("bob", "pw", "Bob", "Dupont").family("12").year(2024),
    )
    .await;
    create(
        &engine,
        &president,
        NewUser::new("carl", "pw", "Carl", "Abcde").family("abc").year(2024),
    )
    .await;
    create(
        &engine,
        &president,
        NewUser::new("emile", "pw", "Émile", "Zola").surname("Mimile").year(2022),
    )
    .await;
    create(
        &engine,
        &president,
        NewUser::new("visitor", "pw", "Vic", "Tor").family("12").external(true),
    )
    .await;
    let ghost = create(
        &engine,
        &president,
        NewUser::new("ghost", "pw", "Gus", "Host").family("12").year(2025),
    )
    .await;
    engine
        .set_user_active(president.id, ghost.id, false)
        .await
        .unwrap();
    (engine, president)
}

#[tokio::test]
async fn short_fragments_match_family_tokens_only() {
    let (engine, _president) = populated().await;

    assert_eq!(
        engine.search_by_prefix("12").await.unwrap(),
        vec!["bob".to_string(), "alice".to_string()]
    );
    assert!(engine.search_by_prefix("zo").await.unwrap().is_empty());
    assert!(engine.search_by_prefix("1").await.unwrap().is_empty());
    assert!(engine.search_by_prefix("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn longer_alphabetic_fragments_match_names() {
    let (engine, _president) = populated().await;

    assert_eq!(
        engine.search_by_prefix("EMI").await.unwrap(),
        vec!["emile".to_string()]
    );
    assert_eq!(
        engine.search_by_prefix("mimi").await.unwrap(),
        vec!["emile".to_string()]
    );
    assert_eq!(
        engine.search_by_prefix("mar").await.unwrap(),
        vec!["alice".to_string()]
    );
    assert_eq!(
        engine.search_by_prefix("abc").await.unwrap(),
        vec!["carl".to_string()]
    );
    assert!(engine.search_by_prefix("host").await.unwrap().is_empty());
}

#[tokio::test]
async fn balance_lookup_is_for_operators() {
    let (engine, president) = populated().await;
    let alice = engine.user_by_username("alice").await.unwrap();
    fund(&engine, &president, &alice, 420).await;

    assert_eq!(
        engine.balance_for("alice", president.id).await.unwrap(),
        MoneyCents::new(420)
    );
    let err = engine.balance_for("bob", alice.id).await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    let err = engine.balance_for("ghost", president.id).await.unwrap_err();
    assert!(matches!(err, EngineError::UserNotFound(_)));
}

#[tokio::test]
async fn listings_hide_externals_and_filter_by_state() {
    let (engine, president) = populated().await;
    let bob = engine.user_by_username("bob").await.unwrap();
    engine
        .record_exceptional_movement(engine::MovementCmd::new(
            president.id,
            bob.id,
            MoneyCents::new(-150),
            "unpaid dinner",
        ))
        .await
        .unwrap();

    let usernames = |users: Vec<User>| -> Vec<String> {
        users.into_iter().map(|user| user.username).collect()
    };

    assert_eq!(
        usernames(engine.list_users(UserFilter::default()).await.unwrap()),
        vec!["alice", "bob", "carl", "emile", "pres"]
    );
    assert_eq!(
        usernames(
            engine
                .list_users(UserFilter {
                    state: Some(UserState::Inactive),
                    ..UserFilter::default()
                })
                .await
                .unwrap()
        ),
        vec!["ghost"]
    );
    assert_eq!(
        usernames(
            engine
                .list_users(UserFilter {
                    state: Some(UserState::NegativeBalance),
                    ..UserFilter::default()
                })
                .await
                .unwrap()
        ),
        vec!["bob"]
    );
    assert_eq!(
        usernames(
            engine
                .list_users(UserFilter {
                    year: Some(2024),
                    search: Some("Du".to_string()),
                    ..UserFilter::default()
                })
                .await
                .unwrap()
        ),
        vec!["bob"]
    );
}
