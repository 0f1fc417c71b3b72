use std::collections::BTreeSet;

use chrono::Utc;

use engine::{
    Capability, Engine, EngineError, GroupUpdateCmd, ModuleConfig, ModuleKind, MoneyCents,
    NewProduct, NewUser, ProductUpdate, ReservedGroup, SaleCmd, associates_group_name,
    chiefs_group_name,
};
use sea_orm::ConnectionTrait;

mod common;

use common::{
    engine_with_db, engine_with_president, external, fund, member, shop_with_product,
};

fn update(acting: i64, actor: i64, target: i64, members: Vec<i64>, permissions: Vec<i64>) -> GroupUpdateCmd {
    GroupUpdateCmd {
        acting_user_id: acting,
        actor_group_id: actor,
        target_group_id: target,
        members,
        permissions,
    }
}

async fn permission_id(engine: &Engine, president: i64, target_group: i64, codename: &str) -> i64 {
    let presidents = engine.registry().id(ReservedGroup::Presidents);
    engine
        .group_state(president, presidents, target_group)
        .await
        .unwrap()
        .offered_permissions
        .into_iter()
        .find(|permission| permission.codename == codename)
        .map(|permission| permission.id)
        .unwrap()
}

#[tokio::test]
async fn every_capability_is_seeded() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;

    for capability in Capability::ALL {
        assert!(
            engine.check(president.id, capability).await.unwrap().is_allowed(),
            "president lacks {capability}"
        );
    }
    assert!(engine
        .check(alice.id, Capability::UseSelfSaleModule)
        .await
        .unwrap()
        .is_allowed());
    let denied = engine.check(alice.id, Capability::AddUser).await.unwrap();
    assert_eq!(
        denied.into_result(),
        Err(EngineError::PermissionDenied(
            "missing capability add_user".to_string()
        ))
    );
    assert!(!engine.check(9_999, Capability::ViewSale).await.unwrap().is_allowed());
}

#[tokio::test]
async fn shop_groups_form_a_management_chain() {
    let (engine, president) = engine_with_president().await;
    let (shop, _) = shop_with_product(&engine, &president, 100).await;
    let chiefs = engine.group_by_name(&chiefs_group_name(&shop.name)).await.unwrap();
    let associates = engine
        .group_by_name(&associates_group_name(&shop.name))
        .await
        .unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);

    assert!(engine.can_manage(chiefs.id, associates.id).await.unwrap());
    assert!(engine.can_manage(presidents, chiefs.id).await.unwrap());
    assert!(!engine.can_manage(associates.id, chiefs.id).await.unwrap());
    assert!(!engine.can_manage(chiefs.id, chiefs.id).await.unwrap());

    let err = engine
        .create_shop(president.id, "bar", "", "")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("bar".to_string()));
    let err = engine
        .create_shop(president.id, "Bar Two", "", "")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn associates_are_offered_only_what_chiefs_hold() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let (shop, _) = shop_with_product(&engine, &president, 100).await;
    let chiefs = engine.group_by_name(&chiefs_group_name(&shop.name)).await.unwrap();
    let associates = engine
        .group_by_name(&associates_group_name(&shop.name))
        .await
        .unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);

    let chiefs_permissions = engine
        .group_state(president.id, presidents, chiefs.id)
        .await
        .unwrap()
        .permissions;
    engine
        .apply_group_update(update(
            president.id,
            presidents,
            chiefs.id,
            vec![alice.id],
            chiefs_permissions,
        ))
        .await
        .unwrap();

    let state = engine
        .group_state(alice.id, chiefs.id, associates.id)
        .await
        .unwrap();
    let offered: BTreeSet<String> = state
        .offered_permissions
        .iter()
        .map(|permission| permission.codename.clone())
        .collect();
    let expected: BTreeSet<String> = Capability::DEFAULT_CHIEFS
        .iter()
        .map(|capability| capability.codename().to_string())
        .collect();
    assert_eq!(offered, expected);
    assert!(state.possible_members.iter().any(|user| user.id == alice.id));

    let add_shop = permission_id(&engine, president.id, chiefs.id, "add_shop").await;
    let err = engine
        .apply_group_update(update(alice.id, chiefs.id, associates.id, vec![], vec![add_shop]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let view_sale = permission_id(&engine, president.id, chiefs.id, "view_sale").await;
    let summary = engine
        .apply_group_update(update(alice.id, chiefs.id, associates.id, vec![], vec![view_sale]))
        .await
        .unwrap();
    assert_eq!(summary.added_permissions, vec![view_sale]);
}

#[tokio::test]
async fn group_updates_apply_only_differences() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let bob = member(&engine, &president, "bob").await;
    let (shop, _) = shop_with_product(&engine, &president, 100).await;
    let chiefs = engine.group_by_name(&chiefs_group_name(&shop.name)).await.unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);
    let permissions = engine
        .group_state(president.id, presidents, chiefs.id)
        .await
        .unwrap()
        .permissions;

    let first = engine
        .apply_group_update(update(
            president.id,
            presidents,
            chiefs.id,
            vec![alice.id, bob.id],
            permissions.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(first.added_members, vec![alice.id, bob.id]);
    assert!(first.removed_members.is_empty());
    assert!(first.added_permissions.is_empty());

    let again = engine
        .apply_group_update(update(
            president.id,
            presidents,
            chiefs.id,
            vec![bob.id, alice.id, alice.id],
            permissions.clone(),
        ))
        .await
        .unwrap();
    assert!(again.is_empty());

    let shrink = engine
        .apply_group_update(update(president.id, presidents, chiefs.id, vec![bob.id], permissions))
        .await
        .unwrap();
    assert_eq!(shrink.removed_members, vec![alice.id]);
    let names: Vec<String> = engine
        .groups_of(bob.id)
        .await
        .unwrap()
        .into_iter()
        .map(|group| group.name)
        .collect();
    assert_eq!(names, vec!["chiefs-bar".to_string(), "members".to_string()]);
}

#[tokio::test]
async fn group_management_is_refused_outside_the_chain() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let outsider = external(&engine, &president, "visitor").await;
    let (shop, _) = shop_with_product(&engine, &president, 100).await;
    let chiefs = engine.group_by_name(&chiefs_group_name(&shop.name)).await.unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);

    let err = engine
        .apply_group_update(update(alice.id, presidents, chiefs.id, vec![alice.id], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .group_state(alice.id, chiefs.id, chiefs.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .apply_group_update(update(president.id, presidents, chiefs.id, vec![outsider.id], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .apply_group_update(update(president.id, presidents, 9_999, vec![], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::GroupNotFound(_)));
}

#[tokio::test]
async fn deactivation_is_blocked_by_managed_events() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let event = engine
        .create_shared_event(alice.id, "Barbecue", Utc::now())
        .await
        .unwrap();

    let err = engine
        .set_user_active(president.id, alice.id, false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::SharedEventsPending(vec!["Barbecue".to_string()])
    );
    assert!(engine.user(alice.id).await.unwrap().is_active);

    engine
        .register_participant(alice.id, event.id, alice.id, 1)
        .await
        .unwrap();
    engine
        .set_event_price(alice.id, event.id, MoneyCents::ZERO)
        .await
        .unwrap();
    engine.finish_shared_event(alice.id, event.id).await.unwrap();

    let user = engine
        .set_user_active(president.id, alice.id, false)
        .await
        .unwrap();
    assert!(!user.is_active);
    let err = engine.authenticate("alice", "secret").await.unwrap_err();
    assert_eq!(err, EngineError::InvalidCredentials);

    let user = engine.set_user_active(president.id, alice.id, true).await.unwrap();
    assert!(user.is_active);
    assert_eq!(engine.authenticate("alice", "secret").await.unwrap().id, alice.id);
}

#[tokio::test]
async fn deactivating_a_special_member_keeps_only_specials() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let bob = member(&engine, &president, "bob").await;
    let (shop, _) = shop_with_product(&engine, &president, 100).await;
    let chiefs = engine.group_by_name(&chiefs_group_name(&shop.name)).await.unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);
    let specials = engine.registry().id(ReservedGroup::Specials);

    for target in [specials, chiefs.id] {
        let permissions = engine
            .group_state(president.id, presidents, target)
            .await
            .unwrap()
            .permissions;
        engine
            .apply_group_update(update(
                president.id,
                presidents,
                target,
                vec![alice.id, bob.id],
                permissions,
            ))
            .await
            .unwrap();
    }

    engine.set_user_active(president.id, alice.id, false).await.unwrap();
    let groups = engine.groups_of(alice.id).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, specials);

    let err = engine
        .set_user_active(bob.id, alice.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    assert_eq!(engine.groups_of(bob.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn user_creation_paths() {
    let (engine, db) = engine_with_db().await;
    let president = engine
        .bootstrap_president(NewUser::new("pres", "secret", "Ada", "Lovelace"))
        .await
        .unwrap();
    let err = engine
        .bootstrap_president(NewUser::new("pres2", "secret", "Grace", "Hopper"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let alice = member(&engine, &president, "alice").await;
    let err = engine
        .create_user(alice.id, NewUser::new("carol", "secret", "Carol", "C"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .create_user(president.id, NewUser::new("alice", "secret", "Other", "Alice"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));

    let err = engine
        .create_user(president.id, NewUser::new("two words", "secret", "A", "B"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine
        .register_user(NewUser::new("dave", "secret", "Dave", "D"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let open = Engine::builder()
        .database(db)
        .self_registration(true)
        .build()
        .await
        .unwrap();
    let dave = open
        .register_user(NewUser::new("dave", "secret", "Dave", "D"))
        .await
        .unwrap();
    assert_eq!(open.authenticate("dave", "secret").await.unwrap().id, dave.id);
    assert_eq!(
        open.authenticate("dave", "wrong").await.unwrap_err(),
        EngineError::InvalidCredentials
    );
}

#[tokio::test]
async fn shop_chiefs_act_only_on_their_own_shop() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let bob = member(&engine, &president, "bob").await;
    fund(&engine, &president, &bob, 1_000).await;
    let (bar, beer) = shop_with_product(&engine, &president, 100).await;

    let kfet = engine
        .create_shop(president.id, "kfet", "", "")
        .await
        .unwrap();
    engine
        .configure_module(
            president.id,
            kfet.id,
            ModuleKind::OperatorSale,
            ModuleConfig {
                enabled: true,
                ..ModuleConfig::default()
            },
        )
        .await
        .unwrap();
    let coffee = engine
        .create_product(
            president.id,
            NewProduct::new(kfet.id, "Coffee", MoneyCents::new(50)).stock(10),
        )
        .await
        .unwrap();
    let kfet_chiefs = engine.group_by_name(&chiefs_group_name(&kfet.name)).await.unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);
    let permissions = engine
        .group_state(president.id, presidents, kfet_chiefs.id)
        .await
        .unwrap()
        .permissions;
    engine
        .apply_group_update(update(
            president.id,
            presidents,
            kfet_chiefs.id,
            vec![alice.id],
            permissions,
        ))
        .await
        .unwrap();

    let sale = engine
        .record_sale(SaleCmd::operator_sale(alice.id, kfet.id).client("bob").line(coffee.id, 2))
        .await
        .unwrap();
    assert_eq!(sale.amount, MoneyCents::new(100));

    let err = engine
        .record_sale(SaleCmd::operator_sale(alice.id, bar.id).client("bob").line(beer.id, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .update_product(
            alice.id,
            beer.id,
            ProductUpdate {
                base_price: Some(MoneyCents::new(1)),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .configure_module(alice.id, bar.id, ModuleKind::OperatorSale, ModuleConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .create_product(alice.id, NewProduct::new(bar.id, "Wine", MoneyCents::new(300)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine.remove_product(alice.id, beer.id).await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    assert_eq!(engine.get_balance(bob.id).await.unwrap(), MoneyCents::new(900));
    let bar_products = engine.products(bar.id).await.unwrap();
    assert_eq!(bar_products[0].base_price, MoneyCents::new(100));
    assert!(
        engine
            .module_config(bar.id, ModuleKind::OperatorSale)
            .await
            .unwrap()
            .enabled
    );
}

#[tokio::test]
async fn revoked_management_is_refused_at_write_time() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let bob = member(&engine, &president, "bob").await;
    let (shop, _) = shop_with_product(&engine, &president, 100).await;
    let chiefs = engine.group_by_name(&chiefs_group_name(&shop.name)).await.unwrap();
    let associates = engine
        .group_by_name(&associates_group_name(&shop.name))
        .await
        .unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);
    let permissions = engine
        .group_state(president.id, presidents, chiefs.id)
        .await
        .unwrap()
        .permissions;
    engine
        .apply_group_update(update(
            president.id,
            presidents,
            chiefs.id,
            vec![alice.id],
            permissions,
        ))
        .await
        .unwrap();

    let seen = engine
        .group_state(alice.id, chiefs.id, associates.id)
        .await
        .unwrap();
    assert!(seen.members.is_empty());

    engine
        .apply_group_update(update(president.id, presidents, chiefs.id, vec![alice.id], vec![]))
        .await
        .unwrap();

    let err = engine
        .apply_group_update(update(
            alice.id,
            chiefs.id,
            associates.id,
            vec![bob.id],
            seen.permissions,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    let names: Vec<String> = engine
        .groups_of(bob.id)
        .await
        .unwrap()
        .into_iter()
        .map(|group| group.name)
        .collect();
    assert_eq!(names, vec!["members".to_string()]);
}

#[tokio::test]
async fn vanished_membership_makes_the_update_stale() {
    let (engine, db) = engine_with_db().await;
    let president = engine
        .bootstrap_president(NewUser::new("pres", "secret", "Ada", "Lovelace"))
        .await
        .unwrap();
    let alice = member(&engine, &president, "alice").await;
    let bob = member(&engine, &president, "bob").await;
    let (shop, _) = shop_with_product(&engine, &president, 100).await;
    let chiefs = engine.group_by_name(&chiefs_group_name(&shop.name)).await.unwrap();
    let presidents = engine.registry().id(ReservedGroup::Presidents);
    let permissions = engine
        .group_state(president.id, presidents, chiefs.id)
        .await
        .unwrap()
        .permissions;
    engine
        .apply_group_update(update(
            president.id,
            presidents,
            chiefs.id,
            vec![alice.id],
            permissions.clone(),
        ))
        .await
        .unwrap();

    // Stands in for a concurrent writer that already removed alice's row.
    db.execute_unprepared(&format!(
        "CREATE TRIGGER skip_alice BEFORE DELETE ON user_groups \
         WHEN OLD.user_id = {} AND OLD.group_id = {} \
         BEGIN SELECT RAISE(IGNORE); END;",
        alice.id, chiefs.id
    ))
    .await
    .unwrap();

    let err = engine
        .apply_group_update(update(
            president.id,
            presidents,
            chiefs.id,
            vec![bob.id],
            permissions,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StaleGroupState(_)));
    assert!(!err.is_retryable());

    let members = engine
        .group_state(president.id, presidents, chiefs.id)
        .await
        .unwrap()
        .members;
    assert_eq!(members, vec![alice.id]);
}
