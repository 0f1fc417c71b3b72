use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    Capability, EngineError, NewUser, ReservedGroup, ResultEngine, SelfUpdate, User, UserFilter,
    UserState, UserUpdate,
    locks::LockKey,
    password::{hash_password, verify_password},
    shared_events, user_groups, users,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Creates a user on behalf of an operator holding `add_user`.
    pub async fn create_user(&self, operator_id: i64, new_user: NewUser) -> ResultEngine<User> {
        let user: User = with_tx!(self, |db_tx| {
            self.require(&db_tx, operator_id, Capability::AddUser).await?;
            self.insert_user(&db_tx, &new_user).await
        })?;
        tracing::info!(user_id = user.id, username = %user.username, operator_id, "user created");
        Ok(user)
    }

    /// Self-registration, available when the engine allows it.
    pub async fn register_user(&self, new_user: NewUser) -> ResultEngine<User> {
        if !self.self_registration {
            return Err(EngineError::PermissionDenied(
                "self registration is disabled".to_string(),
            ));
        }
        let user: User = with_tx!(self, |db_tx| self.insert_user(&db_tx, &new_user).await)?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Creates the first president. Refused once the presidents group has
    /// a member.
    pub async fn bootstrap_president(&self, new_user: NewUser) -> ResultEngine<User> {
        let presidents = self.registry.id(ReservedGroup::Presidents);
        let _locks = self.locks.acquire([LockKey::Group(presidents)]).await?;
        let user = self.commit_bootstrap(&new_user, presidents).await?;
        tracing::info!(user_id = user.id, username = %user.username, "president bootstrapped");
        Ok(user)
    }

    /// Changes profile fields of a user. Only fields that differ are
    /// written. The balance is never touched here.
    pub async fn update_user(
        &self,
        operator_id: i64,
        user_id: i64,
        update: UserUpdate,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            self.require(&db_tx, operator_id, Capability::ChangeUser)
                .await?;
            let model = self.require_user(&db_tx, user_id).await?;
            let mut active = model.clone().into_active_model();

            if let Some(first_name) = update.first_name.as_deref() {
                let first_name = normalize_required_text(first_name, "first name")?;
                if first_name != model.first_name {
                    active.first_name = ActiveValue::Set(first_name);
                }
            }
            if let Some(last_name) = update.last_name.as_deref() {
                let last_name = normalize_required_text(last_name, "last name")?;
                if last_name != model.last_name {
                    active.last_name = ActiveValue::Set(last_name);
                }
            }
            if let Some(value) = changed_text(&model.surname, update.surname.as_deref()) {
                active.surname = ActiveValue::Set(value);
            }
            if let Some(value) = changed_text(&model.family, update.family.as_deref()) {
                active.family = ActiveValue::Set(value);
            }
            if let Some(value) = changed_text(&model.email, update.email.as_deref()) {
                active.email = ActiveValue::Set(value);
            }
            if let Some(value) = changed_text(&model.phone, update.phone.as_deref()) {
                active.phone = ActiveValue::Set(value);
            }
            if let Some(value) = changed_text(&model.campus, update.campus.as_deref()) {
                active.campus = ActiveValue::Set(value);
            }
            if let Some(year) = update.year
                && model.year != Some(year)
            {
                active.year = ActiveValue::Set(Some(year));
            }

            let model = if active.is_changed() {
                active.update(&db_tx).await?
            } else {
                model
            };
            Ok(User::from(model))
        })
    }

    /// Email, phone and theme of one's own profile.
    pub async fn self_update(&self, user_id: i64, update: SelfUpdate) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.require_active_user(&db_tx, user_id).await?;
            let mut active = model.clone().into_active_model();
            if let Some(value) = changed_text(&model.email, update.email.as_deref()) {
                active.email = ActiveValue::Set(value);
            }
            if let Some(value) = changed_text(&model.phone, update.phone.as_deref()) {
                active.phone = ActiveValue::Set(value);
            }
            if let Some(value) = changed_text(&model.theme, update.theme.as_deref()) {
                active.theme = ActiveValue::Set(value);
            }
            let model = if active.is_changed() {
                active.update(&db_tx).await?
            } else {
                model
            };
            Ok(User::from(model))
        })
    }

    /// Deactivates or reactivates a user.
    ///
    /// Deactivation is refused while the user manages unfinished shared
    /// events. A deactivated special member keeps only the specials group.
    /// Reactivation flips the flag back and restores nothing else.
    pub async fn set_user_active(
        &self,
        operator_id: i64,
        user_id: i64,
        active: bool,
    ) -> ResultEngine<User> {
        let _locks = self.locks.acquire([LockKey::User(user_id)]).await?;
        let user = self
            .commit_activation(operator_id, user_id, active)
            .await
            .inspect_err(|err| tracing::debug!(%err, user_id, "activation change rejected"))?;

        tracing::info!(user_id, operator_id, active, "user activation changed");
        Ok(user)
    }

    /// Checks the password of an active user.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<User> {
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username.trim()))
            .one(&self.database)
            .await?
            .filter(|model| model.is_active)
            .ok_or(EngineError::InvalidCredentials)?;
        if !verify_password(password, &model.password) {
            return Err(EngineError::InvalidCredentials);
        }
        Ok(User::from(model))
    }

    pub async fn user(&self, user_id: i64) -> ResultEngine<User> {
        self.require_user(&self.database, user_id)
            .await
            .map(User::from)
    }

    pub async fn user_by_username(&self, username: &str) -> ResultEngine<User> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username.trim()))
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or_else(|| EngineError::UserNotFound(username.to_string()))
    }

    /// Users matching `filter`, externals excluded, sorted by username.
    pub async fn list_users(&self, filter: UserFilter) -> ResultEngine<Vec<User>> {
        let externals = self.external_ids(&self.database).await?;
        let mut query = users::Entity::find().filter(users::Column::Id.is_not_in(externals));

        if let Some(search) = normalize_optional_text(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(users::Column::Username.contains(search.as_str()))
                    .add(users::Column::FirstName.contains(search.as_str()))
                    .add(users::Column::LastName.contains(search.as_str()))
                    .add(users::Column::Surname.contains(search.as_str())),
            );
        }
        if let Some(year) = filter.year {
            query = query.filter(users::Column::Year.eq(year));
        }
        query = match filter.state {
            None | Some(UserState::Active) => query.filter(users::Column::IsActive.eq(true)),
            Some(UserState::Inactive) => query.filter(users::Column::IsActive.eq(false)),
            Some(UserState::NegativeBalance) => query
                .filter(users::Column::IsActive.eq(true))
                .filter(users::Column::Balance.lt(0)),
            Some(UserState::BelowThreshold(threshold)) => query
                .filter(users::Column::IsActive.eq(true))
                .filter(users::Column::Balance.lt(threshold.cents())),
        };

        Ok(query
            .order_by_asc(users::Column::Username)
            .all(&self.database)
            .await?
            .into_iter()
            .map(User::from)
            .collect())
    }

    async fn commit_bootstrap(&self, new_user: &NewUser, presidents: i64) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let existing = user_groups::Entity::find()
                .filter(user_groups::Column::GroupId.eq(presidents))
                .count(&db_tx)
                .await?;
            if existing > 0 {
                return Err(EngineError::PermissionDenied(
                    "a president already exists".to_string(),
                ));
            }
            let user = self.insert_user(&db_tx, new_user).await?;
            join_group(&db_tx, user.id, presidents).await?;
            Ok(user)
        })
    }

    async fn commit_activation(
        &self,
        operator_id: i64,
        user_id: i64,
        active: bool,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            if operator_id == user_id {
                self.require_user(&db_tx, operator_id).await?;
            } else {
                self.require(&db_tx, operator_id, Capability::DeleteUser)
                    .await?;
            }
            let model = self.require_user(&db_tx, user_id).await?;
            if model.is_active == active {
                return Ok(User::from(model));
            }

            if !active {
                let pending: Vec<String> = shared_events::Entity::find()
                    .filter(shared_events::Column::ManagerId.eq(user_id))
                    .filter(shared_events::Column::Done.eq(false))
                    .order_by_asc(shared_events::Column::Id)
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(|event| event.description)
                    .collect();
                if !pending.is_empty() {
                    return Err(EngineError::SharedEventsPending(pending));
                }

                let specials = self.registry.id(ReservedGroup::Specials);
                if self.is_member(&db_tx, user_id, specials).await? {
                    user_groups::Entity::delete_many()
                        .filter(user_groups::Column::UserId.eq(user_id))
                        .filter(user_groups::Column::GroupId.ne(specials))
                        .exec(&db_tx)
                        .await?;
                }
            }

            let mut record = model.into_active_model();
            record.is_active = ActiveValue::Set(active);
            Ok(User::from(record.update(&db_tx).await?))
        })
    }

    /// Shared creation path of every user: operator, self-registration,
    /// bootstrap and bulk import.
    async fn insert_user(&self, db_tx: &DatabaseTransaction, new_user: &NewUser) -> ResultEngine<User> {
        let username = normalize_required_text(&new_user.username, "username")?;
        if username.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidInput(format!(
                "username must not contain spaces: {username}"
            )));
        }
        if new_user.password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        let first_name = normalize_required_text(&new_user.first_name, "first name")?;
        let last_name = normalize_required_text(&new_user.last_name, "last name")?;

        let exists = users::Entity::find()
            .filter(users::Column::Username.eq(username.as_str()))
            .one(db_tx)
            .await?
            .is_some();
        if exists {
            return Err(EngineError::ExistingKey(username));
        }

        let model = users::ActiveModel {
            id: ActiveValue::NotSet,
            username: ActiveValue::Set(username),
            password: ActiveValue::Set(hash_password(&new_user.password)?),
            first_name: ActiveValue::Set(first_name),
            last_name: ActiveValue::Set(last_name),
            surname: ActiveValue::Set(normalize_optional_text(new_user.surname.as_deref())),
            family: ActiveValue::Set(normalize_optional_text(new_user.family.as_deref())),
            email: ActiveValue::Set(normalize_optional_text(new_user.email.as_deref())),
            phone: ActiveValue::Set(None),
            campus: ActiveValue::Set(normalize_optional_text(new_user.campus.as_deref())),
            year: ActiveValue::Set(new_user.year),
            theme: ActiveValue::Set(None),
            balance: ActiveValue::Set(0),
            is_active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db_tx)
        .await?;

        let group = if new_user.is_external_member {
            ReservedGroup::Externals
        } else {
            ReservedGroup::Members
        };
        join_group(db_tx, model.id, self.registry.id(group)).await?;
        Ok(User::from(model))
    }
}

async fn join_group(db_tx: &DatabaseTransaction, user_id: i64, group_id: i64) -> ResultEngine<()> {
    user_groups::Entity::insert(user_groups::ActiveModel {
        user_id: ActiveValue::Set(user_id),
        group_id: ActiveValue::Set(group_id),
    })
    .exec_without_returning(db_tx)
    .await?;
    Ok(())
}

/// New value of an optional text field when `requested` differs from
/// `current`. An empty request clears the field.
fn changed_text(current: &Option<String>, requested: Option<&str>) -> Option<Option<String>> {
    let requested = requested?;
    let value = normalize_optional_text(Some(requested));
    (value != *current).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_text_reports_only_differences() {
        let current = Some("Pi".to_string());
        assert_eq!(changed_text(&current, None), None);
        assert_eq!(changed_text(&current, Some(" Pi ")), None);
        assert_eq!(changed_text(&current, Some("Tau")), Some(Some("Tau".to_string())));
        assert_eq!(changed_text(&current, Some("")), Some(None));
        assert_eq!(changed_text(&None, Some("  ")), None);
    }
}
