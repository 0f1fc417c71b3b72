//! Shared events: expenses split between participants once the event is
//! finished. Until then their shares are pending and only show up in the
//! forecast balance.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedEvent {
    pub id: i64,
    pub description: String,
    pub manager_id: i64,
    pub date: DateTime<Utc>,
    pub price: Option<MoneyCents>,
    pub done: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "shared_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub description: String,
    pub manager_id: i64,
    pub date: DateTimeUtc,
    pub price: Option<i64>,
    pub done: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shared_event_participants::Entity")]
    Participants,
}

impl Related<super::shared_event_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SharedEvent {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            manager_id: model.manager_id,
            date: model.date,
            price: model.price.map(MoneyCents::new),
            done: model.done,
        }
    }
}

/// Splits `price` between participants proportionally to their weight.
///
/// Cents lost to integer division go one by one to the heaviest
/// participants (ties broken by user id), so the shares always add up to
/// `price`.
pub fn split_price(price: MoneyCents, weights: &[(i64, i64)]) -> ResultEngine<Vec<(i64, MoneyCents)>> {
    let total: i128 = weights.iter().map(|(_, weight)| i128::from(*weight)).sum();
    if total <= 0 {
        return Ok(Vec::new());
    }
    let price_minor = i128::from(price.cents());

    let mut shares: Vec<(i64, i64, i64)> = weights
        .iter()
        .map(|&(user_id, weight)| {
            let share = price_minor * i128::from(weight) / total;
            i64::try_from(share)
                .map(|share| (user_id, weight, share))
                .map_err(|_| EngineError::InvalidAmount("share too large".to_string()))
        })
        .collect::<ResultEngine<_>>()?;

    let assigned: i128 = shares.iter().map(|(_, _, share)| i128::from(*share)).sum();
    let mut remainder = price_minor - assigned;
    shares.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (_, _, share) in shares.iter_mut() {
        if remainder == 0 {
            break;
        }
        *share += 1;
        remainder -= 1;
    }

    Ok(shares
        .into_iter()
        .map(|(user_id, _, share)| (user_id, MoneyCents::new(share)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_distributes_remainder_to_heaviest() {
        let shares = split_price(MoneyCents::new(1000), &[(1, 1), (2, 2), (3, 0)]).unwrap();
        let total: MoneyCents = shares.iter().map(|(_, s)| *s).sum();
        assert_eq!(total, MoneyCents::new(1000));
        let of = |id: i64| shares.iter().find(|(u, _)| *u == id).map(|(_, s)| *s);
        assert_eq!(of(2), Some(MoneyCents::new(667)));
        assert_eq!(of(1), Some(MoneyCents::new(333)));
        assert_eq!(of(3), Some(MoneyCents::ZERO));
    }

    #[test]
    fn split_survives_huge_weights() {
        let shares = split_price(MoneyCents::new(1000), &[(1, i64::MAX), (2, i64::MAX)]).unwrap();
        assert_eq!(
            shares,
            vec![(1, MoneyCents::new(500)), (2, MoneyCents::new(500))]
        );
    }

    #[test]
    fn split_without_participants_is_empty() {
        assert!(split_price(MoneyCents::new(1000), &[]).unwrap().is_empty());
    }
}
