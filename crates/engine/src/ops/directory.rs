use std::{cmp::Reverse, collections::BTreeSet};

use regex::Regex;
use sea_orm::{QueryFilter, prelude::*};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{Capability, EngineError, MoneyCents, ResultEngine, users};

use super::Engine;

/// Fragments longer than this also match on names.
const NAME_MATCH_MIN_LEN: usize = 2;

impl Engine {
    /// Usernames of active users matching `fragment`.
    ///
    /// The family field must contain `fragment` as its first whole token
    /// (externals excluded). Purely alphabetic fragments of three characters
    /// or more also match the start of last name, first name or surname,
    /// ignoring case and accents. Results are unique, most recent year
    /// first.
    pub async fn search_by_prefix(&self, fragment: &str) -> ResultEngine<Vec<String>> {
        let key = fragment.trim();
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let externals: BTreeSet<i64> = self
            .external_ids(&self.database)
            .await?
            .into_iter()
            .collect();
        let candidates = users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .all(&self.database)
            .await?;

        let family = family_matcher(key)?;
        let by_name = matches_names(key);
        let folded_key = fold(key);

        let mut matches: Vec<&users::Model> = candidates
            .iter()
            .filter(|user| {
                let family_match = !externals.contains(&user.id)
                    && user
                        .family
                        .as_deref()
                        .is_some_and(|family_value| family.is_match(family_value));
                family_match || (by_name && name_starts_with(user, &folded_key))
            })
            .collect();
        matches.sort_by(|a, b| {
            Reverse(a.year)
                .cmp(&Reverse(b.year))
                .then_with(|| a.username.cmp(&b.username))
        });

        Ok(matches.into_iter().map(|user| user.username.clone()).collect())
    }

    /// Balance of `username`, for operators of a sale module.
    pub async fn balance_for(&self, username: &str, requester_id: i64) -> ResultEngine<MoneyCents> {
        self.check(requester_id, Capability::UseOperatorSaleModule)
            .await?
            .into_result()?;
        users::Entity::find()
            .filter(users::Column::Username.eq(username.trim()))
            .filter(users::Column::IsActive.eq(true))
            .one(&self.database)
            .await?
            .map(|user| MoneyCents::new(user.balance))
            .ok_or_else(|| EngineError::UserNotFound(username.to_string()))
    }
}

fn family_matcher(key: &str) -> ResultEngine<Regex> {
    Regex::new(&format!(r"^{}(\W|$)", regex::escape(key)))
        .map_err(|err| EngineError::InvalidInput(err.to_string()))
}

fn matches_names(key: &str) -> bool {
    key.chars().count() > NAME_MATCH_MIN_LEN && key.chars().all(char::is_alphabetic)
}

/// Lowercase without diacritics.
fn fold(value: &str) -> String {
    value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn name_starts_with(user: &users::Model, folded_key: &str) -> bool {
    [
        Some(user.last_name.as_str()),
        Some(user.first_name.as_str()),
        user.surname.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|name| fold(name).starts_with(folded_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_matches_whole_first_token_only() {
        let family = family_matcher("12").unwrap();
        assert!(family.is_match("12"));
        assert!(family.is_match("12-34"));
        assert!(family.is_match("12 bis"));
        assert!(!family.is_match("123"));
        assert!(!family.is_match("34-12"));
    }

    #[test]
    fn family_key_is_escaped() {
        let family = family_matcher("1.2").unwrap();
        assert!(family.is_match("1.2"));
        assert!(!family.is_match("1x2"));
    }

    #[test]
    fn names_need_three_alphabetic_characters() {
        assert!(!matches_names("ab"));
        assert!(!matches_names("ab1"));
        assert!(matches_names("abc"));
        assert!(matches_names("éléa"));
    }

    #[test]
    fn fold_ignores_case_and_accents() {
        assert_eq!(fold("Éloïse"), "eloise");
        assert!(fold("Ðuc Çedille").starts_with("ðuc c"));
    }
}
