//! Client-side joins: attach looked-up records to a base list by key.
//!
//! `stitch` and `distinct_keys` are pure. `fetch_profiles` and
//! `attach_profiles` add the one lookup every caller needs: profiles by id.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::Serialize;
use uuid::Uuid;

use crate::gateway::{fetch_all, Gateway, GatewayError, Query};
use crate::models::profile::ProfileSummary;

/// A base record with its looked-up profile; serializes as the record's
/// own fields plus `profile`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stitched<T, U> {
    #[serde(flatten)]
    pub item: T,
    pub profile: Option<U>,
}

/// Attach `lookup[key(item)]` to every item, preserving order.
pub fn stitch<T, K, U, F>(items: Vec<T>, key: F, lookup: &HashMap<K, U>) -> Vec<Stitched<T, U>>
where
    K: Eq + Hash,
    U: Clone,
    F: Fn(&T) -> K,
{
    items
        .into_iter()
        .map(|item| {
            let profile = lookup.get(&key(&item)).cloned();
            Stitched { item, profile }
        })
        .collect()
}

/// Keys in first-seen order, without duplicates.
pub fn distinct_keys<'a, T, K, F>(items: impl IntoIterator<Item = &'a T>, key: F) -> Vec<K>
where
    T: 'a,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(key)
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

/// Profiles for `ids`, keyed by id. No round-trip when `ids` is empty.
pub async fn fetch_profiles(
    gateway: &dyn Gateway,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, ProfileSummary>, GatewayError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let query = Query::table("profiles")
        .select(ProfileSummary::COLUMNS)
        .is_in("id", ids.iter().copied());
    let profiles: Vec<ProfileSummary> = fetch_all(gateway, &query).await?;
    Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
}

/// Look up the profile for every item's user id and stitch it on.
pub async fn attach_profiles<T, F>(
    gateway: &dyn Gateway,
    items: Vec<T>,
    user_id: F,
) -> Result<Vec<Stitched<T, ProfileSummary>>, GatewayError>
where
    F: Fn(&T) -> Uuid,
{
    let ids = distinct_keys(&items, &user_id);
    let profiles = fetch_profiles(gateway, &ids).await?;
    Ok(stitch(items, user_id, &profiles))
}
