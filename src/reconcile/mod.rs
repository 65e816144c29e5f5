//! Generic diff engine shared by every entity type.
//!
//! `reconcile` compares a desired mapping (read from the device) with the
//! actual mapping (read from NetBox) and returns the deltas that bring NetBox
//! in line. It performs no I/O; the caller applies each delta on its own and
//! treats each one as independently failable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::EntityKind;

/// A NetBox record together with its object id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Existing<A> {
    pub id: i64,
    pub record: A,
}

impl<A> Existing<A> {
    pub fn new(id: i64, record: A) -> Self {
        Self { id, record }
    }
}

/// A named group of attributes compared for divergence. Attributes that must
/// be patched together (interface speed + media tags) share one group.
pub struct TrackedField<D, A> {
    pub name: &'static str,
    pub differs: fn(&D, &A) -> bool,
}

/// How diverging field groups of one key turn into updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateMode {
    /// One update carrying every diverging group
    #[default]
    Combined,
    /// Only the first diverging group in declaration order; later groups
    /// are picked up by the next run
    FirstDivergence,
    /// One update per diverging group
    PerField,
}

type CreateFn<K, D, P> = Box<dyn Fn(&K, &D) -> P + Send + Sync>;
type UpdateFn<K, D, P> = Box<dyn Fn(&K, &D, &[&'static str]) -> P + Send + Sync>;

/// Per entity type reconciliation rules
pub struct EntityPolicy<K, D, A, P> {
    pub kind: EntityKind,
    fields: Vec<TrackedField<D, A>>,
    exempt_keys: BTreeSet<K>,
    prune: bool,
    update_mode: UpdateMode,
    create: CreateFn<K, D, P>,
    update: UpdateFn<K, D, P>,
}

impl<K: Ord, D, A, P> EntityPolicy<K, D, A, P> {
    pub fn new(
        kind: EntityKind,
        create: impl Fn(&K, &D) -> P + Send + Sync + 'static,
        update: impl Fn(&K, &D, &[&'static str]) -> P + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            exempt_keys: BTreeSet::new(),
            prune: true,
            update_mode: UpdateMode::Combined,
            create: Box::new(create),
            update: Box::new(update),
        }
    }

    /// Compare a field group; groups are evaluated in the order they are added
    pub fn track(mut self, name: &'static str, differs: fn(&D, &A) -> bool) -> Self {
        self.fields.push(TrackedField { name, differs });
        self
    }

    /// Never delete this key, whatever the device reports
    pub fn exempt(mut self, key: K) -> Self {
        self.exempt_keys.insert(key);
        self
    }

    /// Leave records that only exist in NetBox alone
    pub fn keep_extras(mut self) -> Self {
        self.prune = false;
        self
    }

    pub fn update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Delta<K, P> {
    Create { key: K, payload: P },
    Update { key: K, id: i64, fields: Vec<&'static str>, payload: P },
    Delete { key: K, id: i64 },
}

/// Compute the deltas turning `actual` into `desired`.
///
/// Creates and updates come first, in key order, followed by deletes.
pub fn reconcile<K, D, A, P>(
    desired: &BTreeMap<K, D>,
    actual: &BTreeMap<K, Existing<A>>,
    policy: &EntityPolicy<K, D, A, P>,
) -> Vec<Delta<K, P>>
where
    K: Ord + Clone,
{
    let mut deltas = Vec::new();

    for (key, want) in desired {
        let Some(have) = actual.get(key) else {
            deltas.push(Delta::Create {
                key: key.clone(),
                payload: (policy.create)(key, want),
            });
            continue;
        };

        let diverging: Vec<&'static str> = policy
            .fields
            .iter()
            .filter(|field| (field.differs)(want, &have.record))
            .map(|field| field.name)
            .collect();
        if diverging.is_empty() {
            continue;
        }

        let batches: Vec<Vec<&'static str>> = match policy.update_mode {
            UpdateMode::Combined => vec![diverging],
            UpdateMode::FirstDivergence => vec![vec![diverging[0]]],
            UpdateMode::PerField => diverging.into_iter().map(|name| vec![name]).collect(),
        };
        for fields in batches {
            deltas.push(Delta::Update {
                key: key.clone(),
                id: have.id,
                payload: (policy.update)(key, want, &fields),
                fields,
            });
        }
    }

    if policy.prune {
        for (key, have) in actual {
            if desired.contains_key(key) || policy.exempt_keys.contains(key) {
                continue;
            }
            deltas.push(Delta::Delete {
                key: key.clone(),
                id: have.id,
            });
        }
    }

    deltas
}
