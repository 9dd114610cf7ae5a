//! Student class selection and enrollment.
//!
//! A class id moves between two lists on the user document:
//!
//! ```text
//! unselected --select--> selected --enroll--> enrolled
//!      ^                    |
//!      +-------remove-------+
//! ```
//!
//! Enrolling also touches the class document (`attended + 1`, `seats - 1`). How the two
//! writes relate is chosen by [`EnrollPolicy`].

use bson::{doc, Document};
use serde::{Deserialize, Serialize};
use tracing_futures::Instrument;

use crate::data::class::{ClassId, CLASS_COLLECTION_NAME};
use crate::data::store::{DocumentStore, UpdateOutcome, UpdateWrite};
use crate::data::user::{by_email, ENROLLED_CLASSES, SELECTED_CLASSES, USER_COLLECTION_NAME};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollPolicy {
    /// The user update is authoritative. Class counters are updated afterwards only if it
    /// succeeded, and a counter failure is logged and otherwise ignored: the student stays
    /// enrolled with `seats`/`attended` untouched.
    #[default]
    Sequential,
    /// Both updates commit together or not at all. A missing user or class rolls the
    /// enrollment back and is reported as [`StoreError::Unmatched`].
    Transactional,
}

fn counters_update() -> Document {
    doc! { "$inc": { "attended": 1, "seats": -1 } }
}

pub struct Enrollment<'s, S: ?Sized> {
    store: &'s S,
    policy: EnrollPolicy,
}

impl<'s, S: DocumentStore + ?Sized> Enrollment<'s, S> {
    pub fn new(store: &'s S, policy: EnrollPolicy) -> Enrollment<'s, S> {
        Enrollment { store, policy }
    }

    /// Appends `class` to the student's selected classes. Repeated selection adds repeated
    /// entries; neither capacity nor existence of the class is checked.
    pub async fn select(&self, class: &ClassId, email: &str) -> Result<UpdateOutcome, StoreError> {
        tracing::debug!("{} selects class {}", email, class);
        self.store
            .update_one(
                USER_COLLECTION_NAME,
                by_email(email),
                doc! { "$push": { SELECTED_CLASSES: class.as_str() } },
            )
            .await
    }

    /// Drops every occurrence of `class` from the student's selected classes.
    pub async fn remove(&self, class: &ClassId, email: &str) -> Result<UpdateOutcome, StoreError> {
        tracing::debug!("{} removes class {} from selection", email, class);
        self.store
            .update_one(
                USER_COLLECTION_NAME,
                by_email(email),
                doc! { "$pull": { SELECTED_CLASSES: class.as_str() } },
            )
            .await
    }

    /// Moves `class` from the selected to the enrolled list and takes a seat. The returned
    /// outcome is the one of the user update.
    ///
    /// Selection isn't required beforehand and seats aren't checked; concurrent
    /// enrollments may drive `seats` below zero.
    pub async fn enroll(&self, class: &ClassId, email: &str) -> Result<UpdateOutcome, StoreError> {
        let user_write = UpdateWrite::new(
            USER_COLLECTION_NAME,
            by_email(email),
            doc! {
                "$push": { ENROLLED_CLASSES: class.as_str() },
                "$pull": { SELECTED_CLASSES: class.as_str() }
            },
        );

        match self.policy {
            EnrollPolicy::Sequential => self.enroll_sequential(user_write, class, email).await,
            EnrollPolicy::Transactional => {
                let class_write =
                    UpdateWrite::new(CLASS_COLLECTION_NAME, class.filter(), counters_update());
                let outcomes = self
                    .store
                    .update_all_or_none(vec![user_write, class_write])
                    .await?;
                tracing::info!("{} enrolled in class {}", email, class);

                outcomes
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::Unmatched(USER_COLLECTION_NAME.to_string()))
            }
        }
    }

    async fn enroll_sequential(
        &self,
        user_write: UpdateWrite,
        class: &ClassId,
        email: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        let outcome = self
            .store
            .update_one(&user_write.collection, user_write.filter, user_write.update)
            .await?;

        if outcome.matched_count == 0 {
            tracing::debug!("No user {}; counters of class {} untouched", email, class);
            return Ok(outcome);
        }
        tracing::info!("{} enrolled in class {}", email, class);

        let counters = self
            .store
            .update_one(CLASS_COLLECTION_NAME, class.filter(), counters_update())
            .instrument(tracing::info_span!("class_counters", class = %class))
            .await;

        match counters {
            Ok(it) if it.matched_count == 0 => {
                tracing::warn!("Class {} doesn't exist; {} enrolled without a seat", class, email)
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(
                "Counters of class {} not updated after enrolling {}: {}",
                class,
                email,
                e
            ),
        }

        Ok(outcome)
    }
}
