//! Relief posts (posko) and their derived occupancy.
//!
//! Capacity is a planning figure. Occupancy above it is reported through
//! [`PostOccupancy::over_capacity`], never refused.

use chrono::Utc;
use relief_db::Store;
use relief_types::{Actor, EventId, PostDeletion, PostId, PostOccupancy, PostUpdate, ReliefPost};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ReliefError;
use crate::validate;

/// Input for opening a post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPost {
    /// Display name.
    pub name: String,
    /// Address or landmark.
    pub location: String,
    /// Planned number of sheltered residents.
    pub capacity: u32,
    /// Person in charge.
    pub pic_name: String,
    /// Phone number of the person in charge.
    pub pic_phone: String,
    /// Photo reference.
    #[serde(default)]
    pub photo: Option<String>,
    /// Map link.
    #[serde(default)]
    pub map_link: Option<String>,
}

/// Opens, edits and removes relief posts.
#[derive(Debug, Clone)]
pub struct ReliefPostRegistry {
    store: Store,
}

impl ReliefPostRegistry {
    /// Registry over the given store.
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Open a post under an active event.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for a blank name,
    /// [`ReliefError::NotFound`] for an unknown event,
    /// [`ReliefError::State`] if the event is resolved.
    pub async fn create(
        &self,
        event_id: EventId,
        input: NewPost,
        actor: &Actor,
    ) -> Result<ReliefPost, ReliefError> {
        validate::actor(actor)?;
        validate::non_blank("name", &input.name)?;

        let now = Utc::now();
        let post = ReliefPost {
            id: PostId::new(),
            event_id,
            name: input.name,
            location: input.location,
            capacity: input.capacity,
            pic_name: input.pic_name,
            pic_phone: input.pic_phone,
            photo: input.photo,
            map_link: input.map_link,
            created_by: actor.clone(),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.store.insert_post(&post).await {
            let err = ReliefError::from(err);
            warn!(event_id = %event_id, name = %post.name, error = %err, "Post creation rejected");
            return Err(err);
        }

        info!(
            post_id = %post.id,
            event_id = %event_id,
            name = %post.name,
            capacity = post.capacity,
            actor = %actor,
            "Relief post opened"
        );
        Ok(post)
    }

    /// Partially update a post. A rename refreshes the location of every
    /// resident sheltered there in the same step.
    ///
    /// # Errors
    ///
    /// [`ReliefError::Validation`] for an empty update or a blank name,
    /// [`ReliefError::NotFound`] for an unknown post,
    /// [`ReliefError::State`] if the post's event is resolved.
    pub async fn update(
        &self,
        post_id: PostId,
        update: &PostUpdate,
        actor: &Actor,
    ) -> Result<ReliefPost, ReliefError> {
        validate::actor(actor)?;
        if update.is_empty() {
            return Err(ReliefError::Validation(String::from(
                "update must change at least one field",
            )));
        }
        if let Some(name) = &update.name {
            validate::non_blank("name", name)?;
        }

        match self.store.update_post(post_id, update, Utc::now()).await {
            Ok(post) => {
                info!(
                    post_id = %post_id,
                    renamed = update.name.is_some(),
                    actor = %actor,
                    "Relief post updated"
                );
                Ok(post)
            }
            Err(err) => {
                let err = ReliefError::from(err);
                warn!(post_id = %post_id, error = %err, "Post update rejected");
                Err(err)
            }
        }
    }

    /// Delete a post. Sheltered residents are detached and keep the post
    /// name as their location; the post's items and their transaction
    /// logs are deleted. All of it happens in one step.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown post.
    pub async fn delete(
        &self,
        post_id: PostId,
        actor: &Actor,
    ) -> Result<PostDeletion, ReliefError> {
        validate::actor(actor)?;
        let deletion = self.store.delete_post(post_id, Utc::now()).await?;
        info!(
            post_id = %post_id,
            detached_residents = deletion.detached_residents,
            deleted_items = deletion.deleted_items,
            deleted_transactions = deletion.deleted_transactions,
            actor = %actor,
            "Relief post deleted"
        );
        Ok(deletion)
    }

    /// Residents currently sheltered at a post.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown post.
    pub async fn occupancy_of(&self, post_id: PostId) -> Result<u32, ReliefError> {
        self.get(post_id).await?;
        Ok(self.store.occupancy(post_id).await?)
    }

    /// Capacity against occupancy for one post.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown post.
    pub async fn occupancy_summary(&self, post_id: PostId) -> Result<PostOccupancy, ReliefError> {
        let post = self.get(post_id).await?;
        let occupancy = self.store.occupancy(post_id).await?;
        Ok(PostOccupancy::derive(&post, occupancy))
    }

    /// Look up a post.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown post.
    pub async fn get(&self, post_id: PostId) -> Result<ReliefPost, ReliefError> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| ReliefError::not_found("post", post_id))
    }

    /// Posts serving an event, oldest first.
    ///
    /// # Errors
    ///
    /// [`ReliefError::NotFound`] for an unknown event.
    pub async fn list(&self, event_id: EventId) -> Result<Vec<ReliefPost>, ReliefError> {
        validate::existing_event(&self.store, event_id).await?;
        Ok(self.store.list_posts(event_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::{EventLifecycleManager, NewEvent};

    fn operator() -> Actor {
        Actor::new("op-1")
    }

    fn shelter(name: &str, capacity: u32) -> NewPost {
        NewPost {
            name: name.to_owned(),
            location: String::from("Village hall"),
            capacity,
            pic_name: String::from("Budi"),
            pic_phone: String::from("0812"),
            photo: None,
            map_link: None,
        }
    }

    async fn setup() -> (EventLifecycleManager, ReliefPostRegistry, EventId) {
        let store = Store::memory();
        let events = EventLifecycleManager::new(store.clone());
        let posts = ReliefPostRegistry::new(store);
        let event = events
            .create(
                NewEvent {
                    title: String::from("Flood A"),
                    location: String::from("Riverside"),
                    description: String::new(),
                },
                &operator(),
            )
            .await
            .unwrap();
        (events, posts, event.id)
    }

    #[tokio::test]
    async fn resolved_event_refuses_new_posts() {
        let (events, posts, event_id) = setup().await;
        events.resolve(event_id, &operator()).await.unwrap();
        let result = posts.create(event_id, shelter("Shelter 1", 10), &operator()).await;
        assert!(matches!(result, Err(ReliefError::State(_))));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let (_, posts, _) = setup().await;
        let result = posts
            .create(EventId::new(), shelter("Shelter 1", 10), &operator())
            .await;
        assert!(matches!(result, Err(ReliefError::NotFound { entity: "event", .. })));
    }

    #[tokio::test]
    async fn blank_rename_and_empty_update_are_rejected() {
        let (_, posts, event_id) = setup().await;
        let post = posts
            .create(event_id, shelter("Shelter 1", 10), &operator())
            .await
            .unwrap();

        let empty = posts.update(post.id, &PostUpdate::default(), &operator()).await;
        assert!(matches!(empty, Err(ReliefError::Validation(_))));

        let blank = PostUpdate {
            name: Some(String::from(" ")),
            ..PostUpdate::default()
        };
        let blank = posts.update(post.id, &blank, &operator()).await;
        assert!(matches!(blank, Err(ReliefError::Validation(_))));

        let grow = PostUpdate {
            capacity: Some(40),
            ..PostUpdate::default()
        };
        let updated = posts.update(post.id, &grow, &operator()).await.unwrap();
        assert_eq!(updated.capacity, 40);
        assert_eq!(updated.name, "Shelter 1");
    }

    #[tokio::test]
    async fn empty_post_summary() {
        let (_, posts, event_id) = setup().await;
        let post = posts
            .create(event_id, shelter("Shelter 1", 10), &operator())
            .await
            .unwrap();
        assert_eq!(posts.occupancy_of(post.id).await.unwrap(), 0);
        let summary = posts.occupancy_summary(post.id).await.unwrap();
        assert_eq!(summary.available, 10);
        assert!(!summary.over_capacity);
        assert_eq!(summary.utilization_percent, Some(0));
    }

    #[tokio::test]
    async fn unknown_post_occupancy_is_not_found() {
        let (_, posts, _) = setup().await;
        assert!(matches!(
            posts.occupancy_of(PostId::new()).await,
            Err(ReliefError::NotFound { entity: "post", .. })
        ));
        assert!(posts.delete(PostId::new(), &operator()).await.is_err());
    }
}
