//! Post and reaction events.

use riptide_shared::models::{Post, Reaction, UserStatus};
use riptide_shared::types::ChannelId;

use crate::dispatch::Reconciler;
use crate::events::UiEvent;

use super::{fetch_channel_and_membership, refresh_channel_stats};

pub(crate) async fn handle_posted(rc: &Reconciler, post: Post, set_online: bool) {
    let channel_id = post.channel_id.clone();
    let post_id = post.id.clone();
    let sender = post.user_id.clone();

    // A post can arrive for a channel we have never seen, e.g. a new
    // direct channel opened by the other side.
    let channel_known = rc
        .with_session(|s| s.store.channels.get(&channel_id).is_some())
        .unwrap_or(true);
    if !channel_known {
        fetch_channel_and_membership(rc, &channel_id).await;
    }

    let applied = rc
        .with_session(|s| {
            if set_online && !s.is_me(&sender) {
                s.store.users.set_status(sender.clone(), UserStatus::Online);
            }
            s.store.posts.upsert(post)
        })
        .unwrap_or(false);

    // Replays resolve to no-op upserts and stay invisible.
    if applied {
        rc.ui.emit(UiEvent::NewPost {
            channel_id,
            post_id,
        });
    }
}

pub(crate) async fn handle_post_edited(rc: &Reconciler, post: Post) {
    rc.with_session(|s| s.store.posts.upsert(post));
}

pub(crate) async fn handle_post_deleted(rc: &Reconciler, post: Post) {
    let was_pinned = post.is_pinned;
    let channel_id = post.channel_id.clone();
    rc.with_session(|s| s.store.posts.remove(&post.id));
    // Deleting a pinned post changes counts the server owns.
    if was_pinned {
        refresh_channel_stats(rc, &channel_id).await;
    }
}

pub(crate) fn handle_post_unread(
    rc: &Reconciler,
    channel_id: ChannelId,
    last_viewed_at: i64,
    msg_count: i64,
    mention_count: i64,
) {
    rc.with_session(|s| {
        s.store
            .channels
            .set_unread(&channel_id, last_viewed_at, msg_count, mention_count)
    });
}

pub(crate) fn handle_reaction_added(rc: &Reconciler, reaction: Reaction) {
    rc.with_session(|s| s.store.posts.add_reaction(reaction));
}

pub(crate) fn handle_reaction_removed(rc: &Reconciler, reaction: Reaction) {
    rc.with_session(|s| s.store.posts.remove_reaction(&reaction));
}
