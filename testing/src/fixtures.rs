//! Record fixtures and proptest strategies.

use crate::mocks::test_clock;
use chrono::Duration;
use murmur_core::environment::Clock;
use murmur_core::{Author, Comment, Post};
use proptest::prelude::*;

/// The author most fixtures are written by.
#[must_use]
pub fn ada() -> Author {
    Author::new("u-ada", "Ada")
}

/// A post with a fixed identifier, stamped at [`test_clock`] time.
#[must_use]
pub fn post(author: &Author, post_id: &str, text: &str, image: &str) -> Post {
    Post {
        id: post_id.to_string(),
        user_id: author.user_id.clone(),
        user_name: author.user_name.clone(),
        text: text.to_string(),
        image: image.to_string(),
        timestamp: test_clock().now(),
        edited: None,
    }
}

/// `count` comments under `post_id`, one second apart, with sortable ids.
#[must_use]
pub fn comments(post_id: &str, author: &Author, count: usize) -> Vec<Comment> {
    let start = test_clock().now();
    (0..count)
        .map(|i| Comment {
            id: format!("c{i:05}"),
            post_id: post_id.to_string(),
            user_id: author.user_id.clone(),
            user_name: author.user_name.clone(),
            text: format!("comment {i}"),
            timestamp: start + Duration::seconds(i64::try_from(i).unwrap_or_default()),
            edited: None,
        })
        .collect()
}

/// Number of comments under a post, including none at all.
pub fn comment_count() -> impl Strategy<Value = usize> {
    0usize..=120
}

/// A cascade policy: batch size and retry budget.
pub fn batch_size_and_retries() -> impl Strategy<Value = (usize, u32)> {
    (1usize..=25, 1u32..=6)
}

/// How many keys each early batch call leaves unapplied.
///
/// Every entry is bounded, so a store following this script accepts everything
/// once the script runs out.
pub fn rejection_script() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..=5, 0..=6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_ids_sort_in_creation_order() {
        let comments = comments("p1", &ada(), 12);
        let mut ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        let original = ids.clone();
        ids.sort_unstable();
        assert_eq!(ids, original);
        assert!(comments.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
